//! Session persistence
//!
//! Every top-level run gets a directory under the sessions root holding a
//! `status.json` ([`FlowStatus`]). Background tasks write their own status
//! below it. `cmdflow retry` reads the status back and resumes the flow.

pub mod status;
pub mod store;
pub mod writer;

pub use status::{CmdState, CmdStatus, FlowOutcome, FlowResult, FlowStatus};
pub use store::SessionStore;
pub use writer::{FileStatusWriter, NoopStatusWriter, StatusWriter, STATUS_FILE};
