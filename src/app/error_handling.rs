//! Fatal error reporting for the binary

use crate::error::FlowError;
use tracing::error;

/// Print `error` and exit with the matching status code
///
/// A [`FlowError`] shows its user message and maps to its own exit code;
/// anything else exits with 1. `-v` adds the source chain.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    let exit_code = if let Some(flow_err) = error.downcast_ref::<FlowError>() {
        eprintln!("{}", flow_err.user_message());
        flow_err.exit_code()
    } else {
        eprintln!("Error: {error}");
        1
    };

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code)
}
