use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// Message carried by every user abort; callers match on the "abort" substring.
pub const ABORTED_BY_USER: &str = "aborted by user";

/// The unified error type for cmdflow
///
/// `Aborted` and `Invariant` are the two fatal conditions: they unwind every
/// recursion level of a flow run and are never handled locally. All other
/// variants are ordinary failures that stop the current flow.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("[E{code:04}] {message}")]
    Aborted { code: u16, message: String },

    #[error("[E{code:04}] Invariant violated: {message}")]
    Invariant { code: u16, message: String },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Session error: {message}")]
    Session {
        code: u16,
        message: String,
        session_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        command: Option<String>,
        exit_code: Option<i32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Flow error: {message}")]
    Flow {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FlowError {
    /// The user chose "quit" at a breakpoint
    pub fn aborted() -> Self {
        Self::Aborted {
            code: ErrorCode::DEBUG_ABORTED_BY_USER,
            message: ABORTED_BY_USER.to_string(),
        }
    }

    /// A broken internal invariant
    pub fn invariant(code: u16, message: impl Into<String>) -> Self {
        Self::Invariant {
            code,
            message: message.into(),
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a session error with default code
    pub fn session(message: impl Into<String>) -> Self {
        Self::session_with_code(ErrorCode::SESSION_GENERIC, message, None)
    }

    /// Create a session error with specific code and session ID
    pub fn session_with_code(
        code: u16,
        message: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self::Session {
            code,
            message: message.into(),
            session_id,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an execution error with default code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::execution_with_code(ErrorCode::EXEC_GENERIC, message, None)
    }

    /// Create an execution error with specific code
    pub fn execution_with_code(
        code: u16,
        message: impl Into<String>,
        command: Option<String>,
    ) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            command,
            exit_code: None,
            source: None,
        }
    }

    /// Create a flow error with specific code
    pub fn flow_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Flow {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Session { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Execution { source: src, .. }
            | Self::Flow { source: src, .. }
            | Self::Validation { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::Aborted { .. } | Self::Invariant { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Session { message, .. }
            | Self::Storage { message, .. }
            | Self::Execution { message, .. }
            | Self::Flow { message, .. }
            | Self::Validation { message, .. }
            | Self::Invariant { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            // The abort message is matched on by callers; keep it intact.
            Self::Aborted { .. } => {}
        }
        self
    }

    /// Set the exit code for an execution error
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        if let Self::Execution {
            exit_code: ref mut ec,
            ..
        } = self
        {
            *ec = Some(exit_code);
        }
        self
    }

    /// Whether this error must unwind the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Invariant { .. })
    }

    /// Whether the user quit at a breakpoint
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Session { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Execution { .. } => 5,
            Self::Flow { .. } => 6,
            Self::Validation { .. } => 8,
            Self::Invariant { .. } => 70,
            Self::Aborted { .. } => 130,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Aborted { code, .. }
            | Self::Invariant { code, .. }
            | Self::Config { code, .. }
            | Self::Session { code, .. }
            | Self::Storage { code, .. }
            | Self::Execution { code, .. }
            | Self::Flow { code, .. }
            | Self::Validation { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Aborted { message, .. } => message.clone(),
            Self::Invariant { message, .. } => format!("Internal error: {}", message),
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::Session {
                message,
                session_id,
                ..
            } => match session_id {
                Some(id) => format!("Session {} error: {}", id, message),
                None => format!("Session error: {}", message),
            },
            Self::Storage { message, path, .. } => match path {
                Some(p) => format!("Storage error at {}: {}", p.display(), message),
                None => format!("Storage error: {}", message),
            },
            Self::Execution {
                message, command, ..
            } => match command {
                Some(cmd) => format!("Command '{}' failed: {}", cmd, message),
                None => format!("Execution error: {}", message),
            },
            Self::Flow { message, .. } => format!("Flow error: {}", message),
            Self::Validation { message, field, .. } => match field {
                Some(f) => format!("Validation error for '{}': {}", f, message),
                None => format!("Validation error: {}", message),
            },
            Self::Other { message, .. } => message.clone(),
        }
    }
}

/// Type alias for Results using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::AlreadyExists => (ErrorCode::STORAGE_ALREADY_EXISTS, "Already exists"),
            ErrorKind::InvalidInput => (ErrorCode::VALIDATION_INVALID_INPUT, "Invalid input"),
            ErrorKind::InvalidData => (ErrorCode::VALIDATION_INVALID_DATA, "Invalid data"),
            ErrorKind::TimedOut => (ErrorCode::EXEC_TIMEOUT, "Operation timed out"),
            ErrorKind::Interrupted => (ErrorCode::EXEC_INTERRUPTED, "Operation interrupted"),
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        FlowError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<tokio::task::JoinError> for FlowError {
    fn from(err: tokio::task::JoinError) -> Self {
        let message = if err.is_cancelled() {
            "Task was cancelled"
        } else {
            "Task panicked"
        };
        FlowError::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.to_string(),
            source: None,
        }
        .with_source(err)
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        FlowError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid JSON syntax")
            .with_source(err)
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(err: toml::de::Error) -> Self {
        FlowError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}

impl From<toml::ser::Error> for FlowError {
    fn from(err: toml::ser::Error) -> Self {
        FlowError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Cannot serialize TOML")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "status.json");
        let err = FlowError::session("Cannot read status")
            .with_source(io_err)
            .with_context("while loading session");

        assert_eq!(err.code(), ErrorCode::SESSION_GENERIC);
        assert!(err.to_string().contains("[E2000]"));
        assert!(err.user_message().contains("while loading session"));
    }

    #[test]
    fn test_abort_is_fatal_and_keeps_message() {
        let err = FlowError::aborted().with_context("at cmd1");
        assert!(err.is_fatal());
        assert!(err.is_abort());
        assert!(err.to_string().contains("abort"));
        assert_eq!(err.user_message(), ABORTED_BY_USER);
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_invariant_is_fatal_but_not_abort() {
        let err = FlowError::invariant(ErrorCode::INVARIANT_NESTED_DELAY, "nested delay");
        assert!(err.is_fatal());
        assert!(!err.is_abort());
        assert_eq!(err.code(), 6101);
    }

    #[test]
    fn test_execution_errors_are_not_fatal() {
        let err = FlowError::execution_with_code(
            ErrorCode::EXEC_COMMAND_FAILED,
            "exit status 1",
            Some("build".to_string()),
        )
        .with_exit_code(1);
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.user_message(), "Command 'build' failed: exit status 1");
    }

    #[tokio::test]
    async fn test_join_error_conversion() {
        let join_err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err: FlowError = join_err.into();
        assert_eq!(err.code(), ErrorCode::OTHER_GENERIC);
        assert_eq!(err.exit_code(), 1);
        assert!(!err.is_fatal());
        assert_eq!(err.user_message(), "Task panicked");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: FlowError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert_eq!(err.code(), ErrorCode::STORAGE_NOT_FOUND);
    }
}
