/// Error code registry for cmdflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Session errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Flow errors
/// - 6000-6999: Breakpoint / debugging errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_JSON: u16 = 1003;
    pub const CONFIG_INVALID_TOML: u16 = 1004;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;

    // Session errors (2000-2999)
    pub const SESSION_GENERIC: u16 = 2000;
    pub const SESSION_NOT_FOUND: u16 = 2001;
    pub const SESSION_CORRUPTED: u16 = 2003;
    pub const SESSION_NOT_RETRYABLE: u16 = 2006;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_COMMAND_FAILED: u16 = 4001;
    pub const EXEC_TIMEOUT: u16 = 4002;
    pub const EXEC_SPAWN_FAILED: u16 = 4007;
    pub const EXEC_INTERRUPTED: u16 = 4006;
    pub const EXEC_TASK_PANICKED: u16 = 4011;

    // Flow errors (5000-5999)
    pub const FLOW_GENERIC: u16 = 5000;
    pub const FLOW_UNKNOWN_COMMAND: u16 = 5001;
    pub const FLOW_INVALID_SYNTAX: u16 = 5002;
    pub const FLOW_BG_TASK_NOT_FOUND: u16 = 5003;
    pub const FLOW_TOO_DEEP: u16 = 5004;

    // Breakpoint / debugging errors (6000-6999)
    pub const DEBUG_ABORTED_BY_USER: u16 = 6000;
    pub const DEBUG_HOOK_FAILED: u16 = 6001;
    pub const INVARIANT_STACK_DEPTH: u16 = 6100;
    pub const INVARIANT_NESTED_DELAY: u16 = 6101;
    pub const INVARIANT_WAIT_OFF_MAIN: u16 = 6102;
    pub const INVARIANT_UNEXPECTED_ACTION: u16 = 6103;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_REQUIRED_FIELD: u16 = 7001;
    pub const VALIDATION_INVALID_FORMAT: u16 = 7005;
    pub const VALIDATION_INVALID_INPUT: u16 = 7008;
    pub const VALIDATION_INVALID_DATA: u16 = 7009;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1003 => "Invalid JSON syntax in configuration",
        1004 => "Invalid TOML syntax in configuration",
        1005 => "Invalid configuration value",

        2000 => "Generic session error",
        2001 => "Session not found",
        2003 => "Session status file is corrupted",
        2006 => "Session cannot be retried",

        3000 => "Generic storage error",
        3001 => "I/O error during storage operation",
        3002 => "Permission denied for storage operation",
        3004 => "Storage item not found",
        3005 => "Storage item already exists",

        4000 => "Generic execution error",
        4001 => "Command exited with failure",
        4002 => "Command execution timed out",
        4006 => "Execution was interrupted",
        4007 => "Failed to spawn process",
        4011 => "Background task panicked",

        5000 => "Generic flow error",
        5001 => "Unknown command in flow",
        5002 => "Invalid flow syntax",
        5003 => "Background task not found",
        5004 => "Flow nesting too deep",

        6000 => "Aborted by user at a breakpoint",
        6001 => "Breakpoint prompt failed",
        6100 => "Flow stack depth bookkeeping mismatch",
        6101 => "Delay scheduled from inside a background task",
        6102 => "Background wait issued from inside a background task",
        6103 => "Breakpoint returned an action the executor cannot apply",

        7000 => "Generic validation error",
        7001 => "Required field is missing",
        7005 => "Invalid format",
        7008 => "Invalid input provided",
        7009 => "Invalid data provided",

        9000 => "Generic error",
        _ => "Unknown error code",
    }
}
