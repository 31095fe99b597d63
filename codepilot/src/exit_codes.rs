//! Stable exit codes for codepilot CLI commands.

/// Command succeeded and every executed step succeeded.
pub const OK: i32 = 0;
/// Invalid config, unreadable input, or a run that ended in `error` status.
pub const INVALID: i32 = 1;
/// Execution finished but at least one log entry is an `[ERROR]`.
pub const STEP_ERRORS: i32 = 2;
