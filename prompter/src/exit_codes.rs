//! Stable exit codes for prompter CLI commands.

/// Command succeeded (generation failures inside a run still count as success).
pub const OK: i32 = 0;
/// Runtime failure, e.g. the records could not be persisted.
pub const FAILED: i32 = 1;
/// The request or configuration was rejected before anything ran.
pub const INVALID: i32 = 2;
