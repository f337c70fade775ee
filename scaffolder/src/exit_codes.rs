//! Stable exit codes for the `scaffolder` CLI.

/// Every phase completed.
pub const OK: i32 = 0;
/// Invalid configuration or a hook failed; the run stopped at that point.
pub const FAILED: i32 = 1;
/// One or more staged files could not be written to disk.
pub const WRITE_FAILED: i32 = 2;
