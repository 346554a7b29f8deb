//! Process exit codes
//!
//! Every failure, whether a fatal stage or a failing validation, maps to
//! the same general error code.

/// No errors (and, in strict mode, no warnings)
pub const SUCCESS: u8 = 0;

/// Validation failed, an input could not be walked, or a fatal error occurred
pub const ERROR: u8 = 1;
