//! Exit code constants for the doclock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing identity binding, storage failure)
//! - 2: Lock conflict (another identity holds the lock)
//! - 3: Forbidden (not the owner, or admin capability missing)
//! - 4: Lock service unavailable (transport failure or timeout)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unconfigured identity, or local storage failure.
pub const USER_ERROR: i32 = 1;

/// Lock conflict: the document is held by another identity.
pub const CONFLICT: i32 = 2;

/// Forbidden: ownership or admin capability check failed.
pub const FORBIDDEN: i32 = 3;

/// Lock service unavailable: transport failure or timeout.
pub const UNAVAILABLE: i32 = 4;
