//! Application-wide constants

/// Upper bound on the approval quorum; smaller organizations need every responsible user.
pub const DEFAULT_MAX_QUORUM: usize = 3;
/// Attempts made for a write that lost an optimistic concurrency race.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 10;

pub const FIRST_VERSION: i32 = 1;
