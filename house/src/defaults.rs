//! Default values for optional configuration fields.

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_BACKOFF_MS: u64 = 2_000;
pub const DEFAULT_OWNED_OBJECTS_PAGE_SIZE: usize = 50;
pub const DEFAULT_TRANSACTION_WAIT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TRANSACTION_POLL_INTERVAL_MS: u64 = 1_000;
