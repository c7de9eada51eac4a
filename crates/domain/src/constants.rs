//! Client constants
//!
//! Defaults for every configuration option, plus fixed protocol values.

// Transport
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_USER_AGENT: &str = concat!("tollgate/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

// Rate limiting
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;
pub const DEFAULT_BURST_CAPACITY: f64 = 20.0;

// Circuit breaker
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_HALF_OPEN_MAX_PROBES: u32 = 1;

// Retry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_JITTER_FRACTION: f64 = 0.25;

// Queue and dispatch
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DEADLINE_MS: u64 = 60_000;
pub const DEFAULT_IDLE_POLL_MS: u64 = 250;

// Metrics
pub const DEFAULT_LATENCY_SAMPLE_CAPACITY: usize = 1024;

// Requests
/// Priority assigned when the caller sets none; lower is more urgent
pub const DEFAULT_PRIORITY: u8 = 5;

// Responses
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const RETRY_AFTER_HEADER: &str = "retry-after";
/// Upper bound applied to `Retry-After` hints
pub const MAX_RETRY_AFTER_SECS: u64 = u32::MAX as u64;
/// Error bodies longer than this are truncated in error messages
pub const MAX_ERROR_BODY_CHARS: usize = 512;
