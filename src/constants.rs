//! Application-wide constants and defaults

/// Default server bind host
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default maximum database connections
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default overall deadline for a single judge call, in milliseconds.
/// A call exceeding this is answered with a synthetic all-failed verdict.
pub const DEFAULT_JUDGE_DEADLINE_MS: u64 = 20_000;

/// Default per-test-case execution timeout forwarded to the judge, in milliseconds
pub const DEFAULT_PER_TEST_TIMEOUT_MS: u64 = 2_000;

/// Default interval between `progress-update` heartbeats, in milliseconds
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 5_000;

/// Default idle time before a lobby room with no connections is reaped, in milliseconds
pub const DEFAULT_ROOM_IDLE_TIMEOUT_MS: u64 = 600_000;

/// Maximum accepted source code size in bytes
pub const MAX_CODE_BYTES: usize = 64 * 1024;

/// Maximum participant display name length
pub const MAX_NAME_LENGTH: u64 = 64;

/// Languages the judge sandbox accepts
pub const SUPPORTED_LANGUAGES: &[&str] = &["python", "javascript", "typescript", "java", "cpp", "rust", "go"];

/// Wire error codes reported in the `error` protocol event
pub mod error_codes {
    pub const VALIDATION: &str = "validation_error";
    pub const UNKNOWN_CONTEST: &str = "unknown_contest";
    pub const CONTEST_ENDED: &str = "contest_ended";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
    pub const NOT_JOINED: &str = "not_joined";
    pub const NOT_HOST: &str = "not_host";
    pub const JUDGE_ERROR: &str = "judge_error";
    pub const JUDGE_TIMEOUT: &str = "judge_timeout";
    pub const DATABASE: &str = "database_error";
    pub const INTERNAL: &str = "internal_error";
}
