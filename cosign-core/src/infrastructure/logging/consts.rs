//! Log file names, patterns and rotation limits.

pub const LOG_FILE_NAME: &str = "cosign.log";
/// Warn and error only.
pub const ERR_LOG_FILE_NAME: &str = "cosign_err.log";

/// Format: `timestamp [LEVEL] message [module] [thread-id]`
pub const LOG_LINE_PATTERN_COLORED: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{h({l:5})}] {m} [{M}] [{I}]{n}";

pub const LOG_LINE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:5}] {m} [{M}] [{I}]{n}";

/// Rotate at 50 MB.
pub const LOG_FILE_MAX_SIZE: u64 = 50_000_000;

pub const LOG_FILE_MAX_ROLLS: u32 = 5;

/// Crates logged at the requested app level. Everything else is off unless `root=<level>` is given.
pub const WHITELISTED_CRATES: &[&str] = &["cosign_core"];
