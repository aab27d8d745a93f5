//! System-wide constants for the cosign coordinator.

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Environment variable that pins `now_nanos()` in tests.
pub const TEST_NOW_NANOS_ENV_VAR: &str = "COSIGN_TEST_NOW_NANOS";

/// Keccak-256 digest size in bytes.
pub const HASH_SIZE: usize = 32;

/// ABI word size in bytes.
pub const WORD_SIZE: usize = 32;

/// Account address size in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Static part of one endorsement: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_STATIC_PART_LEN: usize = 65;

/// ECDSA signature size in compact format (64 bytes).
pub const ECDSA_SIGNATURE_SIZE: usize = 64;

/// Maximum accepted call payload for a proposed operation (128 KiB).
///
/// Larger payloads are rejected at hashing time with `InvalidEncoding`.
pub const MAX_CALL_PAYLOAD_BYTES: usize = 128 * 1024;

/// Maximum dynamic part carried by a contract-backed endorsement (16 KiB).
pub const MAX_CONTRACT_SIGNATURE_BYTES: usize = 16 * 1024;

/// Maximum number of owners accepted from a ledger policy read.
pub const MAX_OWNERS: usize = 256;

/// Default per-call timeout for ledger reads (10 seconds).
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Default per-call timeout for ledger submissions (2 minutes).
pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 120_000;

/// Default retry attempts around ledger calls (including the first attempt).
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default base delay between ledger retries.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;

/// Default cap for ledger retry backoff.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Base backoff for the ledger circuit breaker open window.
pub const CIRCUIT_BREAKER_BASE_BACKOFF_SECS: u64 = 1;

/// Default cap on pending records per account held by the pool.
pub const DEFAULT_MAX_PENDING_PER_ACCOUNT: usize = 1_000;
