use secp256k1::Error as SecpError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidEncoding,
    EncodingError,
    MalformedSignature,
    SignerMismatch,
    AlreadySigned,
    IdentifierMismatch,
    RecordNotFound,
    AlreadyExecuted,
    InvalidPolicy,
    InvalidOperation,
    InvalidStateTransition,
    SlotNotReached,
    PoolLimitExceeded,
    ThresholdNotMet,
    Unauthorized,
    NotCurrentOwner,
    UnsafeDeletion,
    AlreadyExecutedElsewhere,
    AlreadyNeutralized,
    LedgerTimeout,
    LedgerUnavailable,
    CircuitOpen,
    PolicyChanged,
    LedgerReverted,
    LedgerError,
    SigningFailed,
    StorageError,
    SerializationError,
    CryptoError,
    ConfigError,
    Message,
}

/// Coarse classification used by callers to decide retryability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed operation or endorsement. Never retried.
    Validation,
    /// Caller lacks proposer/owner standing. Never silently retried.
    Authorization,
    /// Another submission won the ordering slot. Resolved by re-reading state.
    RaceLost,
    /// Timeout or unavailable ledger. Retryable with backoff.
    TransientLedger,
    /// Owners/threshold moved under a classification. Re-classify.
    PolicyChanged,
    /// Ledger rejected the call deterministically.
    Ledger,
    Storage,
    Config,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum CosignError {
    // === Validation ===
    #[error("invalid encoding for {field}: {details}")]
    InvalidEncoding { field: String, details: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("malformed signature: {details}")]
    MalformedSignature { details: String },

    #[error("signer mismatch: claimed={claimed} recovered={recovered}")]
    SignerMismatch { claimed: String, recovered: String },

    #[error("already signed: identifier={identifier} signer={signer}")]
    AlreadySigned { identifier: String, signer: String },

    #[error("identifier mismatch: expected={expected} actual={actual}")]
    IdentifierMismatch { expected: String, actual: String },

    #[error("record not found: {identifier}")]
    RecordNotFound { identifier: String },

    #[error("record already executed: {identifier}")]
    AlreadyExecuted { identifier: String },

    #[error("invalid account policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("ordering slot not reached: slot={slot} current={current}")]
    SlotNotReached { slot: u64, current: u64 },

    #[error("pending pool limit exceeded for account {account}: limit={limit}")]
    PoolLimitExceeded { account: String, limit: usize },

    #[error("threshold not met: required {required}, received {received}")]
    ThresholdNotMet { required: usize, received: usize },

    // === Authorization ===
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized { caller: String, action: String },

    #[error("not a current owner: {address}")]
    NotCurrentOwner { address: String },

    #[error("unsafe deletion of {identifier}: {endorsements} replayable endorsements toward threshold {threshold}")]
    UnsafeDeletion { identifier: String, endorsements: usize, threshold: usize },

    // === Race lost ===
    #[error("already executed elsewhere: identifier={identifier} slot={slot}")]
    AlreadyExecutedElsewhere { identifier: String, slot: u64 },

    #[error("already neutralized: identifier={identifier} slot={slot}")]
    AlreadyNeutralized { identifier: String, slot: u64 },

    // === Transient ledger ===
    #[error("ledger timeout during {operation} after {timeout_ms}ms")]
    LedgerTimeout { operation: String, timeout_ms: u64 },

    #[error("ledger unavailable during {operation}: {details}")]
    LedgerUnavailable { operation: String, details: String },

    #[error("ledger circuit open for {operation}")]
    CircuitOpen { operation: String },

    // === Policy ===
    #[error("account policy changed: {details}")]
    PolicyChanged { details: String },

    // === Ledger ===
    #[error("ledger reverted: {reason}")]
    LedgerReverted { reason: String },

    #[error("ledger error during {operation}: {details}")]
    LedgerError { operation: String, details: String },

    // === Signing / infrastructure ===
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("crypto error during {operation}: {details}")]
    CryptoError { operation: String, details: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, CosignError>;

impl CosignError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CosignError::InvalidEncoding { .. } => ErrorCode::InvalidEncoding,
            CosignError::EncodingError(_) => ErrorCode::EncodingError,
            CosignError::MalformedSignature { .. } => ErrorCode::MalformedSignature,
            CosignError::SignerMismatch { .. } => ErrorCode::SignerMismatch,
            CosignError::AlreadySigned { .. } => ErrorCode::AlreadySigned,
            CosignError::IdentifierMismatch { .. } => ErrorCode::IdentifierMismatch,
            CosignError::RecordNotFound { .. } => ErrorCode::RecordNotFound,
            CosignError::AlreadyExecuted { .. } => ErrorCode::AlreadyExecuted,
            CosignError::InvalidPolicy(_) => ErrorCode::InvalidPolicy,
            CosignError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            CosignError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            CosignError::SlotNotReached { .. } => ErrorCode::SlotNotReached,
            CosignError::PoolLimitExceeded { .. } => ErrorCode::PoolLimitExceeded,
            CosignError::ThresholdNotMet { .. } => ErrorCode::ThresholdNotMet,
            CosignError::Unauthorized { .. } => ErrorCode::Unauthorized,
            CosignError::NotCurrentOwner { .. } => ErrorCode::NotCurrentOwner,
            CosignError::UnsafeDeletion { .. } => ErrorCode::UnsafeDeletion,
            CosignError::AlreadyExecutedElsewhere { .. } => ErrorCode::AlreadyExecutedElsewhere,
            CosignError::AlreadyNeutralized { .. } => ErrorCode::AlreadyNeutralized,
            CosignError::LedgerTimeout { .. } => ErrorCode::LedgerTimeout,
            CosignError::LedgerUnavailable { .. } => ErrorCode::LedgerUnavailable,
            CosignError::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            CosignError::PolicyChanged { .. } => ErrorCode::PolicyChanged,
            CosignError::LedgerReverted { .. } => ErrorCode::LedgerReverted,
            CosignError::LedgerError { .. } => ErrorCode::LedgerError,
            CosignError::SigningFailed(_) => ErrorCode::SigningFailed,
            CosignError::StorageError { .. } => ErrorCode::StorageError,
            CosignError::SerializationError { .. } => ErrorCode::SerializationError,
            CosignError::CryptoError { .. } => ErrorCode::CryptoError,
            CosignError::ConfigError(_) => ErrorCode::ConfigError,
            CosignError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CosignError::InvalidEncoding { .. }
            | CosignError::EncodingError(_)
            | CosignError::MalformedSignature { .. }
            | CosignError::SignerMismatch { .. }
            | CosignError::AlreadySigned { .. }
            | CosignError::IdentifierMismatch { .. }
            | CosignError::RecordNotFound { .. }
            | CosignError::AlreadyExecuted { .. }
            | CosignError::InvalidPolicy(_)
            | CosignError::InvalidOperation(_)
            | CosignError::InvalidStateTransition { .. }
            | CosignError::SlotNotReached { .. }
            | CosignError::PoolLimitExceeded { .. }
            | CosignError::ThresholdNotMet { .. }
            | CosignError::SigningFailed(_)
            | CosignError::CryptoError { .. }
            | CosignError::Message(_) => ErrorCategory::Validation,
            CosignError::Unauthorized { .. } | CosignError::NotCurrentOwner { .. } | CosignError::UnsafeDeletion { .. } => {
                ErrorCategory::Authorization
            }
            CosignError::AlreadyExecutedElsewhere { .. } | CosignError::AlreadyNeutralized { .. } => ErrorCategory::RaceLost,
            CosignError::LedgerTimeout { .. } | CosignError::LedgerUnavailable { .. } | CosignError::CircuitOpen { .. } => {
                ErrorCategory::TransientLedger
            }
            CosignError::PolicyChanged { .. } => ErrorCategory::PolicyChanged,
            CosignError::LedgerReverted { .. } | CosignError::LedgerError { .. } => ErrorCategory::Ledger,
            CosignError::StorageError { .. } | CosignError::SerializationError { .. } => ErrorCategory::Storage,
            CosignError::ConfigError(_) => ErrorCategory::Config,
        }
    }

    /// Only transient ledger failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::TransientLedger
    }

    pub fn is_race_lost(&self) -> bool {
        self.category() == ErrorCategory::RaceLost
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), category: self.category(), message: self.to_string() }
    }

    pub fn invalid_encoding(field: impl Into<String>, details: impl Into<String>) -> Self {
        CosignError::InvalidEncoding { field: field.into(), details: details.into() }
    }

    pub fn malformed_signature(details: impl Into<String>) -> Self {
        CosignError::MalformedSignature { details: details.into() }
    }

    pub fn unauthorized(caller: impl ToString, action: impl Into<String>) -> Self {
        CosignError::Unauthorized { caller: caller.to_string(), action: action.into() }
    }

    pub fn ledger_unavailable(operation: impl Into<String>, details: impl Into<String>) -> Self {
        CosignError::LedgerUnavailable { operation: operation.into(), details: details.into() }
    }
}

impl From<hex::FromHexError> for CosignError {
    fn from(err: hex::FromHexError) -> Self {
        CosignError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<io::Error> for CosignError {
    fn from(err: io::Error) -> Self {
        CosignError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for CosignError {
    fn from(err: serde_json::Error) -> Self {
        CosignError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<figment::Error> for CosignError {
    fn from(err: figment::Error) -> Self {
        CosignError::ConfigError(format!("config extraction failed: {err}"))
    }
}

impl From<SecpError> for CosignError {
    fn from(err: SecpError) -> Self {
        CosignError::CryptoError { operation: "secp256k1".to_string(), details: err.to_string() }
    }
}

#[macro_export]
macro_rules! storage_err {
    ($op:expr, $err:expr) => {
        $crate::foundation::CosignError::StorageError { operation: $op.into(), details: $err.to_string() }
    };
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured `CosignError` variants at the call site to preserve context.
