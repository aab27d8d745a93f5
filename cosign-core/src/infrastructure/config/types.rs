use crate::domain::ContractVersion;
use crate::foundation::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MAX_PENDING_PER_ACCOUNT, DEFAULT_SUBMIT_TIMEOUT_MS, MAX_CALL_PAYLOAD_BYTES,
};
use crate::infrastructure::ledger::{CircuitBreakerConfig, RetryConfig, RetryPolicy};
use figment::value::{Dict, Map};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub cancellation: CancellationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// `[profiles.<name>]` overrides, merged by the profile-aware loaders.
    #[serde(default, skip_serializing)]
    pub profiles: Option<Map<String, Dict>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Account contract version; selects the hashing rules.
    #[serde(default)]
    pub contract_version: ContractVersion,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

const fn default_chain_id() -> u64 {
    1
}

const fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

const fn default_submit_timeout_ms() -> u64 {
    DEFAULT_SUBMIT_TIMEOUT_MS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            contract_version: ContractVersion::default(),
            call_timeout_ms: default_call_timeout_ms(),
            submit_timeout_ms: default_submit_timeout_ms(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.retry)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_pending_per_account")]
    pub max_pending_per_account: usize,
    #[serde(default = "default_max_call_payload_bytes")]
    pub max_call_payload_bytes: usize,
}

const fn default_max_pending_per_account() -> usize {
    DEFAULT_MAX_PENDING_PER_ACCOUNT
}

const fn default_max_call_payload_bytes() -> usize {
    MAX_CALL_PAYLOAD_BYTES
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pending_per_account: default_max_pending_per_account(),
            max_call_payload_bytes: default_max_call_payload_bytes(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CancellationConfig {
    /// Permit plain deletion when `0 < k < M`. Executable records are never deletable.
    #[serde(default = "default_true")]
    pub allow_endorsed_deletion: bool,
    /// Let callers who are neither proposer nor owner delete zero-endorsement records.
    #[serde(default)]
    pub allow_anonymous_empty_deletion: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self { allow_endorsed_deletion: true, allow_anonymous_empty_deletion: false }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files; console only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// `<module>=<level>` or `root=<level>` entries.
    #[serde(default)]
    pub filters: Vec<String>,
}
