use crate::foundation::{
    CosignError, Result, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

const fn default_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

const fn default_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

const fn default_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

const fn default_multiplier() -> u32 {
    2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

pub type RetryPredicate = Arc<dyn Fn(&CosignError) -> bool + Send + Sync>;

/// Single retry policy applied around every ledger call.
#[derive(Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    predicate: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms.max(cfg.base_delay_ms)),
            multiplier: cfg.multiplier.max(1),
            predicate: Arc::new(CosignError::is_retryable),
        }
    }

    /// One attempt, no retries.
    pub fn none() -> Self {
        Self { attempts: 1, ..Self::default() }
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&CosignError) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn should_retry(&self, err: &CosignError) -> bool {
        (self.predicate)(err)
    }

    /// Backoff before attempt `attempt + 1` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(self.max_delay).min(self.max_delay)
    }

    pub async fn run<F, Fut, T>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("ledger call recovered operation={} attempts={}", operation, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.attempts || !self.should_retry(&err) {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        "ledger call failed; retrying operation={} attempt={} max_attempts={} delay_ms={} error={}",
                        operation,
                        attempt,
                        self.attempts,
                        delay.as_millis(),
                        err
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
