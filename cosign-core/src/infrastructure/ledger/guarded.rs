use crate::domain::AccountPolicy;
use crate::foundation::{CosignError, OperationIdentifier, Result};
use crate::infrastructure::ledger::{
    CircuitBreaker, CircuitBreakerConfig, LedgerCall, LedgerClient, LedgerConstraints, RetryPolicy, SlotConfirmation,
    SubmissionOutcome, SubmitOptions,
};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a ledger client with a per-call timeout, retries and a per-method circuit breaker.
/// Dropping a timed-out future leaves no local side effects.
///
/// Writes get their own retry policy, one attempt by default: a submission that timed out
/// may still have landed, and resubmitting it would revert against the moved slot. The gate
/// settles such a record on its next pass through `confirmed_at_slot`.
pub struct GuardedLedger<L> {
    inner: L,
    retry: RetryPolicy,
    write_retry: RetryPolicy,
    call_timeout: Duration,
    submit_timeout: Duration,
    breaker_cfg: CircuitBreakerConfig,
    breakers: parking_lot::Mutex<HashMap<&'static str, Arc<CircuitBreaker>>>,
}

impl<L: LedgerClient> GuardedLedger<L> {
    pub fn new(inner: L, retry: RetryPolicy, call_timeout: Duration, submit_timeout: Duration) -> Self {
        Self {
            inner,
            retry,
            write_retry: RetryPolicy::none(),
            call_timeout,
            submit_timeout,
            breaker_cfg: CircuitBreakerConfig::default(),
            breakers: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn with_circuit_breaker(mut self, cfg: CircuitBreakerConfig) -> Self {
        self.breaker_cfg = cfg;
        self
    }

    /// Retry policy for `LedgerCall`s that write. Only safe with a ledger that rejects
    /// duplicate submissions without side effects.
    pub fn with_write_retry(mut self, retry: RetryPolicy) -> Self {
        self.write_retry = retry;
        self
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn breaker(&self, method: &'static str) -> Arc<CircuitBreaker> {
        self.breakers.lock().entry(method).or_insert_with(|| Arc::new(CircuitBreaker::new(method, self.breaker_cfg))).clone()
    }

    async fn guarded<T, F, Fut>(&self, method: &'static str, timeout: Duration, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.guarded_with(&self.retry, method, timeout, op).await
    }

    async fn guarded_with<T, F, Fut>(&self, retry: &RetryPolicy, method: &'static str, timeout: Duration, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker = self.breaker(method);
        retry
            .run(method, || {
                let attempt = if breaker.allow() { Some(op()) } else { None };
                let breaker = breaker.clone();
                async move {
                    let Some(fut) = attempt else {
                        return Err(CosignError::CircuitOpen { operation: method.to_string() });
                    };
                    let result = match tokio::time::timeout(timeout, fut).await {
                        Ok(result) => result,
                        Err(_) => Err(CosignError::LedgerTimeout {
                            operation: method.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        }),
                    };
                    match &result {
                        Err(err) if err.is_retryable() => breaker.record_failure(),
                        _ => breaker.record_success(),
                    }
                    result
                }
            })
            .await
    }
}

#[async_trait]
impl<L: LedgerClient> LedgerClient for GuardedLedger<L> {
    async fn call(&self, account: Address, call: LedgerCall) -> Result<Bytes> {
        let method = call.method();
        self.guarded(method, self.call_timeout, || self.inner.call(account, call.clone())).await
    }

    async fn submit(&self, account: Address, call: LedgerCall, options: SubmitOptions) -> Result<SubmissionOutcome> {
        let method = call.method();
        let retry = if call.is_write() { &self.write_retry } else { &self.retry };
        self.guarded_with(retry, method, self.submit_timeout, || self.inner.submit(account, call.clone(), options)).await
    }

    async fn confirmed_at_slot(&self, account: Address, slot: u64) -> Result<Option<SlotConfirmation>> {
        self.guarded("confirmed_at_slot", self.call_timeout, || self.inner.confirmed_at_slot(account, slot)).await
    }

    async fn current_slot(&self, account: Address) -> Result<u64> {
        self.guarded("current_slot", self.call_timeout, || self.inner.current_slot(account)).await
    }

    async fn account_policy(&self, account: Address) -> Result<AccountPolicy> {
        self.guarded("account_policy", self.call_timeout, || self.inner.account_policy(account)).await
    }

    async fn is_hash_approved(&self, account: Address, owner: Address, identifier: OperationIdentifier) -> Result<bool> {
        self.guarded("is_hash_approved", self.call_timeout, || self.inner.is_hash_approved(account, owner, identifier)).await
    }

    fn constraints(&self) -> LedgerConstraints {
        self.inner.constraints()
    }
}
