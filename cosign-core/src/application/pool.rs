use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::domain::cancellation::{classify, ensure_may_delete};
use crate::domain::hashes::operation_hash;
use crate::domain::state_machine::ensure_can_delete;
use crate::domain::{AccountPolicy, Operation, PendingRecord, RecordKind, SigningDomain};
use crate::foundation::util::{now_nanos, ResultExt};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result};
use crate::infrastructure::config::PoolConfig;
use crate::infrastructure::storage::PoolStore;
use alloy_primitives::Address;
use log::{debug, info, warn};
use std::sync::Arc;

/// Registry of proposed operations keyed by identifier.
///
/// The pool is staging only. Whether an operation executed is decided by the ledger and
/// recorded here through `mark_executed`.
pub struct TransactionPool {
    store: Arc<dyn PoolStore>,
    config: PoolConfig,
    allow_anonymous_empty_deletion: bool,
    lifecycle: Arc<dyn LifecycleObserver>,
}

impl TransactionPool {
    pub fn new(store: Arc<dyn PoolStore>, config: PoolConfig) -> Self {
        Self { store, config, allow_anonymous_empty_deletion: false, lifecycle: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, lifecycle: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_anonymous_empty_deletion(mut self, allow: bool) -> Self {
        self.allow_anonymous_empty_deletion = allow;
        self
    }

    pub fn store(&self) -> &Arc<dyn PoolStore> {
        &self.store
    }

    pub fn allows_anonymous_empty_deletion(&self) -> bool {
        self.allow_anonymous_empty_deletion
    }

    /// Register `operation` under `domain` and return its identifier.
    ///
    /// Idempotent: an identical (operation, domain) yields the existing identifier, including
    /// when that record is already executed.
    pub fn propose(&self, domain: SigningDomain, operation: Operation, proposer: Address) -> Result<OperationIdentifier> {
        Ok(self.propose_with_kind(domain, operation, proposer, RecordKind::Proposal)?.identifier)
    }

    pub fn propose_with_kind(
        &self,
        domain: SigningDomain,
        operation: Operation,
        proposer: Address,
        kind: RecordKind,
    ) -> Result<PendingRecord> {
        if operation.data.len() > self.config.max_call_payload_bytes {
            return Err(CosignError::invalid_encoding(
                "data",
                format!("payload of {} bytes exceeds {}", operation.data.len(), self.config.max_call_payload_bytes),
            ));
        }
        let identifier = operation_hash(&operation, &domain)?;
        if let Some(existing) = self.store.get(&identifier)? {
            debug!("proposal already registered identifier={} state={}", identifier, existing.state);
            return Ok(existing);
        }

        let neutralizing = matches!(kind, RecordKind::Neutralizing { .. });
        if neutralizing && !operation.is_counter_operation_for(domain.account) {
            return Err(CosignError::InvalidOperation(format!(
                "counter-operation must be a zero-value self call on {}",
                domain.account
            )));
        }

        // Counter-operations bypass the limit: neutralization must stay available on a full pool.
        let pending = self.store.count_pending(&domain.account)?;
        if !neutralizing && pending >= self.config.max_pending_per_account {
            warn!(
                "pending pool limit reached account={} pending={} limit={}",
                domain.account, pending, self.config.max_pending_per_account
            );
            return Err(CosignError::PoolLimitExceeded {
                account: domain.account.to_string(),
                limit: self.config.max_pending_per_account,
            });
        }

        let record = PendingRecord::new(identifier, domain, operation, proposer, kind, now_nanos());
        let (stored, inserted) = self.store.insert_if_absent(record)?;
        if inserted {
            self.lifecycle.on_proposed(&stored);
        }
        Ok(stored)
    }

    pub fn find(&self, identifier: &OperationIdentifier) -> Result<Option<PendingRecord>> {
        self.store.get(identifier)
    }

    pub fn get(&self, identifier: &OperationIdentifier) -> Result<PendingRecord> {
        self.store.get(identifier).required(|| CosignError::RecordNotFound { identifier: identifier.to_string() })
    }

    /// Non-executed records of `account`, by slot then creation time.
    pub fn list_pending(&self, account: &Address) -> Result<Vec<PendingRecord>> {
        let mut records: Vec<PendingRecord> =
            self.store.list_by_account(account)?.into_iter().filter(|record| !record.is_executed()).collect();
        records.sort_by_key(|record| (record.slot(), record.created_at_nanos));
        Ok(records)
    }

    /// Delete a record that carries no current-owner endorsement.
    ///
    /// Records with endorsements are refused with `UnsafeDeletion`; removing them is a
    /// cancellation decision made by the planner.
    pub fn delete(&self, identifier: &OperationIdentifier, caller: Address, policy: &AccountPolicy) -> Result<PendingRecord> {
        let record = self.get(identifier)?;
        ensure_may_delete(&record, policy, caller, self.allow_anonymous_empty_deletion)?;
        let classification = classify(&record, policy);
        if classification.endorsements > 0 {
            return Err(CosignError::UnsafeDeletion {
                identifier: identifier.to_string(),
                endorsements: classification.endorsements,
                threshold: classification.threshold,
            });
        }
        self.remove_reviewed(&record, caller)
    }

    /// Remove a record whose deletion has already been authorized and risk-checked.
    pub(crate) fn remove_reviewed(&self, record: &PendingRecord, caller: Address) -> Result<PendingRecord> {
        ensure_can_delete(record)?;
        let removed = self
            .store
            .remove(&record.identifier)?
            .ok_or_else(|| CosignError::RecordNotFound { identifier: record.identifier.to_string() })?;
        info!(
            "pending record removed identifier={} caller={} endorsements={}",
            removed.identifier,
            caller,
            removed.endorsements.len()
        );
        self.lifecycle.on_deleted(&removed.identifier, &caller);
        Ok(removed)
    }

    /// Terminal and idempotent. Returns the record and whether this call made the transition.
    pub fn mark_executed(&self, identifier: &OperationIdentifier, ledger_ref: LedgerRef) -> Result<(PendingRecord, bool)> {
        let (record, changed) = self.store.mark_executed(identifier, ledger_ref, now_nanos())?;
        if changed {
            self.lifecycle.on_executed(identifier, &ledger_ref);
        } else {
            debug!("mark_executed no-op identifier={} ledger_ref={:?}", identifier, record.ledger_ref);
        }
        Ok((record, changed))
    }
}
