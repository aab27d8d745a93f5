use crate::domain::state_machine::{ensure_accepts_endorsements, ensure_can_delete, ensure_can_execute};
use crate::domain::{ParsedSignature, PendingRecord, RecordState};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result};
use crate::infrastructure::storage::{PoolStats, PoolStore};
use alloy_primitives::Address;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryInner {
    records: HashMap<OperationIdentifier, PendingRecord>,
    by_account: HashMap<Address, BTreeSet<OperationIdentifier>>,
}

pub struct MemoryPoolStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryPoolStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryInner::default())) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner.lock().map_err(|_| CosignError::StorageError {
            operation: "memory pool lock".to_string(),
            details: "poisoned".to_string(),
        })
    }
}

impl Default for MemoryPoolStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(identifier: &OperationIdentifier) -> CosignError {
    CosignError::RecordNotFound { identifier: identifier.to_string() }
}

impl PoolStore for MemoryPoolStore {
    fn get(&self, identifier: &OperationIdentifier) -> Result<Option<PendingRecord>> {
        Ok(self.lock_inner()?.records.get(identifier).cloned())
    }

    fn insert_if_absent(&self, record: PendingRecord) -> Result<(PendingRecord, bool)> {
        let mut inner = self.lock_inner()?;
        if let Some(existing) = inner.records.get(&record.identifier) {
            return Ok((existing.clone(), false));
        }
        inner.by_account.entry(record.account()).or_default().insert(record.identifier);
        inner.records.insert(record.identifier, record.clone());
        Ok((record, true))
    }

    fn add_endorsement(&self, identifier: &OperationIdentifier, signature: ParsedSignature) -> Result<PendingRecord> {
        let mut inner = self.lock_inner()?;
        let record = inner.records.get_mut(identifier).ok_or_else(|| not_found(identifier))?;
        ensure_accepts_endorsements(record)?;
        if record.has_signed(&signature.signer) {
            return Err(CosignError::AlreadySigned { identifier: identifier.to_string(), signer: signature.signer.to_string() });
        }
        record.endorsements.insert(signature.signer, signature);
        Ok(record.clone())
    }

    fn mark_executed(&self, identifier: &OperationIdentifier, ledger_ref: LedgerRef, now_nanos: u64) -> Result<(PendingRecord, bool)> {
        let mut inner = self.lock_inner()?;
        let record = inner.records.get_mut(identifier).ok_or_else(|| not_found(identifier))?;
        if record.is_executed() {
            return Ok((record.clone(), false));
        }
        ensure_can_execute(record)?;
        record.state = RecordState::Executed;
        record.executed_at_nanos = Some(now_nanos);
        record.ledger_ref = Some(ledger_ref);
        Ok((record.clone(), true))
    }

    fn remove(&self, identifier: &OperationIdentifier) -> Result<Option<PendingRecord>> {
        let mut inner = self.lock_inner()?;
        if let Some(record) = inner.records.get(identifier) {
            ensure_can_delete(record)?;
        }
        let removed = inner.records.remove(identifier);
        if let Some(record) = &removed {
            if let Some(ids) = inner.by_account.get_mut(&record.account()) {
                ids.remove(identifier);
                if ids.is_empty() {
                    inner.by_account.remove(&record.account());
                }
            }
        }
        Ok(removed)
    }

    fn list_by_account(&self, account: &Address) -> Result<Vec<PendingRecord>> {
        let inner = self.lock_inner()?;
        let Some(ids) = inner.by_account.get(account) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| inner.records.get(id).cloned()).collect())
    }

    fn stats(&self) -> Result<PoolStats> {
        let inner = self.lock_inner()?;
        let mut stats = PoolStats::default();
        for record in inner.records.values() {
            match record.state {
                RecordState::Pending => stats.pending += 1,
                RecordState::Executed => stats.executed += 1,
            }
            stats.endorsements += record.endorsements.len();
        }
        Ok(stats)
    }
}
