use crate::domain::{ParsedSignature, PendingRecord};
use crate::foundation::{LedgerRef, OperationIdentifier, Result};
use alloy_primitives::Address;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pending: usize,
    pub executed: usize,
    pub endorsements: usize,
}

/// Staging store for pending records. The ledger stays authoritative; every mutating
/// method is atomic per identifier so concurrent endorsers need no external locking.
pub trait PoolStore: Send + Sync {
    fn get(&self, identifier: &OperationIdentifier) -> Result<Option<PendingRecord>>;

    /// Insert `record` only if its identifier is unknown.
    /// Returns the stored record and `true` when it was inserted by this call.
    fn insert_if_absent(&self, record: PendingRecord) -> Result<(PendingRecord, bool)>;

    /// Append an endorsement. Fails with `AlreadySigned` for a recorded signer and
    /// `AlreadyExecuted` once the record is terminal.
    fn add_endorsement(&self, identifier: &OperationIdentifier, signature: ParsedSignature) -> Result<PendingRecord>;

    /// Terminal transition. Returns `false` when the record was already executed.
    fn mark_executed(&self, identifier: &OperationIdentifier, ledger_ref: LedgerRef, now_nanos: u64) -> Result<(PendingRecord, bool)>;

    /// Remove a pending record. Executed records are kept and yield `AlreadyExecuted`.
    fn remove(&self, identifier: &OperationIdentifier) -> Result<Option<PendingRecord>>;

    fn list_by_account(&self, account: &Address) -> Result<Vec<PendingRecord>>;

    fn count_pending(&self, account: &Address) -> Result<usize> {
        Ok(self.list_by_account(account)?.iter().filter(|record| !record.is_executed()).count())
    }

    fn stats(&self) -> Result<PoolStats>;
}
