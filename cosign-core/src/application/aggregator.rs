use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::domain::quorum::{quorum_status, QuorumStatus};
use crate::domain::signature::parse_endorsement;
use crate::domain::state_machine::ensure_accepts_endorsements;
use crate::domain::{AccountPolicy, Endorsement, ParsedSignature, PendingRecord};
use crate::foundation::util::{now_nanos, ResultExt};
use crate::foundation::{CosignError, OperationIdentifier, Result};
use crate::infrastructure::storage::PoolStore;
use alloy_primitives::Address;
use log::{debug, warn};
use std::sync::Arc;

/// Collects endorsements per identifier.
///
/// Accumulation is per-signer and append-only, so concurrent endorsers need no coordination
/// beyond the store's per-record atomicity.
pub struct SignatureAggregator {
    store: Arc<dyn PoolStore>,
    lifecycle: Arc<dyn LifecycleObserver>,
}

impl SignatureAggregator {
    pub fn new(store: Arc<dyn PoolStore>) -> Self {
        Self { store, lifecycle: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, lifecycle: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    fn record(&self, identifier: &OperationIdentifier) -> Result<PendingRecord> {
        self.store.get(identifier).required(|| CosignError::RecordNotFound { identifier: identifier.to_string() })
    }

    /// Validate and append one endorsement.
    ///
    /// Fails with `MalformedSignature`/`SignerMismatch` for bad bytes, `AlreadySigned` for a
    /// signer that already endorsed, and `AlreadyExecuted` once the record is terminal.
    pub fn add(&self, endorsement: &Endorsement) -> Result<PendingRecord> {
        let identifier = &endorsement.identifier;
        let record = self.record(identifier)?;
        ensure_accepts_endorsements(&record)?;
        if record.has_signed(&endorsement.signer) {
            return Err(CosignError::AlreadySigned { identifier: identifier.to_string(), signer: endorsement.signer.to_string() });
        }

        let parsed = parse_endorsement(identifier, endorsement.signer, &endorsement.signature, now_nanos()).map_err(|err| {
            warn!("endorsement rejected identifier={} signer={} error={}", identifier, endorsement.signer, err);
            err
        })?;
        let scheme = parsed.scheme;
        let updated = self.store.add_endorsement(identifier, parsed)?;
        debug!(
            "endorsement stored identifier={} signer={} scheme={} endorsement_count={}",
            identifier,
            endorsement.signer,
            scheme,
            updated.endorsements.len()
        );
        self.lifecycle.on_endorsement_added(identifier, &endorsement.signer, updated.endorsements.len());
        Ok(updated)
    }

    /// Endorsements in ascending signer order.
    pub fn list(&self, identifier: &OperationIdentifier) -> Result<Vec<ParsedSignature>> {
        Ok(self.record(identifier)?.endorsements.into_values().collect())
    }

    pub fn has(&self, identifier: &OperationIdentifier, signer: &Address) -> Result<bool> {
        Ok(self.record(identifier)?.has_signed(signer))
    }

    pub fn count_from_current_owners(&self, identifier: &OperationIdentifier, policy: &AccountPolicy) -> Result<usize> {
        Ok(self.status(identifier, policy)?.count)
    }

    pub fn status(&self, identifier: &OperationIdentifier, policy: &AccountPolicy) -> Result<QuorumStatus> {
        Ok(quorum_status(&self.record(identifier)?, policy))
    }
}
