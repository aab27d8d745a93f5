//! Quorum arithmetic against a live account policy (pure, no I/O).

use crate::domain::signature::ParsedSignature;
use crate::domain::{AccountPolicy, PendingRecord};
use crate::foundation::{CosignError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuorumStatus {
    /// Endorsements whose signer is a current owner.
    pub count: usize,
    pub threshold: usize,
    /// Endorsements retained from signers no longer in the owner set.
    pub stale: usize,
}

impl QuorumStatus {
    pub fn is_met(&self) -> bool {
        self.count >= self.threshold
    }

    pub fn missing(&self) -> usize {
        self.threshold.saturating_sub(self.count)
    }
}

pub fn quorum_status(record: &PendingRecord, policy: &AccountPolicy) -> QuorumStatus {
    let count = record.signers().filter(|signer| policy.is_owner(signer)).count();
    QuorumStatus { count, threshold: policy.threshold(), stale: record.endorsements.len() - count }
}

/// First `threshold` current-owner endorsements in ascending signer order.
pub fn select_for_submission<'a>(record: &'a PendingRecord, policy: &AccountPolicy) -> Result<Vec<&'a ParsedSignature>> {
    let selected: Vec<&ParsedSignature> = record
        .endorsements
        .iter()
        .filter(|(signer, _)| policy.is_owner(signer))
        .map(|(_, signature)| signature)
        .take(policy.threshold())
        .collect();
    if selected.len() < policy.threshold() {
        return Err(CosignError::ThresholdNotMet { required: policy.threshold(), received: selected.len() });
    }
    Ok(selected)
}
