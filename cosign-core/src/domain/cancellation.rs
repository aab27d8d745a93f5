//! Cancellation risk classification (pure, no I/O).
//!
//! Endorsement bytes stay replayable after a pool deletion, so the risk of a plain delete
//! grows as the record approaches quorum. Only a confirmed counter-operation on the same
//! slot forecloses the original.

use crate::domain::quorum::quorum_status;
use crate::domain::{AccountPolicy, Operation, PendingRecord, RecordKind};
use crate::foundation::{CosignError, Result};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeletionRisk {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for DeletionRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletionRisk::None => "none",
            DeletionRisk::Low => "low",
            DeletionRisk::Medium => "medium",
            DeletionRisk::High => "high",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CancellationMethod {
    /// Remove the pool record. Leaves no ledger trace.
    Delete,
    /// Execute a same-slot counter-operation.
    Neutralize,
}

impl fmt::Display for CancellationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationMethod::Delete => f.write_str("delete"),
            CancellationMethod::Neutralize => f.write_str("neutralize"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RiskClassification {
    /// `k`: endorsements from current owners.
    pub endorsements: usize,
    /// `M`: live threshold.
    pub threshold: usize,
    pub is_executable: bool,
    pub deletion_risk: DeletionRisk,
    pub secure_cancellation_available: bool,
    /// `None` for a record at quorum that cannot be neutralized (a counter-operation):
    /// deletion is refused, so it can only go through the execution gate.
    pub recommended: Option<CancellationMethod>,
}

impl RiskClassification {
    pub fn gap(&self) -> usize {
        self.threshold.saturating_sub(self.endorsements)
    }
}

pub fn deletion_risk(endorsements: usize, threshold: usize) -> DeletionRisk {
    if endorsements == 0 {
        return DeletionRisk::None;
    }
    if endorsements >= threshold {
        return DeletionRisk::High;
    }
    match threshold - endorsements {
        1 => DeletionRisk::Medium,
        _ => DeletionRisk::Low,
    }
}

pub fn classify(record: &PendingRecord, policy: &AccountPolicy) -> RiskClassification {
    let status = quorum_status(record, policy);
    let deletion_risk = deletion_risk(status.count, status.threshold);
    let secure_cancellation_available = !record.is_executed() && matches!(record.kind, RecordKind::Proposal);
    let recommended = match deletion_risk {
        DeletionRisk::None | DeletionRisk::Low => Some(CancellationMethod::Delete),
        DeletionRisk::Medium | DeletionRisk::High if secure_cancellation_available => Some(CancellationMethod::Neutralize),
        DeletionRisk::Medium => Some(CancellationMethod::Delete),
        DeletionRisk::High => None,
    };
    RiskClassification {
        endorsements: status.count,
        threshold: status.threshold,
        is_executable: status.is_met(),
        deletion_risk,
        secure_cancellation_available,
        recommended,
    }
}

/// Gate for a plain deletion. `k >= M` is always refused.
pub fn ensure_deletion_safe(
    record: &PendingRecord,
    classification: &RiskClassification,
    allow_endorsed_deletion: bool,
) -> Result<()> {
    let refused = match classification.deletion_risk {
        DeletionRisk::None => false,
        DeletionRisk::Low | DeletionRisk::Medium => !allow_endorsed_deletion,
        DeletionRisk::High => true,
    };
    if refused {
        return Err(CosignError::UnsafeDeletion {
            identifier: record.identifier.to_string(),
            endorsements: classification.endorsements,
            threshold: classification.threshold,
        });
    }
    Ok(())
}

/// Standing to delete: the proposer or a current owner. A caller with neither may remove a
/// record only when it holds no endorsements at all and `allow_anonymous_empty` is set.
pub fn ensure_may_delete(record: &PendingRecord, policy: &AccountPolicy, caller: Address, allow_anonymous_empty: bool) -> Result<()> {
    if caller == record.proposer || policy.is_owner(&caller) {
        return Ok(());
    }
    if allow_anonymous_empty && record.endorsements.is_empty() {
        return Ok(());
    }
    Err(CosignError::unauthorized(caller, format!("delete {}", record.identifier)))
}

/// Zero-value, zero-payload self call on the record's slot.
pub fn counter_operation(record: &PendingRecord) -> Operation {
    Operation::counter_operation(record.account(), record.slot())
}
