use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::application::pool::TransactionPool;
use crate::domain::cancellation::counter_operation;
use crate::domain::hashes::operation_hash;
use crate::domain::quorum::{quorum_status, select_for_submission, QuorumStatus};
use crate::domain::signature::encode_signatures;
use crate::domain::state_machine::ensure_can_execute;
use crate::domain::{PendingRecord, RecordKind};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result};
use crate::infrastructure::gas::GasEstimator;
use crate::infrastructure::ledger::{LedgerCall, LedgerClient, SubmissionOutcome, SubmitOptions};
use crate::infrastructure::signer::SignerConstraints;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug)]
pub enum ExecutionOutcome {
    Executed(LedgerRef),
    /// Quorum not met under the live policy.
    Pending { count: usize, threshold: usize },
    Failed(CosignError),
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed(_))
    }

    pub fn ledger_ref(&self) -> Option<LedgerRef> {
        match self {
            ExecutionOutcome::Executed(ledger_ref) => Some(*ledger_ref),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CosignError> {
        match self {
            ExecutionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Decides quorum against the live policy and submits combined endorsements.
///
/// Local state only moves to executed on an observed ledger confirmation. A timeout or a
/// dropped future leaves the record pending.
pub struct ExecutionGate {
    pool: Arc<TransactionPool>,
    ledger: Arc<dyn LedgerClient>,
    gas: Arc<dyn GasEstimator>,
    signer_constraints: SignerConstraints,
    lifecycle: Arc<dyn LifecycleObserver>,
}

impl ExecutionGate {
    pub fn new(pool: Arc<TransactionPool>, ledger: Arc<dyn LedgerClient>, gas: Arc<dyn GasEstimator>) -> Self {
        Self { pool, ledger, gas, signer_constraints: SignerConstraints::default(), lifecycle: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, lifecycle: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Constraints of the party paying for submission.
    pub fn with_signer_constraints(mut self, constraints: SignerConstraints) -> Self {
        self.signer_constraints = constraints;
        self
    }

    pub async fn status(&self, identifier: &OperationIdentifier) -> Result<QuorumStatus> {
        let record = self.pool.get(identifier)?;
        let policy = self.ledger.account_policy(record.account()).await?;
        Ok(quorum_status(&record, &policy))
    }

    pub async fn is_executable(&self, identifier: &OperationIdentifier) -> Result<bool> {
        Ok(self.status(identifier).await?.is_met())
    }

    /// Submit `identifier` if its quorum is met. Never returns an error: failures are
    /// reported as `Failed`, with lost races as `AlreadyExecutedElsewhere`/`AlreadyNeutralized`.
    pub async fn execute(&self, identifier: &OperationIdentifier) -> ExecutionOutcome {
        match self.try_execute(identifier).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_race_lost() {
                    info!("execution lost slot race identifier={} error={}", identifier, err);
                } else {
                    warn!("execution failed identifier={} error={}", identifier, err);
                }
                self.lifecycle.on_failed(identifier, &err.to_string());
                ExecutionOutcome::Failed(err)
            }
        }
    }

    async fn try_execute(&self, identifier: &OperationIdentifier) -> Result<ExecutionOutcome> {
        let record = self.pool.get(identifier)?;
        if let Some(ledger_ref) = record.ledger_ref.filter(|_| record.is_executed()) {
            debug!("execute on executed record identifier={} ledger_ref={}", identifier, ledger_ref);
            return Ok(ExecutionOutcome::Executed(ledger_ref));
        }
        ensure_can_execute(&record)?;

        let account = record.account();
        // A consumed slot settles the record whatever its endorsements.
        let current = self.ledger.current_slot(account).await?;
        if current > record.slot() {
            return self.resolve_consumed_slot(&record, false).await;
        }

        let policy = self.ledger.account_policy(account).await?;
        let status = quorum_status(&record, &policy);
        if !status.is_met() {
            debug!(
                "quorum not met identifier={} endorsement_count={} threshold={} stale={}",
                identifier, status.count, status.threshold, status.stale
            );
            return Ok(ExecutionOutcome::Pending { count: status.count, threshold: status.threshold });
        }
        self.lifecycle.on_quorum_reached(identifier, status.count, status.threshold);

        if current < record.slot() {
            return Err(CosignError::SlotNotReached { slot: record.slot(), current });
        }

        let options = self.submit_options(&record).await?;
        let signatures = encode_signatures(&select_for_submission(&record, &policy)?);
        let call = LedgerCall::ExecTransaction { operation: record.operation.clone(), signatures };
        info!(
            "submitting operation identifier={} account={} slot={} endorsement_count={} gas_limit={:?}",
            identifier,
            account,
            record.slot(),
            status.threshold,
            options.gas_limit
        );

        match self.ledger.submit(account, call, options).await? {
            SubmissionOutcome::Confirmed(ledger_ref) => {
                self.pool.mark_executed(identifier, ledger_ref)?;
                Ok(ExecutionOutcome::Executed(ledger_ref))
            }
            SubmissionOutcome::Reverted { reason } => {
                // A revert after the slot moved means another submission won it.
                let current = self.ledger.current_slot(account).await?;
                if current > record.slot() {
                    return self.resolve_consumed_slot(&record, true).await;
                }
                Err(CosignError::LedgerReverted { reason })
            }
        }
    }

    async fn submit_options(&self, record: &PendingRecord) -> Result<SubmitOptions> {
        if !(self.ledger.constraints().requires_explicit_gas || self.signer_constraints.requires_explicit_gas) {
            return Ok(SubmitOptions::default());
        }
        let estimate = self.gas.estimate(record.account(), &record.operation).await?;
        debug!("explicit gas requested identifier={} gas_limit={}", record.identifier, estimate.gas_limit);
        Ok(SubmitOptions { gas_limit: Some(estimate.gas_limit) })
    }

    /// The record's slot is consumed. Find out by what.
    ///
    /// `submitted` marks that this call's own submission reverted; if the ledger nevertheless
    /// confirmed this identifier, another submitter won and the race is reported as lost.
    async fn resolve_consumed_slot(&self, record: &PendingRecord, submitted: bool) -> Result<ExecutionOutcome> {
        let slot = record.slot();
        let confirmation = self.ledger.confirmed_at_slot(record.account(), slot).await?.ok_or_else(|| {
            CosignError::LedgerError {
                operation: "confirmed_at_slot".to_string(),
                details: format!("slot {slot} consumed without a recorded confirmation"),
            }
        })?;

        if confirmation.identifier == record.identifier {
            self.pool.mark_executed(&record.identifier, confirmation.ledger_ref)?;
            if submitted {
                return Err(CosignError::AlreadyExecutedElsewhere { identifier: record.identifier.to_string(), slot });
            }
            info!("operation confirmed by another submitter identifier={} slot={}", record.identifier, slot);
            return Ok(ExecutionOutcome::Executed(confirmation.ledger_ref));
        }

        let neutralized = match record.kind {
            RecordKind::Proposal => operation_hash(&counter_operation(record), &record.domain)? == confirmation.identifier,
            RecordKind::Neutralizing { .. } => false,
        };
        if neutralized {
            return Err(CosignError::AlreadyNeutralized { identifier: record.identifier.to_string(), slot });
        }
        Err(CosignError::AlreadyExecutedElsewhere { identifier: record.identifier.to_string(), slot })
    }
}
