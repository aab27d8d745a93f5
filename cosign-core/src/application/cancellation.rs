use crate::application::aggregator::SignatureAggregator;
use crate::application::gate::{ExecutionGate, ExecutionOutcome};
use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::application::pool::TransactionPool;
use crate::domain::cancellation::{classify, counter_operation, ensure_deletion_safe, ensure_may_delete};
use crate::domain::hashes::operation_hash;
use crate::domain::quorum::quorum_status;
use crate::domain::{AccountPolicy, CancellationMethod, Endorsement, Operation, PendingRecord, RecordKind, RiskClassification};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result};
use crate::infrastructure::config::CancellationConfig;
use crate::infrastructure::gas::{GasEstimate, GasEstimator};
use crate::infrastructure::ledger::LedgerClient;
use crate::infrastructure::signer::SignerTransport;
use alloy_primitives::Address;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Classification of one pending record against the policy read at planning time.
#[derive(Clone, Debug, Serialize)]
pub struct CancellationPlan {
    pub identifier: OperationIdentifier,
    pub account: Address,
    pub slot: u64,
    /// Policy snapshot the classification was computed against.
    pub policy: AccountPolicy,
    pub classification: RiskClassification,
    pub counter_operation: Operation,
    pub counter_identifier: OperationIdentifier,
    /// Cost of submitting the counter-operation, when the estimator answered.
    pub counter_gas: Option<GasEstimate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationOutcome {
    /// Pool record removed; nothing reached the ledger.
    Deleted,
    /// A counter-operation consumed the slot on the ledger.
    Neutralized,
    /// The record is still pending.
    Unchanged,
}

#[derive(Debug)]
pub struct CancellationReport {
    pub identifier: OperationIdentifier,
    pub method: CancellationMethod,
    pub outcome: CancellationOutcome,
    pub success: bool,
    pub ledger_ref: Option<LedgerRef>,
    /// Identifier of the counter-operation, for neutralization attempts.
    pub counter_operation: Option<OperationIdentifier>,
    pub error: Option<CosignError>,
}

impl CancellationReport {
    fn deleted(identifier: OperationIdentifier) -> Self {
        Self {
            identifier,
            method: CancellationMethod::Delete,
            outcome: CancellationOutcome::Deleted,
            success: true,
            ledger_ref: None,
            counter_operation: None,
            error: None,
        }
    }

    fn unchanged(identifier: OperationIdentifier, method: CancellationMethod, error: Option<CosignError>) -> Self {
        Self {
            identifier,
            method,
            outcome: CancellationOutcome::Unchanged,
            success: false,
            ledger_ref: None,
            counter_operation: None,
            error,
        }
    }
}

/// Classifies and carries out withdrawal of pending records.
pub struct CancellationPlanner {
    pool: Arc<TransactionPool>,
    aggregator: Arc<SignatureAggregator>,
    gate: Arc<ExecutionGate>,
    ledger: Arc<dyn LedgerClient>,
    gas: Arc<dyn GasEstimator>,
    config: CancellationConfig,
    lifecycle: Arc<dyn LifecycleObserver>,
}

impl CancellationPlanner {
    pub fn new(
        pool: Arc<TransactionPool>,
        aggregator: Arc<SignatureAggregator>,
        gate: Arc<ExecutionGate>,
        ledger: Arc<dyn LedgerClient>,
        gas: Arc<dyn GasEstimator>,
        config: CancellationConfig,
    ) -> Self {
        Self { pool, aggregator, gate, ledger, gas, config, lifecycle: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, lifecycle: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub async fn plan(&self, identifier: &OperationIdentifier) -> Result<CancellationPlan> {
        let record = self.pool.get(identifier)?;
        let policy = self.ledger.account_policy(record.account()).await?;
        self.plan_for(&record, policy).await
    }

    async fn plan_for(&self, record: &PendingRecord, policy: AccountPolicy) -> Result<CancellationPlan> {
        let classification = classify(record, &policy);
        let counter = counter_operation(record);
        let counter_identifier = operation_hash(&counter, &record.domain)?;
        let counter_gas = match self.gas.estimate(record.account(), &counter).await {
            Ok(estimate) => Some(estimate),
            Err(err) => {
                warn!("counter-operation gas estimate unavailable identifier={} error={}", record.identifier, err);
                None
            }
        };
        debug!(
            "cancellation planned identifier={} endorsements={} threshold={} risk={} recommended={:?}",
            record.identifier,
            classification.endorsements,
            classification.threshold,
            classification.deletion_risk,
            classification.recommended
        );
        Ok(CancellationPlan {
            identifier: record.identifier,
            account: record.account(),
            slot: record.slot(),
            policy,
            classification,
            counter_operation: counter,
            counter_identifier,
            counter_gas,
        })
    }

    /// Classify against the live policy, then cancel.
    pub async fn cancel(
        &self,
        identifier: &OperationIdentifier,
        method: CancellationMethod,
        caller: Address,
        signer: Option<&dyn SignerTransport>,
    ) -> CancellationReport {
        match self.plan(identifier).await {
            Ok(plan) => self.cancel_planned(&plan, method, caller, signer).await,
            Err(err) => {
                warn!("cancellation planning failed identifier={} error={}", identifier, err);
                CancellationReport::unchanged(*identifier, method, Some(err))
            }
        }
    }

    /// Cancel according to an earlier plan. The live policy is re-read first; if it moved,
    /// the report carries `PolicyChanged` and nothing is touched.
    pub async fn cancel_planned(
        &self,
        plan: &CancellationPlan,
        method: CancellationMethod,
        caller: Address,
        signer: Option<&dyn SignerTransport>,
    ) -> CancellationReport {
        self.lifecycle.on_cancellation_started(&plan.identifier, method);
        let result = match method {
            CancellationMethod::Delete => self.delete(plan, caller).await,
            CancellationMethod::Neutralize => self.neutralize(plan, caller, signer).await,
        };
        match result {
            Ok(report) => report,
            Err(err) => {
                warn!("cancellation failed identifier={} method={} error={}", plan.identifier, method, err);
                CancellationReport::unchanged(plan.identifier, method, Some(err))
            }
        }
    }

    async fn fresh_record(&self, plan: &CancellationPlan) -> Result<(PendingRecord, AccountPolicy)> {
        let record = self.pool.get(&plan.identifier)?;
        let policy = self.ledger.account_policy(plan.account).await?;
        if policy != plan.policy {
            return Err(CosignError::PolicyChanged {
                details: format!("{}: planned against {}, ledger now has {}", plan.identifier, plan.policy, policy),
            });
        }
        Ok((record, policy))
    }

    async fn delete(&self, plan: &CancellationPlan, caller: Address) -> Result<CancellationReport> {
        let (record, policy) = self.fresh_record(plan).await?;
        ensure_may_delete(&record, &policy, caller, self.pool.allows_anonymous_empty_deletion())?;
        // Endorsements may have arrived since planning.
        let classification = classify(&record, &policy);
        ensure_deletion_safe(&record, &classification, self.config.allow_endorsed_deletion)?;
        if classification.endorsements > 0 {
            warn!(
                "deleting endorsed record; endorsements remain replayable identifier={} endorsements={} threshold={} risk={}",
                record.identifier, classification.endorsements, classification.threshold, classification.deletion_risk
            );
        }
        self.pool.remove_reviewed(&record, caller)?;
        Ok(CancellationReport::deleted(record.identifier))
    }

    async fn neutralize(
        &self,
        plan: &CancellationPlan,
        caller: Address,
        signer: Option<&dyn SignerTransport>,
    ) -> Result<CancellationReport> {
        let signer = signer.ok_or_else(|| CosignError::unauthorized(caller, "neutralize without an owner signer"))?;
        if signer.address() != caller {
            return Err(CosignError::unauthorized(caller, format!("neutralize with signer {}", signer.address())));
        }
        let (record, policy) = self.fresh_record(plan).await?;
        if !policy.is_owner(&caller) {
            return Err(CosignError::NotCurrentOwner { address: caller.to_string() });
        }
        if record.is_executed() {
            return Err(CosignError::AlreadyExecuted { identifier: record.identifier.to_string() });
        }
        if !matches!(record.kind, RecordKind::Proposal) {
            return Err(CosignError::InvalidOperation(format!(
                "{} is itself a counter-operation; delete it instead",
                record.identifier
            )));
        }

        let counter = self.pool.propose_with_kind(
            record.domain,
            plan.counter_operation.clone(),
            caller,
            RecordKind::Neutralizing { target: record.identifier },
        )?;
        if counter.identifier != plan.counter_identifier {
            return Err(CosignError::IdentifierMismatch {
                expected: plan.counter_identifier.to_string(),
                actual: counter.identifier.to_string(),
            });
        }

        let counter = if counter.has_signed(&caller) || counter.is_executed() {
            counter
        } else {
            let signature = signer.sign(&counter.identifier, &counter.domain, &counter.operation).await?;
            let endorsement = Endorsement { identifier: counter.identifier, signer: caller, signature };
            match self.aggregator.add(&endorsement) {
                Ok(updated) => updated,
                Err(CosignError::AlreadySigned { .. }) => self.pool.get(&counter.identifier)?,
                Err(err) => return Err(err),
            }
        };

        let mut report = CancellationReport::unchanged(record.identifier, CancellationMethod::Neutralize, None);
        report.counter_operation = Some(counter.identifier);

        let status = quorum_status(&counter, &policy);
        if !counter.is_executed() && !status.is_met() {
            info!(
                "counter-operation awaiting endorsements target={} counter_operation={} endorsement_count={} threshold={}",
                record.identifier, counter.identifier, status.count, status.threshold
            );
            return Ok(report);
        }

        match self.gate.execute(&counter.identifier).await {
            ExecutionOutcome::Executed(ledger_ref) => {
                self.lifecycle.on_neutralized(&record.identifier, &counter.identifier, &ledger_ref);
                report.outcome = CancellationOutcome::Neutralized;
                report.success = true;
                report.ledger_ref = Some(ledger_ref);
            }
            ExecutionOutcome::Pending { count, threshold } => {
                debug!(
                    "counter-operation pending after policy re-read counter_operation={} endorsement_count={} threshold={}",
                    counter.identifier, count, threshold
                );
            }
            ExecutionOutcome::Failed(err) => report.error = Some(err),
        }
        Ok(report)
    }
}
