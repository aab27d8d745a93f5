use crate::application::aggregator::SignatureAggregator;
use crate::application::cancellation::{CancellationPlan, CancellationPlanner, CancellationReport};
use crate::application::gate::{ExecutionGate, ExecutionOutcome};
use crate::application::lifecycle::{LifecycleObserver, NoopObserver};
use crate::application::pool::TransactionPool;
use crate::domain::quorum::quorum_status;
use crate::domain::{CancellationMethod, Endorsement, Operation, PendingRecord, SigningDomain};
use crate::foundation::{CosignError, OperationIdentifier, Result};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::gas::GasEstimator;
use crate::infrastructure::ledger::LedgerClient;
use crate::infrastructure::signer::SignerTransport;
use crate::infrastructure::storage::PoolStore;
use alloy_primitives::Address;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EndorsementReceipt {
    pub identifier: OperationIdentifier,
    /// `false` when the signer had already endorsed; the stored endorsement is kept.
    pub accepted: bool,
    /// Endorsements from current owners.
    pub current_count: usize,
    pub threshold: usize,
}

/// Entry point for collaborators: wires pool, aggregator, gate and planner over one
/// store and one ledger.
pub struct Coordinator {
    pool: Arc<TransactionPool>,
    aggregator: Arc<SignatureAggregator>,
    gate: Arc<ExecutionGate>,
    planner: CancellationPlanner,
    ledger: Arc<dyn LedgerClient>,
    config: AppConfig,
}

impl Coordinator {
    pub fn new(store: Arc<dyn PoolStore>, ledger: Arc<dyn LedgerClient>, gas: Arc<dyn GasEstimator>, config: AppConfig) -> Self {
        Self::with_observer(store, ledger, gas, config, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        store: Arc<dyn PoolStore>,
        ledger: Arc<dyn LedgerClient>,
        gas: Arc<dyn GasEstimator>,
        config: AppConfig,
        lifecycle: Arc<dyn LifecycleObserver>,
    ) -> Self {
        let pool = Arc::new(
            TransactionPool::new(store.clone(), config.pool)
                .with_anonymous_empty_deletion(config.cancellation.allow_anonymous_empty_deletion)
                .with_observer(lifecycle.clone()),
        );
        let aggregator = Arc::new(SignatureAggregator::new(store).with_observer(lifecycle.clone()));
        let gate = Arc::new(ExecutionGate::new(pool.clone(), ledger.clone(), gas.clone()).with_observer(lifecycle.clone()));
        let planner =
            CancellationPlanner::new(pool.clone(), aggregator.clone(), gate.clone(), ledger.clone(), gas, config.cancellation)
                .with_observer(lifecycle);
        Self { pool, aggregator, gate, planner, ledger, config }
    }

    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    pub fn aggregator(&self) -> &Arc<SignatureAggregator> {
        &self.aggregator
    }

    pub fn gate(&self) -> &Arc<ExecutionGate> {
        &self.gate
    }

    pub fn planner(&self) -> &CancellationPlanner {
        &self.planner
    }

    /// Signing domain for `account` under the configured chain and contract version.
    pub fn signing_domain(&self, account: Address) -> SigningDomain {
        SigningDomain::new(self.config.ledger.chain_id, account).with_version(self.config.ledger.contract_version)
    }

    /// Register an operation for `account`. The proposer must be a current owner and the
    /// slot must not be consumed on the ledger yet.
    pub async fn propose_operation(&self, account: Address, operation: Operation, proposer: Address) -> Result<OperationIdentifier> {
        let policy = self.ledger.account_policy(account).await?;
        if !policy.is_owner(&proposer) {
            return Err(CosignError::NotCurrentOwner { address: proposer.to_string() });
        }
        let current = self.ledger.current_slot(account).await?;
        if operation.slot < current {
            return Err(CosignError::InvalidOperation(format!(
                "slot {} already consumed; ledger is at {}",
                operation.slot, current
            )));
        }
        let identifier = self.pool.propose(self.signing_domain(account), operation, proposer)?;
        info!("proposal accepted identifier={} account={} proposer={} policy={}", identifier, account, proposer, policy);
        Ok(identifier)
    }

    /// Validate and store one endorsement.
    ///
    /// A repeated endorsement by the same signer is not an error: the receipt reports
    /// `accepted = false`. Non-owners are refused with `NotCurrentOwner`.
    pub async fn add_endorsement(&self, endorsement: &Endorsement) -> Result<EndorsementReceipt> {
        let record = self.pool.get(&endorsement.identifier)?;
        let policy = self.ledger.account_policy(record.account()).await?;
        if !policy.is_owner(&endorsement.signer) {
            return Err(CosignError::NotCurrentOwner { address: endorsement.signer.to_string() });
        }
        let (record, accepted) = match self.aggregator.add(endorsement) {
            Ok(updated) => (updated, true),
            Err(err @ CosignError::AlreadySigned { .. }) => {
                info!("duplicate endorsement ignored identifier={} signer={} reason={}", endorsement.identifier, endorsement.signer, err);
                (self.pool.get(&endorsement.identifier)?, false)
            }
            Err(err) => return Err(err),
        };
        let status = quorum_status(&record, &policy);
        Ok(EndorsementReceipt {
            identifier: endorsement.identifier,
            accepted,
            current_count: status.count,
            threshold: status.threshold,
        })
    }

    /// Ask `signer` to endorse `identifier` and store the result.
    pub async fn endorse_with(&self, identifier: &OperationIdentifier, signer: &dyn SignerTransport) -> Result<EndorsementReceipt> {
        let record = self.pool.get(identifier)?;
        let signature = signer.sign(identifier, &record.domain, &record.operation).await?;
        self.add_endorsement(&Endorsement { identifier: *identifier, signer: signer.address(), signature }).await
    }

    /// Pending records whose slot the ledger has not consumed yet.
    pub async fn get_pending(&self, account: Address) -> Result<Vec<PendingRecord>> {
        let current = self.ledger.current_slot(account).await?;
        let records = self.pool.list_pending(&account)?;
        let total = records.len();
        let live: Vec<PendingRecord> = records.into_iter().filter(|record| record.slot() >= current).collect();
        debug!("get_pending account={} current_slot={} listed={} stale={}", account, current, live.len(), total - live.len());
        Ok(live)
    }

    pub async fn attempt_execute(&self, identifier: &OperationIdentifier) -> ExecutionOutcome {
        self.gate.execute(identifier).await
    }

    pub async fn plan_cancellation(&self, identifier: &OperationIdentifier) -> Result<CancellationPlan> {
        self.planner.plan(identifier).await
    }

    pub async fn cancel(
        &self,
        identifier: &OperationIdentifier,
        method: CancellationMethod,
        caller: Address,
        signer: Option<&dyn SignerTransport>,
    ) -> CancellationReport {
        self.planner.cancel(identifier, method, caller, signer).await
    }
}
