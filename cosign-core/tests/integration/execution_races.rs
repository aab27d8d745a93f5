use crate::fixtures::{domain, endorsement, owner_signers, policy_of, recipient, transfer, HarnessBuilder};
use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use cosign_core::application::{Coordinator, ExecutionGate, ExecutionOutcome};
use cosign_core::domain::policy_change::change_threshold;
use cosign_core::domain::Operation;
use cosign_core::foundation::{CosignError, Result};
use cosign_core::infrastructure::config::AppConfig;
use cosign_core::infrastructure::gas::FixedGasEstimator;
use cosign_core::infrastructure::ledger::{
    InMemoryLedger, LedgerCall, LedgerClient, LedgerConstraints, SlotConfirmation, SubmissionOutcome, SubmitOptions,
};
use cosign_core::infrastructure::signer::{SignerConstraints, SignerTransport};
use cosign_core::infrastructure::storage::MemoryPoolStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn two_records_on_one_slot_only_one_executes() {
    let harness = HarnessBuilder::default().build();
    let winner = harness.propose_transfer(0).await;
    let loser = harness.propose(Operation::call(recipient(), U256::from(2u8), Bytes::new(), 0)).await;
    for id in [&winner, &loser] {
        harness.endorse(id, 0).await;
        harness.endorse(id, 1).await;
    }

    assert!(harness.coordinator.attempt_execute(&winner).await.is_executed());
    let outcome = harness.coordinator.attempt_execute(&loser).await;
    let err = outcome.error().expect("second execution must fail");
    assert!(matches!(err, CosignError::AlreadyExecutedElsewhere { slot: 0, .. }), "got {err}");
    assert!(err.is_race_lost());
    assert!(!harness.record(&loser).is_executed());
    assert_eq!(harness.ledger.submission_count(), 1);
    assert_eq!(harness.events.count(&format!("failed {loser}")), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_submitters_confirm_once() {
    let owners = owner_signers(3);
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.register_account(domain(), policy_of(&owners, 2));
    ledger.set_latency(Duration::from_millis(5));

    let mut coordinators = Vec::new();
    for _ in 0..2 {
        let coordinator = Arc::new(Coordinator::new(
            Arc::new(MemoryPoolStore::new()),
            ledger.clone(),
            Arc::new(FixedGasEstimator::default()),
            AppConfig::default(),
        ));
        let id = coordinator.propose_operation(domain().account, transfer(0), owners[0].address()).await.expect("propose");
        coordinator.add_endorsement(&endorsement(&owners[0], &id)).await.expect("endorse");
        coordinator.add_endorsement(&endorsement(&owners[1], &id)).await.expect("endorse");
        coordinators.push((coordinator, id));
    }
    assert_eq!(coordinators[0].1, coordinators[1].1, "independent pools derive the same identifier");

    let mut handles = Vec::new();
    for (coordinator, id) in &coordinators {
        let coordinator = coordinator.clone();
        let id = *id;
        handles.push(tokio::spawn(async move { coordinator.attempt_execute(&id).await }));
    }
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.expect("join"));
    }

    assert_eq!(ledger.submission_count(), 1);
    assert!(outcomes.iter().any(ExecutionOutcome::is_executed));
    for outcome in &outcomes {
        match outcome {
            ExecutionOutcome::Executed(_) => {}
            ExecutionOutcome::Failed(err) => assert!(matches!(err, CosignError::AlreadyExecutedElsewhere { .. }), "got {err}"),
            ExecutionOutcome::Pending { .. } => panic!("quorum was met"),
        }
    }
    for (coordinator, id) in &coordinators {
        assert!(coordinator.pool().get(id).expect("record").is_executed(), "both pools learn the confirmation");
    }
}

#[tokio::test]
async fn pre_submit_discovery_of_own_confirmation_reports_executed() {
    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;
    harness.endorse(&id, 0).await;
    harness.endorse(&id, 1).await;

    let other_store = Arc::new(MemoryPoolStore::new());
    let other = Coordinator::new(
        other_store,
        harness.ledger.clone(),
        Arc::new(FixedGasEstimator::default()),
        AppConfig::default(),
    );
    let same = other.propose_operation(harness.account(), transfer(0), harness.address(0)).await.expect("propose");
    other.add_endorsement(&endorsement(harness.owner(0), &same)).await.expect("endorse");
    other.add_endorsement(&endorsement(harness.owner(1), &same)).await.expect("endorse");
    let ledger_ref = other.attempt_execute(&same).await.ledger_ref().expect("executed elsewhere");

    assert_eq!(harness.coordinator.attempt_execute(&id).await.ledger_ref(), Some(ledger_ref));
    assert_eq!(harness.record(&id).ledger_ref, Some(ledger_ref));
    assert_eq!(harness.ledger.submission_count(), 1);
}

#[tokio::test]
async fn raised_threshold_is_read_at_execution_time() {
    let harness = HarnessBuilder::default().build();
    let target = harness.propose_transfer(1).await;
    harness.endorse(&target, 0).await;
    harness.endorse(&target, 1).await;
    assert!(harness.coordinator.gate().is_executable(&target).await.expect("status"));

    let policy = harness.ledger.policy(harness.account()).expect("policy");
    let raise = harness.propose(change_threshold(&policy, harness.account(), 3, 0).expect("change")).await;
    harness.endorse(&raise, 0).await;
    harness.endorse(&raise, 2).await;
    assert!(harness.coordinator.attempt_execute(&raise).await.is_executed());

    assert!(matches!(
        harness.coordinator.attempt_execute(&target).await,
        ExecutionOutcome::Pending { count: 2, threshold: 3 }
    ));
    harness.endorse(&target, 2).await;
    assert!(harness.coordinator.attempt_execute(&target).await.is_executed());
}

#[tokio::test]
async fn explicit_gas_is_requested_when_the_ledger_requires_it() {
    let harness = HarnessBuilder::default().requires_explicit_gas().build();
    let id = harness.propose_transfer(0).await;
    harness.endorse(&id, 0).await;
    harness.endorse(&id, 1).await;
    assert!(harness.coordinator.attempt_execute(&id).await.is_executed());
}

/// Enforces explicit gas like the wrapped ledger but does not advertise it.
struct UndeclaredGasLedger(Arc<InMemoryLedger>);

#[async_trait]
impl LedgerClient for UndeclaredGasLedger {
    async fn call(&self, account: Address, call: LedgerCall) -> Result<Bytes> {
        self.0.call(account, call).await
    }

    async fn submit(&self, account: Address, call: LedgerCall, options: SubmitOptions) -> Result<SubmissionOutcome> {
        self.0.submit(account, call, options).await
    }

    async fn confirmed_at_slot(&self, account: Address, slot: u64) -> Result<Option<SlotConfirmation>> {
        self.0.confirmed_at_slot(account, slot).await
    }
}

#[tokio::test]
async fn signer_constraints_request_gas_the_ledger_does_not_advertise() {
    let owners = owner_signers(2);
    let inner = Arc::new(InMemoryLedger::new());
    inner.register_account(domain(), policy_of(&owners, 2));
    inner.set_constraints(LedgerConstraints { requires_explicit_gas: true });
    let ledger: Arc<dyn LedgerClient> = Arc::new(UndeclaredGasLedger(inner.clone()));

    let coordinator = Coordinator::new(
        Arc::new(MemoryPoolStore::new()),
        ledger.clone(),
        Arc::new(FixedGasEstimator::default()),
        AppConfig::default(),
    );
    let id = coordinator.propose_operation(domain().account, transfer(0), owners[0].address()).await.expect("propose");
    for owner in &owners {
        coordinator.add_endorsement(&endorsement(owner, &id)).await.expect("endorse");
    }

    let outcome = coordinator.attempt_execute(&id).await;
    assert!(matches!(outcome.error(), Some(CosignError::LedgerReverted { reason }) if reason.contains("gas")));
    assert!(!coordinator.pool().get(&id).expect("record").is_executed());
    assert_eq!(inner.submission_count(), 0);

    let constrained = ExecutionGate::new(coordinator.pool().clone(), ledger, Arc::new(FixedGasEstimator::default()))
        .with_signer_constraints(SignerConstraints { requires_explicit_gas: true });
    assert!(constrained.execute(&id).await.is_executed());
    assert!(coordinator.pool().get(&id).expect("record").is_executed());
}
