use crate::fixtures::{outsider, transfer, HarnessBuilder};
use cosign_core::application::CancellationOutcome;
use cosign_core::domain::policy_change::change_threshold;
use cosign_core::domain::{CancellationMethod, DeletionRisk};
use cosign_core::foundation::CosignError;
use cosign_core::infrastructure::config::AppConfig;
use cosign_core::infrastructure::signer::SignerTransport;

#[tokio::test]
async fn unendorsed_record_is_deleted() {
    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;

    let report = harness.coordinator.cancel(&id, CancellationMethod::Delete, harness.address(1), None).await;
    assert!(report.success, "delete failed: {:?}", report.error);
    assert_eq!(report.outcome, CancellationOutcome::Deleted);
    assert!(report.counter_operation.is_none());
    assert!(harness.coordinator.pool().find(&id).expect("find").is_none());
    assert_eq!(harness.events.count(&format!("deleted {id}")), 1);
    assert_eq!(harness.events.count(&format!("cancellation {id}")), 1);
    assert_eq!(harness.ledger.submission_count(), 0);
}

#[tokio::test]
async fn partially_endorsed_delete_follows_configuration() {
    let permissive = HarnessBuilder::default().threshold(3).build();
    let id = permissive.propose_transfer(0).await;
    permissive.endorse(&id, 0).await;
    let plan = permissive.coordinator.plan_cancellation(&id).await.expect("plan");
    assert_eq!(plan.classification.deletion_risk, DeletionRisk::Low);
    let report = permissive.coordinator.cancel(&id, CancellationMethod::Delete, permissive.address(0), None).await;
    assert_eq!(report.outcome, CancellationOutcome::Deleted);

    let strict = HarnessBuilder::default().threshold(3).allow_endorsed_deletion(false).build();
    let id = strict.propose_transfer(0).await;
    strict.endorse(&id, 0).await;
    let report = strict.coordinator.cancel(&id, CancellationMethod::Delete, strict.address(0), None).await;
    assert!(!report.success);
    assert_eq!(report.outcome, CancellationOutcome::Unchanged);
    assert!(matches!(report.error, Some(CosignError::UnsafeDeletion { endorsements: 1, threshold: 3, .. })));
    assert!(strict.coordinator.pool().find(&id).expect("find").is_some());
}

#[tokio::test]
async fn executable_record_is_never_deleted() {
    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;
    harness.endorse(&id, 0).await;
    harness.endorse(&id, 1).await;

    let plan = harness.coordinator.plan_cancellation(&id).await.expect("plan");
    assert_eq!(plan.classification.deletion_risk, DeletionRisk::High);
    assert_eq!(plan.classification.recommended, Some(CancellationMethod::Neutralize));

    let report = harness.coordinator.cancel(&id, CancellationMethod::Delete, harness.address(0), None).await;
    assert!(matches!(report.error, Some(CosignError::UnsafeDeletion { endorsements: 2, threshold: 2, .. })));
    assert!(harness.coordinator.gate().is_executable(&id).await.expect("status"));
}

#[tokio::test]
async fn outsiders_delete_only_empty_records_when_allowed() {
    let stranger = outsider().address();

    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;
    let report = harness.coordinator.cancel(&id, CancellationMethod::Delete, stranger, None).await;
    assert!(matches!(report.error, Some(CosignError::Unauthorized { .. })));

    let open = HarnessBuilder::default().allow_anonymous_empty_deletion(true).build();
    let empty = open.propose_transfer(0).await;
    let endorsed = open.propose_transfer(1).await;
    open.endorse(&endorsed, 0).await;

    let report = open.coordinator.cancel(&empty, CancellationMethod::Delete, stranger, None).await;
    assert_eq!(report.outcome, CancellationOutcome::Deleted);
    let report = open.coordinator.cancel(&endorsed, CancellationMethod::Delete, stranger, None).await;
    assert!(matches!(report.error, Some(CosignError::Unauthorized { .. })));
}

#[tokio::test]
async fn pool_delete_refuses_endorsed_records() {
    let harness = HarnessBuilder::default().threshold(3).build();
    let id = harness.propose_transfer(0).await;
    harness.endorse(&id, 2).await;

    let policy = harness.ledger.policy(harness.account()).expect("policy");
    let err = harness.coordinator.pool().delete(&id, harness.address(0), &policy).unwrap_err();
    assert!(matches!(err, CosignError::UnsafeDeletion { endorsements: 1, .. }));
}

#[tokio::test]
async fn policy_change_after_planning_aborts_cancellation() {
    let harness = HarnessBuilder::default().build();
    let target = harness.propose_transfer(1).await;
    let plan = harness.coordinator.plan_cancellation(&target).await.expect("plan");
    assert!(plan.counter_gas.is_some());
    assert_eq!(plan.slot, 1);

    let policy = harness.ledger.policy(harness.account()).expect("policy");
    let raise = harness.propose(change_threshold(&policy, harness.account(), 3, 0).expect("threshold change")).await;
    harness.endorse(&raise, 0).await;
    harness.endorse(&raise, 1).await;
    assert!(harness.coordinator.attempt_execute(&raise).await.is_executed());

    let planner = harness.coordinator.planner();
    let report = planner.cancel_planned(&plan, CancellationMethod::Delete, harness.address(0), None).await;
    assert!(matches!(report.error, Some(CosignError::PolicyChanged { .. })));
    assert!(harness.coordinator.pool().find(&target).expect("find").is_some());

    // a fresh plan sees the new threshold
    let replanned = harness.coordinator.plan_cancellation(&target).await.expect("replan");
    assert_eq!(replanned.classification.threshold, 3);
    let report = planner.cancel_planned(&replanned, CancellationMethod::Delete, harness.address(0), None).await;
    assert_eq!(report.outcome, CancellationOutcome::Deleted);
}

#[tokio::test]
async fn neutralize_requires_the_callers_own_signer() {
    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;

    let report = harness.coordinator.cancel(&id, CancellationMethod::Neutralize, harness.address(0), None).await;
    assert!(matches!(report.error, Some(CosignError::Unauthorized { .. })));

    let report =
        harness.coordinator.cancel(&id, CancellationMethod::Neutralize, harness.address(0), Some(harness.owner(1))).await;
    assert!(matches!(report.error, Some(CosignError::Unauthorized { .. })));

    let stranger = outsider();
    let report = harness.coordinator.cancel(&id, CancellationMethod::Neutralize, stranger.address(), Some(&stranger)).await;
    assert!(matches!(report.error, Some(CosignError::NotCurrentOwner { .. })));

    let pending = harness.coordinator.get_pending(harness.account()).await.expect("pending");
    assert_eq!(pending.len(), 1, "no counter-operation was proposed");
    assert_eq!(harness.ledger.submission_count(), 0);
}

#[tokio::test]
async fn counter_operations_are_deleted_not_neutralized() {
    let harness = HarnessBuilder::default().build();
    let id = harness.propose_transfer(0).await;

    let first = harness.coordinator.cancel(&id, CancellationMethod::Neutralize, harness.address(0), Some(harness.owner(0))).await;
    assert!(first.error.is_none(), "unexpected error {:?}", first.error);
    let counter = first.counter_operation.expect("counter-operation proposed");
    assert_eq!(harness.record(&counter).endorsements.len(), 1);

    let report =
        harness.coordinator.cancel(&counter, CancellationMethod::Neutralize, harness.address(1), Some(harness.owner(1))).await;
    assert!(matches!(report.error, Some(CosignError::InvalidOperation(_))));

    let report = harness.coordinator.cancel(&counter, CancellationMethod::Delete, harness.address(0), None).await;
    assert_eq!(report.outcome, CancellationOutcome::Deleted);
    assert!(harness.coordinator.pool().find(&id).expect("find").is_some(), "the target stays pending");
}

#[tokio::test]
async fn counter_operation_at_quorum_is_routed_to_the_gate() {
    let harness = HarnessBuilder::default().build();
    let target = harness.propose_transfer(0).await;

    let first = harness.coordinator.cancel(&target, CancellationMethod::Neutralize, harness.address(0), Some(harness.owner(0))).await;
    let counter = first.counter_operation.expect("counter-operation proposed");
    harness.endorse(&counter, 1).await;

    let plan = harness.coordinator.plan_cancellation(&counter).await.expect("plan");
    assert_eq!(plan.classification.deletion_risk, DeletionRisk::High);
    assert!(plan.classification.is_executable);
    assert!(!plan.classification.secure_cancellation_available);
    assert_eq!(plan.classification.recommended, None);

    let report = harness.coordinator.cancel(&counter, CancellationMethod::Delete, harness.address(0), None).await;
    assert!(matches!(report.error, Some(CosignError::UnsafeDeletion { endorsements: 2, threshold: 2, .. })));

    assert!(harness.coordinator.attempt_execute(&counter).await.is_executed());
    let outcome = harness.coordinator.attempt_execute(&target).await;
    assert!(matches!(outcome.error(), Some(CosignError::AlreadyNeutralized { .. })), "got {outcome:?}");
}

#[tokio::test]
async fn neutralization_works_on_a_full_pool() {
    let mut config = AppConfig::default();
    config.pool.max_pending_per_account = 2;
    let harness = HarnessBuilder::default().config(config).build();
    let target = harness.propose_transfer(0).await;
    harness.propose_transfer(1).await;
    harness.endorse(&target, 0).await;
    harness.endorse(&target, 1).await;
    let err = harness.coordinator.propose_operation(harness.account(), transfer(2), harness.address(0)).await;
    assert!(matches!(err, Err(CosignError::PoolLimitExceeded { limit: 2, .. })));

    let first = harness.coordinator.cancel(&target, CancellationMethod::Neutralize, harness.address(0), Some(harness.owner(0))).await;
    assert!(first.error.is_none(), "unexpected error {:?}", first.error);
    assert_eq!(first.outcome, CancellationOutcome::Unchanged);

    let second = harness.coordinator.cancel(&target, CancellationMethod::Neutralize, harness.address(1), Some(harness.owner(1))).await;
    assert!(second.success, "neutralization failed: {:?}", second.error);
    assert_eq!(second.outcome, CancellationOutcome::Neutralized);
    assert_eq!(harness.ledger.nonce(harness.account()), Some(1));
}
