use crate::fixtures::{endorsement, HarnessBuilder};
use cosign_core::foundation::{CosignError, Result};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_signers_endorse_concurrently() -> Result<()> {
    let harness = Arc::new(HarnessBuilder::default().owners(4).threshold(3).build());
    let id = harness.propose_transfer(0).await;

    let mut handles = Vec::new();
    for owner in 0..4 {
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            let endorsement = endorsement(harness.owner(owner), &id);
            harness.coordinator.add_endorsement(&endorsement).await
        }));
    }
    for handle in handles {
        assert!(handle.await.expect("join")?.accepted);
    }

    let record = harness.record(&id);
    assert_eq!(record.endorsements.len(), 4);
    let signers: Vec<_> = record.signers().copied().collect();
    assert!(signers.windows(2).all(|pair| pair[0] < pair[1]), "endorsements are kept in signer order");
    assert!(harness.coordinator.attempt_execute(&id).await.is_executed());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replayed_endorsement_is_accepted_once() -> Result<()> {
    let harness = Arc::new(HarnessBuilder::default().build());
    let id = harness.propose_transfer(0).await;
    let endorsement = endorsement(harness.owner(1), &id);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let harness = harness.clone();
        let endorsement = endorsement.clone();
        handles.push(tokio::spawn(async move { harness.coordinator.add_endorsement(&endorsement).await }));
    }
    let mut accepted = 0;
    for handle in handles {
        let receipt = handle.await.expect("join")?;
        assert_eq!(receipt.current_count, 1);
        accepted += usize::from(receipt.accepted);
    }
    assert_eq!(accepted, 1);
    assert!(matches!(
        harness.coordinator.aggregator().add(&endorsement),
        Err(CosignError::AlreadySigned { .. })
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn endorsements_race_execution_without_corrupting_state() -> Result<()> {
    let harness = Arc::new(HarnessBuilder::default().owners(4).threshold(2).build());
    let id = harness.propose_transfer(0).await;
    harness.endorse(&id, 0).await;
    harness.endorse(&id, 1).await;

    let executor = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.coordinator.attempt_execute(&id).await })
    };
    let late = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.coordinator.add_endorsement(&endorsement(harness.owner(2), &id)).await })
    };

    assert!(executor.await.expect("join").is_executed());
    match late.await.expect("join") {
        Ok(receipt) => assert!(receipt.accepted),
        Err(err) => assert!(matches!(err, CosignError::AlreadyExecuted { .. }), "got {err}"),
    }
    assert!(harness.record(&id).is_executed());
    assert_eq!(harness.ledger.submission_count(), 1);
    Ok(())
}
