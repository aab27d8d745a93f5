#![allow(dead_code)]

use crate::fixtures::{domain, endorsement, owner_signers, policy_of, transfer};
use alloy_primitives::Address;
use cosign_core::application::{Coordinator, EndorsementReceipt, LifecycleObserver};
use cosign_core::domain::{CancellationMethod, Operation, PendingRecord};
use cosign_core::foundation::{LedgerRef, OperationIdentifier};
use cosign_core::infrastructure::config::AppConfig;
use cosign_core::infrastructure::gas::FixedGasEstimator;
use cosign_core::infrastructure::ledger::{InMemoryLedger, LedgerConstraints};
use cosign_core::infrastructure::signer::{LocalKeySigner, SignerTransport};
use cosign_core::infrastructure::storage::MemoryPoolStore;
use parking_lot::Mutex;
use std::sync::Arc;

/// One account on an in-memory ledger with a coordinator in front of it.
pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub store: Arc<MemoryPoolStore>,
    pub coordinator: Coordinator,
    pub owners: Vec<LocalKeySigner>,
    pub events: Arc<RecordingObserver>,
}

impl Harness {
    pub fn account(&self) -> Address {
        crate::fixtures::account()
    }

    pub fn owner(&self, index: usize) -> &LocalKeySigner {
        &self.owners[index]
    }

    pub fn address(&self, index: usize) -> Address {
        self.owners[index].address()
    }

    pub async fn propose(&self, operation: Operation) -> OperationIdentifier {
        self.coordinator.propose_operation(self.account(), operation, self.address(0)).await.expect("propose")
    }

    pub async fn propose_transfer(&self, slot: u64) -> OperationIdentifier {
        self.propose(transfer(slot)).await
    }

    pub async fn endorse(&self, identifier: &OperationIdentifier, owner: usize) -> EndorsementReceipt {
        self.coordinator.add_endorsement(&endorsement(self.owner(owner), identifier)).await.expect("endorse")
    }

    pub fn record(&self, identifier: &OperationIdentifier) -> PendingRecord {
        self.coordinator.pool().get(identifier).expect("record")
    }
}

pub struct HarnessBuilder {
    owners: usize,
    threshold: usize,
    config: AppConfig,
    constraints: LedgerConstraints,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self { owners: 3, threshold: 2, config: AppConfig::default(), constraints: LedgerConstraints::default() }
    }
}

impl HarnessBuilder {
    pub fn owners(mut self, owners: usize) -> Self {
        self.owners = owners;
        self
    }

    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn allow_endorsed_deletion(mut self, allow: bool) -> Self {
        self.config.cancellation.allow_endorsed_deletion = allow;
        self
    }

    pub fn allow_anonymous_empty_deletion(mut self, allow: bool) -> Self {
        self.config.cancellation.allow_anonymous_empty_deletion = allow;
        self
    }

    pub fn requires_explicit_gas(mut self) -> Self {
        self.constraints.requires_explicit_gas = true;
        self
    }

    pub fn build(self) -> Harness {
        let owners = owner_signers(self.owners);
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.register_account(domain(), policy_of(&owners, self.threshold));
        ledger.set_constraints(self.constraints);

        let store = Arc::new(MemoryPoolStore::new());
        let events = Arc::new(RecordingObserver::default());
        let coordinator = Coordinator::with_observer(
            store.clone(),
            ledger.clone(),
            Arc::new(FixedGasEstimator::default()),
            self.config,
            events.clone(),
        );
        Harness { ledger, store, coordinator, owners, events }
    }
}

/// Lifecycle events as short strings, in emission order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.lock().iter().filter(|event| event.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_proposed(&self, record: &PendingRecord) {
        self.push(format!("proposed {}", record.identifier));
    }

    fn on_endorsement_added(&self, identifier: &OperationIdentifier, signer: &Address, count: usize) {
        self.push(format!("endorsed {identifier} {signer} {count}"));
    }

    fn on_quorum_reached(&self, identifier: &OperationIdentifier, count: usize, threshold: usize) {
        self.push(format!("quorum {identifier} {count}/{threshold}"));
    }

    fn on_executed(&self, identifier: &OperationIdentifier, ledger_ref: &LedgerRef) {
        self.push(format!("executed {identifier} {ledger_ref}"));
    }

    fn on_deleted(&self, identifier: &OperationIdentifier, caller: &Address) {
        self.push(format!("deleted {identifier} {caller}"));
    }

    fn on_neutralized(&self, target: &OperationIdentifier, counter: &OperationIdentifier, _ledger_ref: &LedgerRef) {
        self.push(format!("neutralized {target} {counter}"));
    }

    fn on_failed(&self, identifier: &OperationIdentifier, reason: &str) {
        self.push(format!("failed {identifier} {reason}"));
    }

    fn on_cancellation_started(&self, identifier: &OperationIdentifier, method: CancellationMethod) {
        self.push(format!("cancellation {identifier} {method}"));
    }
}
