use crate::domain::{CancellationMethod, PendingRecord};
use crate::foundation::{LedgerRef, OperationIdentifier};
use alloy_primitives::Address;
use log::{debug, info, trace, warn};
use std::sync::Arc;

pub trait LifecycleObserver: Send + Sync {
    fn on_proposed(&self, _record: &PendingRecord) {}
    fn on_endorsement_added(&self, _identifier: &OperationIdentifier, _signer: &Address, _count: usize) {}
    fn on_quorum_reached(&self, _identifier: &OperationIdentifier, _count: usize, _threshold: usize) {}
    fn on_executed(&self, _identifier: &OperationIdentifier, _ledger_ref: &LedgerRef) {}
    fn on_deleted(&self, _identifier: &OperationIdentifier, _caller: &Address) {}
    fn on_neutralized(&self, _target: &OperationIdentifier, _counter: &OperationIdentifier, _ledger_ref: &LedgerRef) {}
    fn on_failed(&self, _identifier: &OperationIdentifier, _reason: &str) {}
    fn on_cancellation_started(&self, _identifier: &OperationIdentifier, _method: CancellationMethod) {}
}

pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

pub struct CompositeObserver {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for CompositeObserver {
    fn on_proposed(&self, record: &PendingRecord) {
        trace!("on_proposed dispatch observer_count={} identifier={}", self.observers.len(), record.identifier);
        for observer in &self.observers {
            observer.on_proposed(record);
        }
    }

    fn on_endorsement_added(&self, identifier: &OperationIdentifier, signer: &Address, count: usize) {
        trace!("on_endorsement_added dispatch observer_count={} identifier={}", self.observers.len(), identifier);
        for observer in &self.observers {
            observer.on_endorsement_added(identifier, signer, count);
        }
    }

    fn on_quorum_reached(&self, identifier: &OperationIdentifier, count: usize, threshold: usize) {
        for observer in &self.observers {
            observer.on_quorum_reached(identifier, count, threshold);
        }
    }

    fn on_executed(&self, identifier: &OperationIdentifier, ledger_ref: &LedgerRef) {
        for observer in &self.observers {
            observer.on_executed(identifier, ledger_ref);
        }
    }

    fn on_deleted(&self, identifier: &OperationIdentifier, caller: &Address) {
        for observer in &self.observers {
            observer.on_deleted(identifier, caller);
        }
    }

    fn on_neutralized(&self, target: &OperationIdentifier, counter: &OperationIdentifier, ledger_ref: &LedgerRef) {
        for observer in &self.observers {
            observer.on_neutralized(target, counter, ledger_ref);
        }
    }

    fn on_failed(&self, identifier: &OperationIdentifier, reason: &str) {
        for observer in &self.observers {
            observer.on_failed(identifier, reason);
        }
    }

    fn on_cancellation_started(&self, identifier: &OperationIdentifier, method: CancellationMethod) {
        for observer in &self.observers {
            observer.on_cancellation_started(identifier, method);
        }
    }
}

/// Writes every lifecycle event to the `log` facade.
pub struct LoggingObserver;

impl LifecycleObserver for LoggingObserver {
    fn on_proposed(&self, record: &PendingRecord) {
        info!(
            "operation proposed identifier={} account={} slot={} proposer={} kind={:?}",
            record.identifier,
            record.account(),
            record.slot(),
            record.proposer,
            record.kind
        );
    }

    fn on_endorsement_added(&self, identifier: &OperationIdentifier, signer: &Address, count: usize) {
        debug!("endorsement added identifier={} signer={} endorsement_count={}", identifier, signer, count);
    }

    fn on_quorum_reached(&self, identifier: &OperationIdentifier, count: usize, threshold: usize) {
        info!("quorum reached identifier={} endorsement_count={} threshold={}", identifier, count, threshold);
    }

    fn on_executed(&self, identifier: &OperationIdentifier, ledger_ref: &LedgerRef) {
        info!("operation executed identifier={} ledger_ref={}", identifier, ledger_ref);
    }

    fn on_deleted(&self, identifier: &OperationIdentifier, caller: &Address) {
        info!("pending record deleted identifier={} caller={}", identifier, caller);
    }

    fn on_neutralized(&self, target: &OperationIdentifier, counter: &OperationIdentifier, ledger_ref: &LedgerRef) {
        info!("operation neutralized target={} counter_operation={} ledger_ref={}", target, counter, ledger_ref);
    }

    fn on_failed(&self, identifier: &OperationIdentifier, reason: &str) {
        warn!("operation failed identifier={} reason={}", identifier, reason);
    }

    fn on_cancellation_started(&self, identifier: &OperationIdentifier, method: CancellationMethod) {
        info!("cancellation started identifier={} method={}", identifier, method);
    }
}
