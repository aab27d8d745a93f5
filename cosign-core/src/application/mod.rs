//! Application layer: orchestration across domain logic and infrastructure I/O.

pub mod aggregator;
pub mod cancellation;
pub mod coordinator;
pub mod gate;
pub mod lifecycle;
pub mod pool;

pub use aggregator::SignatureAggregator;
pub use cancellation::{CancellationOutcome, CancellationPlan, CancellationPlanner, CancellationReport};
pub use coordinator::{Coordinator, EndorsementReceipt};
pub use gate::{ExecutionGate, ExecutionOutcome};
pub use lifecycle::{CompositeObserver, LifecycleObserver, LoggingObserver, NoopObserver};
pub use pool::TransactionPool;
