//! Domain layer: pure business logic with no I/O.

pub mod abi;
pub mod cancellation;
pub mod hashes;
pub mod model;
pub mod policy_change;
pub mod quorum;
pub mod signature;
pub mod state_machine;

pub use cancellation::{CancellationMethod, DeletionRisk, RiskClassification};
pub use model::*;
pub use quorum::QuorumStatus;
pub use signature::{EndorsementScheme, ParsedSignature};
