//! Signer seam. The core treats every endorsement as opaque bytes plus a claimed address.

pub mod local;

pub use local::LocalKeySigner;

use crate::domain::{EndorsementScheme, Operation, SigningDomain};
use crate::foundation::{OperationIdentifier, Result};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignerConstraints {
    pub requires_explicit_gas: bool,
}

#[async_trait]
pub trait SignerTransport: Send + Sync {
    /// Endorsement bytes for `identifier`. Implementations may re-derive the identifier
    /// from `(operation, domain)` to refuse signing something they cannot display.
    async fn sign(&self, identifier: &OperationIdentifier, domain: &SigningDomain, operation: &Operation) -> Result<Bytes>;

    fn address(&self) -> Address;

    fn scheme(&self) -> EndorsementScheme;

    fn constraints(&self) -> SignerConstraints {
        SignerConstraints::default()
    }
}
