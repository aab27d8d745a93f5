//! In-process secp256k1 signer for tooling and tests.

use crate::domain::hashes::{eth_signed_message_hash, operation_hash};
use crate::domain::signature::public_key_to_address;
use crate::domain::{EndorsementScheme, Operation, SigningDomain};
use crate::foundation::{CosignError, OperationIdentifier, Result};
use crate::infrastructure::signer::{SignerConstraints, SignerTransport};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub struct LocalKeySigner {
    secret: SecretKey,
    address: Address,
    scheme: EndorsementScheme,
    constraints: SignerConstraints,
}

impl fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeySigner").field("address", &self.address).field("scheme", &self.scheme).finish_non_exhaustive()
    }
}

impl LocalKeySigner {
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(secret).map_err(|err| CosignError::CryptoError {
            operation: "parse_secp256k1_secret".to_string(),
            details: err.to_string(),
        })?;
        let address = public_key_to_address(&PublicKey::from_secret_key(&SECP, &secret));
        Ok(Self { secret, address, scheme: EndorsementScheme::Ecdsa, constraints: SignerConstraints::default() })
    }

    /// Only locally-recoverable schemes can be produced from a raw key.
    pub fn with_scheme(mut self, scheme: EndorsementScheme) -> Result<Self> {
        match scheme {
            EndorsementScheme::Ecdsa | EndorsementScheme::EthSign => {
                self.scheme = scheme;
                Ok(self)
            }
            other => Err(CosignError::SigningFailed(format!("local key cannot produce {other} endorsements"))),
        }
    }

    pub fn with_constraints(mut self, constraints: SignerConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// 65 byte `r || s || v` over `identifier` in this signer's scheme.
    pub fn sign_identifier(&self, identifier: &OperationIdentifier) -> Result<Bytes> {
        let (digest, v_base) = match self.scheme {
            EndorsementScheme::EthSign => (eth_signed_message_hash(identifier), 31u8),
            _ => (identifier.to_b256(), 27u8),
        };
        Ok(Bytes::from(sign_digest(&self.secret, &digest, v_base)?.to_vec()))
    }
}

pub fn sign_digest(secret: &SecretKey, digest: &B256, v_base: u8) -> Result<[u8; 65]> {
    let message = Message::from_digest_slice(digest.as_slice())?;
    let (rid, compact) = SECP.sign_ecdsa_recoverable(&message, secret).serialize_compact();
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&compact);
    out[64] = v_base + rid.to_i32() as u8;
    Ok(out)
}

#[async_trait]
impl SignerTransport for LocalKeySigner {
    async fn sign(&self, identifier: &OperationIdentifier, domain: &SigningDomain, operation: &Operation) -> Result<Bytes> {
        let derived = operation_hash(operation, domain)?;
        if !derived.ct_eq(identifier) {
            return Err(CosignError::IdentifierMismatch { expected: derived.to_string(), actual: identifier.to_string() });
        }
        self.sign_identifier(identifier)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn scheme(&self) -> EndorsementScheme {
        self.scheme
    }

    fn constraints(&self) -> SignerConstraints {
        self.constraints
    }
}
