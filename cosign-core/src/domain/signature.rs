//! Endorsement decoding, signer recovery and combined-signature encoding.
//!
//! Every endorsement carries a 65 byte static part `r || s || v`; `v` selects the scheme:
//! - `27`/`28`: ECDSA over the identifier
//! - `31`/`32`: ECDSA over the personal-message digest of the identifier
//! - `0`: contract signature, `r` holds the owner, `s` the offset of `len || data`
//! - `1`: hash pre-approved on the ledger, `r` holds the owner

use crate::domain::hashes::eth_signed_message_hash;
use crate::foundation::{
    CosignError, OperationIdentifier, Result, ECDSA_SIGNATURE_SIZE, MAX_CONTRACT_SIGNATURE_BYTES, SIGNATURE_STATIC_PART_LEN,
    WORD_SIZE,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use once_cell::sync::Lazy;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use serde::{Deserialize, Serialize};
use std::fmt;

static SECP: Lazy<Secp256k1<VerifyOnly>> = Lazy::new(Secp256k1::verification_only);

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EndorsementScheme {
    Ecdsa,
    EthSign,
    Contract,
    ApprovedHash,
}

impl fmt::Display for EndorsementScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndorsementScheme::Ecdsa => "ecdsa",
            EndorsementScheme::EthSign => "eth_sign",
            EndorsementScheme::Contract => "contract",
            EndorsementScheme::ApprovedHash => "approved_hash",
        };
        f.write_str(name)
    }
}

/// Verified endorsement ready for inclusion in a combined signature blob.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParsedSignature {
    pub signer: Address,
    pub scheme: EndorsementScheme,
    pub r: B256,
    pub s: B256,
    pub v: u8,
    /// Contract signatures only: payload passed to the owner contract.
    #[serde(default)]
    pub dynamic: Bytes,
    pub received_at_nanos: u64,
}

impl ParsedSignature {
    fn static_part(&self, dynamic_offset: usize) -> [u8; SIGNATURE_STATIC_PART_LEN] {
        let mut out = [0u8; SIGNATURE_STATIC_PART_LEN];
        match self.scheme {
            EndorsementScheme::Ecdsa | EndorsementScheme::EthSign => {
                out[..32].copy_from_slice(self.r.as_slice());
                out[32..64].copy_from_slice(self.s.as_slice());
            }
            EndorsementScheme::Contract => {
                out[12..32].copy_from_slice(self.signer.as_slice());
                out[32..64].copy_from_slice(&U256::from(dynamic_offset).to_be_bytes::<32>());
            }
            EndorsementScheme::ApprovedHash => {
                out[12..32].copy_from_slice(self.signer.as_slice());
            }
        }
        out[64] = self.v;
        out
    }
}

/// Decode `bytes` as an endorsement of `identifier` by `claimed`.
///
/// ECDSA variants must recover to `claimed`. Contract and approved-hash variants are checked
/// structurally here; their validity is settled by the ledger at execution.
pub fn parse_endorsement(
    identifier: &OperationIdentifier,
    claimed: Address,
    bytes: &[u8],
    received_at_nanos: u64,
) -> Result<ParsedSignature> {
    if bytes.len() < SIGNATURE_STATIC_PART_LEN {
        return Err(CosignError::malformed_signature(format!(
            "expected at least {} bytes, got {}",
            SIGNATURE_STATIC_PART_LEN,
            bytes.len()
        )));
    }
    let r = B256::from_slice(&bytes[0..32]);
    let s = B256::from_slice(&bytes[32..64]);
    let v = bytes[64];

    let (scheme, dynamic) = match v {
        27 | 28 => {
            expect_static_only(bytes)?;
            let recovered = recover_address(&identifier.to_b256(), &bytes[..ECDSA_SIGNATURE_SIZE], v - 27)?;
            ensure_signer(claimed, recovered)?;
            (EndorsementScheme::Ecdsa, Bytes::new())
        }
        31 | 32 => {
            expect_static_only(bytes)?;
            let digest = eth_signed_message_hash(identifier);
            let recovered = recover_address(&digest, &bytes[..ECDSA_SIGNATURE_SIZE], v - 31)?;
            ensure_signer(claimed, recovered)?;
            (EndorsementScheme::EthSign, Bytes::new())
        }
        0 => {
            ensure_signer(claimed, address_from_word(&r)?)?;
            (EndorsementScheme::Contract, contract_payload(bytes)?)
        }
        1 => {
            expect_static_only(bytes)?;
            ensure_signer(claimed, address_from_word(&r)?)?;
            (EndorsementScheme::ApprovedHash, Bytes::new())
        }
        other => return Err(CosignError::malformed_signature(format!("unsupported signature type v={other}"))),
    };

    Ok(ParsedSignature { signer: claimed, scheme, r, s, v, dynamic, received_at_nanos })
}

/// Recover the signing address from a 64 byte compact signature and recovery id `0`/`1`.
pub fn recover_address(digest: &B256, compact: &[u8], recovery: u8) -> Result<Address> {
    let rid = RecoveryId::from_i32(i32::from(recovery))
        .map_err(|err| CosignError::malformed_signature(format!("recovery id: {err}")))?;
    let signature = RecoverableSignature::from_compact(compact, rid)
        .map_err(|err| CosignError::malformed_signature(format!("signature parse: {err}")))?;
    let message = Message::from_digest_slice(digest.as_slice())?;
    let public_key = SECP
        .recover_ecdsa(&message, &signature)
        .map_err(|err| CosignError::malformed_signature(format!("recover: {err}")))?;
    Ok(public_key_to_address(&public_key))
}

pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_slice(&keccak256(&uncompressed[1..])[12..])
}

/// Encode `selected` as the combined signature blob accepted by the account.
///
/// Callers pass endorsements already sorted by ascending signer address.
pub fn encode_signatures(selected: &[&ParsedSignature]) -> Bytes {
    let static_len = selected.len() * SIGNATURE_STATIC_PART_LEN;
    let mut statics = Vec::with_capacity(static_len);
    let mut dynamics = Vec::new();
    for signature in selected {
        let offset = static_len + dynamics.len();
        statics.extend_from_slice(&signature.static_part(offset));
        if signature.scheme == EndorsementScheme::Contract {
            dynamics.extend_from_slice(&U256::from(signature.dynamic.len()).to_be_bytes::<32>());
            dynamics.extend_from_slice(&signature.dynamic);
        }
    }
    statics.extend_from_slice(&dynamics);
    Bytes::from(statics)
}

fn expect_static_only(bytes: &[u8]) -> Result<()> {
    if bytes.len() != SIGNATURE_STATIC_PART_LEN {
        return Err(CosignError::malformed_signature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_STATIC_PART_LEN,
            bytes.len()
        )));
    }
    Ok(())
}

fn ensure_signer(claimed: Address, recovered: Address) -> Result<()> {
    if claimed != recovered {
        return Err(CosignError::SignerMismatch { claimed: claimed.to_string(), recovered: recovered.to_string() });
    }
    Ok(())
}

fn address_from_word(word: &B256) -> Result<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(CosignError::malformed_signature("owner word has non-zero upper bytes"));
    }
    Ok(Address::from_slice(&word[12..]))
}

fn contract_payload(bytes: &[u8]) -> Result<Bytes> {
    let rest = &bytes[SIGNATURE_STATIC_PART_LEN..];
    if rest.is_empty() {
        return Ok(Bytes::new());
    }
    if rest.len() < WORD_SIZE {
        return Err(CosignError::malformed_signature("contract signature length word truncated"));
    }
    let declared = U256::from_be_slice(&rest[..WORD_SIZE]);
    let payload = &rest[WORD_SIZE..];
    if declared > U256::from(MAX_CONTRACT_SIGNATURE_BYTES) {
        return Err(CosignError::malformed_signature(format!(
            "contract signature exceeds {} bytes",
            MAX_CONTRACT_SIGNATURE_BYTES
        )));
    }
    if declared != U256::from(payload.len()) {
        return Err(CosignError::malformed_signature(format!(
            "contract signature declares {} bytes, carries {}",
            declared,
            payload.len()
        )));
    }
    Ok(Bytes::copy_from_slice(payload))
}
