//! Typed structured-data hashing for account operations.
//!
//! identifier = keccak256(0x19 || 0x01 || domainSeparator || structHash)

use crate::domain::{ContractVersion, Operation, SigningDomain};
use crate::foundation::{CosignError, OperationIdentifier, Result, MAX_CALL_PAYLOAD_BYTES, WORD_SIZE};
use alloy_primitives::{keccak256, Address, B256, U256};
use once_cell::sync::Lazy;

const DOMAIN_TYPE: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";
const LEGACY_DOMAIN_TYPE: &str = "EIP712Domain(address verifyingContract)";
const SAFE_TX_TYPE: &str = "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";
const LEGACY_SAFE_TX_TYPE: &str = "SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 dataGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";

const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

static DOMAIN_TYPEHASH: Lazy<B256> = Lazy::new(|| keccak256(DOMAIN_TYPE));
static LEGACY_DOMAIN_TYPEHASH: Lazy<B256> = Lazy::new(|| keccak256(LEGACY_DOMAIN_TYPE));
static SAFE_TX_TYPEHASH: Lazy<B256> = Lazy::new(|| keccak256(SAFE_TX_TYPE));
static LEGACY_SAFE_TX_TYPEHASH: Lazy<B256> = Lazy::new(|| keccak256(LEGACY_SAFE_TX_TYPE));

pub fn domain_separator(domain: &SigningDomain) -> B256 {
    let mut buf = Vec::with_capacity(WORD_SIZE * 3);
    if domain.version.binds_chain_id() {
        buf.extend_from_slice(DOMAIN_TYPEHASH.as_slice());
        push_uint(&mut buf, U256::from(domain.chain_id));
    } else {
        buf.extend_from_slice(LEGACY_DOMAIN_TYPEHASH.as_slice());
    }
    push_address(&mut buf, domain.account);
    keccak256(&buf)
}

pub fn struct_hash(operation: &Operation, version: ContractVersion) -> Result<B256> {
    if operation.data.len() > MAX_CALL_PAYLOAD_BYTES {
        return Err(CosignError::invalid_encoding(
            "data",
            format!("payload of {} bytes exceeds {} byte limit", operation.data.len(), MAX_CALL_PAYLOAD_BYTES),
        ));
    }

    let typehash = match version {
        ContractVersion::Legacy => *LEGACY_SAFE_TX_TYPEHASH,
        ContractVersion::V1_0To1_2 | ContractVersion::V1_3Plus => *SAFE_TX_TYPEHASH,
    };

    let mut buf = Vec::with_capacity(WORD_SIZE * 11);
    buf.extend_from_slice(typehash.as_slice());
    push_address(&mut buf, operation.to);
    push_uint(&mut buf, operation.value);
    buf.extend_from_slice(keccak256(&operation.data).as_slice());
    push_uint(&mut buf, U256::from(operation.call_kind.as_u8()));
    push_uint(&mut buf, operation.safe_tx_gas);
    push_uint(&mut buf, operation.base_gas);
    push_uint(&mut buf, operation.gas_price);
    push_address(&mut buf, operation.gas_token);
    push_address(&mut buf, operation.refund_receiver);
    push_uint(&mut buf, U256::from(operation.slot));
    Ok(keccak256(&buf))
}

/// Pure function of `(operation, domain)`. No I/O.
pub fn operation_hash(operation: &Operation, domain: &SigningDomain) -> Result<OperationIdentifier> {
    let struct_hash = struct_hash(operation, domain.version)?;
    let separator = domain_separator(domain);

    let mut buf = Vec::with_capacity(2 + WORD_SIZE * 2);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    Ok(OperationIdentifier::from(keccak256(&buf)))
}

/// Digest signed by personal-message signers (`eth_sign` style endorsements).
pub fn eth_signed_message_hash(identifier: &OperationIdentifier) -> B256 {
    let mut buf = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + WORD_SIZE);
    buf.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    buf.extend_from_slice(identifier.as_ref());
    keccak256(&buf)
}

fn push_uint(buf: &mut Vec<u8>, value: U256) {
    buf.extend_from_slice(&value.to_be_bytes::<32>());
}

fn push_address(buf: &mut Vec<u8>, address: Address) {
    buf.extend_from_slice(&[0u8; 12]);
    buf.extend_from_slice(address.as_slice());
}
