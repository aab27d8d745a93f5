use crate::domain::signature::ParsedSignature;
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result, ADDRESS_SIZE, MAX_OWNERS};
use crate::foundation::util::encoding::{decode_hex, strip_hex_prefix};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Call semantics requested from the account. Encoded as a single byte in the hash.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    #[default]
    Call,
    DelegateCall,
}

impl CallKind {
    pub fn as_u8(self) -> u8 {
        match self {
            CallKind::Call => 0,
            CallKind::DelegateCall => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CallKind::Call),
            1 => Some(CallKind::DelegateCall),
            _ => None,
        }
    }
}

/// Hashing rules differ across deployed account contract versions.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum ContractVersion {
    /// Before 1.0.0: `dataGas` field name, domain without chain id.
    #[serde(rename = "legacy")]
    Legacy,
    /// 1.0.0 through 1.2.x: `baseGas`, domain without chain id.
    #[serde(rename = "v1_0_to_1_2")]
    V1_0To1_2,
    /// 1.3.0 and later: domain binds the chain id.
    #[default]
    #[serde(rename = "v1_3_plus")]
    V1_3Plus,
}

impl ContractVersion {
    pub fn binds_chain_id(self) -> bool {
        matches!(self, ContractVersion::V1_3Plus)
    }
}

impl FromStr for ContractVersion {
    type Err = CosignError;

    /// Accepts either a semantic version ("1.3.0", "0.1.0") or a variant name.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => return Ok(ContractVersion::Legacy),
            "v1_0_to_1_2" => return Ok(ContractVersion::V1_0To1_2),
            "v1_3_plus" => return Ok(ContractVersion::V1_3Plus),
            _ => {}
        }
        let mut parts = s.trim().trim_start_matches('v').split('.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = parts.next().map(|p| p.parse::<u32>().ok()).unwrap_or(Some(0));
        match (major, minor) {
            (Some(0), Some(_)) => Ok(ContractVersion::Legacy),
            (Some(1), Some(minor)) if minor < 3 => Ok(ContractVersion::V1_0To1_2),
            (Some(major), Some(_)) if major >= 1 => Ok(ContractVersion::V1_3Plus),
            _ => Err(CosignError::invalid_encoding("contract_version", format!("unrecognized version '{s}'"))),
        }
    }
}

/// Context an operation identifier is bound to.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct SigningDomain {
    pub chain_id: u64,
    /// The multisig account that verifies and executes.
    pub account: Address,
    #[serde(default)]
    pub version: ContractVersion,
}

impl SigningDomain {
    pub fn new(chain_id: u64, account: Address) -> Self {
        Self { chain_id, account, version: ContractVersion::default() }
    }

    pub fn with_version(mut self, version: ContractVersion) -> Self {
        self.version = version;
        self
    }
}

/// A proposed call bound to an ordering slot (the account nonce).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Operation {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub call_kind: CallKind,
    #[serde(default)]
    pub safe_tx_gas: U256,
    #[serde(default)]
    pub base_gas: U256,
    #[serde(default)]
    pub gas_price: U256,
    #[serde(default)]
    pub gas_token: Address,
    #[serde(default)]
    pub refund_receiver: Address,
    pub slot: u64,
}

impl Operation {
    /// Plain call with zeroed gas and refund parameters.
    pub fn call(to: Address, value: U256, data: impl Into<Bytes>, slot: u64) -> Self {
        Self {
            to,
            value,
            data: data.into(),
            call_kind: CallKind::Call,
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            slot,
        }
    }

    /// The no-op self call that consumes `slot` without side effects.
    pub fn counter_operation(account: Address, slot: u64) -> Self {
        Self::call(account, U256::ZERO, Bytes::new(), slot)
    }

    pub fn is_counter_operation_for(&self, account: Address) -> bool {
        self == &Self::counter_operation(account, self.slot)
    }
}

/// Untrusted operation as received from callers, before width checks.
///
/// Numeric fields accept decimal or `0x`-prefixed hex.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RawOperation {
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub operation: u8,
    #[serde(default)]
    pub safe_tx_gas: Option<String>,
    #[serde(default)]
    pub base_gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub gas_token: Option<String>,
    #[serde(default)]
    pub refund_receiver: Option<String>,
    pub slot: u64,
}

impl TryFrom<RawOperation> for Operation {
    type Error = CosignError;

    fn try_from(raw: RawOperation) -> Result<Self> {
        let call_kind = CallKind::from_u8(raw.operation)
            .ok_or_else(|| CosignError::invalid_encoding("operation", format!("call kind {} is not 0 or 1", raw.operation)))?;
        Ok(Self {
            to: parse_address("to", &raw.to)?,
            value: parse_word("value", &raw.value)?,
            data: Bytes::from(decode_hex(&raw.data).map_err(|err| CosignError::invalid_encoding("data", err.to_string()))?),
            call_kind,
            safe_tx_gas: parse_optional_word("safe_tx_gas", raw.safe_tx_gas.as_deref())?,
            base_gas: parse_optional_word("base_gas", raw.base_gas.as_deref())?,
            gas_price: parse_optional_word("gas_price", raw.gas_price.as_deref())?,
            gas_token: parse_optional_address("gas_token", raw.gas_token.as_deref())?,
            refund_receiver: parse_optional_address("refund_receiver", raw.refund_receiver.as_deref())?,
            slot: raw.slot,
        })
    }
}

pub fn parse_address(field: &str, value: &str) -> Result<Address> {
    let bytes = decode_hex(value).map_err(|err| CosignError::invalid_encoding(field, err.to_string()))?;
    if bytes.len() != ADDRESS_SIZE {
        return Err(CosignError::invalid_encoding(
            field,
            format!("expected {} bytes, got {}", ADDRESS_SIZE, bytes.len()),
        ));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_optional_address(field: &str, value: Option<&str>) -> Result<Address> {
    match value {
        None => Ok(Address::ZERO),
        Some(v) if v.trim().is_empty() => Ok(Address::ZERO),
        Some(v) => parse_address(field, v),
    }
}

fn parse_word(field: &str, value: &str) -> Result<U256> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        let digits = strip_hex_prefix(trimmed);
        if digits.len() > 64 {
            return Err(CosignError::invalid_encoding(field, "value exceeds 256 bits"));
        }
        return U256::from_str_radix(digits, 16).map_err(|err| CosignError::invalid_encoding(field, err.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|err| CosignError::invalid_encoding(field, err.to_string()))
}

fn parse_optional_word(field: &str, value: Option<&str>) -> Result<U256> {
    value.map(|v| parse_word(field, v)).transpose().map(|v| v.unwrap_or(U256::ZERO))
}

/// Owners and approval threshold as read from the ledger.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountPolicy {
    owners: Vec<Address>,
    threshold: usize,
}

impl AccountPolicy {
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self> {
        let unique: BTreeSet<Address> = owners.iter().copied().collect();
        if owners.is_empty() {
            return Err(CosignError::InvalidPolicy("owner set is empty".to_string()));
        }
        if unique.len() != owners.len() {
            return Err(CosignError::InvalidPolicy("owner set contains duplicates".to_string()));
        }
        if owners.len() > MAX_OWNERS {
            return Err(CosignError::InvalidPolicy(format!("owner set exceeds {} entries", MAX_OWNERS)));
        }
        if owners.contains(&Address::ZERO) || owners.contains(&crate::domain::policy_change::SENTINEL_OWNER) {
            return Err(CosignError::InvalidPolicy("owner set contains a reserved address".to_string()));
        }
        if threshold == 0 || threshold > owners.len() {
            return Err(CosignError::InvalidPolicy(format!(
                "threshold {} outside 1..={}",
                threshold,
                owners.len()
            )));
        }
        Ok(Self { owners, threshold })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }
}

impl fmt::Display for AccountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-of-{}", self.threshold, self.owners.len())
    }
}

/// A signer's claimed approval of an operation identifier.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Endorsement {
    pub identifier: OperationIdentifier,
    pub signer: Address,
    pub signature: Bytes,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKind {
    Proposal,
    /// Counter-operation proposed to consume the slot of `target`.
    Neutralizing { target: OperationIdentifier },
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    #[default]
    Pending,
    Executed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Pending => f.write_str("pending"),
            RecordState::Executed => f.write_str("executed"),
        }
    }
}

/// An operation tracked by the pool together with its endorsements.
///
/// Endorsements are keyed by signer, so iteration yields ascending addresses.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PendingRecord {
    pub identifier: OperationIdentifier,
    pub domain: SigningDomain,
    pub operation: Operation,
    pub proposer: Address,
    pub kind: RecordKind,
    pub state: RecordState,
    pub endorsements: BTreeMap<Address, ParsedSignature>,
    pub created_at_nanos: u64,
    pub executed_at_nanos: Option<u64>,
    pub ledger_ref: Option<LedgerRef>,
}

impl PendingRecord {
    pub fn new(
        identifier: OperationIdentifier,
        domain: SigningDomain,
        operation: Operation,
        proposer: Address,
        kind: RecordKind,
        now_nanos: u64,
    ) -> Self {
        Self {
            identifier,
            domain,
            operation,
            proposer,
            kind,
            state: RecordState::Pending,
            endorsements: BTreeMap::new(),
            created_at_nanos: now_nanos,
            executed_at_nanos: None,
            ledger_ref: None,
        }
    }

    pub fn account(&self) -> Address {
        self.domain.account
    }

    pub fn slot(&self) -> u64 {
        self.operation.slot
    }

    pub fn is_executed(&self) -> bool {
        self.state == RecordState::Executed
    }

    pub fn signers(&self) -> impl Iterator<Item = &Address> {
        self.endorsements.keys()
    }

    pub fn has_signed(&self, signer: &Address) -> bool {
        self.endorsements.contains_key(signer)
    }
}
