//! Ledger seam: typed calls, submission outcomes and the client trait.

pub mod circuit_breaker;
pub mod guarded;
pub mod memory;
pub mod retry;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use guarded::GuardedLedger;
pub use memory::InMemoryLedger;
pub use retry::{RetryConfig, RetryPolicy};

use crate::domain::abi::{approvedHashesCall, execTransactionCall, getOwnersCall, getThresholdCall, nonceCall};
use crate::domain::{AccountPolicy, Operation};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    ExecTransaction { operation: Operation, signatures: Bytes },
    GetOwners,
    GetThreshold,
    Nonce,
    ApprovedHashes { owner: Address, identifier: OperationIdentifier },
}

impl LedgerCall {
    pub fn method(&self) -> &'static str {
        match self {
            LedgerCall::ExecTransaction { .. } => "execTransaction",
            LedgerCall::GetOwners => "getOwners",
            LedgerCall::GetThreshold => "getThreshold",
            LedgerCall::Nonce => "nonce",
            LedgerCall::ApprovedHashes { .. } => "approvedHashes",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, LedgerCall::ExecTransaction { .. })
    }

    /// ABI calldata for this call.
    pub fn encode(&self) -> Bytes {
        let encoded = match self {
            LedgerCall::ExecTransaction { operation, signatures } => execTransactionCall {
                to: operation.to,
                value: operation.value,
                data: operation.data.clone(),
                operation: operation.call_kind.as_u8(),
                safeTxGas: operation.safe_tx_gas,
                baseGas: operation.base_gas,
                gasPrice: operation.gas_price,
                gasToken: operation.gas_token,
                refundReceiver: operation.refund_receiver,
                signatures: signatures.clone(),
            }
            .abi_encode(),
            LedgerCall::GetOwners => getOwnersCall {}.abi_encode(),
            LedgerCall::GetThreshold => getThresholdCall {}.abi_encode(),
            LedgerCall::Nonce => nonceCall {}.abi_encode(),
            LedgerCall::ApprovedHashes { owner, identifier } => {
                approvedHashesCall { owner: *owner, hash: identifier.to_b256() }.abi_encode()
            }
        };
        Bytes::from(encoded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Confirmed(LedgerRef),
    Reverted { reason: String },
}

/// Which operation consumed a slot, and the ledger reference of that confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotConfirmation {
    pub identifier: OperationIdentifier,
    pub ledger_ref: LedgerRef,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Explicit gas limit, when the ledger or signer requires one.
    pub gas_limit: Option<u64>,
}

/// Capabilities a ledger declares instead of callers branching on its identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerConstraints {
    pub requires_explicit_gas: bool,
}

/// Ledger access for one or more multisig accounts.
///
/// Read results are decoded and validated here, so callers only see typed values.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn call(&self, account: Address, call: LedgerCall) -> Result<Bytes>;

    async fn submit(&self, account: Address, call: LedgerCall, options: SubmitOptions) -> Result<SubmissionOutcome>;

    /// Operation confirmed at a consumed slot, if any.
    async fn confirmed_at_slot(&self, account: Address, slot: u64) -> Result<Option<SlotConfirmation>>;

    async fn current_slot(&self, account: Address) -> Result<u64> {
        let raw = self.call(account, LedgerCall::Nonce).await?;
        let nonce = decode_word("nonce", &raw)?;
        u64::try_from(nonce).map_err(|_| CosignError::LedgerError {
            operation: "nonce".to_string(),
            details: format!("nonce {nonce} exceeds u64"),
        })
    }

    async fn account_policy(&self, account: Address) -> Result<AccountPolicy> {
        let owners_raw = self.call(account, LedgerCall::GetOwners).await?;
        let threshold_raw = self.call(account, LedgerCall::GetThreshold).await?;
        let owners = Vec::<Address>::abi_decode(&owners_raw).map_err(|err| decode_error("getOwners", err))?;
        let threshold = decode_word("getThreshold", &threshold_raw)?;
        let threshold = usize::try_from(threshold)
            .map_err(|_| CosignError::InvalidPolicy(format!("threshold {threshold} out of range")))?;
        AccountPolicy::new(owners, threshold)
    }

    async fn is_hash_approved(&self, account: Address, owner: Address, identifier: OperationIdentifier) -> Result<bool> {
        let raw = self.call(account, LedgerCall::ApprovedHashes { owner, identifier }).await?;
        Ok(decode_word("approvedHashes", &raw)? != U256::ZERO)
    }

    fn constraints(&self) -> LedgerConstraints {
        LedgerConstraints::default()
    }
}

fn decode_word(method: &str, raw: &[u8]) -> Result<U256> {
    U256::abi_decode(raw).map_err(|err| decode_error(method, err))
}

fn decode_error(method: &str, err: alloy_sol_types::Error) -> CosignError {
    CosignError::LedgerError { operation: method.to_string(), details: format!("malformed return data: {err}") }
}
