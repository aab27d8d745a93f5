use crate::domain::hashes::{eth_signed_message_hash, operation_hash};
use crate::domain::policy_change::PolicyChange;
use crate::domain::signature::recover_address;
use crate::domain::{AccountPolicy, SigningDomain};
use crate::foundation::{CosignError, LedgerRef, OperationIdentifier, Result, SIGNATURE_STATIC_PART_LEN, WORD_SIZE};
use crate::infrastructure::ledger::{
    LedgerCall, LedgerClient, LedgerConstraints, SlotConfirmation, SubmissionOutcome, SubmitOptions,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Validator standing in for an owner contract's signature check.
pub type ContractValidator = Arc<dyn Fn(&OperationIdentifier, &[u8]) -> bool + Send + Sync>;

struct AccountState {
    domain: SigningDomain,
    policy: AccountPolicy,
    nonce: u64,
    confirmed: BTreeMap<u64, SlotConfirmation>,
    approved: HashSet<(Address, OperationIdentifier)>,
}

/// Deterministic ledger double that enforces the account contract's execution rules:
/// one confirmation per slot, ascending distinct current-owner signatures, and
/// owner-management calls applied on execution.
pub struct InMemoryLedger {
    accounts: parking_lot::Mutex<HashMap<Address, AccountState>>,
    contract_signers: parking_lot::RwLock<HashMap<Address, ContractValidator>>,
    constraints: parking_lot::RwLock<LedgerConstraints>,
    fail_next: AtomicU32,
    latency_ms: AtomicU64,
    submissions: AtomicU64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: parking_lot::Mutex::new(HashMap::new()),
            contract_signers: parking_lot::RwLock::new(HashMap::new()),
            constraints: parking_lot::RwLock::new(LedgerConstraints::default()),
            fail_next: AtomicU32::new(0),
            latency_ms: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
        }
    }

    pub fn register_account(&self, domain: SigningDomain, policy: AccountPolicy) {
        let state = AccountState { domain, policy, nonce: 0, confirmed: BTreeMap::new(), approved: HashSet::new() };
        self.accounts.lock().insert(domain.account, state);
    }

    pub fn register_contract_signer(
        &self,
        owner: Address,
        validator: impl Fn(&OperationIdentifier, &[u8]) -> bool + Send + Sync + 'static,
    ) {
        self.contract_signers.write().insert(owner, Arc::new(validator));
    }

    /// On-ledger pre-approval of `identifier` by `owner`.
    pub fn approve_hash(&self, account: Address, owner: Address, identifier: OperationIdentifier) -> Result<()> {
        let mut accounts = self.accounts.lock();
        let state = accounts.get_mut(&account).ok_or_else(|| unknown_account(account))?;
        if !state.policy.is_owner(&owner) {
            return Err(CosignError::NotCurrentOwner { address: owner.to_string() });
        }
        state.approved.insert((owner, identifier));
        Ok(())
    }

    pub fn set_constraints(&self, constraints: LedgerConstraints) {
        *self.constraints.write() = constraints;
    }

    /// The next `count` calls fail with a transient `LedgerUnavailable`.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn policy(&self, account: Address) -> Option<AccountPolicy> {
        self.accounts.lock().get(&account).map(|state| state.policy.clone())
    }

    pub fn nonce(&self, account: Address) -> Option<u64> {
        self.accounts.lock().get(&account).map(|state| state.nonce)
    }

    async fn before_request(&self, method: &str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let injected = self.fail_next.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if injected {
            return Err(CosignError::ledger_unavailable(method, "injected failure"));
        }
        Ok(())
    }

    fn read(&self, account: Address, call: &LedgerCall) -> Result<Bytes> {
        let accounts = self.accounts.lock();
        let state = accounts.get(&account).ok_or_else(|| unknown_account(account))?;
        let encoded = match call {
            LedgerCall::GetOwners => state.policy.owners().to_vec().abi_encode(),
            LedgerCall::GetThreshold => U256::from(state.policy.threshold()).abi_encode(),
            LedgerCall::Nonce => U256::from(state.nonce).abi_encode(),
            LedgerCall::ApprovedHashes { owner, identifier } => {
                U256::from(u8::from(state.approved.contains(&(*owner, *identifier)))).abi_encode()
            }
            LedgerCall::ExecTransaction { .. } => {
                return Err(CosignError::InvalidOperation("execTransaction must be submitted, not called".to_string()))
            }
        };
        Ok(Bytes::from(encoded))
    }

    fn execute(&self, account: Address, call: LedgerCall, options: SubmitOptions) -> Result<SubmissionOutcome> {
        let (operation, signatures) = match call {
            LedgerCall::ExecTransaction { operation, signatures } => (operation, signatures),
            other => return Err(CosignError::InvalidOperation(format!("{} is not a write call", other.method()))),
        };
        if self.constraints.read().requires_explicit_gas && options.gas_limit.is_none() {
            return Ok(SubmissionOutcome::Reverted { reason: "out of gas: explicit gas limit required".to_string() });
        }

        let contract_signers = self.contract_signers.read();
        let mut accounts = self.accounts.lock();
        let state = accounts.get_mut(&account).ok_or_else(|| unknown_account(account))?;

        // The contract hashes with its own nonce; a stale slot yields signatures over another digest.
        let mut at_nonce = operation.clone();
        at_nonce.slot = state.nonce;
        let identifier = operation_hash(&at_nonce, &state.domain)?;

        if let Err(reason) = check_signatures(state, &contract_signers, &identifier, &signatures) {
            return Ok(SubmissionOutcome::Reverted { reason });
        }

        let next_policy = match (operation.to == account).then(|| PolicyChange::decode(&operation.data)) {
            Some(Ok(Some(change))) => match change.apply(&state.policy) {
                Ok(policy) => Some(policy),
                Err(err) => return Ok(SubmissionOutcome::Reverted { reason: format!("GS013: {err}") }),
            },
            Some(Err(err)) => return Ok(SubmissionOutcome::Reverted { reason: format!("GS013: {err}") }),
            Some(Ok(None)) | None => None,
        };

        let slot = state.nonce;
        let mut preimage = Vec::with_capacity(20 + 8 + 32);
        preimage.extend_from_slice(account.as_slice());
        preimage.extend_from_slice(&slot.to_be_bytes());
        preimage.extend_from_slice(identifier.as_ref());
        let ledger_ref = LedgerRef::from(keccak256(&preimage));

        state.nonce += 1;
        state.confirmed.insert(slot, SlotConfirmation { identifier, ledger_ref });
        if let Some(policy) = next_policy {
            debug!("ledger applied policy change account={} policy={}", account, policy);
            state.policy = policy;
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(SubmissionOutcome::Confirmed(ledger_ref))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_account(account: Address) -> CosignError {
    CosignError::LedgerError { operation: "account".to_string(), details: format!("unknown account {account}") }
}

fn check_signatures(
    state: &AccountState,
    contract_signers: &HashMap<Address, ContractValidator>,
    identifier: &OperationIdentifier,
    blob: &[u8],
) -> std::result::Result<(), String> {
    let threshold = state.policy.threshold();
    let static_len = threshold * SIGNATURE_STATIC_PART_LEN;
    if blob.len() < static_len {
        return Err("GS020: signatures data too short".to_string());
    }

    let mut last_owner = Address::ZERO;
    for part in blob[..static_len].chunks_exact(SIGNATURE_STATIC_PART_LEN) {
        let r = B256::from_slice(&part[0..32]);
        let v = part[64];
        let owner_word = Address::from_slice(&r[12..]);
        let owner = match v {
            0 => {
                let offset = usize::try_from(U256::from_be_slice(&part[32..64])).map_err(|_| "GS021".to_string())?;
                if offset < static_len {
                    return Err("GS021: invalid contract signature location".to_string());
                }
                let len_end = offset.checked_add(WORD_SIZE).filter(|end| *end <= blob.len()).ok_or("GS022")?;
                let len = usize::try_from(U256::from_be_slice(&blob[offset..len_end])).map_err(|_| "GS023".to_string())?;
                let data_end = len_end.checked_add(len).filter(|end| *end <= blob.len()).ok_or("GS023")?;
                let valid = contract_signers
                    .get(&owner_word)
                    .map(|validator| validator(identifier, &blob[len_end..data_end]))
                    .unwrap_or(false);
                if !valid {
                    return Err("GS024: invalid contract signature provided".to_string());
                }
                owner_word
            }
            1 => {
                if !state.approved.contains(&(owner_word, *identifier)) {
                    return Err("GS025: hash has not been approved".to_string());
                }
                owner_word
            }
            31 | 32 => recover_address(&eth_signed_message_hash(identifier), &part[..64], v - 31)
                .map_err(|_| "GS026: invalid owner provided".to_string())?,
            27 | 28 => recover_address(&identifier.to_b256(), &part[..64], v - 27)
                .map_err(|_| "GS026: invalid owner provided".to_string())?,
            _ => return Err("GS026: invalid owner provided".to_string()),
        };
        if owner <= last_owner || !state.policy.is_owner(&owner) {
            return Err("GS026: invalid owner provided".to_string());
        }
        last_owner = owner;
    }
    Ok(())
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn call(&self, account: Address, call: LedgerCall) -> Result<Bytes> {
        self.before_request(call.method()).await?;
        self.read(account, &call)
    }

    async fn submit(&self, account: Address, call: LedgerCall, options: SubmitOptions) -> Result<SubmissionOutcome> {
        self.before_request(call.method()).await?;
        self.execute(account, call, options)
    }

    async fn confirmed_at_slot(&self, account: Address, slot: u64) -> Result<Option<SlotConfirmation>> {
        self.before_request("confirmed_at_slot").await?;
        let accounts = self.accounts.lock();
        let state = accounts.get(&account).ok_or_else(|| unknown_account(account))?;
        Ok(state.confirmed.get(&slot).copied())
    }

    fn constraints(&self) -> LedgerConstraints {
        *self.constraints.read()
    }
}
