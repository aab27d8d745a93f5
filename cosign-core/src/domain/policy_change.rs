//! Self-targeted operations that change the owner set or threshold.
//!
//! Owners form a linked list on the ledger; removal and swap name the predecessor,
//! with [`SENTINEL_OWNER`] standing in front of the first owner.

use crate::domain::abi::{addOwnerWithThresholdCall, changeThresholdCall, removeOwnerCall, swapOwnerCall};
use crate::domain::{AccountPolicy, Operation};
use crate::foundation::{CosignError, Result};
use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::SolCall;

pub const SENTINEL_OWNER: Address = address!("0x0000000000000000000000000000000000000001");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyChange {
    AddOwner { owner: Address, threshold: usize },
    RemoveOwner { prev_owner: Address, owner: Address, threshold: usize },
    SwapOwner { prev_owner: Address, old_owner: Address, new_owner: Address },
    ChangeThreshold { threshold: usize },
}

impl PolicyChange {
    pub fn encode(&self) -> Bytes {
        let encoded = match self {
            PolicyChange::AddOwner { owner, threshold } => {
                addOwnerWithThresholdCall { owner: *owner, _threshold: U256::from(*threshold) }.abi_encode()
            }
            PolicyChange::RemoveOwner { prev_owner, owner, threshold } => {
                removeOwnerCall { prevOwner: *prev_owner, owner: *owner, _threshold: U256::from(*threshold) }.abi_encode()
            }
            PolicyChange::SwapOwner { prev_owner, old_owner, new_owner } => {
                swapOwnerCall { prevOwner: *prev_owner, oldOwner: *old_owner, newOwner: *new_owner }.abi_encode()
            }
            PolicyChange::ChangeThreshold { threshold } => {
                changeThresholdCall { _threshold: U256::from(*threshold) }.abi_encode()
            }
        };
        Bytes::from(encoded)
    }

    /// `Ok(None)` when `data` is not an owner-management call.
    pub fn decode(data: &[u8]) -> Result<Option<Self>> {
        if data.len() < 4 {
            return Ok(None);
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
        let change = if selector == addOwnerWithThresholdCall::SELECTOR {
            let call = addOwnerWithThresholdCall::abi_decode(data).map_err(abi_error)?;
            PolicyChange::AddOwner { owner: call.owner, threshold: word_to_usize(call._threshold)? }
        } else if selector == removeOwnerCall::SELECTOR {
            let call = removeOwnerCall::abi_decode(data).map_err(abi_error)?;
            PolicyChange::RemoveOwner { prev_owner: call.prevOwner, owner: call.owner, threshold: word_to_usize(call._threshold)? }
        } else if selector == swapOwnerCall::SELECTOR {
            let call = swapOwnerCall::abi_decode(data).map_err(abi_error)?;
            PolicyChange::SwapOwner { prev_owner: call.prevOwner, old_owner: call.oldOwner, new_owner: call.newOwner }
        } else if selector == changeThresholdCall::SELECTOR {
            let call = changeThresholdCall::abi_decode(data).map_err(abi_error)?;
            PolicyChange::ChangeThreshold { threshold: word_to_usize(call._threshold)? }
        } else {
            return Ok(None);
        };
        Ok(Some(change))
    }

    /// Policy after this change, with the same checks the account contract performs.
    pub fn apply(&self, policy: &AccountPolicy) -> Result<AccountPolicy> {
        let mut owners = policy.owners().to_vec();
        let threshold = match self {
            PolicyChange::AddOwner { owner, threshold } => {
                ensure_new_owner(policy, *owner)?;
                owners.insert(0, *owner);
                *threshold
            }
            PolicyChange::RemoveOwner { prev_owner, owner, threshold } => {
                let index = owner_index(policy, *owner)?;
                ensure_predecessor(policy, index, *prev_owner)?;
                owners.remove(index);
                *threshold
            }
            PolicyChange::SwapOwner { prev_owner, old_owner, new_owner } => {
                let index = owner_index(policy, *old_owner)?;
                ensure_predecessor(policy, index, *prev_owner)?;
                ensure_new_owner(policy, *new_owner)?;
                owners[index] = *new_owner;
                policy.threshold()
            }
            PolicyChange::ChangeThreshold { threshold } => *threshold,
        };
        AccountPolicy::new(owners, threshold)
    }
}

/// Linked-list predecessor of `owner` in ledger order.
pub fn prev_owner(policy: &AccountPolicy, owner: Address) -> Result<Address> {
    let index = owner_index(policy, owner)?;
    Ok(if index == 0 { SENTINEL_OWNER } else { policy.owners()[index - 1] })
}

pub fn add_owner_with_threshold(
    policy: &AccountPolicy,
    account: Address,
    owner: Address,
    threshold: usize,
    slot: u64,
) -> Result<Operation> {
    let change = PolicyChange::AddOwner { owner, threshold };
    build(policy, account, change, slot)
}

pub fn remove_owner(policy: &AccountPolicy, account: Address, owner: Address, threshold: usize, slot: u64) -> Result<Operation> {
    let change = PolicyChange::RemoveOwner { prev_owner: prev_owner(policy, owner)?, owner, threshold };
    build(policy, account, change, slot)
}

pub fn swap_owner(policy: &AccountPolicy, account: Address, old_owner: Address, new_owner: Address, slot: u64) -> Result<Operation> {
    let change = PolicyChange::SwapOwner { prev_owner: prev_owner(policy, old_owner)?, old_owner, new_owner };
    build(policy, account, change, slot)
}

pub fn change_threshold(policy: &AccountPolicy, account: Address, threshold: usize, slot: u64) -> Result<Operation> {
    build(policy, account, PolicyChange::ChangeThreshold { threshold }, slot)
}

fn build(policy: &AccountPolicy, account: Address, change: PolicyChange, slot: u64) -> Result<Operation> {
    if let PolicyChange::AddOwner { owner, .. } | PolicyChange::SwapOwner { new_owner: owner, .. } = &change {
        if *owner == account {
            return Err(CosignError::InvalidPolicy("account cannot own itself".to_string()));
        }
    }
    change.apply(policy)?;
    Ok(Operation::call(account, U256::ZERO, change.encode(), slot))
}

fn owner_index(policy: &AccountPolicy, owner: Address) -> Result<usize> {
    policy
        .owners()
        .iter()
        .position(|candidate| *candidate == owner)
        .ok_or_else(|| CosignError::NotCurrentOwner { address: owner.to_string() })
}

fn ensure_predecessor(policy: &AccountPolicy, index: usize, prev_owner: Address) -> Result<()> {
    let expected = if index == 0 { SENTINEL_OWNER } else { policy.owners()[index - 1] };
    if expected != prev_owner {
        return Err(CosignError::InvalidPolicy(format!("invalid prevOwner {prev_owner}, expected {expected}")));
    }
    Ok(())
}

fn ensure_new_owner(policy: &AccountPolicy, owner: Address) -> Result<()> {
    if owner == Address::ZERO || owner == SENTINEL_OWNER {
        return Err(CosignError::InvalidPolicy(format!("{owner} is a reserved address")));
    }
    if policy.is_owner(&owner) {
        return Err(CosignError::InvalidPolicy(format!("{owner} is already an owner")));
    }
    Ok(())
}

fn word_to_usize(value: U256) -> Result<usize> {
    usize::try_from(value).map_err(|_| CosignError::InvalidPolicy(format!("threshold {value} out of range")))
}

fn abi_error(err: alloy_sol_types::Error) -> CosignError {
    CosignError::invalid_encoding("policy_change", err.to_string())
}
