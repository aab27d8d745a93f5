use crate::fixtures::{account, domain, recipient, reference_operation, transfer, TEST_REFERENCE_IDENTIFIER};
use alloy_primitives::{Address, Bytes, U256};
use cosign_core::domain::hashes::{domain_separator, operation_hash};
use cosign_core::domain::{CallKind, ContractVersion, Operation, SigningDomain};
use cosign_core::foundation::{CosignError, OperationIdentifier, MAX_CALL_PAYLOAD_BYTES};
use std::collections::HashSet;

#[test]
fn reference_transfer_matches_pinned_identifier() {
    let id = operation_hash(&reference_operation(), &domain()).expect("hash");
    assert_eq!(id.to_string(), TEST_REFERENCE_IDENTIFIER);
    let parsed: OperationIdentifier = TEST_REFERENCE_IDENTIFIER.parse().expect("identifier");
    assert_eq!(id, parsed);
}

#[test]
fn identical_inputs_hash_identically() {
    let first = operation_hash(&reference_operation(), &domain()).expect("hash");
    for _ in 0..10 {
        assert_eq!(operation_hash(&reference_operation(), &domain()).expect("hash"), first);
    }
}

#[test]
fn every_single_field_change_moves_the_identifier() {
    let base = reference_operation();
    let mut variants: Vec<(&str, Operation, SigningDomain)> = Vec::new();
    let mut push = |name: &'static str, mutate: fn(&mut Operation)| {
        let mut op = base.clone();
        mutate(&mut op);
        variants.push((name, op, domain()));
    };
    push("to", |op| op.to = Address::repeat_byte(0x23));
    push("value", |op| op.value += U256::from(1u8));
    push("data", |op| op.data = Bytes::from(vec![0xde, 0xad, 0xbe, 0xee]));
    push("call_kind", |op| op.call_kind = CallKind::DelegateCall);
    push("safe_tx_gas", |op| op.safe_tx_gas = U256::from(1u8));
    push("base_gas", |op| op.base_gas = U256::from(1u8));
    push("gas_price", |op| op.gas_price = U256::from(1u8));
    push("gas_token", |op| op.gas_token = Address::repeat_byte(0x01));
    push("refund_receiver", |op| op.refund_receiver = Address::repeat_byte(0x01));
    push("slot", |op| op.slot += 1);
    variants.push(("chain_id", base.clone(), SigningDomain::new(5, account())));
    variants.push(("account", base.clone(), SigningDomain::new(1, Address::repeat_byte(0x12))));
    variants.push(("version", base.clone(), domain().with_version(ContractVersion::V1_0To1_2)));

    let base_id = operation_hash(&base, &domain()).expect("hash");
    let mut seen = HashSet::new();
    seen.insert(base_id);
    for (name, op, variant_domain) in variants {
        let id = operation_hash(&op, &variant_domain).expect("hash");
        assert!(seen.insert(id), "changing {name} did not produce a fresh identifier");
    }
}

#[test]
fn pre_1_3_domains_ignore_chain_id() {
    let op = transfer(0);
    for version in [ContractVersion::Legacy, ContractVersion::V1_0To1_2] {
        let mainnet = SigningDomain::new(1, account()).with_version(version);
        let other = SigningDomain::new(100, account()).with_version(version);
        assert_eq!(domain_separator(&mainnet), domain_separator(&other));
        assert_eq!(operation_hash(&op, &mainnet).expect("hash"), operation_hash(&op, &other).expect("hash"));
    }

    let legacy = operation_hash(&op, &domain().with_version(ContractVersion::Legacy)).expect("hash");
    let v1_0 = operation_hash(&op, &domain().with_version(ContractVersion::V1_0To1_2)).expect("hash");
    assert_ne!(legacy, v1_0, "legacy type string names dataGas, not baseGas");
}

#[test]
fn payload_limit_is_enforced_at_hashing() {
    let at_limit = Operation::call(recipient(), U256::ZERO, Bytes::from(vec![0u8; MAX_CALL_PAYLOAD_BYTES]), 0);
    assert!(operation_hash(&at_limit, &domain()).is_ok());

    let over = Operation::call(recipient(), U256::ZERO, Bytes::from(vec![0u8; MAX_CALL_PAYLOAD_BYTES + 1]), 0);
    let err = operation_hash(&over, &domain()).unwrap_err();
    assert!(matches!(err, CosignError::InvalidEncoding { ref field, .. } if field == "data"));
}

#[test]
fn counter_operation_hashes_apart_from_the_original() {
    let original = transfer(7);
    let counter = Operation::counter_operation(account(), 7);
    assert!(counter.is_counter_operation_for(account()));
    assert!(!original.is_counter_operation_for(account()));
    assert_ne!(operation_hash(&original, &domain()).expect("hash"), operation_hash(&counter, &domain()).expect("hash"));
}
