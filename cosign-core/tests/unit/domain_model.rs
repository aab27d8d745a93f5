use crate::fixtures::recipient;
use alloy_primitives::U256;
use cosign_core::domain::{AccountPolicy, CallKind, Operation, RawOperation};
use cosign_core::foundation::CosignError;

fn raw(value: &str) -> RawOperation {
    RawOperation { to: recipient().to_string(), value: value.to_string(), data: "0xdeadbeef".to_string(), slot: 5, ..Default::default() }
}

#[test]
fn raw_operation_accepts_decimal_and_hex_words() {
    let decimal = Operation::try_from(raw("1000000000000000000")).expect("decimal");
    let hex = Operation::try_from(raw("0xde0b6b3a7640000")).expect("hex");
    assert_eq!(decimal, hex);
    assert_eq!(decimal.value, U256::from(1_000_000_000_000_000_000u64));
    assert_eq!(&decimal.data[..], &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(decimal.call_kind, CallKind::Call);
    assert_eq!(decimal.to, recipient());
}

#[test]
fn raw_operation_rejects_bad_fields() {
    let too_wide = format!("0x1{}", "0".repeat(64));
    assert!(matches!(Operation::try_from(raw(&too_wide)), Err(CosignError::InvalidEncoding { ref field, .. }) if field == "value"));

    let mut bad_kind = raw("0");
    bad_kind.operation = 2;
    assert!(matches!(Operation::try_from(bad_kind), Err(CosignError::InvalidEncoding { ref field, .. }) if field == "operation"));

    let mut bad_data = raw("0");
    bad_data.data = "0xabc".to_string();
    assert!(Operation::try_from(bad_data).is_err());
}

#[test]
fn policy_validation() {
    let a = alloy_primitives::Address::repeat_byte(0xa1);
    let b = alloy_primitives::Address::repeat_byte(0xa2);
    assert!(AccountPolicy::new(vec![], 1).is_err());
    assert!(AccountPolicy::new(vec![a, a], 1).is_err());
    assert!(AccountPolicy::new(vec![a, b], 0).is_err());
    assert!(AccountPolicy::new(vec![a, b], 3).is_err());
    assert!(AccountPolicy::new(vec![alloy_primitives::Address::ZERO], 1).is_err());
    let policy = AccountPolicy::new(vec![a, b], 2).expect("policy");
    assert_eq!(policy.to_string(), "2-of-2");
}
