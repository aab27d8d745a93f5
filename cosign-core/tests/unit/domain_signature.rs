use crate::fixtures::{approved_hash_signature, contract_signature, owner_signers, signer};
use alloy_primitives::{Address, B256, U256};
use cosign_core::domain::hashes::eth_signed_message_hash;
use cosign_core::domain::signature::{encode_signatures, parse_endorsement, EndorsementScheme, ParsedSignature};
use cosign_core::foundation::{CosignError, OperationIdentifier, SIGNATURE_STATIC_PART_LEN, WORD_SIZE};
use cosign_core::infrastructure::signer::SignerTransport;

fn identifier() -> OperationIdentifier {
    OperationIdentifier::new([0x42; 32])
}

fn owner_word(owner: Address) -> B256 {
    B256::left_padding_from(owner.as_slice())
}

fn contract_bytes(owner: Address, payload: &[u8]) -> Vec<u8> {
    contract_signature(owner, payload).to_vec()
}

fn approved_bytes(owner: Address) -> Vec<u8> {
    approved_hash_signature(owner).to_vec()
}

fn word_at(blob: &[u8], offset: usize) -> U256 {
    U256::from_be_slice(&blob[offset..offset + WORD_SIZE])
}

#[test]
fn every_scheme_parses_to_its_claimed_signer() {
    let ecdsa = signer(0x01);
    let eth_sign = signer(0x02).with_scheme(EndorsementScheme::EthSign).expect("eth_sign scheme");
    let contract_owner = Address::repeat_byte(0x0c);
    let approving_owner = Address::repeat_byte(0x0a);

    let cases = [
        (ecdsa.address(), ecdsa.sign_identifier(&identifier()).expect("sign").to_vec(), EndorsementScheme::Ecdsa),
        (eth_sign.address(), eth_sign.sign_identifier(&identifier()).expect("sign").to_vec(), EndorsementScheme::EthSign),
        (contract_owner, contract_bytes(contract_owner, b"proof"), EndorsementScheme::Contract),
        (approving_owner, approved_bytes(approving_owner), EndorsementScheme::ApprovedHash),
    ];
    for (claimed, bytes, scheme) in cases {
        let parsed = parse_endorsement(&identifier(), claimed, &bytes, 7).expect("valid endorsement");
        assert_eq!(parsed.signer, claimed);
        assert_eq!(parsed.scheme, scheme);
        assert_eq!(parsed.received_at_nanos, 7);
    }
}

#[test]
fn eth_sign_digest_differs_from_identifier() {
    assert_ne!(eth_signed_message_hash(&identifier()), identifier().to_b256());
}

#[test]
fn malformed_endorsements_are_rejected() {
    let owner = signer(0x01);
    let good = owner.sign_identifier(&identifier()).expect("sign").to_vec();

    let mut bad_v = good.clone();
    bad_v[64] = 29;
    assert!(matches!(parse_endorsement(&identifier(), owner.address(), &bad_v, 0), Err(CosignError::MalformedSignature { .. })));

    let mut trailing = good.clone();
    trailing.push(0);
    assert!(matches!(
        parse_endorsement(&identifier(), owner.address(), &trailing, 0),
        Err(CosignError::MalformedSignature { .. })
    ));

    let other = OperationIdentifier::new([0x43; 32]);
    assert!(matches!(parse_endorsement(&other, owner.address(), &good, 0), Err(CosignError::SignerMismatch { .. })));

    let contract_owner = Address::repeat_byte(0x0c);
    let mut short_payload = contract_bytes(contract_owner, b"proof");
    short_payload.pop();
    assert!(matches!(
        parse_endorsement(&identifier(), contract_owner, &short_payload, 0),
        Err(CosignError::MalformedSignature { .. })
    ));

    let mut dirty_word = approved_bytes(contract_owner);
    dirty_word[0] = 0xff;
    assert!(matches!(
        parse_endorsement(&identifier(), contract_owner, &dirty_word, 0),
        Err(CosignError::MalformedSignature { .. })
    ));

    let mut approved_with_tail = approved_bytes(contract_owner);
    approved_with_tail.extend_from_slice(&[0u8; 32]);
    assert!(parse_endorsement(&identifier(), contract_owner, &approved_with_tail, 0).is_err());
}

#[test]
fn combined_blob_keeps_order_and_points_at_dynamic_parts() {
    let first_owner = Address::repeat_byte(0x03);
    let second_owner = Address::repeat_byte(0x04);
    let ecdsa = owner_signers(1).remove(0);

    let first = parse_endorsement(&identifier(), first_owner, &contract_bytes(first_owner, b"abc"), 0).expect("contract");
    let second = parse_endorsement(&identifier(), second_owner, &contract_bytes(second_owner, b"defgh"), 0).expect("contract");
    let third = parse_endorsement(&identifier(), ecdsa.address(), &ecdsa.sign_identifier(&identifier()).expect("sign"), 0)
        .expect("ecdsa");

    let blob = encode_signatures(&[&first, &second, &third]);
    let static_len = 3 * SIGNATURE_STATIC_PART_LEN;
    assert_eq!(blob.len(), static_len + (WORD_SIZE + 3) + (WORD_SIZE + 5));

    let first_offset = static_len;
    let second_offset = static_len + WORD_SIZE + 3;
    assert_eq!(&blob[12..32], first_owner.as_slice());
    assert_eq!(word_at(&blob, 32), U256::from(first_offset));
    assert_eq!(blob[64], 0);
    assert_eq!(word_at(&blob, SIGNATURE_STATIC_PART_LEN + 32), U256::from(second_offset));

    assert_eq!(word_at(&blob, first_offset), U256::from(3u8));
    assert_eq!(&blob[first_offset + WORD_SIZE..first_offset + WORD_SIZE + 3], b"abc");
    assert_eq!(word_at(&blob, second_offset), U256::from(5u8));
    assert_eq!(&blob[second_offset + WORD_SIZE..], b"defgh");

    let third_static = &blob[2 * SIGNATURE_STATIC_PART_LEN..static_len];
    assert_eq!(&third_static[..32], third.r.as_slice());
    assert_eq!(&third_static[32..64], third.s.as_slice());
    assert_eq!(third_static[64], third.v);
}

#[test]
fn approved_hash_static_part_carries_only_the_owner() {
    let owner = Address::repeat_byte(0x0a);
    let parsed: ParsedSignature = parse_endorsement(&identifier(), owner, &approved_bytes(owner), 0).expect("approved");
    let blob = encode_signatures(&[&parsed]);
    assert_eq!(blob.len(), SIGNATURE_STATIC_PART_LEN);
    assert_eq!(&blob[..32], owner_word(owner).as_slice());
    assert!(blob[32..64].iter().all(|b| *b == 0));
    assert_eq!(blob[64], 1);
}
