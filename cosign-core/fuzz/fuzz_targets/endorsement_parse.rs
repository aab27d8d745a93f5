#![no_main]

use alloy_primitives::Address;
use arbitrary::Unstructured;
use cosign_core::domain::signature::{encode_signatures, parse_endorsement, EndorsementScheme};
use cosign_core::foundation::OperationIdentifier;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(identifier) = u.arbitrary::<[u8; 32]>() else {
        return;
    };
    let Ok(claimed) = u.arbitrary::<[u8; 20]>() else {
        return;
    };
    let identifier = OperationIdentifier::new(identifier);
    let claimed = Address::from(claimed);
    let bytes = u.take_rest();

    // Parsing never panics; accepted owner-word schemes re-encode naming the same signer.
    if let Ok(parsed) = parse_endorsement(&identifier, claimed, bytes, 0) {
        assert_eq!(parsed.signer, claimed);
        let blob = encode_signatures(&[&parsed]);
        assert!(blob.len() >= 65);
        assert_eq!(blob[64], parsed.v);
        if matches!(parsed.scheme, EndorsementScheme::Contract | EndorsementScheme::ApprovedHash) {
            assert_eq!(&blob[12..32], claimed.as_slice());
        }
    }
});
