//! Fuzz target for recipient projection.
//!
//! For any payload that decodes, projecting to each of its recipients
//! must succeed with exactly one box, and projecting to an absent key
//! must fail cleanly.

#![no_main]

use hush_crypto::PublicKey;
use hush_payload::EncodedPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = EncodedPayload::decode(data) {
        if payload.recipient_keys().len() == payload.recipient_boxes().len() {
            for recipient in payload.recipient_keys() {
                let projected = payload.for_recipient(recipient).unwrap();
                assert_eq!(projected.recipient_keys().len(), 1);
                assert_eq!(projected.recipient_boxes().len(), 1);
            }
        }

        let absent = PublicKey::from_bytes(&[0xEE; 32]).unwrap();
        if !payload.recipient_keys().contains(&absent) {
            assert!(payload.for_recipient(&absent).is_err());
        }
    }
});
