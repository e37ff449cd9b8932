//! Fuzz target for the payload codec.
//!
//! Tests that decoding arbitrary bytes is handled safely: malformed
//! input must be rejected with an error, never a panic, and anything
//! that decodes must re-encode canonically.

#![no_main]

use hush_payload::EncodedPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(payload) = EncodedPayload::decode(data) {
        // Canonical codec: whatever decodes must round-trip byte-for-byte
        let reencoded = payload.encode().unwrap();
        assert_eq!(reencoded, data);
    }
});
