//! Fuzz target for hash parsing at the API boundary.
//!
//! Arbitrary strings arrive as transaction keys; parsing must reject
//! bad input without panicking.

#![no_main]

use hush_crypto::MessageHash;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(hash) = MessageHash::from_base64(text) {
            // Round-trip through the wire form
            let reparsed = MessageHash::from_base64(&hash.to_base64()).unwrap();
            assert_eq!(hash, reparsed);
        }
    }
});
