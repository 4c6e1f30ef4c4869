//! Fuzz target for ChatPayload::from_json
//!
//! Message bodies come from other clients and from server builds that
//! disagree on id types and field spellings. Tests:
//! - Malformed or truncated JSON
//! - Ids as strings, signed and unsigned integers
//! - `null` in every field
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use chatsync_proto::ChatPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = ChatPayload::from_json(data) else {
        return;
    };

    // Outbound encoding must accept every payload inbound decoding produces
    let json = payload.to_json().expect("decoded payload encodes");
    let again = ChatPayload::from_json(&json).expect("encoded payload decodes");
    assert_eq!(again.id, payload.id);
    assert_eq!(again.content, payload.content);
});
