//! Fuzz target for Frame::decode
//!
//! Feeds arbitrary bytes to the STOMP decoder to find:
//! - Parser crashes or panics
//! - Header escapes that decode but cannot be encoded again
//! - Content-length values that read past the buffer
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use chatsync_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(Some(frame)) = Frame::decode(data) else {
        return;
    };

    // Anything we accept must survive a second trip through the codec
    if let Ok(bytes) = frame.to_bytes() {
        let again = Frame::decode(&bytes).expect("re-encoded frame decodes");
        let again = again.expect("re-encoded frame is not a heart-beat");
        assert_eq!(again.command, frame.command);
    }
});
