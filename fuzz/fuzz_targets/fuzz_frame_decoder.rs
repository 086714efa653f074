//! Fuzz target: `frame::accept`
//!
//! Drives arbitrary transceiver output through the receive-side length
//! check and the header decoder.  Neither may panic, and anything accepted
//! must re-encode to the bytes it came from.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use maxgate::protocol::Frame;
use maxgate::protocol::frame::{MAX_PAYLOAD, accept};

fuzz_target!(|data: &[u8]| {
    // Lenient decode must cope with anything.
    let _ = Frame::decode(data);

    if let Ok(received) = accept(data) {
        assert!(received.frame.payload.len() <= MAX_PAYLOAD);
        let encoded = received.frame.encode();
        assert_eq!(&encoded[..], &data[..data.len() - 2], "accepted frame must re-encode");
    }
});
