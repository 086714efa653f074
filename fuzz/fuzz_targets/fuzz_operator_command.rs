//! Fuzz target: `OperatorCommand::parse`
//!
//! Splits the input into a topic and a payload at the first NUL byte and
//! parses it as a bus message.  Malformed topics or JSON must come back as
//! errors, never as panics.
//!
//! cargo fuzz run fuzz_operator_command

#![no_main]

use libfuzzer_sys::fuzz_target;
use maxgate::app::commands::{OperatorCommand, parse_time_of_day};

fuzz_target!(|data: &[u8]| {
    let (topic, payload) = match data.iter().position(|&b| b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };
    let Ok(topic) = std::str::from_utf8(topic) else {
        return;
    };

    if let Ok(OperatorCommand::Device { settings, .. }) = OperatorCommand::parse("max", topic, payload) {
        for time in settings.schedule.iter().flat_map(|s| s.keys()) {
            if let Ok(minutes) = parse_time_of_day(time) {
                assert!(minutes <= 24 * 60);
            }
        }
    }
});
