//! Fuzz target for GUID parsing.

#![no_main]

use ergonomic_win32::guid::Guid;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(guid) = Guid::parse(data) {
        // Whatever parses formats back to something that parses the same
        let text = guid.to_string();
        assert_eq!(Guid::parse(&text).unwrap(), guid);
    }
});
