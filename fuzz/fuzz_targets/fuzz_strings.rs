//! Fuzz target for UTF-16 marshaling of Rust strings.

#![no_main]

use ergonomic_win32::string::{from_multi_wide, from_wide, to_multi_wide, to_wide, WideString};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let wide = to_wide(data);
    assert_eq!(wide.last(), Some(&0));

    // Text after an embedded null is cut off
    let head = data.split('\0').next().unwrap_or_default();
    assert_eq!(from_wide(&wide).unwrap(), head);

    let ws = WideString::new(data);
    assert_eq!(ws.as_slice(), &wide[..]);

    // Null-separated items come back as the non-empty runs
    let items: Vec<&str> = data.split('\0').take_while(|s| !s.is_empty()).collect();
    let packed = to_multi_wide(items.iter().copied());
    assert_eq!(from_multi_wide(&packed).unwrap(), items);
});
