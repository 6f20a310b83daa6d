//! Fuzz target for decoding arbitrary UTF-16, including lone surrogates.

#![no_main]

use ergonomic_win32::string::{from_wide, from_wide_with_len, WideBuf};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<u16>| {
    if data.len() > 100_000 {
        return;
    }

    let end = data.iter().position(|&c| c == 0).unwrap_or(data.len());
    let decoded = from_wide(&data);
    assert_eq!(decoded.is_ok(), String::from_utf16(&data[..end]).is_ok());

    // An explicit length past the data never reads out of bounds
    let _ = from_wide_with_len(&data, data.len() + 10);

    let mut buf = WideBuf::new(data.len());
    buf.as_mut_slice()[..data.len()].copy_from_slice(&data);
    let lossy = buf.to_string_lossy();
    if let Ok(s) = decoded {
        assert_eq!(lossy, s);
    }
});
