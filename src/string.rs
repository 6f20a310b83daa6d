//! UTF-16 string marshaling.
//!
//! Win32 and COM take null-terminated UTF-16 strings, while Rust uses UTF-8.
//! This module holds the conversions every wrapper goes through on its way
//! into and out of a system call.

use crate::error::{Error, Result};

/// Converts a Rust string to a null-terminated UTF-16 vector.
///
/// # Example
///
/// ```
/// use ergonomic_win32::string::to_wide;
///
/// let wide = to_wide("Hello");
/// assert_eq!(wide, vec![72, 101, 108, 108, 111, 0]);
/// ```
#[inline]
pub fn to_wide(s: &str) -> Vec<u16> {
    // UTF-16 length never exceeds the UTF-8 byte length; +1 for the terminator.
    let mut result = Vec::with_capacity(s.len() + 1);
    result.extend(s.encode_utf16());
    result.push(0);
    result
}

/// Converts a path to a null-terminated UTF-16 vector.
#[cfg(windows)]
#[inline]
pub fn path_to_wide(path: &std::path::Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    let os_str = path.as_os_str();
    let mut result = Vec::with_capacity(os_str.len() + 1);
    result.extend(os_str.encode_wide());
    result.push(0);
    result
}

/// Converts a UTF-16 slice to a Rust `String`, stopping at the first null.
///
/// # Example
///
/// ```
/// use ergonomic_win32::string::{to_wide, from_wide};
///
/// let wide = to_wide("Hello");
/// assert_eq!(from_wide(&wide).unwrap(), "Hello");
/// ```
#[inline]
pub fn from_wide(wide: &[u16]) -> Result<String> {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16(&wide[..len]).map_err(|_| Error::string_conversion("Invalid UTF-16 sequence"))
}

/// Converts the first `len` code units of a UTF-16 slice, ignoring nulls.
///
/// `len` is clamped to the slice length.
#[inline]
pub fn from_wide_with_len(wide: &[u16], len: usize) -> Result<String> {
    let actual_len = len.min(wide.len());
    String::from_utf16(&wide[..actual_len])
        .map_err(|_| Error::string_conversion("Invalid UTF-16 sequence"))
}

/// Converts a null-terminated UTF-16 pointer to a Rust `String`.
///
/// # Safety
///
/// `ptr` must be null or point to a readable, null-terminated UTF-16 string
/// that is not mutated during the call.
///
/// # Errors
///
/// Returns an error if `ptr` is null or the data is not valid UTF-16.
pub unsafe fn from_wide_ptr(ptr: *const u16) -> Result<String> {
    if ptr.is_null() {
        return Err(Error::null_pointer("from_wide_ptr received null pointer"));
    }

    let mut len = 0;
    // SAFETY: caller guarantees a terminator exists.
    while *ptr.add(len) != 0 {
        len += 1;
    }

    // SAFETY: the `len` units before the terminator were just read.
    let slice = std::slice::from_raw_parts(ptr, len);
    from_wide(slice)
}

/// Builds a double-null-terminated list of strings.
///
/// Used by APIs that take several strings in one buffer, such as filter lists.
/// An empty list still produces the two terminating nulls.
pub fn to_multi_wide<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<u16> {
    let mut result = Vec::new();
    for item in items {
        result.extend(item.encode_utf16());
        result.push(0);
    }
    if result.is_empty() {
        result.push(0);
    }
    result.push(0);
    result
}

/// Parses a double-null-terminated list of strings.
///
/// Parsing stops at the first empty entry, or at the end of the slice.
pub fn from_multi_wide(wide: &[u16]) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut rest = wide;
    loop {
        let len = rest.iter().position(|&c| c == 0).unwrap_or(rest.len());
        if len == 0 {
            break;
        }
        items.push(from_wide_with_len(rest, len)?);
        if len >= rest.len() {
            break;
        }
        rest = &rest[len + 1..];
    }
    Ok(items)
}

/// A builder for creating wide strings with proper null termination.
#[derive(Default)]
pub struct WideStringBuilder {
    buffer: Vec<u16>,
}

impl WideStringBuilder {
    /// Creates a new empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder with the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Appends a string to the builder.
    #[inline]
    pub fn push(&mut self, s: &str) -> &mut Self {
        self.buffer.extend(s.encode_utf16());
        self
    }

    /// Appends a single UTF-16 code unit.
    #[inline]
    pub fn push_unit(&mut self, c: u16) -> &mut Self {
        self.buffer.push(c);
        self
    }

    /// Appends a null terminator and returns the completed vector.
    #[inline]
    pub fn build(mut self) -> Vec<u16> {
        self.buffer.push(0);
        self.buffer
    }

    /// Returns the current length without the null terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the builder is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// An owned, null-terminated wide string to pass into Win32 calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WideString {
    buffer: Vec<u16>,
}

impl WideString {
    /// Creates a new `WideString` from a Rust string.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self { buffer: to_wide(s) }
    }

    /// Creates a new `WideString` from a path.
    #[cfg(windows)]
    #[inline]
    pub fn from_path(path: &std::path::Path) -> Self {
        Self {
            buffer: path_to_wide(path),
        }
    }

    /// Returns a pointer to the null-terminated wide string.
    #[inline]
    pub fn as_ptr(&self) -> *const u16 {
        self.buffer.as_ptr()
    }

    /// Returns the string as a PCWSTR for use with Windows APIs.
    #[cfg(windows)]
    #[inline]
    pub fn as_pcwstr(&self) -> windows::core::PCWSTR {
        windows::core::PCWSTR::from_raw(self.buffer.as_ptr())
    }

    /// Returns the length in UTF-16 code units, not including the null terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    /// Returns true if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts back to a Rust String, replacing invalid sequences.
    #[inline]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.buffer[..self.len()])
    }

    /// Returns the underlying buffer, including the terminator.
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.buffer
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WideString {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// A zero-filled output buffer for calls that write a string back.
///
/// The buffer always keeps room for a terminator, so a call that fills it
/// completely still produces a valid string.
#[derive(Clone, Debug)]
pub struct WideBuf {
    buffer: Vec<u16>,
}

impl WideBuf {
    /// Allocates room for `chars` characters plus the terminator.
    pub fn new(chars: usize) -> Self {
        Self {
            buffer: vec![0; chars + 1],
        }
    }

    /// Returns the whole buffer for the system call to write into.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.buffer
    }

    /// Returns a raw pointer to the buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u16 {
        self.buffer.as_mut_ptr()
    }

    /// Returns the capacity in code units, terminator included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Converts the contents up to the first null.
    pub fn to_string(&self) -> Result<String> {
        from_wide(&self.buffer)
    }

    /// Converts the contents up to the first null, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        let len = self.buffer.iter().position(|&c| c == 0).unwrap_or(self.buffer.len());
        String::from_utf16_lossy(&self.buffer[..len])
    }
}
