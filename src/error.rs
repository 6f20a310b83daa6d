//! Error handling utilities for Win32 and COM calls.
//!
//! Every wrapper in this crate checks the status returned by the system call
//! or vtable slot against an allowed success set and turns anything else into
//! an [`Error`] carrying the numeric code and its message-table text.
//!
//! Two status types model the two conventions:
//!
//! - [`ErrorCode`] - a Win32 error code, as returned by `GetLastError`.
//! - [`HResult`] - a COM `HRESULT`.
//!
//! Callers who prefer the classic "panic on failure" binding style can opt in
//! with [`OrPanic::or_panic`].

use std::fmt;
use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A Win32 API call failed with the given error code.
    #[error("Win32 error {0}")]
    Win32(ErrorCode),

    /// A COM method returned a failure `HRESULT`.
    #[error("COM error {0}")]
    Com(HResult),

    /// A null pointer was encountered where a valid pointer was expected.
    #[error("Null pointer error: {context}")]
    NullPointer {
        /// Description of where the null pointer was encountered.
        context: &'static str,
    },

    /// An invalid handle was provided or returned.
    #[error("Invalid handle: {context}")]
    InvalidHandle {
        /// Description of the invalid handle context.
        context: &'static str,
    },

    /// A string conversion error occurred.
    #[error("String conversion error: {0}")]
    StringConversion(String),

    /// A buffer was too small for the requested operation.
    #[error("Buffer too small: needed {needed}, got {actual}")]
    BufferTooSmall {
        /// The required buffer size.
        needed: usize,
        /// The actual buffer size provided.
        actual: usize,
    },

    /// The requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A window callback failed or panicked while processing a message.
    #[error("Callback failed: {0}")]
    Callback(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom error with a message.
    #[error("{0}")]
    Custom(String),
}

/// A specialized `Result` type for Win32 and COM operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new null pointer error with the given context.
    pub fn null_pointer(context: &'static str) -> Self {
        Error::NullPointer { context }
    }

    /// Creates a new invalid handle error with the given context.
    pub fn invalid_handle(context: &'static str) -> Self {
        Error::InvalidHandle { context }
    }

    /// Creates a new string conversion error.
    pub fn string_conversion(msg: impl Into<String>) -> Self {
        Error::StringConversion(msg.into())
    }

    /// Creates a new buffer too small error.
    pub fn buffer_too_small(needed: usize, actual: usize) -> Self {
        Error::BufferTooSmall { needed, actual }
    }

    /// Creates a new not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a callback error.
    pub fn callback(msg: impl Into<String>) -> Self {
        Error::Callback(msg.into())
    }

    /// Creates a custom error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Returns the Win32 error code, if this error carries one.
    ///
    /// COM errors in `FACILITY_WIN32` are unwrapped to their Win32 code.
    pub fn win32_error_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Win32(code) => Some(*code),
            Error::Com(hr) => hr.to_win32(),
            _ => None,
        }
    }

    /// Returns the error as an `HRESULT`, if it carries a system status.
    pub fn hresult(&self) -> Option<HResult> {
        match self {
            Error::Win32(code) => Some(code.to_hresult()),
            Error::Com(hr) => Some(*hr),
            _ => None,
        }
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for Error {
    fn from(e: windows::core::Error) -> Self {
        HResult(e.code().0).into_error()
    }
}

/// A Win32 error code, as returned by `GetLastError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    /// The operation completed successfully.
    pub const SUCCESS: Self = Self(0);
    /// Incorrect function.
    pub const INVALID_FUNCTION: Self = Self(1);
    /// The system cannot find the file specified.
    pub const FILE_NOT_FOUND: Self = Self(2);
    /// The system cannot find the path specified.
    pub const PATH_NOT_FOUND: Self = Self(3);
    /// Access is denied.
    pub const ACCESS_DENIED: Self = Self(5);
    /// The handle is invalid.
    pub const INVALID_HANDLE: Self = Self(6);
    /// Not enough memory resources are available to process this command.
    pub const NOT_ENOUGH_MEMORY: Self = Self(8);
    /// The parameter is incorrect.
    pub const INVALID_PARAMETER: Self = Self(87);
    /// The data area passed to a system call is too small.
    pub const INSUFFICIENT_BUFFER: Self = Self(122);
    /// The specified procedure could not be found.
    pub const PROC_NOT_FOUND: Self = Self(127);
    /// The operation was canceled by the user.
    pub const CANCELLED: Self = Self(1223);
    /// Invalid window handle.
    pub const INVALID_WINDOW_HANDLE: Self = Self(1400);
    /// Cannot find window class.
    pub const CLASS_DOES_NOT_EXIST: Self = Self(1411);
    /// Class already exists.
    pub const CLASS_ALREADY_EXISTS: Self = Self(1410);

    /// Returns the raw code.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true if this is `ERROR_SUCCESS`.
    #[inline]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Accepts only `ERROR_SUCCESS`.
    pub fn check(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::Win32(self))
        }
    }

    /// Converts the code to an `HRESULT`, the way `HRESULT_FROM_WIN32` does.
    #[inline]
    pub const fn to_hresult(self) -> HResult {
        if self.0 as i32 <= 0 {
            HResult(self.0 as i32)
        } else {
            HResult(((self.0 & 0x0000_FFFF) | (FACILITY_WIN32 << 16) | 0x8000_0000) as i32)
        }
    }

    /// Returns the system message-table text for this code.
    ///
    /// Falls back to a built-in description when the system has no entry.
    pub fn message(self) -> String {
        system_message(self.0).unwrap_or_else(|| fallback_message(self.0).to_owned())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.message())
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::Win32(code)
    }
}

const FACILITY_WIN32: u32 = 7;

/// A COM `HRESULT` status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    /// Operation successful.
    pub const S_OK: Self = Self(0);
    /// Operation successful, with a "false" outcome.
    pub const S_FALSE: Self = Self(1);
    /// Not implemented.
    pub const E_NOTIMPL: Self = Self(0x8000_4001_u32 as i32);
    /// No such interface supported.
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);
    /// Pointer that is not valid.
    pub const E_POINTER: Self = Self(0x8000_4003_u32 as i32);
    /// Operation aborted.
    pub const E_ABORT: Self = Self(0x8000_4004_u32 as i32);
    /// Unspecified failure.
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    /// Failed to allocate necessary memory.
    pub const E_OUTOFMEMORY: Self = Self(0x8007_000E_u32 as i32);
    /// One or more arguments are not valid.
    pub const E_INVALIDARG: Self = Self(0x8007_0057_u32 as i32);

    /// Returns true for any success code (severity bit clear).
    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Returns true for any failure code (severity bit set).
    #[inline]
    pub const fn is_err(self) -> bool {
        !self.is_ok()
    }

    /// Returns the facility field.
    #[inline]
    pub const fn facility(self) -> u32 {
        ((self.0 as u32) >> 16) & 0x1FFF
    }

    /// Returns the code field (low 16 bits).
    #[inline]
    pub const fn code(self) -> u16 {
        (self.0 as u32 & 0xFFFF) as u16
    }

    /// Builds an `HRESULT` from a Win32 error code.
    #[inline]
    pub const fn from_win32(code: ErrorCode) -> Self {
        code.to_hresult()
    }

    /// Extracts the Win32 error code of a `FACILITY_WIN32` failure.
    pub fn to_win32(self) -> Option<ErrorCode> {
        if self.is_err() && self.facility() == FACILITY_WIN32 {
            Some(ErrorCode(self.code() as u32))
        } else {
            None
        }
    }

    /// Accepts only `S_OK`.
    pub fn check(self) -> Result<()> {
        if self == Self::S_OK {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    /// Accepts `S_OK` and `S_FALSE`, returning `true` for `S_OK`.
    pub fn check_ok_or_false(self) -> Result<bool> {
        match self {
            Self::S_OK => Ok(true),
            Self::S_FALSE => Ok(false),
            other => Err(other.into_error()),
        }
    }

    /// Converts to an [`Error`], preferring [`Error::Win32`] for `FACILITY_WIN32`.
    pub fn into_error(self) -> Error {
        match self.to_win32() {
            Some(code) => Error::Win32(code),
            None => Error::Com(self),
        }
    }

    /// Returns the system message-table text for this `HRESULT`.
    pub fn message(self) -> String {
        if let Some(code) = self.to_win32() {
            return code.message();
        }
        system_message(self.0 as u32).unwrap_or_else(|| fallback_message(self.0 as u32).to_owned())
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}: {}", self.0 as u32, self.message())
    }
}

#[cfg(windows)]
impl From<windows::core::HRESULT> for HResult {
    fn from(hr: windows::core::HRESULT) -> Self {
        Self(hr.0)
    }
}

#[cfg(windows)]
impl From<HResult> for windows::core::HRESULT {
    fn from(hr: HResult) -> Self {
        windows::core::HRESULT(hr.0)
    }
}

#[cfg(windows)]
fn system_message(code: u32) -> Option<String> {
    use windows::core::PWSTR;
    use windows::Win32::System::Diagnostics::Debug::{
        FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
    };

    let mut buffer = [0u16; 512];
    // SAFETY: buffer is a valid writable region and its length is passed as nsize.
    // FORMAT_MESSAGE_IGNORE_INSERTS means no arguments are read.
    let len = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            None,
            code,
            0,
            PWSTR(buffer.as_mut_ptr()),
            buffer.len() as u32,
            None,
        )
    } as usize;

    if len == 0 {
        return None;
    }
    let text = String::from_utf16_lossy(&buffer[..len]);
    let text = text.trim_end();
    (!text.is_empty()).then(|| text.to_owned())
}

#[cfg(not(windows))]
fn system_message(_code: u32) -> Option<String> {
    None
}

fn fallback_message(code: u32) -> &'static str {
    match code {
        0 => "The operation completed successfully.",
        1 => "Incorrect function.",
        2 => "The system cannot find the file specified.",
        3 => "The system cannot find the path specified.",
        5 => "Access is denied.",
        6 => "The handle is invalid.",
        8 => "Not enough memory resources are available to process this command.",
        87 => "The parameter is incorrect.",
        122 => "The data area passed to a system call is too small.",
        127 => "The specified procedure could not be found.",
        1223 => "The operation was canceled by the user.",
        1400 => "Invalid window handle.",
        1410 => "Class already exists.",
        1411 => "Class does not exist.",
        0x8000_4001 => "Not implemented.",
        0x8000_4002 => "No such interface supported.",
        0x8000_4003 => "Invalid pointer.",
        0x8000_4004 => "Operation aborted.",
        0x8000_4005 => "Unspecified error.",
        _ => "Unknown error.",
    }
}

/// Extension trait for converting `windows` crate results.
#[cfg(windows)]
pub trait ResultExt<T> {
    /// Converts a `windows` result to our Result type.
    fn to_result(self) -> Result<T>;
}

#[cfg(windows)]
impl<T> ResultExt<T> for windows::core::Result<T> {
    fn to_result(self) -> Result<T> {
        self.map_err(Error::from)
    }
}

/// Opt-in "panic on failure" policy.
///
/// The panic message carries the numeric code and the message-table text.
pub trait OrPanic<T> {
    /// Returns the value, or panics with the error description.
    #[track_caller]
    fn or_panic(self) -> T;
}

impl<T> OrPanic<T> for Result<T> {
    #[track_caller]
    fn or_panic(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Gets the calling thread's last Win32 error as our Error type.
#[cfg(windows)]
pub fn last_error() -> Error {
    Error::Win32(last_error_code())
}

/// Gets the calling thread's last Win32 error code.
#[cfg(windows)]
pub fn last_error_code() -> ErrorCode {
    // SAFETY: GetLastError only reads thread-local state.
    ErrorCode(unsafe { windows::Win32::Foundation::GetLastError() }.0)
}

/// Returns Ok(()) if the last error is `ERROR_SUCCESS`, otherwise the error.
#[cfg(windows)]
pub fn check_last_error() -> Result<()> {
    last_error_code().check()
}

/// Clears the calling thread's last Win32 error.
///
/// Needed before calls whose failure can only be told apart from a legitimate
/// zero return by inspecting the last error afterwards.
#[cfg(windows)]
pub fn clear_last_error() {
    // SAFETY: SetLastError only writes thread-local state.
    unsafe { windows::Win32::Foundation::SetLastError(windows::Win32::Foundation::WIN32_ERROR(0)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hresult_from_win32() {
        let hr = ErrorCode::ACCESS_DENIED.to_hresult();
        assert_eq!(hr.0 as u32, 0x8007_0005);
        assert_eq!(hr.facility(), FACILITY_WIN32);
        assert_eq!(hr.to_win32(), Some(ErrorCode::ACCESS_DENIED));
        assert_eq!(ErrorCode::SUCCESS.to_hresult(), HResult::S_OK);
    }

    #[test]
    fn test_cancelled_hresult() {
        let hr = HResult::from_win32(ErrorCode::CANCELLED);
        assert_eq!(hr.0 as u32, 0x8007_04C7);
    }

    #[test]
    fn test_success_sets() {
        assert!(HResult::S_OK.check().is_ok());
        assert!(HResult::S_FALSE.check().is_err());
        assert_eq!(HResult::S_FALSE.check_ok_or_false().unwrap(), false);
        assert_eq!(HResult::S_OK.check_ok_or_false().unwrap(), true);
        assert!(HResult::E_FAIL.check_ok_or_false().is_err());
        assert!(ErrorCode::SUCCESS.check().is_ok());
        assert!(ErrorCode::FILE_NOT_FOUND.check().is_err());
    }

    #[test]
    fn test_into_error_prefers_win32() {
        let err = HResult::E_INVALIDARG.into_error();
        assert!(matches!(err, Error::Win32(ErrorCode::INVALID_PARAMETER)));

        let err = HResult::E_NOINTERFACE.into_error();
        assert!(matches!(err, Error::Com(HResult::E_NOINTERFACE)));
        assert_eq!(err.hresult(), Some(HResult::E_NOINTERFACE));
        assert_eq!(err.win32_error_code(), None);
    }

    #[test]
    fn test_display_carries_code() {
        let text = Error::Win32(ErrorCode::ACCESS_DENIED).to_string();
        assert!(text.contains('5'), "{text}");
        assert!(!ErrorCode::ACCESS_DENIED.message().is_empty());

        let text = Error::Com(HResult::E_NOINTERFACE).to_string();
        assert!(text.contains("0x80004002"), "{text}");
    }

    #[test]
    fn test_hresult_severity() {
        assert!(HResult::S_FALSE.is_ok());
        assert!(HResult::E_POINTER.is_err());
        assert_eq!(HResult::E_POINTER.code(), 0x4003);
    }

    #[test]
    #[should_panic(expected = "Win32 error 5")]
    fn test_or_panic_message() {
        let r: Result<()> = Err(Error::Win32(ErrorCode::ACCESS_DENIED));
        r.or_panic();
    }

    #[test]
    fn test_or_panic_passes_value() {
        let r: Result<i32> = Ok(7);
        assert_eq!(r.or_panic(), 7);
    }

    #[cfg(windows)]
    #[test]
    fn test_system_message_lookup() {
        assert!(system_message(ErrorCode::FILE_NOT_FOUND.0).is_some());
    }
}
