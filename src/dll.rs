//! Dynamic library loading and lazily resolved exports.
//!
//! [`Library`] owns (or borrows) a module handle. [`LazyProc`] is a slot
//! meant to live in a `static`: it resolves an export the first time it is
//! needed, which lets the crate call functions missing from older systems
//! without failing to load.

use crate::error::{Error, Result};
use crate::string::WideString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use windows::core::PCSTR;
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{
    GetModuleFileNameW, GetModuleHandleW, GetProcAddress, LoadLibraryExW, LoadLibraryW,
    LOAD_LIBRARY_AS_DATAFILE, LOAD_LIBRARY_AS_IMAGE_RESOURCE, LOAD_LIBRARY_FLAGS,
    LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR, LOAD_LIBRARY_SEARCH_SYSTEM32,
};

/// A loaded dynamic library (DLL).
#[derive(Debug)]
pub struct Library {
    handle: HMODULE,
    owned: bool,
}

impl Library {
    /// Loads a library, incrementing its reference count.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_wide = WideString::from_path(path.as_ref());

        // SAFETY: the path is a valid null-terminated wide string.
        let handle = unsafe { LoadLibraryW(path_wide.as_pcwstr())? };

        Ok(Self {
            handle,
            owned: true,
        })
    }

    /// Loads a library with specific flags.
    pub fn load_with_flags(path: impl AsRef<Path>, flags: LoadFlags) -> Result<Self> {
        let path_wide = WideString::from_path(path.as_ref());

        // SAFETY: the path is a valid null-terminated wide string.
        let handle = unsafe { LoadLibraryExW(path_wide.as_pcwstr(), None, flags.to_native())? };

        Ok(Self {
            handle,
            owned: true,
        })
    }

    /// Gets a library already loaded in the process, without taking a reference.
    pub fn get(name: &str) -> Result<Self> {
        let name_wide = WideString::new(name);

        // SAFETY: the name is a valid null-terminated wide string.
        let handle = unsafe { GetModuleHandleW(name_wide.as_pcwstr())? };

        Ok(Self {
            handle,
            owned: false,
        })
    }

    /// Gets the module of the current executable.
    pub fn current() -> Result<Self> {
        // SAFETY: a null name returns the executable's module.
        let handle = unsafe { GetModuleHandleW(None)? };

        Ok(Self {
            handle,
            owned: false,
        })
    }

    /// Gets an export by name.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the export's signature
    /// and calling convention.
    pub unsafe fn get_proc<F: Copy>(&self, name: &str) -> Result<F> {
        let name_cstr = std::ffi::CString::new(name)
            .map_err(|_| Error::string_conversion("Export name contains a null byte"))?;

        let proc = GetProcAddress(self.handle, PCSTR(name_cstr.as_ptr() as *const u8));
        match proc {
            Some(p) => Ok(cast_proc(p)),
            None => Err(Error::not_found(format!("Export '{name}' not found"))),
        }
    }

    /// Gets an export by ordinal.
    ///
    /// # Safety
    ///
    /// Same contract as [`Library::get_proc`].
    pub unsafe fn get_proc_ordinal<F: Copy>(&self, ordinal: u16) -> Result<F> {
        // MAKEINTRESOURCEA: ordinals travel in the low word of the name pointer.
        let proc = GetProcAddress(self.handle, PCSTR(ordinal as usize as *const u8));
        match proc {
            Some(p) => Ok(cast_proc(p)),
            None => Err(Error::not_found(format!("Export #{ordinal} not found"))),
        }
    }

    /// Gets the full path of the module.
    pub fn path(&self) -> Result<PathBuf> {
        // MAX_PATH is not enough for extended paths.
        let mut buffer = vec![0u16; 32768];

        // SAFETY: the buffer is writable for its whole length.
        let len = unsafe { GetModuleFileNameW(self.handle, &mut buffer) } as usize;
        if len == 0 {
            return Err(crate::error::last_error());
        }

        let path_str = crate::string::from_wide_with_len(&buffer, len)?;
        Ok(PathBuf::from(path_str))
    }

    /// Returns the raw module handle.
    pub fn as_raw(&self) -> HMODULE {
        self.handle
    }

    /// Gives up ownership, keeping the module loaded for the rest of the process.
    pub fn leak(mut self) -> HMODULE {
        self.owned = false;
        self.handle
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: the reference was taken by `load`.
            unsafe {
                let _ = FreeLibrary(self.handle);
            }
        }
    }
}

unsafe fn cast_proc<F: Copy>(p: unsafe extern "system" fn() -> isize) -> F {
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of_val(&p));
    std::mem::transmute_copy(&p)
}

/// Flags for [`Library::load_with_flags`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadFlags(u32);

impl LoadFlags {
    /// No special flags.
    pub const NONE: Self = Self(0);

    /// Map as a data file; no code can run.
    pub const AS_DATAFILE: Self = Self(LOAD_LIBRARY_AS_DATAFILE.0);

    /// Map as an image resource.
    pub const AS_IMAGE_RESOURCE: Self = Self(LOAD_LIBRARY_AS_IMAGE_RESOURCE.0);

    /// Search the DLL's directory for dependencies.
    pub const SEARCH_DLL_LOAD_DIR: Self = Self(LOAD_LIBRARY_SEARCH_DLL_LOAD_DIR.0);

    /// Search only System32 for dependencies.
    pub const SEARCH_SYSTEM32: Self = Self(LOAD_LIBRARY_SEARCH_SYSTEM32.0);

    /// Combines two sets of flags.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    fn to_native(self) -> LOAD_LIBRARY_FLAGS {
        LOAD_LIBRARY_FLAGS(self.0)
    }
}

/// How a [`LazyProc`] names its export.
#[derive(Debug, Clone, Copy)]
pub enum ProcName {
    /// By exported name.
    Name(&'static str),
    /// By ordinal.
    Ordinal(u16),
}

/// An export resolved on first use and cached for the rest of the process.
///
/// A miss is cached too, so probing for an export absent from the running
/// system costs one lookup.
///
/// ```no_run
/// use ergonomic_win32::dll::LazyProc;
///
/// type GetTickCount64 = unsafe extern "system" fn() -> u64;
/// static TICKS: LazyProc<GetTickCount64> = LazyProc::new("kernel32.dll", "GetTickCount64");
///
/// if let Some(f) = TICKS.get() {
///     println!("{}", unsafe { f() });
/// }
/// ```
pub struct LazyProc<F> {
    dll: &'static str,
    name: ProcName,
    slot: OnceLock<Option<F>>,
}

impl<F: Copy> LazyProc<F> {
    /// Declares an export looked up by name.
    pub const fn new(dll: &'static str, name: &'static str) -> Self {
        Self {
            dll,
            name: ProcName::Name(name),
            slot: OnceLock::new(),
        }
    }

    /// Declares an export looked up by ordinal.
    pub const fn ordinal(dll: &'static str, ordinal: u16) -> Self {
        Self {
            dll,
            name: ProcName::Ordinal(ordinal),
            slot: OnceLock::new(),
        }
    }

    /// Returns the function, resolving it on the first call.
    pub fn get(&self) -> Option<F> {
        *self.slot.get_or_init(|| match self.resolve() {
            Ok(f) => {
                log::debug!("resolved {}!{:?}", self.dll, self.name);
                Some(f)
            }
            Err(e) => {
                log::debug!("{}!{:?} unavailable: {e}", self.dll, self.name);
                None
            }
        })
    }

    /// Like [`LazyProc::get`], reporting a miss as [`Error::NotFound`].
    pub fn try_get(&self) -> Result<F> {
        self.get()
            .ok_or_else(|| Error::not_found(format!("{}!{:?} is not available", self.dll, self.name)))
    }

    fn resolve(&self) -> Result<F> {
        // Modules stay loaded for the process lifetime since the cached
        // pointer outlives any guard.
        let lib = match Library::get(self.dll) {
            Ok(lib) => lib,
            Err(_) => Library::load(self.dll)?,
        };
        // SAFETY: the declaration of this slot fixes the signature.
        let f = unsafe {
            match self.name {
                ProcName::Name(name) => lib.get_proc(name)?,
                ProcName::Ordinal(ord) => lib.get_proc_ordinal(ord)?,
            }
        };
        lib.leak();
        Ok(f)
    }
}

/// Gets the path to the current executable.
pub fn current_exe() -> Result<PathBuf> {
    Library::current()?.path()
}

#[cfg(test)]
mod tests {
    use super::*;

    type GetCurrentProcessIdFn = unsafe extern "system" fn() -> u32;

    #[test]
    fn test_current_module() {
        let path = Library::current().unwrap().path().unwrap();
        assert!(path.exists());
        assert_eq!(path, current_exe().unwrap());
    }

    #[test]
    fn test_get_loaded_module() {
        let user32 = Library::load("user32.dll").unwrap();
        let path = user32.path().unwrap();
        assert!(path.to_string_lossy().to_lowercase().contains("user32"));
    }

    #[test]
    fn test_get_proc() {
        let kernel32 = Library::get("kernel32.dll").unwrap();
        let get_pid: GetCurrentProcessIdFn = unsafe { kernel32.get_proc("GetCurrentProcessId").unwrap() };
        assert_eq!(unsafe { get_pid() }, std::process::id());
    }

    #[test]
    fn test_missing_export() {
        let kernel32 = Library::get("kernel32.dll").unwrap();
        let r: Result<GetCurrentProcessIdFn> = unsafe { kernel32.get_proc("NoSuchExport_123") };
        assert!(matches!(r, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_lazy_proc_caches() {
        static PID: LazyProc<GetCurrentProcessIdFn> = LazyProc::new("kernel32.dll", "GetCurrentProcessId");
        let f = PID.get().unwrap();
        assert_eq!(unsafe { f() }, std::process::id());
        assert!(PID.try_get().is_ok());
    }

    #[test]
    fn test_lazy_proc_miss() {
        static MISSING: LazyProc<GetCurrentProcessIdFn> = LazyProc::new("kernel32.dll", "NoSuchExport_123");
        assert!(MISSING.get().is_none());
        assert!(MISSING.try_get().is_err());

        static NO_DLL: LazyProc<GetCurrentProcessIdFn> = LazyProc::new("no_such_module_123.dll", "F");
        assert!(NO_DLL.get().is_none());
    }
}
