//! COM plumbing shared by the shell, Direct2D and DirectShow wrappers.
//!
//! Interface pointers are the `windows` crate types, where `Clone` calls
//! `AddRef` and `Drop` calls `Release`. This module adds the apartment
//! guard, instance creation, and a few conveniences on top of them.

use crate::error::{Error, HResult, Result};
use crate::guid::Guid;
use crate::string::{from_wide_ptr, WideString};
use std::ffi::c_void;
use std::marker::PhantomData;
use windows::core::{IUnknown_Vtbl, Interface, GUID, PCWSTR, PWSTR};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, IDispatch,
    CLSCTX, CLSCTX_ALL, CLSCTX_INPROC_SERVER, CLSCTX_LOCAL_SERVER, COINIT_APARTMENTTHREADED,
    COINIT_DISABLE_OLE1DDE, COINIT_MULTITHREADED,
};

const LOCALE_USER_DEFAULT: u32 = 0x0400;

/// Threading model of a COM apartment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Apartment {
    /// Single-threaded; required by UI threads and most shell objects.
    SingleThreaded,
    /// Multi-threaded.
    MultiThreaded,
}

/// Keeps COM initialized on the current thread; uninitializes on drop.
///
/// Initialization is counted per thread, so nesting guards is fine as long as
/// they use the same apartment model.
#[must_use = "COM is uninitialized when the guard is dropped"]
#[derive(Debug)]
pub struct ComApartment {
    // Bound to the thread that initialized it.
    _not_send: PhantomData<*const ()>,
}

impl ComApartment {
    /// Initializes COM on the current thread.
    ///
    /// Fails with `RPC_E_CHANGED_MODE` if the thread already joined an
    /// apartment of the other model.
    pub fn init(apartment: Apartment) -> Result<Self> {
        let flags = match apartment {
            Apartment::SingleThreaded => COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE,
            Apartment::MultiThreaded => COINIT_MULTITHREADED,
        };
        // SAFETY: reserved parameter must be null.
        let hr = HResult(unsafe { CoInitializeEx(None, flags) }.0);
        let first = hr.check_ok_or_false()?;
        log::debug!("COM initialized ({apartment:?}, first on thread: {first})");
        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        // SAFETY: pairs the successful CoInitializeEx of the constructor.
        unsafe { CoUninitialize() };
    }
}

/// Server context for [`create_instance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClsCtx {
    /// A DLL loaded in this process.
    #[default]
    InprocServer,
    /// A separate process on this machine.
    LocalServer,
    /// Any of them.
    All,
}

impl ClsCtx {
    fn raw(self) -> CLSCTX {
        match self {
            Self::InprocServer => CLSCTX_INPROC_SERVER,
            Self::LocalServer => CLSCTX_LOCAL_SERVER,
            Self::All => CLSCTX_ALL,
        }
    }
}

/// Creates a COM object and returns its `T` interface.
pub fn create_instance<T: Interface>(clsid: &Guid, ctx: ClsCtx) -> Result<T> {
    let clsid: GUID = (*clsid).into();
    // SAFETY: `clsid` lives during the call; no aggregation.
    let obj = unsafe { CoCreateInstance(&clsid, None, ctx.raw())? };
    Ok(obj)
}

/// Looks up the class ID registered for a ProgID such as `"Shell.Application"`.
pub fn clsid_from_prog_id(prog_id: &str) -> Result<Guid> {
    let wide = WideString::new(prog_id);
    // SAFETY: the string lives during the call.
    let clsid = unsafe { CLSIDFromProgID(wide.as_pcwstr())? };
    Ok(clsid.into())
}

/// Copies a string allocated with `CoTaskMemAlloc`, then frees it.
///
/// # Safety
///
/// `s` must be null or a null-terminated string owned by the caller and
/// allocated with `CoTaskMemAlloc`. It must not be used afterwards.
pub unsafe fn co_task_string(s: PWSTR) -> Result<String> {
    if s.is_null() {
        return Err(Error::null_pointer("CoTaskMem string"));
    }
    let out = from_wide_ptr(s.0);
    CoTaskMemFree(Some(s.0 as *const c_void));
    out
}

/// Conveniences for every COM interface pointer.
pub trait ComInterfaceExt: Interface {
    /// Asks the object for another interface; `None` when it does not
    /// implement it.
    fn query<U: Interface>(&self) -> Result<Option<U>> {
        match self.cast::<U>() {
            Ok(u) => Ok(Some(u)),
            Err(e) if HResult(e.code().0) == HResult::E_NOINTERFACE => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the object implements `U`.
    fn supports<U: Interface>(&self) -> bool {
        matches!(self.query::<U>(), Ok(Some(_)))
    }

    /// Current reference count, for diagnostics.
    ///
    /// Read by an `AddRef`/`Release` pair through the `IUnknown` slots of the
    /// vtable; objects are free to report approximate values.
    fn ref_count(&self) -> u32 {
        let raw = self.as_raw();
        // SAFETY: every COM vtable starts with the IUnknown slots, and the
        // AddRef is immediately balanced.
        unsafe {
            let vtbl = *(raw as *const *const IUnknown_Vtbl);
            ((*vtbl).AddRef)(raw);
            ((*vtbl).Release)(raw)
        }
    }

    /// The raw interface pointer, still owned by `self`.
    fn as_raw_ptr(&self) -> *mut c_void {
        self.as_raw()
    }
}

impl<T: Interface> ComInterfaceExt for T {}

/// Late-bound automation through `IDispatch`.
#[derive(Clone, Debug)]
pub struct Dispatch {
    inner: IDispatch,
}

impl Dispatch {
    /// Wraps an `IDispatch` pointer.
    pub fn new(inner: IDispatch) -> Self {
        Self { inner }
    }

    /// Creates the object registered for a ProgID.
    pub fn from_prog_id(prog_id: &str, ctx: ClsCtx) -> Result<Self> {
        let clsid = clsid_from_prog_id(prog_id)?;
        Ok(Self::new(create_instance(&clsid, ctx)?))
    }

    /// The underlying interface.
    pub fn as_inner(&self) -> &IDispatch {
        &self.inner
    }

    /// Number of type-information interfaces: 0 or 1.
    pub fn type_info_count(&self) -> Result<u32> {
        // SAFETY: plain call on a live interface.
        Ok(unsafe { self.inner.GetTypeInfoCount()? })
    }

    /// Maps member names to dispatch IDs.
    pub fn ids_of_names(&self, names: &[&str]) -> Result<Vec<i32>> {
        let wides: Vec<WideString> = names.iter().map(|n| WideString::new(n)).collect();
        let ptrs: Vec<PCWSTR> = wides.iter().map(WideString::as_pcwstr).collect();
        let mut ids = vec![0i32; names.len()];
        // SAFETY: `ptrs` and `ids` both hold `names.len()` entries, and the
        // strings outlive the call.
        unsafe {
            self.inner.GetIDsOfNames(
                &GUID::zeroed(),
                ptrs.as_ptr(),
                ptrs.len() as u32,
                LOCALE_USER_DEFAULT,
                ids.as_mut_ptr(),
            )?
        };
        Ok(ids)
    }

    /// Maps one member name to its dispatch ID.
    pub fn id_of_name(&self, name: &str) -> Result<i32> {
        self.ids_of_names(&[name])?
            .pop()
            .ok_or_else(|| Error::not_found(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::System::Com::IPersistFile;
    use windows::Win32::UI::Shell::{IShellLinkW, ITaskbarList3, ShellLink};

    #[test]
    fn test_apartment_nesting() {
        let outer = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let inner = ComApartment::init(Apartment::SingleThreaded).unwrap();
        drop(inner);
        drop(outer);
    }

    #[test]
    fn test_apartment_mode_conflict() {
        let _sta = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let err = ComApartment::init(Apartment::MultiThreaded).unwrap_err();
        assert!(matches!(err, Error::Com(_)));
    }

    #[test]
    fn test_query_and_ref_count() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let link: IShellLinkW = create_instance(&ShellLink.into(), ClsCtx::InprocServer).unwrap();

        assert!(link.supports::<IPersistFile>());
        assert!(link.query::<ITaskbarList3>().unwrap().is_none());

        let before = link.ref_count();
        let copy = link.clone();
        assert_eq!(link.ref_count(), before + 1);
        drop(copy);
        assert_eq!(link.ref_count(), before);
        assert!(!link.as_raw_ptr().is_null());
    }

    #[test]
    fn test_create_unknown_class() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let bogus = Guid::from_u128(0x0BAD_0BAD_0BAD_0BAD_0BAD_0BAD_0BAD_0BAD);
        assert!(create_instance::<IShellLinkW>(&bogus, ClsCtx::InprocServer).is_err());
        assert!(clsid_from_prog_id("No.Such.ProgId").is_err());
    }

    #[test]
    fn test_dispatch_names() {
        let _com = ComApartment::init(Apartment::SingleThreaded).unwrap();
        let shell = Dispatch::from_prog_id("Shell.Application", ClsCtx::InprocServer).unwrap();
        assert_eq!(shell.type_info_count().unwrap(), 1);
        let ids = shell.ids_of_names(&["Windows"]).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(shell.id_of_name("Windows").unwrap(), ids[0]);
        assert!(shell.id_of_name("NoSuchMember").is_err());
    }

    #[test]
    fn test_co_task_string_null() {
        // SAFETY: null is accepted.
        assert!(unsafe { co_task_string(PWSTR::null()) }.is_err());
    }
}
