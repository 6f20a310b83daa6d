//! Native controls.
//!
//! Every control wraps a [`BaseControl`], which handles what they share:
//!
//! - creation is queued on the parent and runs at its `WM_CREATE`, or right
//!   away if the parent already exists;
//! - a control ID is allocated when none is given;
//! - resize anchors are kept by a hook on the parent's `WM_SIZE`;
//! - the control is subclassed, so messages sent to the control itself can
//!   be handled through [`GuiControl::on_subclass`].
//!
//! Notifications (`WM_COMMAND`, `WM_NOTIFY`) reach the parent, so each
//! control's `on()` returns a small view registering on the parent's table
//! under the control's ID.

mod button;
mod combo_box;
mod edit;
mod label;
mod list_box;
mod list_view;
mod progress_bar;
mod status_bar;

pub use button::{Button, ButtonEvents, ButtonKind, ButtonOpts, CheckState};
pub use combo_box::{ComboBox, ComboBoxEvents, ComboBoxOpts};
pub use edit::{Edit, EditEvents, EditOpts, TextAlign};
pub use label::{Label, LabelEvents, LabelOpts};
pub use list_box::{ListBox, ListBoxEvents, ListBoxOpts};
pub use list_view::{ListView, ListViewEvents, ListViewOpts, NmItemActivate, NmListView};
pub use progress_bar::{ProgressBar, ProgressBarOpts, ProgressState, ProgressStyle};
pub use status_bar::{StatusBar, StatusBarEvents};

use crate::dll::LazyProc;
use crate::error::{last_error, HResult, Result};
use crate::events::{next_auto_ctrl_id, WindowEvents};
use crate::handle::Hwnd;
use crate::layout::Anchor;
use crate::msg::{self, WndMsg};
use crate::string::{WideBuf, WideString};
use crate::window::{guarded, ExStyle, GuiParent, Style, WindowBase};
use std::cell::Cell;
use std::ffi::c_void;
use std::rc::Rc;
use std::sync::Once;
use windows::core::{HRESULT, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, DEFAULT_GUI_FONT};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Controls::{
    InitCommonControlsEx, ICC_STANDARD_CLASSES, ICC_WIN95_CLASSES, INITCOMMONCONTROLSEX,
};
use windows::Win32::UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass};
use windows::Win32::UI::WindowsAndMessaging::{CreateWindowExW, HMENU, WINDOW_EX_STYLE, WINDOW_STYLE};

/// Common-control notification codes shared by several controls.
pub(crate) mod nm {
    pub const CLICK: i32 = -2;
    pub const DBLCLK: i32 = -3;
    pub const RCLICK: i32 = -5;
}

const SUBCLASS_ID: usize = 1;

static INIT_COMMON_CONTROLS: Once = Once::new();

/// Registers the common-control window classes.
///
/// Control constructors call it; calling it again is harmless.
pub fn init_common_controls() -> Result<()> {
    let icc = INITCOMMONCONTROLSEX {
        dwSize: std::mem::size_of::<INITCOMMONCONTROLSEX>() as u32,
        dwICC: ICC_STANDARD_CLASSES | ICC_WIN95_CLASSES,
    };

    // SAFETY: `icc` is fully initialized.
    if !unsafe { InitCommonControlsEx(&icc) }.as_bool() {
        return Err(last_error());
    }
    Ok(())
}

type SetWindowThemeFn = unsafe extern "system" fn(HWND, PCWSTR, PCWSTR) -> HRESULT;

static SET_WINDOW_THEME: LazyProc<SetWindowThemeFn> = LazyProc::new("uxtheme.dll", "SetWindowTheme");

/// Applies a visual style to a control, e.g. `"Explorer"` for list views.
pub fn set_theme(hwnd: Hwnd, app_name: &str) -> Result<()> {
    let f = SET_WINDOW_THEME.try_get()?;
    let name = WideString::new(app_name);
    // SAFETY: signature fixed by the slot declaration; the name outlives the call.
    HResult::from(unsafe { f(hwnd.raw(), name.as_pcwstr(), PCWSTR::null()) }).check()
}

/// Access to the state every control shares.
pub trait GuiControl {
    /// Shared control state.
    fn base(&self) -> &Rc<BaseControl>;

    /// The control handle; null before creation.
    fn hwnd(&self) -> Hwnd {
        self.base().hwnd()
    }

    /// The control ID.
    fn ctrl_id(&self) -> u16 {
        self.base().ctrl_id()
    }

    /// Handlers for messages sent to the control itself.
    ///
    /// Must be populated before the control is created.
    fn on_subclass(&self) -> &WindowEvents {
        self.base().on_subclass()
    }
}

/// Parameters of a native control window.
pub(crate) struct NativeCreate {
    pub class: &'static str,
    pub text: String,
    pub position: (i32, i32),
    pub size: (i32, i32),
    pub style: Style,
    pub ex_style: ExStyle,
    pub resize: Anchor,
}

/// State shared by every native control.
pub struct BaseControl {
    hwnd: Cell<Hwnd>,
    ctrl_id: u16,
    parent: Rc<WindowBase>,
    subclass: WindowEvents,
}

impl std::fmt::Debug for BaseControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseControl")
            .field("hwnd", &self.hwnd.get())
            .field("ctrl_id", &self.ctrl_id)
            .finish()
    }
}

impl BaseControl {
    pub(crate) fn new(parent: &impl GuiParent, ctrl_id: Option<u16>) -> Rc<Self> {
        Rc::new(Self {
            hwnd: Cell::new(Hwnd::NULL),
            ctrl_id: ctrl_id.unwrap_or_else(next_auto_ctrl_id),
            parent: parent.as_base().clone(),
            subclass: WindowEvents::new(),
        })
    }

    /// The control handle; null before creation.
    pub fn hwnd(&self) -> Hwnd {
        self.hwnd.get()
    }

    /// The control ID.
    pub fn ctrl_id(&self) -> u16 {
        self.ctrl_id
    }

    /// Handlers for messages sent to the control itself.
    pub fn on_subclass(&self) -> &WindowEvents {
        &self.subclass
    }

    /// The parent's dispatch table, where notifications arrive.
    pub(crate) fn parent_events(&self) -> &WindowEvents {
        self.parent.on()
    }

    pub(crate) fn parent(&self) -> &Rc<WindowBase> {
        &self.parent
    }

    /// Sends a message to the control.
    pub(crate) fn send(&self, msg: u32, wparam: usize, lparam: isize) -> isize {
        self.hwnd().send_message(WndMsg::new(msg, wparam, lparam))
    }

    /// Queues the creation of the control on its parent; `after` runs once
    /// the control exists.
    pub(crate) fn create<F>(self: &Rc<Self>, c: NativeCreate, after: F) -> Result<()>
    where
        F: FnOnce(Hwnd) -> Result<()> + 'static,
    {
        let me = self.clone();
        self.parent.on_created(move |parent_hwnd| {
            INIT_COMMON_CONTROLS.call_once(|| {
                if let Err(e) = init_common_controls() {
                    log::warn!("InitCommonControlsEx failed: {e}");
                }
            });

            let hwnd = me.create_window(&c, parent_hwnd)?;
            me.hwnd.set(hwnd);
            // SAFETY: stock objects are never freed.
            let font = unsafe { GetStockObject(DEFAULT_GUI_FONT) };
            hwnd.send_message(WndMsg::new(msg::WM_SETFONT, font.0 as usize, 1));
            me.install_subclass()?;
            me.parent.add_layout(hwnd, c.resize)?;
            after(hwnd)
        })
    }

    fn create_window(&self, c: &NativeCreate, parent: Hwnd) -> Result<Hwnd> {
        let class = WideString::new(c.class);
        let text = WideString::new(&c.text);
        // SAFETY: a null name returns the executable's module.
        let hinstance = unsafe { GetModuleHandleW(None)? };
        // SAFETY: the strings are alive during the call.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(c.ex_style.0),
                class.as_pcwstr(),
                text.as_pcwstr(),
                WINDOW_STYLE(c.style.0),
                c.position.0,
                c.position.1,
                c.size.0,
                c.size.1,
                parent.raw(),
                HMENU(self.ctrl_id as usize as *mut c_void),
                hinstance,
                None,
            )?
        };
        log::trace!("created {} #{}", c.class, self.ctrl_id);
        Ok(Hwnd::from_raw(hwnd))
    }

    fn install_subclass(self: &Rc<Self>) -> Result<()> {
        // The subclass owns a reference until WM_NCDESTROY.
        let ref_data = Rc::into_raw(self.clone());
        // SAFETY: `subclass_proc` releases `ref_data` when the control dies.
        let ok = unsafe { SetWindowSubclass(self.hwnd().raw(), Some(subclass_proc), SUBCLASS_ID, ref_data as usize) };
        if !ok.as_bool() {
            // SAFETY: not installed, so the reference is still ours.
            drop(unsafe { Rc::from_raw(ref_data) });
            return Err(last_error());
        }
        Ok(())
    }
}

unsafe extern "system" fn subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _id: usize,
    ref_data: usize,
) -> LRESULT {
    let p = WndMsg::new(msg, wparam.0, lparam.0);
    match guarded(|| subclass_dispatch(Hwnd::from_raw(hwnd), p, ref_data as *const BaseControl)) {
        Some(r) => LRESULT(r),
        None => DefSubclassProc(hwnd, msg, wparam, lparam),
    }
}

unsafe fn subclass_dispatch(hwnd: Hwnd, p: WndMsg, ptr: *const BaseControl) -> Result<isize> {
    Rc::increment_strong_count(ptr);
    let ctrl = Rc::from_raw(ptr);

    let ret = match ctrl.subclass.process(p) {
        Some(r) => r,
        None => Ok(DefSubclassProc(hwnd.raw(), p.msg, WPARAM(p.wparam), LPARAM(p.lparam)).0),
    };

    if p.msg == msg::WM_NCDESTROY {
        let _ = RemoveWindowSubclass(hwnd.raw(), Some(subclass_proc), SUBCLASS_ID);
        ctrl.subclass.clear();
        ctrl.hwnd.set(Hwnd::NULL);
        // Release the reference taken by `install_subclass`.
        drop(Rc::from_raw(ptr));
    }
    ret
}

/// Reads the text of a list item through a length message and a text message.
pub(crate) fn item_text(hwnd: Hwnd, len_msg: u32, text_msg: u32, index: u32, err_value: isize) -> Result<String> {
    let len = hwnd.send_message(WndMsg::new(len_msg, index as usize, 0));
    if len == err_value {
        return Err(crate::error::Error::not_found(format!("No item at index {index}")));
    }
    let mut buf = WideBuf::new(len as usize);
    hwnd.send_message(WndMsg::new(text_msg, index as usize, buf.as_mut_ptr() as isize));
    buf.to_string()
}

/// Turns a `-1`-for-none index into an `Option`.
pub(crate) fn opt_index(v: isize) -> Option<u32> {
    u32::try_from(v).ok()
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::window::{process_pending_messages, WindowClassOpts, WindowMain, WindowMainOpts};

    /// A hidden main window for control tests.
    pub fn parent() -> WindowMain {
        WindowMain::new(WindowMainOpts {
            title: "controls".to_owned(),
            class: WindowClassOpts {
                class_name: "ErgonomicWin32.ControlTest".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    /// Destroys the window and drains the resulting `WM_QUIT`.
    pub fn teardown(wnd: &WindowMain) {
        wnd.hwnd().destroy().unwrap();
        let _ = process_pending_messages();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_init_common_controls() {
        assert!(init_common_controls().is_ok());
    }

    #[test]
    fn test_opt_index() {
        assert_eq!(opt_index(-1), None);
        assert_eq!(opt_index(3), Some(3));
    }

    #[test]
    fn test_subclass_sees_control_messages() {
        let wnd = test_util::parent();
        let btn = Button::new(&wnd, ButtonOpts::default()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        btn.on_subclass().wm(msg::WM_SETTEXT, move |_| {
            s.borrow_mut().push("settext");
            // Returning without the default procedure swallows the change.
            Ok(1)
        });

        wnd.create().unwrap();
        btn.hwnd().set_text("ignored").unwrap();
        assert_eq!(*seen.borrow(), vec!["settext"]);
        assert_eq!(btn.hwnd().text().unwrap(), "");

        let base = btn.base().clone();
        test_util::teardown(&wnd);
        assert!(base.hwnd().is_null());
        assert!(base.on_subclass().is_empty());
    }

    #[test]
    fn test_failing_subclass_nc_destroy_still_releases() {
        let wnd = test_util::parent();
        let btn = Button::new(&wnd, ButtonOpts::default()).unwrap();
        btn.on_subclass()
            .wm(msg::WM_NCDESTROY, |_| Err(crate::error::Error::custom("subclass teardown failed")));
        let base = btn.base().clone();
        let before = Rc::strong_count(&base);

        wnd.create().unwrap();
        assert_eq!(Rc::strong_count(&base), before + 1);
        btn.hwnd().destroy().unwrap();

        let err = crate::window::take_callback_error().unwrap();
        assert_eq!(err.to_string(), "subclass teardown failed");
        assert!(base.hwnd().is_null());
        assert!(base.on_subclass().is_empty());
        assert_eq!(Rc::strong_count(&base), before);
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_control_created_after_parent() {
        let wnd = test_util::parent();
        wnd.create().unwrap();
        let lbl = Label::new(
            &wnd,
            LabelOpts {
                text: "late".to_owned(),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!lbl.hwnd().is_null());
        assert_eq!(lbl.hwnd().text().unwrap(), "late");
        assert_eq!(lbl.hwnd().parent().unwrap(), wnd.hwnd());
        test_util::teardown(&wnd);
    }
}
