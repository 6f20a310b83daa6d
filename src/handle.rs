//! The window handle wrapper.
//!
//! [`Hwnd`] is a plain `Copy` value: it never destroys the window when
//! dropped. Windows belong to their parent (or to the user, for top-level
//! windows) and are torn down by the system or by [`Hwnd::destroy`].

use crate::dll::LazyProc;
use crate::error::{clear_last_error, last_error, last_error_code, Result};
use crate::layout::{Rect, Size};
use crate::msg::WndMsg;
use crate::string::{WideBuf, WideString};
use std::ffi::c_void;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{InvalidateRect, UpdateWindow};
use windows::Win32::UI::Input::KeyboardAndMouse::{EnableWindow, IsWindowEnabled, SetFocus};
use windows::Win32::UI::WindowsAndMessaging::{
    DestroyWindow, GetClientRect, GetDlgCtrlID, GetDlgItem, GetParent, GetWindowLongPtrW,
    GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindow, IsWindowVisible, KillTimer,
    MessageBoxW, MoveWindow, PostMessageW, SendMessageW, SetTimer, SetWindowLongPtrW,
    SetWindowPos, SetWindowTextW, ShowWindow, GWLP_USERDATA, GWL_EXSTYLE, GWL_STYLE,
    MESSAGEBOX_STYLE, SET_WINDOW_POS_FLAGS, SHOW_WINDOW_CMD, SW_HIDE, SW_MAXIMIZE, SW_MINIMIZE,
    SW_RESTORE, SW_SHOW, SW_SHOWDEFAULT, SW_SHOWNORMAL, WINDOW_LONG_PTR_INDEX,
};

/// Default DPI, used when the system cannot report a per-window value.
pub const USER_DEFAULT_SCREEN_DPI: u32 = 96;

type GetDpiForWindowFn = unsafe extern "system" fn(HWND) -> u32;

// Windows 10 1607 and later.
static GET_DPI_FOR_WINDOW: LazyProc<GetDpiForWindowFn> = LazyProc::new("user32.dll", "GetDpiForWindow");

/// Show window commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShowCommand(pub SHOW_WINDOW_CMD);

impl ShowCommand {
    /// Shows the window in the state the launching process asked for.
    pub const DEFAULT: Self = Self(SW_SHOWDEFAULT);
    /// Activates and shows the window in its current size and position.
    pub const SHOW: Self = Self(SW_SHOW);
    /// Activates and shows the window, restoring it if minimized.
    pub const NORMAL: Self = Self(SW_SHOWNORMAL);
    /// Hides the window.
    pub const HIDE: Self = Self(SW_HIDE);
    /// Minimizes the window.
    pub const MINIMIZE: Self = Self(SW_MINIMIZE);
    /// Maximizes the window.
    pub const MAXIMIZE: Self = Self(SW_MAXIMIZE);
    /// Restores a minimized or maximized window.
    pub const RESTORE: Self = Self(SW_RESTORE);
}

/// Buttons and icon of a message box, the raw `MB_*` flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageBoxStyle(pub u32);

impl MessageBoxStyle {
    /// An OK button.
    pub const OK: Self = Self(0x0000_0000);
    /// OK and Cancel buttons.
    pub const OK_CANCEL: Self = Self(0x0000_0001);
    /// Yes and No buttons.
    pub const YES_NO: Self = Self(0x0000_0004);
    /// A stop-sign icon.
    pub const ICON_ERROR: Self = Self(0x0000_0010);
    /// A question-mark icon.
    pub const ICON_QUESTION: Self = Self(0x0000_0020);
    /// An exclamation-point icon.
    pub const ICON_WARNING: Self = Self(0x0000_0030);
    /// An information icon.
    pub const ICON_INFORMATION: Self = Self(0x0000_0040);

    /// Combines two styles.
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The button that closed a message box (`IDOK`, `IDCANCEL`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DialogResult(pub i32);

impl DialogResult {
    /// OK.
    pub const OK: Self = Self(1);
    /// Cancel, or the box was closed.
    pub const CANCEL: Self = Self(2);
    /// Yes.
    pub const YES: Self = Self(6);
    /// No.
    pub const NO: Self = Self(7);
}

/// A window handle.
///
/// The null handle is a valid value meaning "no window"; methods that need
/// a live window report failure as an error instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hwnd(HWND);

impl Hwnd {
    /// The null handle.
    pub const NULL: Self = Self(HWND(std::ptr::null_mut()));

    /// Wraps a native handle.
    #[inline]
    pub const fn from_raw(hwnd: HWND) -> Self {
        Self(hwnd)
    }

    /// Returns the native handle.
    #[inline]
    pub const fn raw(self) -> HWND {
        self.0
    }

    /// Returns the handle as a pointer-sized integer, e.g. for `NMHDR::hwndFrom`
    /// comparisons or to cross thread boundaries.
    #[inline]
    pub fn as_isize(self) -> isize {
        self.0 .0 as isize
    }

    /// Rebuilds a handle from [`Hwnd::as_isize`].
    #[inline]
    pub fn from_isize(v: isize) -> Self {
        Self(HWND(v as *mut c_void))
    }

    /// Returns true for the null handle.
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 .0.is_null()
    }

    /// Returns true if the handle names an existing window.
    pub fn is_window(self) -> bool {
        // SAFETY: IsWindow accepts any value.
        unsafe { IsWindow(self.0) }.as_bool()
    }

    /// Returns the length of the window text, in UTF-16 units.
    pub fn text_length(self) -> Result<usize> {
        clear_last_error();
        // SAFETY: plain query on a handle value.
        let len = unsafe { GetWindowTextLengthW(self.0) };
        if len == 0 {
            last_error_code().check()?;
        }
        Ok(len as usize)
    }

    /// Returns the window text (caption, or contents for edit controls).
    pub fn text(self) -> Result<String> {
        let len = self.text_length()?;
        if len == 0 {
            return Ok(String::new());
        }
        let mut buf = WideBuf::new(len);
        clear_last_error();
        // SAFETY: the buffer is writable for its whole length.
        let copied = unsafe { GetWindowTextW(self.0, buf.as_mut_slice()) };
        if copied == 0 {
            last_error_code().check()?;
        }
        buf.to_string()
    }

    /// Sets the window text.
    pub fn set_text(self, text: &str) -> Result<()> {
        let text = WideString::new(text);
        // SAFETY: the string outlives the call.
        unsafe { SetWindowTextW(self.0, text.as_pcwstr())? };
        Ok(())
    }

    /// Shows or hides the window. Returns whether it was visible before.
    pub fn show(self, cmd: ShowCommand) -> bool {
        // SAFETY: plain call on a handle value.
        unsafe { ShowWindow(self.0, cmd.0) }.as_bool()
    }

    /// Enables or disables input. Returns whether it was disabled before.
    pub fn enable(self, enable: bool) -> bool {
        // SAFETY: plain call on a handle value.
        unsafe { EnableWindow(self.0, BOOL::from(enable)) }.as_bool()
    }

    /// Returns true if the window accepts input.
    pub fn is_enabled(self) -> bool {
        // SAFETY: plain query on a handle value.
        unsafe { IsWindowEnabled(self.0) }.as_bool()
    }

    /// Returns true if the window and all its ancestors are visible.
    pub fn is_visible(self) -> bool {
        // SAFETY: plain query on a handle value.
        unsafe { IsWindowVisible(self.0) }.as_bool()
    }

    /// Returns the size of the client area.
    pub fn client_rect(self) -> Result<Rect> {
        let mut rc = RECT::default();
        // SAFETY: `rc` is a valid out pointer.
        unsafe { GetClientRect(self.0, &mut rc)? };
        Ok(to_rect(rc))
    }

    /// Returns the client area size.
    pub fn client_size(self) -> Result<Size> {
        let rc = self.client_rect()?;
        Ok(Size::new(rc.width, rc.height))
    }

    /// Returns the window rectangle in screen coordinates.
    pub fn window_rect(self) -> Result<Rect> {
        let mut rc = RECT::default();
        // SAFETY: `rc` is a valid out pointer.
        unsafe { GetWindowRect(self.0, &mut rc)? };
        Ok(to_rect(rc))
    }

    /// Moves and resizes the window.
    pub fn move_window(self, rc: Rect, repaint: bool) -> Result<()> {
        // SAFETY: plain call on a handle value.
        unsafe { MoveWindow(self.0, rc.x, rc.y, rc.width, rc.height, BOOL::from(repaint))? };
        Ok(())
    }

    /// Calls `SetWindowPos` with raw `SWP_*` flags.
    pub fn set_window_pos(self, insert_after: Hwnd, rc: Rect, flags: u32) -> Result<()> {
        // SAFETY: plain call on handle values.
        unsafe {
            SetWindowPos(
                self.0,
                insert_after.0,
                rc.x,
                rc.y,
                rc.width,
                rc.height,
                SET_WINDOW_POS_FLAGS(flags),
            )?
        };
        Ok(())
    }

    /// Gives the keyboard focus to the window. Returns the previous focus.
    pub fn set_focus(self) -> Result<Hwnd> {
        // A stale error would make "no previous focus" look like a failure.
        clear_last_error();
        // SAFETY: plain call on a handle value.
        let prev = unsafe { SetFocus(self.0) };
        match prev {
            Ok(h) => Ok(Hwnd(h)),
            // No previous focus is not a failure.
            Err(_) if last_error_code().is_success() => Ok(Hwnd::NULL),
            Err(e) => Err(e.into()),
        }
    }

    /// Marks the whole client area for repainting.
    pub fn invalidate(self, erase: bool) -> Result<()> {
        // SAFETY: a null rectangle means the whole client area.
        let ok = unsafe { InvalidateRect(self.0, None, BOOL::from(erase)) };
        if !ok.as_bool() {
            return Err(last_error());
        }
        Ok(())
    }

    /// Sends `WM_PAINT` immediately if the update region is not empty.
    pub fn update(self) -> Result<()> {
        // SAFETY: plain call on a handle value.
        let ok = unsafe { UpdateWindow(self.0) };
        if !ok.as_bool() {
            return Err(last_error());
        }
        Ok(())
    }

    /// Returns the parent or owner window, or the null handle for none.
    pub fn parent(self) -> Result<Hwnd> {
        clear_last_error();
        // SAFETY: plain query on a handle value.
        match unsafe { GetParent(self.0) } {
            Ok(h) => Ok(Hwnd(h)),
            Err(_) if last_error_code().is_success() => Ok(Hwnd::NULL),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the child with the given control ID.
    pub fn dlg_item(self, ctrl_id: u16) -> Result<Hwnd> {
        // SAFETY: plain query on a handle value.
        let h = unsafe { GetDlgItem(self.0, ctrl_id as i32)? };
        Ok(Hwnd(h))
    }

    /// Returns the control ID of a child window.
    pub fn dlg_ctrl_id(self) -> Result<u16> {
        // SAFETY: plain query on a handle value.
        let id = unsafe { GetDlgCtrlID(self.0) };
        if id == 0 {
            return Err(last_error());
        }
        Ok(id as u16)
    }

    /// Sends a message and waits for the window procedure to return.
    pub fn send_message(self, p: WndMsg) -> isize {
        // SAFETY: message parameters are the caller's contract with the receiver.
        unsafe { SendMessageW(self.0, p.msg, WPARAM(p.wparam), LPARAM(p.lparam)) }.0
    }

    /// Posts a message to the window's queue and returns immediately.
    pub fn post_message(self, p: WndMsg) -> Result<()> {
        // SAFETY: message parameters are the caller's contract with the receiver.
        unsafe { PostMessageW(self.0, p.msg, WPARAM(p.wparam), LPARAM(p.lparam))? };
        Ok(())
    }

    /// Starts (or resets) a timer delivering `WM_TIMER` every `elapse_ms`.
    pub fn set_timer(self, timer_id: usize, elapse_ms: u32) -> Result<usize> {
        // SAFETY: no TIMERPROC; notifications arrive as WM_TIMER.
        let id = unsafe { SetTimer(self.0, timer_id, elapse_ms, None) };
        if id == 0 {
            return Err(last_error());
        }
        Ok(id)
    }

    /// Stops a timer.
    pub fn kill_timer(self, timer_id: usize) -> Result<()> {
        // SAFETY: plain call on a handle value.
        unsafe { KillTimer(self.0, timer_id)? };
        Ok(())
    }

    fn long_ptr(self, index: WINDOW_LONG_PTR_INDEX) -> Result<isize> {
        clear_last_error();
        // SAFETY: plain query on a handle value.
        let v = unsafe { GetWindowLongPtrW(self.0, index) };
        if v == 0 {
            last_error_code().check()?;
        }
        Ok(v)
    }

    fn set_long_ptr(self, index: WINDOW_LONG_PTR_INDEX, value: isize) -> Result<isize> {
        clear_last_error();
        // SAFETY: the index is one of the documented slots.
        let prev = unsafe { SetWindowLongPtrW(self.0, index, value) };
        if prev == 0 {
            last_error_code().check()?;
        }
        Ok(prev)
    }

    /// Returns the `WS_*` style bits.
    pub fn style(self) -> Result<u32> {
        Ok(self.long_ptr(GWL_STYLE)? as u32)
    }

    /// Replaces the `WS_*` style bits.
    pub fn set_style(self, style: u32) -> Result<()> {
        self.set_long_ptr(GWL_STYLE, style as isize).map(|_| ())
    }

    /// Returns the `WS_EX_*` style bits.
    pub fn ex_style(self) -> Result<u32> {
        Ok(self.long_ptr(GWL_EXSTYLE)? as u32)
    }

    /// Returns the pointer-sized `GWLP_USERDATA` slot.
    pub fn user_data(self) -> Result<isize> {
        self.long_ptr(GWLP_USERDATA)
    }

    /// Stores a value in the `GWLP_USERDATA` slot. Returns the previous value.
    pub fn set_user_data(self, value: isize) -> Result<isize> {
        self.set_long_ptr(GWLP_USERDATA, value)
    }

    /// Destroys the window and its children.
    ///
    /// Only the thread that created the window may destroy it.
    pub fn destroy(self) -> Result<()> {
        // SAFETY: plain call on a handle value.
        unsafe { DestroyWindow(self.0)? };
        Ok(())
    }

    /// Shows a modal message box owned by this window.
    pub fn message_box(self, text: &str, caption: &str, style: MessageBoxStyle) -> Result<DialogResult> {
        let text = WideString::new(text);
        let caption = WideString::new(caption);
        // SAFETY: both strings outlive the modal loop.
        let ret = unsafe { MessageBoxW(self.0, text.as_pcwstr(), caption.as_pcwstr(), MESSAGEBOX_STYLE(style.0)) };
        if ret.0 == 0 {
            return Err(last_error());
        }
        Ok(DialogResult(ret.0))
    }

    /// Returns the DPI of the window's monitor.
    ///
    /// Systems without `GetDpiForWindow` report [`USER_DEFAULT_SCREEN_DPI`].
    pub fn dpi(self) -> u32 {
        match GET_DPI_FOR_WINDOW.get() {
            // SAFETY: signature fixed by the slot declaration.
            Some(f) => match unsafe { f(self.0) } {
                0 => USER_DEFAULT_SCREEN_DPI,
                dpi => dpi,
            },
            None => USER_DEFAULT_SCREEN_DPI,
        }
    }

    /// Scales a length in 96-DPI pixels to this window's DPI.
    pub fn scale(self, px: i32) -> i32 {
        (px as i64 * self.dpi() as i64 / USER_DEFAULT_SCREEN_DPI as i64) as i32
    }
}

impl From<HWND> for Hwnd {
    fn from(h: HWND) -> Self {
        Self(h)
    }
}

impl From<Hwnd> for HWND {
    fn from(h: Hwnd) -> Self {
        h.0
    }
}

pub(crate) fn to_rect(rc: RECT) -> Rect {
    Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top)
}

pub(crate) fn from_rect(r: Rect) -> RECT {
    RECT {
        left: r.x,
        top: r.y,
        right: r.x + r.width,
        bottom: r.y + r.height,
    }
}
