//! Raw window messages and their typed parameters.
//!
//! A window procedure receives `(msg, wparam, lparam)`. [`WndMsg`] carries
//! that triple unchanged, and the structs in [`wm`] decode the packed
//! parameters of the messages this crate dispatches.

use std::ffi::c_void;

/// A raw window message, as received by a window procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WndMsg {
    /// The message identifier.
    pub msg: u32,
    /// First message parameter.
    pub wparam: usize,
    /// Second message parameter.
    pub lparam: isize,
}

impl WndMsg {
    /// Creates a new message.
    #[inline]
    pub const fn new(msg: u32, wparam: usize, lparam: isize) -> Self {
        Self { msg, wparam, lparam }
    }
}

/// `WM_NULL` message.
pub const WM_NULL: u32 = 0x0000;
/// `WM_CREATE` message.
pub const WM_CREATE: u32 = 0x0001;
/// `WM_DESTROY` message.
pub const WM_DESTROY: u32 = 0x0002;
/// `WM_MOVE` message.
pub const WM_MOVE: u32 = 0x0003;
/// `WM_SIZE` message.
pub const WM_SIZE: u32 = 0x0005;
/// `WM_ACTIVATE` message.
pub const WM_ACTIVATE: u32 = 0x0006;
/// `WM_SETFOCUS` message.
pub const WM_SETFOCUS: u32 = 0x0007;
/// `WM_KILLFOCUS` message.
pub const WM_KILLFOCUS: u32 = 0x0008;
/// `WM_ENABLE` message.
pub const WM_ENABLE: u32 = 0x000A;
/// `WM_SETTEXT` message.
pub const WM_SETTEXT: u32 = 0x000C;
/// `WM_GETTEXT` message.
pub const WM_GETTEXT: u32 = 0x000D;
/// `WM_GETTEXTLENGTH` message.
pub const WM_GETTEXTLENGTH: u32 = 0x000E;
/// `WM_PAINT` message.
pub const WM_PAINT: u32 = 0x000F;
/// `WM_CLOSE` message.
pub const WM_CLOSE: u32 = 0x0010;
/// `WM_QUIT` message.
pub const WM_QUIT: u32 = 0x0012;
/// `WM_ERASEBKGND` message.
pub const WM_ERASEBKGND: u32 = 0x0014;
/// `WM_SHOWWINDOW` message.
pub const WM_SHOWWINDOW: u32 = 0x0018;
/// `WM_GETMINMAXINFO` message.
pub const WM_GETMINMAXINFO: u32 = 0x0024;
/// `WM_SETFONT` message.
pub const WM_SETFONT: u32 = 0x0030;
/// `WM_NOTIFY` message.
pub const WM_NOTIFY: u32 = 0x004E;
/// `WM_NCCREATE` message.
pub const WM_NCCREATE: u32 = 0x0081;
/// `WM_NCDESTROY` message.
pub const WM_NCDESTROY: u32 = 0x0082;
/// `WM_KEYDOWN` message.
pub const WM_KEYDOWN: u32 = 0x0100;
/// `WM_KEYUP` message.
pub const WM_KEYUP: u32 = 0x0101;
/// `WM_CHAR` message.
pub const WM_CHAR: u32 = 0x0102;
/// `WM_SYSKEYDOWN` message.
pub const WM_SYSKEYDOWN: u32 = 0x0104;
/// `WM_SYSKEYUP` message.
pub const WM_SYSKEYUP: u32 = 0x0105;
/// `WM_COMMAND` message.
pub const WM_COMMAND: u32 = 0x0111;
/// `WM_SYSCOMMAND` message.
pub const WM_SYSCOMMAND: u32 = 0x0112;
/// `WM_TIMER` message.
pub const WM_TIMER: u32 = 0x0113;
/// `WM_HSCROLL` message.
pub const WM_HSCROLL: u32 = 0x0114;
/// `WM_VSCROLL` message.
pub const WM_VSCROLL: u32 = 0x0115;
/// `WM_CTLCOLORSTATIC` message.
pub const WM_CTLCOLORSTATIC: u32 = 0x0138;
/// `WM_MOUSEMOVE` message.
pub const WM_MOUSEMOVE: u32 = 0x0200;
/// `WM_LBUTTONDOWN` message.
pub const WM_LBUTTONDOWN: u32 = 0x0201;
/// `WM_LBUTTONUP` message.
pub const WM_LBUTTONUP: u32 = 0x0202;
/// `WM_LBUTTONDBLCLK` message.
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
/// `WM_RBUTTONDOWN` message.
pub const WM_RBUTTONDOWN: u32 = 0x0204;
/// `WM_RBUTTONUP` message.
pub const WM_RBUTTONUP: u32 = 0x0205;
/// `WM_MBUTTONDOWN` message.
pub const WM_MBUTTONDOWN: u32 = 0x0207;
/// `WM_MOUSEWHEEL` message.
pub const WM_MOUSEWHEEL: u32 = 0x020A;
/// `WM_DPICHANGED` message.
pub const WM_DPICHANGED: u32 = 0x02E0;
/// First message available to private window classes.
pub const WM_USER: u32 = 0x0400;
/// First message available to applications.
pub const WM_APP: u32 = 0x8000;

/// Private message used to run a closure on the thread that owns a window.
///
/// The last value of the `WM_APP` range, so user `WM_APP + n` messages never
/// collide with it.
pub const WM_UI_THREAD: u32 = WM_APP + 0x3FFF;

/// Returns the low-order word of a value.
#[inline]
pub const fn lo_word(v: usize) -> u16 {
    (v & 0xFFFF) as u16
}

/// Returns the high-order word of the low 32 bits of a value.
#[inline]
pub const fn hi_word(v: usize) -> u16 {
    ((v >> 16) & 0xFFFF) as u16
}

/// Returns the low-order byte of a word.
#[inline]
pub const fn lo_byte(v: u16) -> u8 {
    (v & 0xFF) as u8
}

/// Returns the high-order byte of a word.
#[inline]
pub const fn hi_byte(v: u16) -> u8 {
    (v >> 8) as u8
}

/// Packs two words, the way `MAKELONG` does.
#[inline]
pub const fn make_long(lo: u16, hi: u16) -> u32 {
    (lo as u32) | ((hi as u32) << 16)
}

/// Signed x coordinate packed in an `LPARAM`, the way `GET_X_LPARAM` does.
#[inline]
pub const fn get_x_lparam(lparam: isize) -> i32 {
    lo_word(lparam as usize) as i16 as i32
}

/// Signed y coordinate packed in an `LPARAM`, the way `GET_Y_LPARAM` does.
#[inline]
pub const fn get_y_lparam(lparam: isize) -> i32 {
    hi_word(lparam as usize) as i16 as i32
}

/// The common header of every `WM_NOTIFY` payload (`NMHDR`).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct NmHdr {
    /// Handle of the control sending the notification.
    pub hwnd_from: *mut c_void,
    /// Identifier of the control sending the notification.
    pub id_from: usize,
    /// Notification code. Common-control codes are negative when read as `i32`.
    pub code: u32,
}

/// Typed parameters of individual messages.
pub mod wm {
    use super::*;

    /// Why a window was resized (`WM_SIZE` `wparam`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum SizeRequest {
        /// Resized, but neither minimized nor maximized.
        Restored,
        /// Minimized.
        Minimized,
        /// Maximized.
        Maximized,
        /// Another window was restored.
        MaxShow,
        /// Another window was maximized.
        MaxHide,
        /// A value outside the documented set.
        Other(usize),
    }

    impl From<usize> for SizeRequest {
        fn from(v: usize) -> Self {
            match v {
                0 => Self::Restored,
                1 => Self::Minimized,
                2 => Self::Maximized,
                3 => Self::MaxShow,
                4 => Self::MaxHide,
                other => Self::Other(other),
            }
        }
    }

    /// `WM_SIZE` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Size {
        /// Resize kind.
        pub request: SizeRequest,
        /// New client area width.
        pub client_width: u16,
        /// New client area height.
        pub client_height: u16,
    }

    impl Size {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                request: p.wparam.into(),
                client_width: lo_word(p.lparam as usize),
                client_height: hi_word(p.lparam as usize),
            }
        }
    }

    /// `WM_COMMAND` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Command {
        /// Notification code; 0 for menus, 1 for accelerators.
        pub code: u16,
        /// Control, menu item or accelerator identifier.
        pub ctrl_id: u16,
        /// Raw handle of the control, null for menus and accelerators.
        pub ctrl_hwnd: isize,
    }

    impl Command {
        /// Notification code sent by menu items.
        pub const MENU: u16 = 0;
        /// Notification code sent by accelerators.
        pub const ACCELERATOR: u16 = 1;

        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                code: hi_word(p.wparam),
                ctrl_id: lo_word(p.wparam),
                ctrl_hwnd: p.lparam,
            }
        }

        /// Returns true if the command came from a menu item.
        pub fn is_menu(&self) -> bool {
            self.ctrl_hwnd == 0 && self.code == Self::MENU
        }

        /// Returns true if the command came from an accelerator.
        pub fn is_accelerator(&self) -> bool {
            self.ctrl_hwnd == 0 && self.code == Self::ACCELERATOR
        }
    }

    /// Virtual keys held down during a mouse message.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MouseKeys(pub u16);

    impl MouseKeys {
        /// Left button.
        pub const LBUTTON: u16 = 0x0001;
        /// Right button.
        pub const RBUTTON: u16 = 0x0002;
        /// Shift key.
        pub const SHIFT: u16 = 0x0004;
        /// Ctrl key.
        pub const CONTROL: u16 = 0x0008;
        /// Middle button.
        pub const MBUTTON: u16 = 0x0010;

        /// Returns true if all given flags are set.
        pub fn has(self, flags: u16) -> bool {
            self.0 & flags == flags
        }
    }

    /// Parameters of mouse button and move messages.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Mouse {
        /// Keys and buttons held down.
        pub vkeys: MouseKeys,
        /// Cursor x, in client coordinates.
        pub x: i32,
        /// Cursor y, in client coordinates.
        pub y: i32,
    }

    impl Mouse {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                vkeys: MouseKeys(lo_word(p.wparam)),
                x: get_x_lparam(p.lparam),
                y: get_y_lparam(p.lparam),
            }
        }
    }

    /// `WM_MOUSEWHEEL` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MouseWheel {
        /// Wheel rotation, in multiples of 120 per notch. Positive is away from the user.
        pub delta: i16,
        /// Keys and buttons held down.
        pub vkeys: MouseKeys,
        /// Cursor x, in screen coordinates.
        pub x: i32,
        /// Cursor y, in screen coordinates.
        pub y: i32,
    }

    impl MouseWheel {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                delta: hi_word(p.wparam) as i16,
                vkeys: MouseKeys(lo_word(p.wparam)),
                x: get_x_lparam(p.lparam),
                y: get_y_lparam(p.lparam),
            }
        }
    }

    /// Keystroke flags packed in the `lparam` of keyboard messages.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct KeyFlags {
        /// Auto-repeat count.
        pub repeat_count: u16,
        /// Hardware scan code.
        pub scan_code: u8,
        /// Extended key (right-hand Alt/Ctrl, arrows on the numeric pad...).
        pub is_extended: bool,
        /// Alt was held down.
        pub has_alt: bool,
        /// The key was down before this message.
        pub was_down: bool,
        /// The key is being released.
        pub is_released: bool,
    }

    impl KeyFlags {
        fn from_lparam(lparam: isize) -> Self {
            let l = lparam as usize;
            Self {
                repeat_count: lo_word(l),
                scan_code: ((l >> 16) & 0xFF) as u8,
                is_extended: (l >> 24) & 1 != 0,
                has_alt: (l >> 29) & 1 != 0,
                was_down: (l >> 30) & 1 != 0,
                is_released: (l >> 31) & 1 != 0,
            }
        }
    }

    /// `WM_KEYDOWN`/`WM_KEYUP` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Key {
        /// Virtual-key code.
        pub vkey_code: u16,
        /// Keystroke flags.
        pub flags: KeyFlags,
    }

    impl Key {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                vkey_code: lo_word(p.wparam),
                flags: KeyFlags::from_lparam(p.lparam),
            }
        }
    }

    /// `WM_CHAR` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Char {
        /// UTF-16 code unit of the character.
        pub char_code: u16,
        /// Keystroke flags.
        pub flags: KeyFlags,
    }

    impl Char {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                char_code: lo_word(p.wparam),
                flags: KeyFlags::from_lparam(p.lparam),
            }
        }

        /// Returns the character, if the code unit is not a surrogate half.
        pub fn as_char(&self) -> Option<char> {
            char::from_u32(self.char_code as u32)
        }
    }

    /// `WM_TIMER` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Timer {
        /// Timer identifier.
        pub timer_id: usize,
    }

    impl Timer {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self { timer_id: p.wparam }
        }
    }

    /// Activation state carried by `WM_ACTIVATE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum ActivateEvent {
        /// Deactivated.
        Inactive,
        /// Activated by something other than a mouse click.
        Active,
        /// Activated by a mouse click.
        ClickActive,
    }

    /// `WM_ACTIVATE` parameters.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Activate {
        /// What happened.
        pub event: ActivateEvent,
        /// The window is minimized.
        pub is_minimized: bool,
        /// Raw handle of the other window involved, possibly null.
        pub hwnd: isize,
    }

    impl Activate {
        /// Decodes the message.
        pub fn from_msg(p: &WndMsg) -> Self {
            Self {
                event: match lo_word(p.wparam) {
                    0 => ActivateEvent::Inactive,
                    2 => ActivateEvent::ClickActive,
                    _ => ActivateEvent::Active,
                },
                is_minimized: hi_word(p.wparam) != 0,
                hwnd: p.lparam,
            }
        }
    }

    /// `WM_NOTIFY` parameters.
    ///
    /// The header is copied when the message is decoded, so its fields stay
    /// readable after the handler returns. The rest of the payload belongs to
    /// the sender and is reachable only through the unsafe accessors.
    #[derive(Clone, Copy, Debug)]
    pub struct Notify {
        hdr: NmHdr,
        lparam: isize,
    }

    impl Notify {
        /// Decodes the `lparam` of a `WM_NOTIFY`.
        ///
        /// # Safety
        ///
        /// `p.lparam` must point to a valid `NMHDR`, possibly the head of a
        /// larger notification struct.
        pub unsafe fn from_msg(p: &WndMsg) -> Self {
            Self {
                hdr: *(p.lparam as *const NmHdr),
                lparam: p.lparam,
            }
        }

        /// Returns the header.
        pub fn nmhdr(&self) -> &NmHdr {
            &self.hdr
        }

        /// Identifier of the sending control, truncated to the 16 bits control IDs use.
        pub fn id_from(&self) -> u16 {
            self.hdr.id_from as u16
        }

        /// Notification code as a signed value.
        pub fn code(&self) -> i32 {
            self.hdr.code as i32
        }

        /// Raw handle of the sending control.
        pub fn hwnd_from(&self) -> *mut c_void {
            self.hdr.hwnd_from
        }

        /// The original `lparam`, which the sender frees once the message returns.
        ///
        /// # Safety
        ///
        /// The value must not be dereferenced after the handler returns.
        pub unsafe fn lparam(&self) -> isize {
            self.lparam
        }

        /// Reinterprets the payload as the full notification struct.
        ///
        /// # Safety
        ///
        /// `T` must be `#[repr(C)]`, start with an `NMHDR`, and be the struct
        /// the control actually sent for this notification code. The message
        /// must still be in flight: the reference is only valid inside the
        /// handler that received this value.
        pub unsafe fn cast<T>(&self) -> &T {
            &*(self.lparam as *const T)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::wm::*;
    use super::*;

    #[test]
    fn test_word_packing() {
        let v = make_long(0x1234, 0xABCD);
        assert_eq!(v, 0xABCD_1234);
        assert_eq!(lo_word(v as usize), 0x1234);
        assert_eq!(hi_word(v as usize), 0xABCD);
        assert_eq!(lo_byte(0xABCD), 0xCD);
        assert_eq!(hi_byte(0xABCD), 0xAB);
    }

    #[test]
    fn test_signed_coordinates() {
        // Multi-monitor setups produce negative coordinates.
        let lparam = make_long((-10i16) as u16, (-300i16) as u16) as isize;
        assert_eq!(get_x_lparam(lparam), -10);
        assert_eq!(get_y_lparam(lparam), -300);
    }

    #[test]
    fn test_size_decoding() {
        let p = WndMsg::new(WM_SIZE, 2, make_long(800, 600) as isize);
        let size = Size::from_msg(&p);
        assert_eq!(size.request, SizeRequest::Maximized);
        assert_eq!(size.client_width, 800);
        assert_eq!(size.client_height, 600);
        assert_eq!(SizeRequest::from(9), SizeRequest::Other(9));
    }

    #[test]
    fn test_command_decoding() {
        let p = WndMsg::new(WM_COMMAND, make_long(1001, 0) as usize, 0);
        let cmd = Command::from_msg(&p);
        assert_eq!(cmd.ctrl_id, 1001);
        assert!(cmd.is_menu());
        assert!(!cmd.is_accelerator());

        let p = WndMsg::new(WM_COMMAND, make_long(42, 0x0300) as usize, 0x5000);
        let cmd = Command::from_msg(&p);
        assert_eq!(cmd.code, 0x0300);
        assert_eq!(cmd.ctrl_hwnd, 0x5000);
        assert!(!cmd.is_menu());
    }

    #[test]
    fn test_mouse_decoding() {
        let p = WndMsg::new(
            WM_LBUTTONDOWN,
            (MouseKeys::LBUTTON | MouseKeys::SHIFT) as usize,
            make_long(15, 25) as isize,
        );
        let m = Mouse::from_msg(&p);
        assert_eq!((m.x, m.y), (15, 25));
        assert!(m.vkeys.has(MouseKeys::LBUTTON | MouseKeys::SHIFT));
        assert!(!m.vkeys.has(MouseKeys::CONTROL));
    }

    #[test]
    fn test_wheel_decoding() {
        let p = WndMsg::new(WM_MOUSEWHEEL, make_long(0, (-120i16) as u16) as usize, 0);
        assert_eq!(MouseWheel::from_msg(&p).delta, -120);
    }

    #[test]
    fn test_key_flags() {
        // Repeat 1, scan code 0x1E, extended, previously down, being released.
        let lparam = (1 | (0x1E << 16) | (1 << 24) | (1 << 30) | (1u32 << 31)) as isize;
        let key = Key::from_msg(&WndMsg::new(WM_KEYUP, 0x41, lparam));
        assert_eq!(key.vkey_code, 0x41);
        assert_eq!(key.flags.repeat_count, 1);
        assert_eq!(key.flags.scan_code, 0x1E);
        assert!(key.flags.is_extended);
        assert!(!key.flags.has_alt);
        assert!(key.flags.was_down);
        assert!(key.flags.is_released);
    }

    #[test]
    fn test_char_decoding() {
        let c = Char::from_msg(&WndMsg::new(WM_CHAR, 'é' as usize, 1));
        assert_eq!(c.as_char(), Some('é'));
        let half = Char::from_msg(&WndMsg::new(WM_CHAR, 0xD83D, 1));
        assert_eq!(half.as_char(), None);
    }

    #[test]
    fn test_activate_decoding() {
        let a = Activate::from_msg(&WndMsg::new(WM_ACTIVATE, make_long(2, 1) as usize, 0));
        assert_eq!(a.event, ActivateEvent::ClickActive);
        assert!(a.is_minimized);
        let a = Activate::from_msg(&WndMsg::new(WM_ACTIVATE, 0, 0));
        assert_eq!(a.event, ActivateEvent::Inactive);
    }

    #[test]
    fn test_notify_decoding() {
        let hdr = NmHdr {
            hwnd_from: std::ptr::null_mut(),
            id_from: 0x1_0007,
            code: (-2i32) as u32,
        };
        let p = WndMsg::new(WM_NOTIFY, 7, &hdr as *const NmHdr as isize);
        // SAFETY: lparam points to `hdr`, alive for the whole test.
        let nfy = unsafe { Notify::from_msg(&p) };
        assert_eq!(nfy.id_from(), 7);
        assert_eq!(nfy.code(), -2);
        assert!(nfy.hwnd_from().is_null());
    }

    #[test]
    fn test_notify_header_outlives_payload() {
        let nfy = {
            let hdr = Box::new(NmHdr {
                hwnd_from: std::ptr::null_mut(),
                id_from: 31,
                code: (-12i32) as u32,
            });
            let p = WndMsg::new(WM_NOTIFY, 31, &*hdr as *const NmHdr as isize);
            // SAFETY: lparam points to `hdr`, alive while decoding.
            unsafe { Notify::from_msg(&p) }
        };
        // The header was freed with its box; the copy is what remains.
        assert_eq!(nfy.id_from(), 31);
        assert_eq!(nfy.code(), -12);
        assert_eq!(nfy.nmhdr().id_from, 31);
    }

    #[test]
    fn test_ui_thread_message_in_app_range() {
        assert!(WM_UI_THREAD >= WM_APP && WM_UI_THREAD <= 0xBFFF);
    }

    #[cfg(windows)]
    #[test]
    fn test_constants_match_system_headers() {
        use windows::Win32::UI::WindowsAndMessaging as w;
        assert_eq!(WM_CREATE, w::WM_CREATE);
        assert_eq!(WM_SIZE, w::WM_SIZE);
        assert_eq!(WM_NOTIFY, w::WM_NOTIFY);
        assert_eq!(WM_COMMAND, w::WM_COMMAND);
        assert_eq!(WM_NCDESTROY, w::WM_NCDESTROY);
        assert_eq!(WM_MOUSEWHEEL, w::WM_MOUSEWHEEL);
        assert_eq!(WM_APP, w::WM_APP);
    }
}
