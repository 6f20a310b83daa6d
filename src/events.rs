//! Window message dispatch tables.
//!
//! [`WindowEvents`] maps integer keys to user callbacks:
//!
//! - plain messages, keyed by message ID;
//! - `WM_COMMAND`, keyed by `(control ID, notification code)`;
//! - `WM_NOTIFY`, keyed by `(control ID, notification code)`;
//! - `WM_TIMER`, keyed by timer ID.
//!
//! Windows and subclassed controls each own one table; the window procedure
//! feeds every message to [`WindowEvents::process`] and falls back to the
//! default procedure when it returns `None`.
//!
//! # Example
//!
//! ```
//! use ergonomic_win32::events::WindowEvents;
//! use ergonomic_win32::msg::{self, make_long, WndMsg};
//!
//! let events = WindowEvents::new();
//! events.wm_size(|size| {
//!     println!("{}x{}", size.client_width, size.client_height);
//!     Ok(())
//! });
//!
//! let size = WndMsg::new(msg::WM_SIZE, 0, make_long(640, 480) as isize);
//! // SAFETY: WM_SIZE carries no pointers.
//! let handled = unsafe { events.process(size) };
//! assert!(matches!(handled, Some(Ok(0))));
//! ```

use crate::error::Result;
use crate::msg::{self, wm, WndMsg};
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::atomic::{AtomicU16, Ordering};

type Handler = Rc<dyn Fn(WndMsg) -> Result<isize>>;

/// First control ID handed out by [`next_auto_ctrl_id`].
///
/// High enough to stay clear of IDs written by hand in resource scripts.
pub const FIRST_AUTO_CTRL_ID: u16 = 20_000;

static NEXT_CTRL_ID: AtomicU16 = AtomicU16::new(FIRST_AUTO_CTRL_ID);

/// Returns a fresh control ID for controls created without an explicit one.
///
/// After the last ID the sequence starts over at [`FIRST_AUTO_CTRL_ID`].
pub fn next_auto_ctrl_id() -> u16 {
    NEXT_CTRL_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
            Some(auto_ctrl_id_after(id))
        })
        .unwrap_or_else(|id| id)
}

/// The ID handed out after `id`. `0xFFFF` is skipped, since it reads as -1
/// (`IDC_STATIC`).
fn auto_ctrl_id_after(id: u16) -> u16 {
    match id.checked_add(1) {
        Some(next) if next != u16::MAX => next,
        _ => FIRST_AUTO_CTRL_ID,
    }
}

/// A map of handlers where registering an existing key replaces the handler.
struct HandlerMap<K> {
    name: &'static str,
    map: RefCell<HashMap<K, Handler>>,
}

impl<K: Eq + Hash + Copy + std::fmt::Debug> HandlerMap<K> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            map: RefCell::new(HashMap::new()),
        }
    }

    fn insert(&self, key: K, handler: Handler) {
        if self.map.borrow_mut().insert(key, handler).is_some() {
            log::warn!("{} handler for {:?} replaced", self.name, key);
        }
    }

    // The Rc is cloned out so the handler runs with the map unborrowed.
    fn get(&self, key: &K) -> Option<Handler> {
        self.map.borrow().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.map.borrow().len()
    }

    fn clear(&self) {
        self.map.borrow_mut().clear();
    }
}

/// The dispatch table of one window or subclassed control.
///
/// Handlers return `Result`; an error stops the message loop and is reported
/// by the function running it. Only one user handler exists per key: a second
/// registration replaces the first.
pub struct WindowEvents {
    msgs: HandlerMap<u32>,
    cmds: HandlerMap<(u16, u16)>,
    nfys: HandlerMap<(u16, i32)>,
    timers: HandlerMap<usize>,
    privileged: RefCell<HashMap<u32, Vec<Handler>>>,
}

impl Default for WindowEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WindowEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowEvents")
            .field("msgs", &self.msgs.len())
            .field("cmds", &self.cmds.len())
            .field("nfys", &self.nfys.len())
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl WindowEvents {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            msgs: HandlerMap::new("message"),
            cmds: HandlerMap::new("WM_COMMAND"),
            nfys: HandlerMap::new("WM_NOTIFY"),
            timers: HandlerMap::new("WM_TIMER"),
            privileged: RefCell::new(HashMap::new()),
        }
    }

    /// Returns true if no user handler is registered.
    ///
    /// Privileged hooks are not counted.
    pub fn is_empty(&self) -> bool {
        self.msgs.len() + self.cmds.len() + self.nfys.len() + self.timers.len() == 0
    }

    /// Drops every handler, privileged hooks included.
    ///
    /// Handlers often hold `Rc` clones of the window owning this table;
    /// clearing it when the window is destroyed releases those cycles.
    pub fn clear(&self) {
        self.msgs.clear();
        self.cmds.clear();
        self.nfys.clear();
        self.timers.clear();
        self.privileged.borrow_mut().clear();
    }

    /// Registers an internal hook which runs before the user handler.
    ///
    /// Hooks never count as handling the message, so the user handler or the
    /// default procedure still run afterwards.
    pub(crate) fn add_privileged<F>(&self, msg: u32, f: F)
    where
        F: Fn(WndMsg) -> Result<()> + 'static,
    {
        self.privileged
            .borrow_mut()
            .entry(msg)
            .or_default()
            .push(Rc::new(move |p| f(p).map(|_| 0)));
    }

    /// Runs the handler registered for a message.
    ///
    /// Returns `None` if no user handler matched, in which case the caller is
    /// expected to run the default window procedure.
    ///
    /// # Safety
    ///
    /// The message must be one the system delivered (or one built with valid
    /// parameters): for `WM_NOTIFY`, `lparam` must point to an `NMHDR`.
    pub unsafe fn process(&self, p: WndMsg) -> Option<Result<isize>> {
        let hooks = self.privileged.borrow().get(&p.msg).cloned();
        for hook in hooks.iter().flatten() {
            if let Err(e) = hook(p) {
                return Some(Err(e));
            }
        }

        let specific = match p.msg {
            msg::WM_COMMAND => {
                let cmd = wm::Command::from_msg(&p);
                self.cmds.get(&(cmd.ctrl_id, cmd.code))
            }
            msg::WM_NOTIFY if p.lparam != 0 => {
                let nfy = wm::Notify::from_msg(&p);
                self.nfys.get(&(nfy.id_from(), nfy.code()))
            }
            msg::WM_TIMER => self.timers.get(&p.wparam),
            _ => None,
        };

        let handler = specific.or_else(|| self.msgs.get(&p.msg))?;
        log::trace!("dispatching message {:#06x}", p.msg);
        Some(handler(p))
    }

    /// Handles any message, returning the value of the window procedure.
    pub fn wm<F>(&self, msg: u32, f: F)
    where
        F: Fn(WndMsg) -> Result<isize> + 'static,
    {
        self.msgs.insert(msg, Rc::new(f));
    }

    fn wm_unit<F>(&self, msg: u32, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm(msg, move |_| f().map(|_| 0));
    }

    /// `WM_CREATE`, sent once the window exists but before it is shown.
    ///
    /// Child controls created against this window already exist when the
    /// handler runs.
    pub fn wm_create<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_CREATE, f);
    }

    /// `WM_CLOSE`. Registering a handler replaces the default behavior of
    /// destroying the window; call `destroy` from the handler to keep it.
    pub fn wm_close<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_CLOSE, f);
    }

    /// `WM_DESTROY`.
    pub fn wm_destroy<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_DESTROY, f);
    }

    /// `WM_PAINT`. The handler must validate the update region, usually by
    /// creating a `PaintGuard`.
    pub fn wm_paint<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_PAINT, f);
    }

    /// `WM_SETFOCUS`.
    pub fn wm_set_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_SETFOCUS, f);
    }

    /// `WM_KILLFOCUS`.
    pub fn wm_kill_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_unit(msg::WM_KILLFOCUS, f);
    }

    /// `WM_SIZE`.
    pub fn wm_size<F>(&self, f: F)
    where
        F: Fn(wm::Size) -> Result<()> + 'static,
    {
        self.wm(msg::WM_SIZE, move |p| f(wm::Size::from_msg(&p)).map(|_| 0));
    }

    /// `WM_ACTIVATE`.
    pub fn wm_activate<F>(&self, f: F)
    where
        F: Fn(wm::Activate) -> Result<()> + 'static,
    {
        self.wm(msg::WM_ACTIVATE, move |p| f(wm::Activate::from_msg(&p)).map(|_| 0));
    }

    fn wm_mouse<F>(&self, msg: u32, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm(msg, move |p| f(wm::Mouse::from_msg(&p)).map(|_| 0));
    }

    /// `WM_MOUSEMOVE`.
    pub fn wm_mouse_move<F>(&self, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm_mouse(msg::WM_MOUSEMOVE, f);
    }

    /// `WM_LBUTTONDOWN`.
    pub fn wm_l_button_down<F>(&self, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm_mouse(msg::WM_LBUTTONDOWN, f);
    }

    /// `WM_LBUTTONUP`.
    pub fn wm_l_button_up<F>(&self, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm_mouse(msg::WM_LBUTTONUP, f);
    }

    /// `WM_LBUTTONDBLCLK`. The window class needs `CS_DBLCLKS`.
    pub fn wm_l_button_dbl_clk<F>(&self, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm_mouse(msg::WM_LBUTTONDBLCLK, f);
    }

    /// `WM_RBUTTONDOWN`.
    pub fn wm_r_button_down<F>(&self, f: F)
    where
        F: Fn(wm::Mouse) -> Result<()> + 'static,
    {
        self.wm_mouse(msg::WM_RBUTTONDOWN, f);
    }

    /// `WM_MOUSEWHEEL`.
    pub fn wm_mouse_wheel<F>(&self, f: F)
    where
        F: Fn(wm::MouseWheel) -> Result<()> + 'static,
    {
        self.wm(msg::WM_MOUSEWHEEL, move |p| f(wm::MouseWheel::from_msg(&p)).map(|_| 0));
    }

    /// `WM_KEYDOWN`.
    pub fn wm_key_down<F>(&self, f: F)
    where
        F: Fn(wm::Key) -> Result<()> + 'static,
    {
        self.wm(msg::WM_KEYDOWN, move |p| f(wm::Key::from_msg(&p)).map(|_| 0));
    }

    /// `WM_KEYUP`.
    pub fn wm_key_up<F>(&self, f: F)
    where
        F: Fn(wm::Key) -> Result<()> + 'static,
    {
        self.wm(msg::WM_KEYUP, move |p| f(wm::Key::from_msg(&p)).map(|_| 0));
    }

    /// `WM_CHAR`.
    pub fn wm_char<F>(&self, f: F)
    where
        F: Fn(wm::Char) -> Result<()> + 'static,
    {
        self.wm(msg::WM_CHAR, move |p| f(wm::Char::from_msg(&p)).map(|_| 0));
    }

    /// `WM_TIMER` for one timer ID.
    pub fn wm_timer<F>(&self, timer_id: usize, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.timers.insert(timer_id, Rc::new(move |_| f().map(|_| 0)));
    }

    /// `WM_COMMAND` for one control ID and notification code.
    pub fn wm_command<F>(&self, ctrl_id: u16, code: u16, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.cmds.insert((ctrl_id, code), Rc::new(move |_| f().map(|_| 0)));
    }

    /// `WM_COMMAND` sent by a menu item.
    pub fn wm_command_menu<F>(&self, item_id: u16, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_command(item_id, wm::Command::MENU, f);
    }

    /// `WM_COMMAND` sent by an accelerator.
    pub fn wm_command_accel<F>(&self, accel_id: u16, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.wm_command(accel_id, wm::Command::ACCELERATOR, f);
    }

    /// `WM_NOTIFY` for one control ID and notification code.
    ///
    /// The handler's return value becomes the window procedure's result,
    /// which some notifications interpret.
    pub fn wm_notify<F>(&self, id_from: u16, code: i32, f: F)
    where
        F: Fn(wm::Notify) -> Result<isize> + 'static,
    {
        self.nfys.insert(
            (id_from, code),
            Rc::new(move |p| {
                // SAFETY: only reached from `process`, whose contract makes a
                // WM_NOTIFY lparam point to an NMHDR.
                f(unsafe { wm::Notify::from_msg(&p) })
            }),
        );
    }

    /// An application message, `WM_APP + offset`.
    ///
    /// # Panics
    ///
    /// Panics if the message would collide with [`msg::WM_UI_THREAD`].
    pub fn wm_app<F>(&self, offset: u32, f: F)
    where
        F: Fn(WndMsg) -> Result<isize> + 'static,
    {
        assert!(
            offset < msg::WM_UI_THREAD - msg::WM_APP,
            "WM_APP + {offset:#x} is reserved"
        );
        self.wm(msg::WM_APP + offset, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::msg::{make_long, NmHdr};
    use std::cell::{Cell, RefCell};

    fn dispatch(events: &WindowEvents, p: WndMsg) -> Option<Result<isize>> {
        // SAFETY: the tests only build messages without pointers, or
        // WM_NOTIFY messages pointing to a live NmHdr.
        unsafe { events.process(p) }
    }

    #[test]
    fn test_unhandled_returns_none() {
        let events = WindowEvents::new();
        assert!(events.is_empty());
        assert!(dispatch(&events, WndMsg::new(msg::WM_PAINT, 0, 0)).is_none());
    }

    #[test]
    fn test_plain_message_routing() {
        let events = WindowEvents::new();
        let seen = Rc::new(Cell::new((0, 0)));
        let seen2 = seen.clone();
        events.wm_size(move |s| {
            seen2.set((s.client_width, s.client_height));
            Ok(())
        });
        events.wm(msg::WM_ERASEBKGND, |_| Ok(1));

        let r = dispatch(&events, WndMsg::new(msg::WM_SIZE, 0, make_long(320, 200) as isize));
        assert!(matches!(r, Some(Ok(0))));
        assert_eq!(seen.get(), (320, 200));

        let r = dispatch(&events, WndMsg::new(msg::WM_ERASEBKGND, 0, 0));
        assert!(matches!(r, Some(Ok(1))));
    }

    #[test]
    fn test_command_routing_by_id_and_code() {
        let events = WindowEvents::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        events.wm_command(100, 0, move || {
            l.borrow_mut().push("menu 100");
            Ok(())
        });
        let l = log.clone();
        events.wm_command(100, 5, move || {
            l.borrow_mut().push("code 5");
            Ok(())
        });
        let l = log.clone();
        events.wm(msg::WM_COMMAND, move |_| {
            l.borrow_mut().push("fallback");
            Ok(0)
        });

        dispatch(&events, WndMsg::new(msg::WM_COMMAND, make_long(100, 5) as usize, 0x10));
        dispatch(&events, WndMsg::new(msg::WM_COMMAND, make_long(100, 0) as usize, 0));
        dispatch(&events, WndMsg::new(msg::WM_COMMAND, make_long(7, 0) as usize, 0));

        assert_eq!(*log.borrow(), vec!["code 5", "menu 100", "fallback"]);
    }

    #[test]
    fn test_command_without_fallback_is_unhandled() {
        let events = WindowEvents::new();
        events.wm_command_accel(3, || Ok(()));
        let r = dispatch(&events, WndMsg::new(msg::WM_COMMAND, make_long(3, 0) as usize, 0));
        assert!(r.is_none());
        let r = dispatch(&events, WndMsg::new(msg::WM_COMMAND, make_long(3, 1) as usize, 0));
        assert!(matches!(r, Some(Ok(0))));
    }

    #[test]
    fn test_notify_routing() {
        let events = WindowEvents::new();
        events.wm_notify(12, -2, |nfy| Ok(nfy.id_from() as isize * 10));

        let hdr = NmHdr {
            hwnd_from: std::ptr::null_mut(),
            id_from: 12,
            code: (-2i32) as u32,
        };
        let p = WndMsg::new(msg::WM_NOTIFY, 12, &hdr as *const NmHdr as isize);
        assert!(matches!(dispatch(&events, p), Some(Ok(120))));

        let other = NmHdr { code: (-3i32) as u32, ..hdr };
        let p = WndMsg::new(msg::WM_NOTIFY, 12, &other as *const NmHdr as isize);
        assert!(dispatch(&events, p).is_none());
    }

    #[test]
    fn test_null_notify_is_not_dereferenced() {
        let events = WindowEvents::new();
        events.wm_notify(1, -2, |_| Ok(1));
        assert!(dispatch(&events, WndMsg::new(msg::WM_NOTIFY, 0, 0)).is_none());
    }

    #[test]
    fn test_timer_routing() {
        let events = WindowEvents::new();
        let ticks = Rc::new(Cell::new(0));
        let t = ticks.clone();
        events.wm_timer(7, move || {
            t.set(t.get() + 1);
            Ok(())
        });
        dispatch(&events, WndMsg::new(msg::WM_TIMER, 7, 0));
        dispatch(&events, WndMsg::new(msg::WM_TIMER, 8, 0));
        dispatch(&events, WndMsg::new(msg::WM_TIMER, 7, 0));
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_second_registration_replaces_first() {
        let events = WindowEvents::new();
        events.wm(msg::WM_USER, |_| Ok(1));
        events.wm(msg::WM_USER, |_| Ok(2));
        assert!(matches!(dispatch(&events, WndMsg::new(msg::WM_USER, 0, 0)), Some(Ok(2))));
    }

    #[test]
    fn test_privileged_runs_first_and_does_not_handle() {
        let events = WindowEvents::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        events.add_privileged(msg::WM_SIZE, move |_| {
            l.borrow_mut().push("layout");
            Ok(())
        });
        let l = log.clone();
        events.add_privileged(msg::WM_SIZE, move |_| {
            l.borrow_mut().push("status bar");
            Ok(())
        });
        assert!(events.is_empty());

        let size = WndMsg::new(msg::WM_SIZE, 0, 0);
        assert!(dispatch(&events, size).is_none());

        let l = log.clone();
        events.wm_size(move |_| {
            l.borrow_mut().push("user");
            Ok(())
        });
        assert!(dispatch(&events, size).is_some());
        assert_eq!(
            *log.borrow(),
            vec!["layout", "status bar", "layout", "status bar", "user"]
        );
    }

    #[test]
    fn test_privileged_error_short_circuits() {
        let events = WindowEvents::new();
        let ran = Rc::new(Cell::new(false));
        events.add_privileged(msg::WM_SIZE, |_| Err(Error::custom("layout failed")));
        let r = ran.clone();
        events.wm_size(move |_| {
            r.set(true);
            Ok(())
        });
        let res = dispatch(&events, WndMsg::new(msg::WM_SIZE, 0, 0));
        assert!(matches!(res, Some(Err(Error::Custom(_)))));
        assert!(!ran.get());
    }

    #[test]
    fn test_handler_error_propagates() {
        let events = WindowEvents::new();
        events.wm_create(|| Err(Error::custom("boom")));
        let res = dispatch(&events, WndMsg::new(msg::WM_CREATE, 0, 0));
        match res {
            Some(Err(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_handler_may_register_and_reenter() {
        let events = Rc::new(WindowEvents::new());
        let inner_ran = Rc::new(Cell::new(false));

        let ev = events.clone();
        let flag = inner_ran.clone();
        events.wm(msg::WM_USER, move |_| {
            // Registering while dispatching must not hit a RefCell conflict.
            let flag = flag.clone();
            ev.wm(msg::WM_USER + 1, move |_| {
                flag.set(true);
                Ok(5)
            });
            // Nested dispatch, like a SendMessage from inside a handler.
            let nested = dispatch(&ev, WndMsg::new(msg::WM_USER + 1, 0, 0));
            Ok(nested.and_then(|r| r.ok()).unwrap_or(-1))
        });

        let r = dispatch(&events, WndMsg::new(msg::WM_USER, 0, 0));
        assert!(matches!(r, Some(Ok(5))));
        assert!(inner_ran.get());
        events.clear();
    }

    #[test]
    fn test_clear_drops_handlers() {
        let events = WindowEvents::new();
        let token = Rc::new(());
        let held = token.clone();
        events.wm_paint(move || {
            let _ = &held;
            Ok(())
        });
        events.add_privileged(msg::WM_SIZE, |_| Ok(()));
        assert_eq!(Rc::strong_count(&token), 2);

        events.clear();
        assert!(events.is_empty());
        assert_eq!(Rc::strong_count(&token), 1);
        assert!(dispatch(&events, WndMsg::new(msg::WM_PAINT, 0, 0)).is_none());
    }

    #[test]
    fn test_wm_app_offsets() {
        let events = WindowEvents::new();
        events.wm_app(1, |p| Ok(p.wparam as isize));
        let r = dispatch(&events, WndMsg::new(msg::WM_APP + 1, 9, 0));
        assert!(matches!(r, Some(Ok(9))));
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn test_wm_app_rejects_ui_thread_message() {
        WindowEvents::new().wm_app(0x3FFF, |_| Ok(0));
    }

    #[test]
    fn test_auto_ctrl_ids_are_unique() {
        let a = next_auto_ctrl_id();
        let b = next_auto_ctrl_id();
        assert!(a >= FIRST_AUTO_CTRL_ID);
        assert_ne!(a, b);
    }

    #[test]
    fn test_auto_ctrl_ids_wrap_to_first() {
        assert_eq!(auto_ctrl_id_after(FIRST_AUTO_CTRL_ID), FIRST_AUTO_CTRL_ID + 1);
        assert_eq!(auto_ctrl_id_after(u16::MAX - 2), u16::MAX - 1);
        assert_eq!(auto_ctrl_id_after(u16::MAX - 1), FIRST_AUTO_CTRL_ID);
        assert_eq!(auto_ctrl_id_after(u16::MAX), FIRST_AUTO_CTRL_ID);
    }
}
