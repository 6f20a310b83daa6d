//! Windows, window classes and the message loop.
//!
//! A window is a [`WindowBase`] behind an `Rc`: the handle plus its
//! [`WindowEvents`] table. The window procedure finds the base through
//! `GWLP_USERDATA` and feeds it every message. Two public kinds exist:
//!
//! - [`WindowMain`], a top-level window which runs the message loop;
//! - [`WindowControl`], a custom child window.
//!
//! Children, native controls included, may be declared before their parent
//! exists. Their creation is queued and runs when the parent receives
//! `WM_CREATE`, before the user's own `WM_CREATE` handler.
//!
//! ```no_run
//! use ergonomic_win32::prelude::*;
//!
//! let wnd = WindowMain::new(WindowMainOpts {
//!     title: "Hello".to_owned(),
//!     size: (400, 300),
//!     ..Default::default()
//! });
//! let wnd2 = wnd.clone();
//! wnd.on().wm_create(move || {
//!     wnd2.hwnd().set_text("Hello, world")?;
//!     Ok(())
//! });
//! wnd.run_main(None)?;
//! # Ok::<(), ergonomic_win32::error::Error>(())
//! ```

use crate::error::{last_error, Error, ErrorCode, Result};
use crate::events::{next_auto_ctrl_id, WindowEvents};
use crate::handle::{Hwnd, ShowCommand};
use crate::layout::{reposition, Anchor, Rect, Size};
use crate::msg::{self, wm, WndMsg};
use crate::string::WideString;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::ffi::c_void;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::HBRUSH;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW, GetWindowLongPtrW,
    IsDialogMessageW, LoadCursorW, LoadIconW, PeekMessageW, PostMessageW, PostQuitMessage,
    RegisterClassExW, TranslateMessage, CREATESTRUCTW, CW_USEDEFAULT, GWLP_USERDATA, HICON,
    HMENU, IDC_ARROW, IDC_CROSS, IDC_HAND, IDC_IBEAM, IDC_WAIT, MSG, PM_REMOVE, WINDOW_EX_STYLE,
    WINDOW_STYLE, WNDCLASSEXW, WNDCLASS_STYLES,
};

/// Window styles (`WS_*`), freely combined with control-specific bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Style(pub u32);

impl Style {
    /// A standard top-level window with title bar, borders and system menu.
    pub const OVERLAPPEDWINDOW: Self = Self(0x00CF_0000);
    /// A title bar.
    pub const CAPTION: Self = Self(0x00C0_0000);
    /// A window menu on the title bar.
    pub const SYSMENU: Self = Self(0x0008_0000);
    /// A minimize button.
    pub const MINIMIZEBOX: Self = Self(0x0002_0000);
    /// A sizing border.
    pub const THICKFRAME: Self = Self(0x0004_0000);
    /// Initially visible.
    pub const VISIBLE: Self = Self(0x1000_0000);
    /// A child window.
    pub const CHILD: Self = Self(0x4000_0000);
    /// A thin border.
    pub const BORDER: Self = Self(0x0080_0000);
    /// Receives focus with the TAB key.
    pub const TABSTOP: Self = Self(0x0001_0000);
    /// Starts a group for arrow-key navigation.
    pub const GROUP: Self = Self(0x0002_0000);
    /// Children are excluded when painting the parent.
    pub const CLIPCHILDREN: Self = Self(0x0200_0000);
    /// Siblings are excluded when painting.
    pub const CLIPSIBLINGS: Self = Self(0x0400_0000);
    /// A vertical scroll bar.
    pub const VSCROLL: Self = Self(0x0020_0000);
    /// A horizontal scroll bar.
    pub const HSCROLL: Self = Self(0x0010_0000);

    /// Combines two styles.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Extended window styles (`WS_EX_*`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExStyle(pub u32);

impl ExStyle {
    /// No extended styles.
    pub const NONE: Self = Self(0);
    /// A sunken 3D border.
    pub const CLIENTEDGE: Self = Self(0x0000_0200);
    /// Children take part in dialog keyboard navigation.
    pub const CONTROLPARENT: Self = Self(0x0001_0000);
    /// A raised border.
    pub const WINDOWEDGE: Self = Self(0x0000_0100);
    /// Accepts drag-and-drop files.
    pub const ACCEPTFILES: Self = Self(0x0000_0010);

    /// Combines two extended styles.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The system cursor shown over a window class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// The standard arrow.
    #[default]
    Arrow,
    /// A text insertion beam.
    IBeam,
    /// A pointing hand.
    Hand,
    /// An hourglass.
    Wait,
    /// A crosshair.
    Cross,
}

impl Cursor {
    fn id(self) -> PCWSTR {
        match self {
            Self::Arrow => IDC_ARROW,
            Self::IBeam => IDC_IBEAM,
            Self::Hand => IDC_HAND,
            Self::Wait => IDC_WAIT,
            Self::Cross => IDC_CROSS,
        }
    }
}

/// `COLOR_BTNFACE`, the usual dialog background.
pub const COLOR_BTNFACE: i32 = 15;
/// `COLOR_WINDOW`, the usual document background.
pub const COLOR_WINDOW: i32 = 5;

/// Window class options.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowClassOpts {
    /// Class name. When empty, a name is derived from the other options so
    /// windows with identical classes share one registration.
    pub class_name: String,
    /// `CS_*` class styles.
    pub style: u32,
    /// Cursor.
    pub cursor: Cursor,
    /// Background system color index, or `None` to paint everything yourself.
    pub background: Option<i32>,
    /// Icon resource ID in the executable.
    pub icon_id: Option<u16>,
}

impl Default for WindowClassOpts {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            // CS_DBLCLKS | CS_HREDRAW | CS_VREDRAW
            style: 0x0008 | 0x0002 | 0x0001,
            cursor: Cursor::Arrow,
            background: Some(COLOR_BTNFACE),
            icon_id: None,
        }
    }
}

impl WindowClassOpts {
    /// Returns the class name, generating one when none was given.
    pub fn resolved_name(&self) -> String {
        if !self.class_name.is_empty() {
            return self.class_name.clone();
        }
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("ErgonomicWin32.{:016x}", hasher.finish())
    }

    /// Registers the class with the shared window procedure.
    ///
    /// Registering a name twice is not an error.
    pub fn register(&self) -> Result<WideString> {
        let name = WideString::new(&self.resolved_name());
        // SAFETY: a null name returns the executable's module.
        let hinstance = unsafe { GetModuleHandleW(None)? };

        let icon = match self.icon_id {
            // SAFETY: MAKEINTRESOURCE; integer IDs travel in the pointer value.
            Some(id) => unsafe { LoadIconW(hinstance, PCWSTR(id as usize as *const u16))? },
            None => HICON::default(),
        };
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: WNDCLASS_STYLES(self.style),
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            hIcon: icon,
            // SAFETY: system cursors need no module.
            hCursor: unsafe { LoadCursorW(None, self.cursor.id())? },
            hbrBackground: match self.background {
                // The system maps (index + 1) to the color's brush.
                Some(idx) => HBRUSH((idx + 1) as isize as *mut c_void),
                None => HBRUSH::default(),
            },
            lpszClassName: name.as_pcwstr(),
            ..Default::default()
        };

        // SAFETY: `wc` and the name it points to are alive during the call.
        let atom = unsafe { RegisterClassExW(&wc) };
        if atom == 0 {
            let err = last_error();
            if err.win32_error_code() != Some(ErrorCode::CLASS_ALREADY_EXISTS) {
                return Err(err);
            }
        } else {
            log::debug!("registered window class {}", name.to_string_lossy());
        }
        Ok(name)
    }
}

/// State shared by every window kind.
pub struct WindowBase {
    hwnd: Cell<Hwnd>,
    events: WindowEvents,
    creation_hooks: RefCell<Vec<Box<dyn FnOnce(Hwnd) -> Result<()>>>>,
    is_main: bool,
}

impl std::fmt::Debug for WindowBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowBase")
            .field("hwnd", &self.hwnd.get())
            .field("is_main", &self.is_main)
            .finish()
    }
}

impl WindowBase {
    pub(crate) fn new(is_main: bool) -> Rc<Self> {
        Rc::new(Self {
            hwnd: Cell::new(Hwnd::NULL),
            events: WindowEvents::new(),
            creation_hooks: RefCell::new(Vec::new()),
            is_main,
        })
    }

    /// The window handle; null before creation and after destruction.
    pub fn hwnd(&self) -> Hwnd {
        self.hwnd.get()
    }

    /// The dispatch table.
    pub fn on(&self) -> &WindowEvents {
        &self.events
    }

    /// Runs `f` with this window's handle once it exists.
    ///
    /// If the window is already created `f` runs right away; otherwise it runs
    /// at `WM_CREATE`, after the hooks queued before it.
    pub(crate) fn on_created<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Hwnd) -> Result<()> + 'static,
    {
        let hwnd = self.hwnd();
        if hwnd.is_null() {
            self.creation_hooks.borrow_mut().push(Box::new(f));
            Ok(())
        } else {
            f(hwnd)
        }
    }

    fn run_creation_hooks(&self) -> Result<()> {
        let hooks = std::mem::take(&mut *self.creation_hooks.borrow_mut());
        hooks.into_iter().try_for_each(|hook| hook(self.hwnd()))
    }

    /// Keeps `child` anchored to this window's client area.
    ///
    /// Must be called once both windows exist.
    pub(crate) fn add_layout(&self, child: Hwnd, anchor: Anchor) -> Result<()> {
        if anchor.is_fixed() {
            return Ok(());
        }
        let orig_parent = self.hwnd().client_size()?;
        let orig_rect = child_rect(self.hwnd(), child)?;
        self.events.add_privileged(msg::WM_SIZE, move |p| {
            let size = wm::Size::from_msg(&p);
            if size.request == wm::SizeRequest::Minimized {
                return Ok(());
            }
            let new_parent = Size::new(size.client_width as i32, size.client_height as i32);
            child.move_window(reposition(anchor, orig_parent, orig_rect, new_parent), true)
        });
        Ok(())
    }

    /// Returns a handle other threads can use to run code on this window's thread.
    pub fn ui_thread(&self) -> Result<UiThread> {
        let hwnd = self.hwnd();
        if hwnd.is_null() {
            return Err(Error::invalid_handle("Window not created"));
        }
        Ok(UiThread {
            hwnd: hwnd.as_isize(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        self: &Rc<Self>,
        class: &WindowClassOpts,
        title: &str,
        style: Style,
        ex_style: ExStyle,
        rect: Rect,
        parent: Hwnd,
        ctrl_id: u16,
    ) -> Result<Hwnd> {
        if !self.hwnd().is_null() {
            return Err(Error::custom("Window already created"));
        }
        let class_name = class.register()?;
        let title = WideString::new(title);
        // SAFETY: a null name returns the executable's module.
        let hinstance = unsafe { GetModuleHandleW(None)? };

        // SAFETY: the strings are alive during the call; the base pointer is
        // picked up at WM_NCCREATE, which runs before CreateWindowExW returns.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(ex_style.0),
                class_name.as_pcwstr(),
                title.as_pcwstr(),
                WINDOW_STYLE(style.0),
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                parent.raw(),
                HMENU(ctrl_id as usize as *mut c_void),
                hinstance,
                Some(Rc::as_ptr(self) as *const c_void),
            )
        };
        // A failing WM_CREATE handler stored its own error; prefer it.
        match hwnd {
            Ok(h) => Ok(Hwnd::from_raw(h)),
            Err(e) => Err(take_callback_error().unwrap_or_else(|| e.into())),
        }
    }
}

/// Something child windows and controls can be placed on.
pub trait GuiParent {
    /// Shared window state.
    fn as_base(&self) -> &Rc<WindowBase>;

    /// The window handle.
    fn hwnd(&self) -> Hwnd {
        self.as_base().hwnd()
    }

    /// The dispatch table.
    fn on(&self) -> &WindowEvents {
        self.as_base().on()
    }
}

/// Options of [`WindowMain`].
#[derive(Clone, Debug)]
pub struct WindowMainOpts {
    /// Title bar text.
    pub title: String,
    /// Window class.
    pub class: WindowClassOpts,
    /// Window style.
    pub style: Style,
    /// Extended window style.
    pub ex_style: ExStyle,
    /// Position on screen; `CW_USEDEFAULT` lets the system choose.
    pub position: (i32, i32),
    /// Outer size of the window.
    pub size: (i32, i32),
    /// Route keyboard input through `IsDialogMessageW`, so TAB and arrow
    /// keys move between controls.
    pub process_dialog_messages: bool,
}

impl Default for WindowMainOpts {
    fn default() -> Self {
        Self {
            title: String::new(),
            class: WindowClassOpts::default(),
            style: Style::OVERLAPPEDWINDOW.with(Style::CLIPCHILDREN),
            ex_style: ExStyle::CONTROLPARENT,
            position: (CW_USEDEFAULT, CW_USEDEFAULT),
            size: (600, 400),
            process_dialog_messages: true,
        }
    }
}

/// The main window of an application. Destroying it ends the message loop.
#[derive(Clone, Debug)]
pub struct WindowMain {
    base: Rc<WindowBase>,
    opts: Rc<WindowMainOpts>,
}

impl GuiParent for WindowMain {
    fn as_base(&self) -> &Rc<WindowBase> {
        &self.base
    }
}

impl WindowMain {
    /// Declares a main window. Nothing is created until [`WindowMain::run_main`].
    pub fn new(opts: WindowMainOpts) -> Self {
        Self {
            base: WindowBase::new(true),
            opts: Rc::new(opts),
        }
    }

    /// The window handle; null before creation.
    pub fn hwnd(&self) -> Hwnd {
        self.base.hwnd()
    }

    /// The dispatch table.
    pub fn on(&self) -> &WindowEvents {
        self.base.on()
    }

    /// Creates the window without showing it or running a loop.
    pub fn create(&self) -> Result<()> {
        let o = &self.opts;
        let rect = Rect::new(o.position.0, o.position.1, o.size.0, o.size.1);
        self.base
            .create(&o.class, &o.title, o.style, o.ex_style, rect, Hwnd::NULL, 0)?;
        log::debug!("main window created: {:?}", self.hwnd());
        Ok(())
    }

    /// Creates and shows the window, then runs the message loop until it is
    /// destroyed.
    ///
    /// Returns the exit code, or the first error raised by a handler.
    pub fn run_main(&self, cmd_show: Option<ShowCommand>) -> Result<i32> {
        self.create()?;
        let hwnd = self.hwnd();
        hwnd.show(cmd_show.unwrap_or(ShowCommand::DEFAULT));
        hwnd.update()?;
        let dialog = self.opts.process_dialog_messages.then_some(hwnd);
        run_message_loop(dialog)
    }

    /// Asks the window to close, as the close button would.
    pub fn close(&self) -> Result<()> {
        self.hwnd().post_message(WndMsg::new(msg::WM_CLOSE, 0, 0))
    }

    /// Returns a handle for running code on this window's thread.
    pub fn ui_thread(&self) -> Result<UiThread> {
        self.base.ui_thread()
    }

    /// Runs `f` on a new thread.
    ///
    /// An error or panic in `f` is sent back to the UI thread, where it ends
    /// the message loop like an error raised by a handler.
    pub fn spawn_thread<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let ui = self.ui_thread()?;
        std::thread::Builder::new()
            .name("ui-worker".to_owned())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                    .unwrap_or_else(|p| Err(Error::callback(panic_message(p.as_ref()))));
                if let Err(e) = outcome {
                    log::error!("worker thread failed: {e}");
                    if let Err(post) = ui.run(move || Err(e)) {
                        log::error!("cannot report worker failure: {post}");
                    }
                }
            })?;
        Ok(())
    }
}

/// Options of [`WindowControl`].
#[derive(Clone, Debug)]
pub struct WindowControlOpts {
    /// Window class.
    pub class: WindowClassOpts,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Window style.
    pub style: Style,
    /// Extended window style.
    pub ex_style: ExStyle,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for WindowControlOpts {
    fn default() -> Self {
        Self {
            class: WindowClassOpts::default(),
            position: (0, 0),
            size: (100, 100),
            ctrl_id: None,
            style: Style::CHILD
                .with(Style::VISIBLE)
                .with(Style::TABSTOP)
                .with(Style::CLIPCHILDREN)
                .with(Style::CLIPSIBLINGS),
            ex_style: ExStyle::CLIENTEDGE,
            resize: Anchor::default(),
        }
    }
}

/// A custom child window with its own dispatch table.
#[derive(Clone, Debug)]
pub struct WindowControl {
    base: Rc<WindowBase>,
    ctrl_id: u16,
}

impl GuiParent for WindowControl {
    fn as_base(&self) -> &Rc<WindowBase> {
        &self.base
    }
}

impl WindowControl {
    /// Declares a child window, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: WindowControlOpts) -> Result<Self> {
        let ctrl_id = opts.ctrl_id.unwrap_or_else(next_auto_ctrl_id);
        let base = WindowBase::new(false);
        let me = Self { base, ctrl_id };

        let child = me.base.clone();
        let parent_base = parent.as_base().clone();
        parent.as_base().on_created(move |parent_hwnd| {
            let rect = Rect::new(opts.position.0, opts.position.1, opts.size.0, opts.size.1);
            let hwnd = child.create(&opts.class, "", opts.style, opts.ex_style, rect, parent_hwnd, ctrl_id)?;
            parent_base.add_layout(hwnd, opts.resize)
        })?;
        Ok(me)
    }

    /// The window handle; null before creation.
    pub fn hwnd(&self) -> Hwnd {
        self.base.hwnd()
    }

    /// The dispatch table.
    pub fn on(&self) -> &WindowEvents {
        self.base.on()
    }

    /// The control ID.
    pub fn ctrl_id(&self) -> u16 {
        self.ctrl_id
    }
}

/// Returns the child's rectangle in the parent's client coordinates.
pub(crate) fn child_rect(parent: Hwnd, child: Hwnd) -> Result<Rect> {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::Graphics::Gdi::ScreenToClient;

    let rc = child.window_rect()?;
    let mut pt = POINT { x: rc.x, y: rc.y };
    // SAFETY: `pt` is a valid in/out pointer.
    if !unsafe { ScreenToClient(parent.raw(), &mut pt) }.as_bool() {
        return Err(last_error());
    }
    Ok(Rect::new(pt.x, pt.y, rc.width, rc.height))
}

/// Marks a posted `WM_UI_THREAD` as carrying a closure from [`UiThread::run`].
const UI_THREAD_MAGIC: usize = 0x5549_5448;

type UiClosure = Box<dyn FnOnce() -> Result<()> + Send>;

/// A `Send` handle for running code on a window's thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UiThread {
    hwnd: isize,
}

impl UiThread {
    /// Queues `f` to run on the window's thread.
    ///
    /// An error returned by `f` ends the message loop. If the window is
    /// destroyed before the message is processed, `f` never runs.
    pub fn run<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let ptr = Box::into_raw(Box::new(Box::new(f) as UiClosure));
        let hwnd = HWND(self.hwnd as *mut c_void);
        // SAFETY: the receiver reclaims the box in `dispatch`.
        let posted = unsafe { PostMessageW(hwnd, msg::WM_UI_THREAD, WPARAM(UI_THREAD_MAGIC), LPARAM(ptr as isize)) };
        if let Err(e) = posted {
            // SAFETY: the message was not queued, so the box is still ours.
            drop(unsafe { Box::from_raw(ptr) });
            return Err(e.into());
        }
        Ok(())
    }
}

thread_local! {
    static CALLBACK_ERROR: RefCell<Option<Error>> = const { RefCell::new(None) };
}

/// Records a handler failure and asks the message loop to stop.
///
/// Only the first failure is kept.
pub(crate) fn report_callback_error(e: Error) {
    log::error!("window callback failed: {e}");
    CALLBACK_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(e);
        }
    });
    // SAFETY: only posts WM_QUIT to this thread's queue.
    unsafe { PostQuitMessage(1) };
}

pub(crate) fn take_callback_error() -> Option<Error> {
    CALLBACK_ERROR.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn panic_message(p: &(dyn Any + Send)) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = p.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}

/// Runs a callback invoked by the system, never letting a panic unwind into it.
///
/// Returns `None` if the callback failed; the failure is reported.
pub(crate) fn guarded<F>(f: F) -> Option<isize>
where
    F: FnOnce() -> Result<isize>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(r)) => Some(r),
        Ok(Err(e)) => {
            report_callback_error(e);
            None
        }
        Err(p) => {
            report_callback_error(Error::callback(panic_message(p.as_ref())));
            None
        }
    }
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let p = WndMsg::new(msg, wparam.0, lparam.0);
    match guarded(|| dispatch(Hwnd::from_raw(hwnd), p)) {
        Some(r) => LRESULT(r),
        // -1 aborts CreateWindowExW.
        None if msg == msg::WM_CREATE => LRESULT(-1),
        None if msg == msg::WM_NCCREATE => LRESULT(0),
        None => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn def_proc(hwnd: Hwnd, p: WndMsg) -> isize {
    // SAFETY: forwards the message unchanged.
    unsafe { DefWindowProcW(hwnd.raw(), p.msg, WPARAM(p.wparam), LPARAM(p.lparam)) }.0
}

unsafe fn dispatch(hwnd: Hwnd, p: WndMsg) -> Result<isize> {
    if p.msg == msg::WM_NCCREATE {
        let cs = &*(p.lparam as *const CREATESTRUCTW);
        let ptr = cs.lpCreateParams as *const WindowBase;
        if !ptr.is_null() {
            // The window holds a strong reference until WM_NCDESTROY.
            Rc::increment_strong_count(ptr);
            hwnd.set_user_data(ptr as isize)?;
            (*ptr).hwnd.set(hwnd);
        }
    }

    let ptr = GetWindowLongPtrW(hwnd.raw(), GWLP_USERDATA) as *const WindowBase;
    if ptr.is_null() {
        return Ok(def_proc(hwnd, p));
    }
    // Own a reference for the duration of the call, so a handler dropping the
    // last outside reference cannot free the base under us.
    Rc::increment_strong_count(ptr);
    let base = Rc::from_raw(ptr);

    if p.msg == msg::WM_UI_THREAD && p.wparam == UI_THREAD_MAGIC {
        let f = Box::from_raw(p.lparam as *mut UiClosure);
        f()?;
        return Ok(0);
    }
    if p.msg == msg::WM_CREATE {
        base.run_creation_hooks()?;
    }

    let ret = match base.events.process(p) {
        Some(r) => r,
        None => Ok(def_proc(hwnd, p)),
    };

    // Teardown runs whatever the handler returned.
    match p.msg {
        msg::WM_DESTROY if base.is_main => PostQuitMessage(0),
        msg::WM_NCDESTROY => {
            log::trace!("window {:?} destroyed", hwnd);
            base.events.clear();
            base.creation_hooks.borrow_mut().clear();
            base.hwnd.set(Hwnd::NULL);
            if let Err(e) = hwnd.set_user_data(0) {
                log::warn!("cannot detach window {:?}: {e}", hwnd);
            }
            // Release the reference taken at WM_NCCREATE.
            drop(Rc::from_raw(ptr));
        }
        _ => {}
    }
    ret
}

/// Runs the message loop until `WM_QUIT`.
///
/// With `dialog` set, keyboard input goes through `IsDialogMessageW` for
/// that window, which gives TAB navigation between its controls.
///
/// Returns the exit code posted with `WM_QUIT`, or the error that stopped
/// the loop.
pub fn run_message_loop(dialog: Option<Hwnd>) -> Result<i32> {
    let mut msg = MSG::default();
    loop {
        // SAFETY: `msg` is a valid out pointer.
        let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match ret.0 {
            -1 => return Err(last_error()),
            0 => break,
            _ => {}
        }
        if let Some(dlg) = dialog {
            // SAFETY: `msg` was filled by GetMessageW.
            if unsafe { IsDialogMessageW(dlg.raw(), &msg) }.as_bool() {
                continue;
            }
        }
        // SAFETY: `msg` was filled by GetMessageW.
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    match take_callback_error() {
        Some(e) => Err(e),
        None => Ok(msg.wParam.0 as i32),
    }
}

/// Dispatches queued messages without blocking.
///
/// Returns `Ok(true)` once `WM_QUIT` was seen, or the error raised by a
/// handler meanwhile.
pub fn process_pending_messages() -> Result<bool> {
    let mut msg = MSG::default();
    // SAFETY: `msg` is a valid out pointer.
    while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
        if msg.message == msg::WM_QUIT {
            return match take_callback_error() {
                Some(e) => Err(e),
                None => Ok(true),
            };
        }
        // SAFETY: `msg` was filled by PeekMessageW.
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn hidden_main(title: &str) -> WindowMain {
        WindowMain::new(WindowMainOpts {
            title: title.to_owned(),
            class: WindowClassOpts {
                class_name: "ErgonomicWin32.Test".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn pump_until(mut done: impl FnMut() -> bool) -> Result<()> {
        for _ in 0..200 {
            process_pending_messages()?;
            if done() {
                return Ok(());
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        panic!("timed out pumping messages");
    }

    #[test]
    fn test_generated_class_names() {
        let a = WindowClassOpts::default();
        let mut b = WindowClassOpts::default();
        assert_eq!(a.resolved_name(), b.resolved_name());
        b.cursor = Cursor::Hand;
        assert_ne!(a.resolved_name(), b.resolved_name());
        b.class_name = "Custom".to_owned();
        assert_eq!(b.resolved_name(), "Custom");
    }

    #[test]
    fn test_register_twice_is_ok() {
        let opts = WindowClassOpts {
            class_name: "ErgonomicWin32.Twice".to_owned(),
            ..Default::default()
        };
        opts.register().unwrap();
        opts.register().unwrap();
    }

    #[test]
    fn test_create_runs_hooks_then_handler() {
        let wnd = hidden_main("hooks");
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        wnd.as_base()
            .on_created(move |_| {
                o.borrow_mut().push("child");
                Ok(())
            })
            .unwrap();
        let o = order.clone();
        wnd.on().wm_create(move || {
            o.borrow_mut().push("user");
            Ok(())
        });

        wnd.create().unwrap();
        assert!(!wnd.hwnd().is_null());
        assert_eq!(wnd.hwnd().text().unwrap(), "hooks");
        assert_eq!(*order.borrow(), vec!["child", "user"]);
        wnd.hwnd().destroy().unwrap();
    }

    #[test]
    fn test_destroy_clears_events_and_quits() {
        let wnd = hidden_main("destroy");
        let token = Rc::new(());
        let held = token.clone();
        wnd.on().wm_paint(move || {
            let _ = &held;
            Ok(())
        });
        wnd.create().unwrap();
        wnd.hwnd().destroy().unwrap();

        assert!(wnd.hwnd().is_null());
        assert!(wnd.on().is_empty());
        assert_eq!(Rc::strong_count(&token), 1);
        assert!(process_pending_messages().unwrap());
    }

    #[test]
    fn test_failing_create_reports_error() {
        let wnd = hidden_main("failing");
        wnd.on().wm_create(|| Err(Error::custom("no resources")));
        let err = wnd.create().unwrap_err();
        assert_eq!(err.to_string(), "no resources");
        // Drain the WM_QUIT posted by the failure.
        let _ = process_pending_messages();
    }

    #[test]
    fn test_handler_panic_is_caught() {
        let wnd = hidden_main("panic");
        wnd.on().wm_app(1, |_| panic!("handler exploded"));
        wnd.create().unwrap();
        wnd.hwnd().send_message(WndMsg::new(msg::WM_APP + 1, 0, 0));
        let err = process_pending_messages().unwrap_err();
        assert!(matches!(err, Error::Callback(ref m) if m.contains("handler exploded")));
        wnd.hwnd().destroy().unwrap();
        let _ = process_pending_messages();
    }

    #[test]
    fn test_failing_nc_destroy_still_detaches() {
        let wnd = hidden_main("failing teardown");
        wnd.on().wm(msg::WM_NCDESTROY, |_| Err(Error::custom("teardown failed")));
        let before = Rc::strong_count(&wnd.base);

        wnd.create().unwrap();
        assert_eq!(Rc::strong_count(&wnd.base), before + 1);
        wnd.hwnd().destroy().unwrap();

        let err = take_callback_error().unwrap();
        assert_eq!(err.to_string(), "teardown failed");
        assert!(wnd.hwnd().is_null());
        assert!(wnd.on().is_empty());
        assert_eq!(Rc::strong_count(&wnd.base), before);
        let _ = process_pending_messages();
    }

    #[test]
    fn test_ui_thread_runs_closure() {
        let wnd = hidden_main("ui thread");
        wnd.create().unwrap();
        let ui = wnd.ui_thread().unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        std::thread::spawn(move || {
            ui.run(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
        })
        .join()
        .unwrap()
        .unwrap();

        pump_until(|| ran.load(Ordering::SeqCst)).unwrap();
        wnd.hwnd().destroy().unwrap();
        let _ = process_pending_messages();
    }

    #[test]
    fn test_ui_thread_requires_window() {
        let wnd = hidden_main("not created");
        assert!(wnd.ui_thread().is_err());
        // Posting to a stale handle fails and frees the closure.
        let stale = UiThread { hwnd: 0x7FFF_FFF0 };
        assert!(stale.run(|| Ok(())).is_err());
    }

    #[test]
    fn test_child_window_created_with_parent() {
        let wnd = hidden_main("parent");
        let child = WindowControl::new(
            &wnd,
            WindowControlOpts {
                position: (10, 10),
                size: (50, 40),
                resize: Anchor::new(crate::layout::Horz::Resize, crate::layout::Vert::None),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(child.hwnd().is_null());

        wnd.create().unwrap();
        assert!(!child.hwnd().is_null());
        assert_eq!(child.hwnd().dlg_ctrl_id().unwrap(), child.ctrl_id());

        let before = child.hwnd().window_rect().unwrap();
        let outer = wnd.hwnd().window_rect().unwrap();
        wnd.hwnd()
            .move_window(Rect::new(outer.x, outer.y, outer.width + 100, outer.height), true)
            .unwrap();
        let after = child.hwnd().window_rect().unwrap();
        assert_eq!(after.width, before.width + 100);
        assert_eq!(after.height, before.height);

        wnd.hwnd().destroy().unwrap();
        let _ = process_pending_messages();
    }
}
