//! # Ergonomic Win32
//!
//! Safe, idiomatic Rust wrappers for the Win32 GUI stack.
//!
//! This crate covers the parts of Windows a desktop application is built from:
//!
//! - **Error Handling**: Win32 codes and `HRESULT`s with their system message text
//! - **Strings**: Conversion between Rust strings and null-terminated UTF-16
//! - **Messages**: Packing and decoding of window message parameters
//! - **Dispatch**: Closures registered per message, command, or notification
//! - **Windows**: Main windows, custom child windows, the message loop
//! - **Controls**: Buttons, edits, labels, list and combo boxes, list views,
//!   progress and status bars
//! - **GDI**: Device contexts, pens, brushes, fonts, and off-screen bitmaps
//! - **COM**: Apartments, instance creation, interface queries, `IDispatch`
//! - **Shell**: Shell items, file dialogs, taskbar progress
//! - **Direct2D**: Render targets, brushes, and DirectWrite text
//! - **DirectShow**: Filter graphs for media playback
//!
//! The error, string, guid, msg, events, and layout modules are portable; the
//! rest only exist on Windows.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> ergonomic_win32::error::Result<()> {
//! use ergonomic_win32::prelude::*;
//!
//! let wnd = WindowMain::new(WindowMainOpts {
//!     title: "Hello".to_owned(),
//!     ..Default::default()
//! });
//! let btn = Button::new(&wnd, ButtonOpts {
//!     text: "&Click me".to_owned(),
//!     position: (20, 20),
//!     ..Default::default()
//! })?;
//!
//! let wnd2 = wnd.clone();
//! btn.on().bn_clicked(move || {
//!     wnd2.hwnd().set_text("Clicked")?;
//!     Ok(())
//! });
//!
//! wnd.run_main(None)?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ## Feature Highlights
//!
//! ### Message Dispatch
//!
//! Handlers are closures. Registering twice for the same message replaces
//! the first handler; messages without one reach the default procedure.
//!
//! ```
//! use ergonomic_win32::events::WindowEvents;
//! use ergonomic_win32::msg::{WndMsg, WM_CLOSE};
//!
//! let events = WindowEvents::new();
//! events.wm_close(|| Ok(()));
//! // SAFETY: WM_CLOSE carries no pointers.
//! let handled = unsafe { events.process(WndMsg::new(WM_CLOSE, 0, 0)) };
//! assert!(handled.is_some());
//! ```
//!
//! ### Errors
//!
//! Every call returns [`error::Result`]. Code that prefers to stop at the
//! first failure opts in with [`error::OrPanic::or_panic`].
//!
//! ```
//! use ergonomic_win32::error::{ErrorCode, HResult};
//!
//! let hr = HResult::from_win32(ErrorCode::ACCESS_DENIED);
//! assert_eq!(hr.to_win32(), Some(ErrorCode::ACCESS_DENIED));
//! ```

#![warn(missing_docs)]

// Portable modules
pub mod error;
pub mod events;
pub mod guid;
pub mod layout;
pub mod msg;
pub mod string;

// Windows modules
#[cfg(windows)]
pub mod com;
#[cfg(windows)]
pub mod controls;
#[cfg(windows)]
pub mod d2d;
#[cfg(windows)]
pub mod dll;
#[cfg(windows)]
pub mod dshow;
#[cfg(windows)]
pub mod gdi;
#[cfg(windows)]
pub mod handle;
#[cfg(windows)]
pub mod shell;
#[cfg(windows)]
pub mod window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, ErrorCode, HResult, OrPanic, Result};
    pub use crate::events::WindowEvents;
    pub use crate::guid::Guid;
    pub use crate::layout::{Anchor, Horz, Rect, SbPart, Size, Vert};
    pub use crate::msg::{wm, WndMsg};
    pub use crate::string::{from_wide, to_wide, WideString};

    #[cfg(windows)]
    pub use crate::com::{Apartment, ComApartment, ComInterfaceExt};
    #[cfg(windows)]
    pub use crate::controls::{
        Button, ButtonOpts, ComboBox, ComboBoxOpts, Edit, EditOpts, GuiControl, Label, LabelOpts,
        ListBox, ListBoxOpts, ListView, ListViewOpts, ProgressBar, ProgressBarOpts, StatusBar,
    };
    #[cfg(windows)]
    pub use crate::error::ResultExt;
    #[cfg(windows)]
    pub use crate::handle::{Hwnd, ShowCommand};
    #[cfg(windows)]
    pub use crate::window::{
        ExStyle, GuiParent, Style, UiThread, WindowClassOpts, WindowControl, WindowControlOpts,
        WindowMain, WindowMainOpts,
    };
}
