use super::{nm, BaseControl, GuiControl, NativeCreate};
use crate::error::{Error, Result};
use crate::events::WindowEvents;
use crate::handle::Hwnd;
use crate::layout::{status_bar_edges, Anchor, SbPart};
use crate::msg::{self, lo_word, NmHdr, WndMsg};
use crate::string::{WideBuf, WideString};
use crate::window::{ExStyle, GuiParent, Style};
use std::cell::RefCell;
use std::rc::Rc;
use windows::Win32::Foundation::POINT;

const SBARS_SIZEGRIP: u32 = 0x0100;

const SB_SETPARTS: u32 = 0x0404;
const SB_GETPARTS: u32 = 0x0406;
const SB_SETTEXTW: u32 = 0x040B;
const SB_GETTEXTLENGTHW: u32 = 0x040C;
const SB_GETTEXTW: u32 = 0x040D;

const MAX_PARTS: usize = 256;

#[repr(C)]
struct NmMouse {
    hdr: NmHdr,
    item_spec: usize,
    item_data: usize,
    pt: POINT,
    hit_info: isize,
}

/// A status bar docked at the bottom of its parent.
///
/// The bar follows the parent's size by itself, and its parts are laid out
/// again on each resize.
#[derive(Clone, Debug)]
pub struct StatusBar {
    base: Rc<BaseControl>,
    parts: Rc<RefCell<Vec<SbPart>>>,
}

impl GuiControl for StatusBar {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl StatusBar {
    /// Declares a status bar with the given parts, created with its parent.
    pub fn new(parent: &impl GuiParent, parts: &[SbPart]) -> Result<Self> {
        if parts.len() > MAX_PARTS {
            return Err(Error::custom(format!("A status bar has at most {MAX_PARTS} parts")));
        }
        let base = BaseControl::new(parent, None);
        let parts = Rc::new(RefCell::new(parts.to_vec()));

        let layout_parts = parts.clone();
        let parent_base = base.parent().clone();
        base.create(
            NativeCreate {
                class: "msctls_statusbar32",
                text: String::new(),
                position: (0, 0),
                size: (0, 0),
                style: Style::CHILD.with(Style::VISIBLE).with(Style(SBARS_SIZEGRIP)),
                ex_style: ExStyle::NONE,
                resize: Anchor::default(),
            },
            move |hwnd| {
                let initial = layout_parts.clone();
                parent_base.on().add_privileged(msg::WM_SIZE, move |p| {
                    // The bar moves itself when it sees the parent's WM_SIZE.
                    // Its reply carries nothing.
                    let _ = hwnd.send_message(p);
                    let width = lo_word(p.lparam as usize) as i32;
                    apply_parts(hwnd, width, &layout_parts.borrow());
                    Ok(())
                });
                let width = parent_base.hwnd().client_size()?.width;
                apply_parts(hwnd, width, &initial.borrow());
                Ok(())
            },
        )?;
        Ok(Self { base, parts })
    }

    /// Notifications sent by this status bar.
    pub fn on(&self) -> StatusBarEvents<'_> {
        StatusBarEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Replaces the parts.
    pub fn set_parts(&self, parts: Vec<SbPart>) -> Result<()> {
        if parts.len() > MAX_PARTS {
            return Err(Error::custom(format!("A status bar has at most {MAX_PARTS} parts")));
        }
        *self.parts.borrow_mut() = parts;
        let hwnd = self.hwnd();
        if !hwnd.is_null() {
            let width = self.base.parent().hwnd().client_size()?.width;
            apply_parts(hwnd, width, &self.parts.borrow());
        }
        Ok(())
    }

    /// Returns the number of parts currently shown.
    pub fn part_count(&self) -> u32 {
        self.base.send(SB_GETPARTS, 0, 0).max(0) as u32
    }

    /// Sets the text of a part.
    pub fn set_text(&self, part: u8, text: &str) -> Result<()> {
        let wide = WideString::new(text);
        if self.base.send(SB_SETTEXTW, part as usize, wide.as_ptr() as isize) == 0 {
            return Err(Error::not_found(format!("No status bar part {part}")));
        }
        Ok(())
    }

    /// Returns the text of a part.
    pub fn text(&self, part: u8) -> Result<String> {
        if part as u32 >= self.part_count() {
            return Err(Error::not_found(format!("No status bar part {part}")));
        }
        let len = lo_word(self.base.send(SB_GETTEXTLENGTHW, part as usize, 0) as usize);
        let mut buf = WideBuf::new(len as usize);
        self.base.send(SB_GETTEXTW, part as usize, buf.as_mut_ptr() as isize);
        buf.to_string()
    }
}

fn apply_parts(hwnd: Hwnd, width: i32, parts: &[SbPart]) {
    if parts.is_empty() {
        return;
    }
    let edges = status_bar_edges(width, parts);
    hwnd.send_message(WndMsg::new(SB_SETPARTS, edges.len(), edges.as_ptr() as isize));
}

/// Notification registration for a [`StatusBar`].
pub struct StatusBarEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl StatusBarEvents<'_> {
    /// `NM_CLICK`, with the clicked part, if any.
    pub fn nm_click<F>(&self, f: F)
    where
        F: Fn(Option<u32>) -> Result<()> + 'static,
    {
        self.parent.wm_notify(self.ctrl_id, nm::CLICK, move |p| {
            // SAFETY: status bars send an NMMOUSE with NM_CLICK.
            let nmm = unsafe { p.cast::<NmMouse>() };
            f(u32::try_from(nmm.item_spec as isize).ok())?;
            Ok(0)
        });
    }
}
