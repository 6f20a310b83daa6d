use super::{item_text, opt_index, BaseControl, GuiControl, NativeCreate};
use crate::error::{Error, Result};
use crate::events::WindowEvents;
use crate::layout::Anchor;
use crate::msg::WndMsg;
use crate::string::WideString;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const LBS_NOTIFY: u32 = 0x0001;
const LBS_MULTIPLESEL: u32 = 0x0008;
const LBS_NOINTEGRALHEIGHT: u32 = 0x0100;
const LBS_HASSTRINGS: u32 = 0x0040;

const LB_ADDSTRING: u32 = 0x0180;
const LB_INSERTSTRING: u32 = 0x0181;
const LB_DELETESTRING: u32 = 0x0182;
const LB_RESETCONTENT: u32 = 0x0184;
const LB_SETCURSEL: u32 = 0x0186;
const LB_GETCURSEL: u32 = 0x0188;
const LB_GETTEXT: u32 = 0x0189;
const LB_GETTEXTLEN: u32 = 0x018A;
const LB_GETCOUNT: u32 = 0x018B;

const LB_ERR: isize = -1;

const LBN_SELCHANGE: u16 = 1;
const LBN_DBLCLK: u16 = 2;

/// Options of [`ListBox`].
#[derive(Debug, Clone)]
pub struct ListBoxOpts {
    /// Initial items.
    pub items: Vec<String>,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Allow several selected items.
    pub multi_select: bool,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for ListBoxOpts {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            position: (0, 0),
            size: (120, 120),
            ctrl_id: None,
            multi_select: false,
            style: Style::CHILD
                .with(Style::VISIBLE)
                .with(Style::TABSTOP)
                .with(Style::GROUP)
                .with(Style::VSCROLL),
            resize: Anchor::default(),
        }
    }
}

/// A list of strings.
#[derive(Clone, Debug)]
pub struct ListBox {
    base: Rc<BaseControl>,
}

impl GuiControl for ListBox {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl ListBox {
    /// Declares a list box, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: ListBoxOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let mut bits = LBS_NOTIFY | LBS_HASSTRINGS | LBS_NOINTEGRALHEIGHT;
        if opts.multi_select {
            bits |= LBS_MULTIPLESEL;
        }
        let items = opts.items;
        base.create(
            NativeCreate {
                class: "ListBox",
                text: String::new(),
                position: opts.position,
                size: opts.size,
                style: opts.style.with(Style(bits)),
                ex_style: ExStyle::CLIENTEDGE,
                resize: opts.resize,
            },
            move |hwnd| {
                for item in &items {
                    let wide = WideString::new(item);
                    hwnd.send_message(WndMsg::new(LB_ADDSTRING, 0, wide.as_ptr() as isize));
                }
                Ok(())
            },
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this list box.
    pub fn on(&self) -> ListBoxEvents<'_> {
        ListBoxEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Appends a string and returns its index.
    pub fn add_string(&self, text: &str) -> Result<u32> {
        let wide = WideString::new(text);
        let idx = self.base.send(LB_ADDSTRING, 0, wide.as_ptr() as isize);
        opt_index(idx).ok_or_else(|| Error::custom("LB_ADDSTRING failed"))
    }

    /// Inserts a string at `index`; `None` appends.
    pub fn insert_string(&self, index: Option<u32>, text: &str) -> Result<u32> {
        let wide = WideString::new(text);
        let at = index.map_or(usize::MAX, |i| i as usize);
        let idx = self.base.send(LB_INSERTSTRING, at, wide.as_ptr() as isize);
        opt_index(idx).ok_or_else(|| Error::custom("LB_INSERTSTRING failed"))
    }

    /// Removes the string at `index`.
    pub fn delete_string(&self, index: u32) -> Result<()> {
        if self.base.send(LB_DELETESTRING, index as usize, 0) == LB_ERR {
            return Err(Error::not_found(format!("No item at index {index}")));
        }
        Ok(())
    }

    /// Returns the number of items.
    pub fn count(&self) -> u32 {
        opt_index(self.base.send(LB_GETCOUNT, 0, 0)).unwrap_or(0)
    }

    /// Returns the text of an item.
    pub fn item_text(&self, index: u32) -> Result<String> {
        item_text(self.hwnd(), LB_GETTEXTLEN, LB_GETTEXT, index, LB_ERR)
    }

    /// Returns the selected index of a single-selection list box.
    pub fn selected_index(&self) -> Option<u32> {
        opt_index(self.base.send(LB_GETCURSEL, 0, 0))
    }

    /// Selects an item; `None` clears the selection.
    pub fn set_selected_index(&self, index: Option<u32>) {
        let at = index.map_or(usize::MAX, |i| i as usize);
        self.base.send(LB_SETCURSEL, at, 0);
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.base.send(LB_RESETCONTENT, 0, 0);
    }
}

/// Notification registration for a [`ListBox`].
pub struct ListBoxEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl ListBoxEvents<'_> {
    /// `LBN_SELCHANGE`, when the user changes the selection.
    pub fn lbn_sel_change<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, LBN_SELCHANGE, f);
    }

    /// `LBN_DBLCLK`.
    pub fn lbn_dbl_clk<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, LBN_DBLCLK, f);
    }
}
