use super::{item_text, opt_index, BaseControl, GuiControl, NativeCreate};
use crate::error::{Error, Result};
use crate::events::WindowEvents;
use crate::layout::Anchor;
use crate::msg::WndMsg;
use crate::string::WideString;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const CBS_DROPDOWN: u32 = 0x0002;
const CBS_DROPDOWNLIST: u32 = 0x0003;
const CBS_AUTOHSCROLL: u32 = 0x0040;
const CBS_HASSTRINGS: u32 = 0x0200;

const CB_ADDSTRING: u32 = 0x0143;
const CB_GETCOUNT: u32 = 0x0146;
const CB_GETCURSEL: u32 = 0x0147;
const CB_GETLBTEXT: u32 = 0x0148;
const CB_GETLBTEXTLEN: u32 = 0x0149;
const CB_RESETCONTENT: u32 = 0x014B;
const CB_SETCURSEL: u32 = 0x014E;

const CB_ERR: isize = -1;

const CBN_SELCHANGE: u16 = 1;
const CBN_EDITCHANGE: u16 = 5;
const CBN_DROPDOWN: u16 = 7;
const CBN_CLOSEUP: u16 = 8;

/// Options of [`ComboBox`].
#[derive(Debug, Clone)]
pub struct ComboBoxOpts {
    /// Initial items.
    pub items: Vec<String>,
    /// Initially selected item.
    pub selected_item: Option<u32>,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Width; the height is set by the system.
    pub width: i32,
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// The user can type text not in the list.
    pub editable: bool,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for ComboBoxOpts {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected_item: None,
            position: (0, 0),
            width: 120,
            ctrl_id: None,
            editable: false,
            style: Style::CHILD.with(Style::VISIBLE).with(Style::TABSTOP).with(Style::GROUP),
            resize: Anchor::default(),
        }
    }
}

/// A drop-down list, optionally editable.
#[derive(Clone, Debug)]
pub struct ComboBox {
    base: Rc<BaseControl>,
}

impl GuiControl for ComboBox {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl ComboBox {
    /// Declares a combo box, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: ComboBoxOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let kind = if opts.editable {
            CBS_DROPDOWN | CBS_AUTOHSCROLL
        } else {
            CBS_DROPDOWNLIST
        };
        let items = opts.items;
        let selected = opts.selected_item;
        base.create(
            NativeCreate {
                class: "ComboBox",
                text: String::new(),
                position: opts.position,
                // The height covers the drop-down part.
                size: (opts.width, 200),
                style: opts.style.with(Style(kind | CBS_HASSTRINGS)),
                ex_style: ExStyle::NONE,
                resize: opts.resize,
            },
            move |hwnd| {
                for item in &items {
                    let wide = WideString::new(item);
                    hwnd.send_message(WndMsg::new(CB_ADDSTRING, 0, wide.as_ptr() as isize));
                }
                if let Some(idx) = selected {
                    hwnd.send_message(WndMsg::new(CB_SETCURSEL, idx as usize, 0));
                }
                Ok(())
            },
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this combo box.
    pub fn on(&self) -> ComboBoxEvents<'_> {
        ComboBoxEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Appends a string and returns its index.
    pub fn add_string(&self, text: &str) -> Result<u32> {
        let wide = WideString::new(text);
        let idx = self.base.send(CB_ADDSTRING, 0, wide.as_ptr() as isize);
        opt_index(idx).ok_or_else(|| Error::custom("CB_ADDSTRING failed"))
    }

    /// Returns the number of items.
    pub fn count(&self) -> u32 {
        opt_index(self.base.send(CB_GETCOUNT, 0, 0)).unwrap_or(0)
    }

    /// Returns the text of an item.
    pub fn item_text(&self, index: u32) -> Result<String> {
        item_text(self.hwnd(), CB_GETLBTEXTLEN, CB_GETLBTEXT, index, CB_ERR)
    }

    /// Returns the selected index.
    pub fn selected_index(&self) -> Option<u32> {
        opt_index(self.base.send(CB_GETCURSEL, 0, 0))
    }

    /// Selects an item; `None` clears the selection.
    pub fn set_selected_index(&self, index: Option<u32>) {
        let at = index.map_or(usize::MAX, |i| i as usize);
        self.base.send(CB_SETCURSEL, at, 0);
    }

    /// Returns the text of the selected item.
    pub fn selected_text(&self) -> Result<Option<String>> {
        self.selected_index().map(|i| self.item_text(i)).transpose()
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.base.send(CB_RESETCONTENT, 0, 0);
    }
}

/// Notification registration for a [`ComboBox`].
pub struct ComboBoxEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl ComboBoxEvents<'_> {
    /// `CBN_SELCHANGE`.
    pub fn cbn_sel_change<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, CBN_SELCHANGE, f);
    }

    /// `CBN_EDITCHANGE`, for editable combo boxes.
    pub fn cbn_edit_change<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, CBN_EDITCHANGE, f);
    }

    /// `CBN_DROPDOWN`.
    pub fn cbn_drop_down<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, CBN_DROPDOWN, f);
    }

    /// `CBN_CLOSEUP`.
    pub fn cbn_close_up<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, CBN_CLOSEUP, f);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util;
    use super::*;

    #[test]
    fn test_selection() {
        let wnd = test_util::parent();
        let cb = ComboBox::new(
            &wnd,
            ComboBoxOpts {
                items: vec!["red".to_owned(), "green".to_owned()],
                selected_item: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        wnd.create().unwrap();

        assert_eq!(cb.count(), 2);
        assert_eq!(cb.selected_text().unwrap().as_deref(), Some("green"));
        assert_eq!(cb.add_string("blue").unwrap(), 2);
        cb.set_selected_index(None);
        assert_eq!(cb.selected_text().unwrap(), None);
        assert!(cb.item_text(7).is_err());
        cb.clear();
        assert_eq!(cb.count(), 0);
        test_util::teardown(&wnd);
    }
}
