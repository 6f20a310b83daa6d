use super::{BaseControl, GuiControl, NativeCreate};
use crate::error::Result;
use crate::events::WindowEvents;
use crate::layout::Anchor;
use crate::string::WideString;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const ES_CENTER: u32 = 0x0001;
const ES_RIGHT: u32 = 0x0002;
const ES_MULTILINE: u32 = 0x0004;
const ES_PASSWORD: u32 = 0x0020;
const ES_AUTOVSCROLL: u32 = 0x0040;
const ES_AUTOHSCROLL: u32 = 0x0080;
const ES_WANTRETURN: u32 = 0x1000;
const ES_READONLY: u32 = 0x0800;
const ES_NUMBER: u32 = 0x2000;

const EM_GETSEL: u32 = 0x00B0;
const EM_SETSEL: u32 = 0x00B1;
const EM_GETLINECOUNT: u32 = 0x00BA;
const EM_REPLACESEL: u32 = 0x00C2;
const EM_LIMITTEXT: u32 = 0x00C5;
const EM_SETREADONLY: u32 = 0x00CF;

const EN_SETFOCUS: u16 = 0x0100;
const EN_KILLFOCUS: u16 = 0x0200;
const EN_CHANGE: u16 = 0x0300;
const EN_MAXTEXT: u16 = 0x0501;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Left-aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right-aligned.
    Right,
}

/// Options of [`Edit`].
#[derive(Debug, Clone)]
pub struct EditOpts {
    /// Initial text.
    pub text: String,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Several lines, with ENTER inserting a line break.
    pub multi_line: bool,
    /// Characters are shown as dots.
    pub password: bool,
    /// Text cannot be changed by the user.
    pub read_only: bool,
    /// Only digits can be typed.
    pub number: bool,
    /// Alignment.
    pub align: TextAlign,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for EditOpts {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: (0, 0),
            size: (100, 23),
            ctrl_id: None,
            multi_line: false,
            password: false,
            read_only: false,
            number: false,
            align: TextAlign::Left,
            style: Style::CHILD.with(Style::VISIBLE).with(Style::TABSTOP).with(Style::GROUP),
            resize: Anchor::default(),
        }
    }
}

impl EditOpts {
    fn edit_style(&self) -> u32 {
        let mut s = match self.align {
            TextAlign::Left => 0,
            TextAlign::Center => ES_CENTER,
            TextAlign::Right => ES_RIGHT,
        };
        if self.multi_line {
            s |= ES_MULTILINE | ES_WANTRETURN | ES_AUTOVSCROLL | Style::VSCROLL.0;
        } else {
            s |= ES_AUTOHSCROLL;
        }
        if self.password {
            s |= ES_PASSWORD;
        }
        if self.read_only {
            s |= ES_READONLY;
        }
        if self.number {
            s |= ES_NUMBER;
        }
        s
    }
}

/// A text box.
#[derive(Clone, Debug)]
pub struct Edit {
    base: Rc<BaseControl>,
}

impl GuiControl for Edit {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl Edit {
    /// Declares an edit control, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: EditOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let style = opts.style.with(Style(opts.edit_style()));
        base.create(
            NativeCreate {
                class: "Edit",
                text: opts.text,
                position: opts.position,
                size: opts.size,
                style,
                ex_style: ExStyle::CLIENTEDGE,
                resize: opts.resize,
            },
            |_| Ok(()),
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this edit.
    pub fn on(&self) -> EditEvents<'_> {
        EditEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Limits the text length, in characters. Zero restores the default.
    pub fn set_limit(&self, max_chars: usize) {
        self.base.send(EM_LIMITTEXT, max_chars, 0);
    }

    /// Makes the text read-only or editable.
    pub fn set_readonly(&self, read_only: bool) {
        self.base.send(EM_SETREADONLY, read_only as usize, 0);
    }

    /// Selects the whole text.
    pub fn select_all(&self) {
        self.set_selection(0, -1);
    }

    /// Returns the selection as start and end character positions.
    pub fn selection(&self) -> (u32, u32) {
        let mut start = 0u32;
        let mut end = 0u32;
        self.base.send(
            EM_GETSEL,
            &mut start as *mut u32 as usize,
            &mut end as *mut u32 as isize,
        );
        (start, end)
    }

    /// Selects a range; an `end` of -1 extends to the end of the text.
    pub fn set_selection(&self, start: i32, end: i32) {
        self.base.send(EM_SETSEL, start as usize, end as isize);
    }

    /// Replaces the selection with `text`, as an undoable edit.
    pub fn replace_selection(&self, text: &str) {
        let wide = WideString::new(text);
        self.base.send(EM_REPLACESEL, 1, wide.as_ptr() as isize);
    }

    /// Returns the number of lines; 1 for single-line edits.
    pub fn line_count(&self) -> u32 {
        self.base.send(EM_GETLINECOUNT, 0, 0) as u32
    }
}

/// Notification registration for an [`Edit`].
pub struct EditEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl EditEvents<'_> {
    /// `EN_CHANGE`, after the text changed and was redrawn.
    pub fn en_change<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, EN_CHANGE, f);
    }

    /// `EN_SETFOCUS`.
    pub fn en_set_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, EN_SETFOCUS, f);
    }

    /// `EN_KILLFOCUS`.
    pub fn en_kill_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, EN_KILLFOCUS, f);
    }

    /// `EN_MAXTEXT`, when typing hits the limit.
    pub fn en_max_text<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, EN_MAXTEXT, f);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util;
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_styles() {
        let single = EditOpts::default().edit_style();
        assert_eq!(single & ES_AUTOHSCROLL, ES_AUTOHSCROLL);
        assert_eq!(single & ES_MULTILINE, 0);

        let multi = EditOpts {
            multi_line: true,
            password: true,
            align: TextAlign::Right,
            ..Default::default()
        }
        .edit_style();
        assert_eq!(multi & ES_MULTILINE, ES_MULTILINE);
        assert_eq!(multi & ES_PASSWORD, ES_PASSWORD);
        assert_eq!(multi & ES_RIGHT, ES_RIGHT);
    }

    #[test]
    fn test_text_selection_and_change() {
        let wnd = test_util::parent();
        let edit = Edit::new(
            &wnd,
            EditOpts {
                text: "hello".to_owned(),
                ..Default::default()
            },
        )
        .unwrap();
        let changes = Rc::new(Cell::new(0));
        let c = changes.clone();
        edit.on().en_change(move || {
            c.set(c.get() + 1);
            Ok(())
        });

        wnd.create().unwrap();
        assert_eq!(edit.hwnd().text().unwrap(), "hello");

        edit.select_all();
        assert_eq!(edit.selection(), (0, 5));
        edit.set_selection(5, 5);
        edit.replace_selection(", world");
        assert_eq!(edit.hwnd().text().unwrap(), "hello, world");
        assert!(changes.get() >= 1);
        assert_eq!(edit.line_count(), 1);
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_multi_line_count() {
        let wnd = test_util::parent();
        let edit = Edit::new(
            &wnd,
            EditOpts {
                multi_line: true,
                size: (200, 100),
                text: "one\r\ntwo\r\nthree".to_owned(),
                ..Default::default()
            },
        )
        .unwrap();
        wnd.create().unwrap();
        assert_eq!(edit.line_count(), 3);
        test_util::teardown(&wnd);
    }
}
