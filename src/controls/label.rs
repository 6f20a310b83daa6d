use super::{BaseControl, GuiControl, NativeCreate, TextAlign};
use crate::error::Result;
use crate::events::WindowEvents;
use crate::layout::Anchor;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const SS_CENTER: u32 = 0x0001;
const SS_RIGHT: u32 = 0x0002;
const SS_NOTIFY: u32 = 0x0100;

const STN_CLICKED: u16 = 0;
const STN_DBLCLK: u16 = 1;

/// Options of [`Label`].
#[derive(Debug, Clone)]
pub struct LabelOpts {
    /// Text.
    pub text: String,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Alignment.
    pub align: TextAlign,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for LabelOpts {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: (0, 0),
            size: (100, 20),
            ctrl_id: None,
            align: TextAlign::Left,
            style: Style::CHILD.with(Style::VISIBLE),
            resize: Anchor::default(),
        }
    }
}

/// A static text label. Its text is read and written through its `Hwnd`.
#[derive(Clone, Debug)]
pub struct Label {
    base: Rc<BaseControl>,
}

impl GuiControl for Label {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl Label {
    /// Declares a label, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: LabelOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let align = match opts.align {
            TextAlign::Left => 0,
            TextAlign::Center => SS_CENTER,
            TextAlign::Right => SS_RIGHT,
        };
        base.create(
            NativeCreate {
                class: "Static",
                text: opts.text,
                position: opts.position,
                size: opts.size,
                style: opts.style.with(Style(align | SS_NOTIFY)),
                ex_style: ExStyle::NONE,
                resize: opts.resize,
            },
            |_| Ok(()),
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this label.
    pub fn on(&self) -> LabelEvents<'_> {
        LabelEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }
}

/// Notification registration for a [`Label`].
pub struct LabelEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl LabelEvents<'_> {
    /// `STN_CLICKED`.
    pub fn stn_clicked<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, STN_CLICKED, f);
    }

    /// `STN_DBLCLK`.
    pub fn stn_dbl_clk<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, STN_DBLCLK, f);
    }
}
