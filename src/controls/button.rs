use super::{BaseControl, GuiControl, NativeCreate};
use crate::error::Result;
use crate::events::WindowEvents;
use crate::layout::Anchor;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const BS_PUSHBUTTON: u32 = 0x0000;
const BS_DEFPUSHBUTTON: u32 = 0x0001;
const BS_CHECKBOX: u32 = 0x0002;
const BS_AUTOCHECKBOX: u32 = 0x0003;
const BS_RADIOBUTTON: u32 = 0x0004;
const BS_3STATE: u32 = 0x0005;
const BS_GROUPBOX: u32 = 0x0007;
const BS_AUTORADIOBUTTON: u32 = 0x0009;
const BS_NOTIFY: u32 = 0x4000;

const BM_GETCHECK: u32 = 0x00F0;
const BM_SETCHECK: u32 = 0x00F1;
const BM_CLICK: u32 = 0x00F5;

const BN_CLICKED: u16 = 0;
const BN_DBLCLK: u16 = 5;
const BN_SETFOCUS: u16 = 6;
const BN_KILLFOCUS: u16 = 7;

/// The kind of button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonKind {
    /// A push button.
    #[default]
    Push,
    /// A push button pressed by ENTER in a dialog.
    DefaultPush,
    /// A check box the application toggles.
    CheckBox,
    /// A check box that toggles itself.
    AutoCheckBox,
    /// A check box with an indeterminate state.
    ThreeState,
    /// A radio button the application selects.
    Radio,
    /// A radio button that selects itself and clears its group.
    AutoRadio,
    /// A frame with a caption grouping other controls.
    GroupBox,
}

impl ButtonKind {
    fn style(self) -> u32 {
        match self {
            Self::Push => BS_PUSHBUTTON,
            Self::DefaultPush => BS_DEFPUSHBUTTON,
            Self::CheckBox => BS_CHECKBOX,
            Self::AutoCheckBox => BS_AUTOCHECKBOX,
            Self::ThreeState => BS_3STATE,
            Self::Radio => BS_RADIOBUTTON,
            Self::AutoRadio => BS_AUTORADIOBUTTON,
            Self::GroupBox => BS_GROUPBOX,
        }
    }
}

/// Check state of check boxes and radio buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Cleared.
    Unchecked,
    /// Checked.
    Checked,
    /// Grayed, for three-state check boxes.
    Indeterminate,
}

impl CheckState {
    fn from_raw(v: isize) -> Self {
        match v {
            1 => Self::Checked,
            2 => Self::Indeterminate,
            _ => Self::Unchecked,
        }
    }

    fn raw(self) -> usize {
        match self {
            Self::Unchecked => 0,
            Self::Checked => 1,
            Self::Indeterminate => 2,
        }
    }
}

/// Options of [`Button`].
#[derive(Debug, Clone)]
pub struct ButtonOpts {
    /// Caption.
    pub text: String,
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Button kind.
    pub kind: ButtonKind,
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for ButtonOpts {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: (0, 0),
            size: (88, 26),
            ctrl_id: None,
            kind: ButtonKind::Push,
            style: Style::CHILD.with(Style::VISIBLE).with(Style::TABSTOP),
            resize: Anchor::default(),
        }
    }
}

/// A button, check box, radio button or group box.
#[derive(Clone, Debug)]
pub struct Button {
    base: Rc<BaseControl>,
}

impl GuiControl for Button {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl Button {
    /// Declares a button, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: ButtonOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        base.create(
            NativeCreate {
                class: "Button",
                text: opts.text,
                position: opts.position,
                size: opts.size,
                style: opts.style.with(Style(opts.kind.style() | BS_NOTIFY)),
                ex_style: ExStyle::NONE,
                resize: opts.resize,
            },
            |_| Ok(()),
        )?;
        Ok(Self { base })
    }

    /// Notifications sent by this button.
    pub fn on(&self) -> ButtonEvents<'_> {
        ButtonEvents {
            parent: self.base.parent_events(),
            ctrl_id: self.base.ctrl_id(),
        }
    }

    /// Clicks the button as the user would, firing `BN_CLICKED`.
    pub fn trigger_click(&self) {
        self.base.send(BM_CLICK, 0, 0);
    }

    /// Returns the check state.
    pub fn check_state(&self) -> CheckState {
        CheckState::from_raw(self.base.send(BM_GETCHECK, 0, 0))
    }

    /// Sets the check state.
    pub fn set_check_state(&self, state: CheckState) {
        self.base.send(BM_SETCHECK, state.raw(), 0);
    }

    /// Returns true if checked.
    pub fn is_checked(&self) -> bool {
        self.check_state() == CheckState::Checked
    }

    /// Checks or clears the button.
    pub fn set_checked(&self, checked: bool) {
        self.set_check_state(if checked {
            CheckState::Checked
        } else {
            CheckState::Unchecked
        });
    }
}

/// Notification registration for a [`Button`].
pub struct ButtonEvents<'a> {
    parent: &'a WindowEvents,
    ctrl_id: u16,
}

impl ButtonEvents<'_> {
    /// `BN_CLICKED`.
    pub fn bn_clicked<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, BN_CLICKED, f);
    }

    /// `BN_DBLCLK`.
    pub fn bn_dbl_clk<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, BN_DBLCLK, f);
    }

    /// `BN_SETFOCUS`.
    pub fn bn_set_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, BN_SETFOCUS, f);
    }

    /// `BN_KILLFOCUS`.
    pub fn bn_kill_focus<F>(&self, f: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.parent.wm_command(self.ctrl_id, BN_KILLFOCUS, f);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util;
    use super::*;
    use crate::msg::{self, make_long, WndMsg};
    use std::cell::Cell;

    #[test]
    fn test_kind_styles() {
        assert_eq!(ButtonKind::Push.style(), BS_PUSHBUTTON);
        assert_eq!(ButtonKind::AutoCheckBox.style(), BS_AUTOCHECKBOX);
        assert_eq!(ButtonKind::GroupBox.style(), BS_GROUPBOX);
    }

    #[test]
    fn test_click_fires_notification() {
        let wnd = test_util::parent();
        let btn = Button::new(
            &wnd,
            ButtonOpts {
                text: "&OK".to_owned(),
                ..Default::default()
            },
        )
        .unwrap();
        let clicks = Rc::new(Cell::new(0));
        let c = clicks.clone();
        btn.on().bn_clicked(move || {
            c.set(c.get() + 1);
            Ok(())
        });

        wnd.create().unwrap();
        assert_eq!(btn.hwnd().text().unwrap(), "&OK");
        // What the button sends its parent when clicked.
        let wparam = make_long(btn.ctrl_id(), BN_CLICKED) as usize;
        wnd.hwnd()
            .send_message(WndMsg::new(msg::WM_COMMAND, wparam, btn.hwnd().as_isize()));
        assert_eq!(clicks.get(), 1);
        test_util::teardown(&wnd);
    }

    #[test]
    fn test_check_state() {
        let wnd = test_util::parent();
        let chk = Button::new(
            &wnd,
            ButtonOpts {
                kind: ButtonKind::ThreeState,
                ..Default::default()
            },
        )
        .unwrap();
        wnd.create().unwrap();

        assert!(!chk.is_checked());
        chk.set_checked(true);
        assert!(chk.is_checked());
        chk.set_check_state(CheckState::Indeterminate);
        assert_eq!(chk.check_state(), CheckState::Indeterminate);
        test_util::teardown(&wnd);
    }
}
