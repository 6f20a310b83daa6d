use super::{BaseControl, GuiControl, NativeCreate};
use crate::error::Result;
use crate::layout::Anchor;
use crate::msg::WndMsg;
use crate::window::{ExStyle, GuiParent, Style};
use std::rc::Rc;

const PBS_SMOOTH: u32 = 0x01;
const PBS_MARQUEE: u32 = 0x08;

const PBM_SETPOS: u32 = 0x0402;
const PBM_DELTAPOS: u32 = 0x0403;
const PBM_SETSTEP: u32 = 0x0404;
const PBM_STEPIT: u32 = 0x0405;
const PBM_SETRANGE32: u32 = 0x0406;
const PBM_GETRANGE: u32 = 0x0407;
const PBM_GETPOS: u32 = 0x0408;
const PBM_SETMARQUEE: u32 = 0x040A;
const PBM_SETSTATE: u32 = 0x0410;

/// Look of a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStyle {
    /// Segmented, on unthemed systems.
    #[default]
    Standard,
    /// Continuous.
    Smooth,
    /// Indeterminate animation; see [`ProgressBar::set_marquee`].
    Marquee,
}

/// Color state of a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// Green.
    Normal,
    /// Red.
    Error,
    /// Yellow.
    Paused,
}

/// Options of [`ProgressBar`].
#[derive(Debug, Clone)]
pub struct ProgressBarOpts {
    /// Position in the parent's client area.
    pub position: (i32, i32),
    /// Size.
    pub size: (i32, i32),
    /// Control ID; `None` allocates one.
    pub ctrl_id: Option<u16>,
    /// Look.
    pub progress_style: ProgressStyle,
    /// Initial range.
    pub range: (i32, i32),
    /// Extra window style bits.
    pub style: Style,
    /// Behavior when the parent is resized.
    pub resize: Anchor,
}

impl Default for ProgressBarOpts {
    fn default() -> Self {
        Self {
            position: (0, 0),
            size: (200, 20),
            ctrl_id: None,
            progress_style: ProgressStyle::Smooth,
            range: (0, 100),
            style: Style::CHILD.with(Style::VISIBLE),
            resize: Anchor::default(),
        }
    }
}

/// A progress bar.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    base: Rc<BaseControl>,
}

impl GuiControl for ProgressBar {
    fn base(&self) -> &Rc<BaseControl> {
        &self.base
    }
}

impl ProgressBar {
    /// Declares a progress bar, created with its parent.
    pub fn new(parent: &impl GuiParent, opts: ProgressBarOpts) -> Result<Self> {
        let base = BaseControl::new(parent, opts.ctrl_id);
        let bits = match opts.progress_style {
            ProgressStyle::Standard => 0,
            ProgressStyle::Smooth => PBS_SMOOTH,
            ProgressStyle::Marquee => PBS_MARQUEE,
        };
        let (min, max) = opts.range;
        base.create(
            NativeCreate {
                class: "msctls_progress32",
                text: String::new(),
                position: opts.position,
                size: opts.size,
                style: opts.style.with(Style(bits)),
                ex_style: ExStyle::NONE,
                resize: opts.resize,
            },
            move |hwnd| {
                hwnd.send_message(WndMsg::new(PBM_SETRANGE32, min as usize, max as isize));
                Ok(())
            },
        )?;
        Ok(Self { base })
    }

    /// Sets the range.
    pub fn set_range(&self, min: i32, max: i32) {
        self.base.send(PBM_SETRANGE32, min as usize, max as isize);
    }

    /// Returns the range.
    pub fn range(&self) -> (i32, i32) {
        let low = self.base.send(PBM_GETRANGE, 1, 0) as i32;
        let high = self.base.send(PBM_GETRANGE, 0, 0) as i32;
        (low, high)
    }

    /// Sets the position.
    pub fn set_pos(&self, pos: i32) {
        self.base.send(PBM_SETPOS, pos as usize, 0);
    }

    /// Returns the position.
    pub fn pos(&self) -> i32 {
        self.base.send(PBM_GETPOS, 0, 0) as i32
    }

    /// Advances by the step increment.
    pub fn step(&self) {
        self.base.send(PBM_STEPIT, 0, 0);
    }

    /// Sets the step increment.
    pub fn set_step(&self, step: i32) {
        self.base.send(PBM_SETSTEP, step as usize, 0);
    }

    /// Advances by `delta`.
    pub fn advance(&self, delta: i32) {
        self.base.send(PBM_DELTAPOS, delta as usize, 0);
    }

    /// Starts or stops the marquee animation. Needs [`ProgressStyle::Marquee`].
    pub fn set_marquee(&self, enable: bool, interval_ms: u32) {
        self.base.send(PBM_SETMARQUEE, enable as usize, interval_ms as isize);
    }

    /// Sets the color state.
    pub fn set_state(&self, state: ProgressState) {
        let raw = match state {
            ProgressState::Normal => 1,
            ProgressState::Error => 2,
            ProgressState::Paused => 3,
        };
        self.base.send(PBM_SETSTATE, raw, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util;
    use super::*;

    #[test]
    fn test_position_arithmetic() {
        let wnd = test_util::parent();
        let pb = ProgressBar::new(
            &wnd,
            ProgressBarOpts {
                range: (0, 50),
                ..Default::default()
            },
        )
        .unwrap();
        wnd.create().unwrap();

        assert_eq!(pb.range(), (0, 50));
        pb.set_pos(10);
        assert_eq!(pb.pos(), 10);
        pb.set_step(5);
        pb.step();
        assert_eq!(pb.pos(), 15);
        pb.advance(-3);
        assert_eq!(pb.pos(), 12);
        pb.set_state(ProgressState::Paused);
        test_util::teardown(&wnd);
    }
}
