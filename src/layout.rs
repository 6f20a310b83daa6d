//! Geometry for child controls that follow their parent's size.
//!
//! Controls created with anchors remember their rectangle and the parent's
//! client size at creation. Each `WM_SIZE` of the parent moves or stretches
//! them by the difference, which keeps margins constant.

/// Horizontal behavior when the parent is resized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Horz {
    /// Keep position and width.
    #[default]
    None,
    /// Move with the right edge of the parent.
    Repos,
    /// Stretch with the right edge of the parent.
    Resize,
}

/// Vertical behavior when the parent is resized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Vert {
    /// Keep position and height.
    #[default]
    None,
    /// Move with the bottom edge of the parent.
    Repos,
    /// Stretch with the bottom edge of the parent.
    Resize,
}

/// A rectangle as position plus size, in client coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, never negative after repositioning.
    pub width: i32,
    /// Height, never negative after repositioning.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

/// A width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// How a child follows its parent on both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Anchor {
    /// Horizontal behavior.
    pub horz: Horz,
    /// Vertical behavior.
    pub vert: Vert,
}

impl Anchor {
    /// Creates an anchor.
    pub const fn new(horz: Horz, vert: Vert) -> Self {
        Self { horz, vert }
    }

    /// Returns true if the child never moves.
    pub fn is_fixed(&self) -> bool {
        self.horz == Horz::None && self.vert == Vert::None
    }
}

/// Computes the new rectangle of a child after its parent was resized.
///
/// `orig_parent` and `orig_rect` are the parent's client size and the
/// child's rectangle when the child was created.
///
/// ```
/// use ergonomic_win32::layout::{reposition, Anchor, Horz, Rect, Size, Vert};
///
/// let ok_button = Rect::new(500, 400, 80, 24);
/// let moved = reposition(
///     Anchor::new(Horz::Repos, Vert::Repos),
///     Size::new(600, 440),
///     ok_button,
///     Size::new(800, 600),
/// );
/// assert_eq!(moved, Rect::new(700, 560, 80, 24));
/// ```
pub fn reposition(anchor: Anchor, orig_parent: Size, orig_rect: Rect, new_parent: Size) -> Rect {
    let dx = new_parent.width - orig_parent.width;
    let dy = new_parent.height - orig_parent.height;
    let mut r = orig_rect;

    match anchor.horz {
        Horz::None => {}
        Horz::Repos => r.x += dx,
        Horz::Resize => r.width = (r.width + dx).max(0),
    }
    match anchor.vert {
        Vert::None => {}
        Vert::Repos => r.y += dy,
        Vert::Resize => r.height = (r.height + dy).max(0),
    }
    r
}

/// Width of one status bar part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SbPart {
    /// A fixed width in pixels.
    Fixed(u32),
    /// A share of the width left over by fixed parts, relative to the other
    /// proportional parts.
    Proportional(u8),
}

/// Computes the right edges passed to `SB_SETPARTS`.
///
/// The last edge is always -1, so the final part extends to the border of
/// the status bar whatever the rounding.
///
/// ```
/// use ergonomic_win32::layout::{status_bar_edges, SbPart};
///
/// let parts = [SbPart::Fixed(100), SbPart::Proportional(1), SbPart::Proportional(1)];
/// assert_eq!(status_bar_edges(500, &parts), vec![100, 300, -1]);
/// ```
pub fn status_bar_edges(total_width: i32, parts: &[SbPart]) -> Vec<i32> {
    let fixed: i64 = parts
        .iter()
        .map(|p| match p {
            SbPart::Fixed(w) => *w as i64,
            SbPart::Proportional(_) => 0,
        })
        .sum();
    let weights: i64 = parts
        .iter()
        .map(|p| match p {
            SbPart::Fixed(_) => 0,
            SbPart::Proportional(w) => *w as i64,
        })
        .sum();
    let spare = (total_width as i64 - fixed).max(0);

    let mut edges = Vec::with_capacity(parts.len());
    let mut right = 0i64;
    for part in parts {
        right += match part {
            SbPart::Fixed(w) => *w as i64,
            SbPart::Proportional(_) if weights == 0 => 0,
            SbPart::Proportional(w) => spare * *w as i64 / weights,
        };
        edges.push(right.min(i32::MAX as i64) as i32);
    }
    if let Some(last) = edges.last_mut() {
        *last = -1;
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: Size = Size::new(400, 300);
    const CHILD: Rect = Rect::new(10, 20, 100, 50);

    #[test]
    fn test_fixed_anchor_does_not_move() {
        let r = reposition(Anchor::default(), PARENT, CHILD, Size::new(900, 900));
        assert_eq!(r, CHILD);
        assert!(Anchor::default().is_fixed());
    }

    #[test]
    fn test_repos_keeps_margin() {
        let anchor = Anchor::new(Horz::Repos, Vert::None);
        let r = reposition(anchor, PARENT, CHILD, Size::new(450, 280));
        assert_eq!(r, Rect::new(60, 20, 100, 50));
    }

    #[test]
    fn test_resize_stretches() {
        let anchor = Anchor::new(Horz::Resize, Vert::Resize);
        let r = reposition(anchor, PARENT, CHILD, Size::new(500, 350));
        assert_eq!(r, Rect::new(10, 20, 200, 100));
    }

    #[test]
    fn test_resize_never_negative() {
        let anchor = Anchor::new(Horz::Resize, Vert::Resize);
        let r = reposition(anchor, PARENT, CHILD, Size::new(0, 0));
        assert_eq!((r.width, r.height), (0, 0));
    }

    #[test]
    fn test_edges_fixed_only() {
        let parts = [SbPart::Fixed(50), SbPart::Fixed(70)];
        assert_eq!(status_bar_edges(1000, &parts), vec![50, -1]);
    }

    #[test]
    fn test_edges_weighted() {
        let parts = [
            SbPart::Proportional(1),
            SbPart::Fixed(60),
            SbPart::Proportional(3),
        ];
        // 400 spare pixels split 1:3.
        assert_eq!(status_bar_edges(460, &parts), vec![100, 160, -1]);
    }

    #[test]
    fn test_edges_narrow_parent() {
        let parts = [SbPart::Fixed(200), SbPart::Proportional(1), SbPart::Fixed(10)];
        assert_eq!(status_bar_edges(100, &parts), vec![200, 200, -1]);
    }

    #[test]
    fn test_edges_degenerate() {
        assert!(status_bar_edges(300, &[]).is_empty());
        assert_eq!(status_bar_edges(300, &[SbPart::Proportional(0)]), vec![-1]);
    }
}
