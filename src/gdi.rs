//! GDI painting.
//!
//! Device contexts and GDI objects are owned by guards that release them on
//! drop: [`PaintGuard`] pairs `BeginPaint` with `EndPaint`, [`WindowDc`]
//! pairs `GetDC` with `ReleaseDC`, and [`SelectGuard`] puts back the object
//! a `SelectObject` call replaced.
//!
//! # Example
//!
//! ```ignore
//! use ergonomic_win32::gdi::{Brush, PaintGuard, Rgb};
//!
//! wnd.on().wm_paint(move || {
//!     let ps = PaintGuard::new(hwnd)?;
//!     let brush = Brush::solid(Rgb::new(30, 30, 30))?;
//!     ps.hdc().fill_rect(ps.paint_rect(), &brush)?;
//!     ps.hdc().text_out(10, 10, "Hello")?;
//!     Ok(())
//! });
//! ```

use crate::error::{Error, Result};
use crate::handle::{from_rect, to_rect, Hwnd};
use crate::layout::{Rect, Size};
use crate::string::{from_wide, WideString};
use std::ffi::c_void;
use std::marker::PhantomData;
use windows::Win32::Foundation::{BOOL, COLORREF};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, CreateFontIndirectW, CreatePen,
    CreateSolidBrush, DeleteDC, DeleteObject, Ellipse, EndPaint, FillRect, GetDC, GetObjectW,
    GetPixel, GetStockObject, LineTo, MoveToEx, Rectangle, ReleaseDC, SelectObject, SetBkColor,
    SetBkMode, SetTextColor, TextOutW, BLACK_BRUSH, CLEARTYPE_QUALITY, DEFAULT_CHARSET,
    DEFAULT_GUI_FONT, DKGRAY_BRUSH, GET_STOCK_OBJECT_FLAGS, GRAY_BRUSH, HBITMAP, HBRUSH, HDC,
    HFONT, HGDIOBJ, HPEN, LIGHTGRAY_BRUSH, LOGFONTW, NULL_BRUSH, OPAQUE, PAINTSTRUCT, PEN_STYLE,
    PS_DASH, PS_DOT, PS_NULL, PS_SOLID, SRCCOPY, TRANSPARENT, WHITE_BRUSH,
};

/// CLR_INVALID, returned by color queries on failure.
const CLR_INVALID: u32 = 0xFFFF_FFFF;

/// A 24-bit color, packed as a `COLORREF` (`0x00BBGGRR`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb {
    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White.
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Pure red.
    pub const RED: Self = Self::new(255, 0, 0);
    /// Pure green.
    pub const GREEN: Self = Self::new(0, 255, 0);
    /// Pure blue.
    pub const BLUE: Self = Self::new(0, 0, 255);

    /// Creates a color from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks a `COLORREF` value; the high byte is ignored.
    pub const fn from_colorref(v: u32) -> Self {
        Self {
            r: (v & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: ((v >> 16) & 0xFF) as u8,
        }
    }

    /// Packs into a `COLORREF` value.
    pub const fn to_colorref(self) -> u32 {
        self.r as u32 | (self.g as u32) << 8 | (self.b as u32) << 16
    }

    fn raw(self) -> COLORREF {
        COLORREF(self.to_colorref())
    }
}

/// Background mix mode for text and hatched brushes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BkMode {
    /// The background is left untouched.
    Transparent,
    /// The background is filled with the background color.
    Opaque,
}

/// A GDI object that can be selected into a device context.
pub trait GdiObject {
    /// The raw object handle.
    fn as_gdi_obj(&self) -> HGDIOBJ;
}

/// A borrowed device context.
///
/// Owned by one of the guards; it is only valid while the guard lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hdc(HDC);

fn gdi_ok(ok: BOOL, what: &str) -> Result<()> {
    if ok.as_bool() {
        Ok(())
    } else {
        Err(Error::custom(format!("{what} failed")))
    }
}

impl Hdc {
    /// Wraps a raw device context.
    ///
    /// # Safety
    ///
    /// `hdc` must be a valid device context for as long as the wrapper is used.
    pub unsafe fn from_raw(hdc: HDC) -> Self {
        Self(hdc)
    }

    /// The raw device context.
    pub fn raw(self) -> HDC {
        self.0
    }

    /// Draws text with the current font and colors.
    pub fn text_out(self, x: i32, y: i32, text: &str) -> Result<()> {
        let wide: Vec<u16> = text.encode_utf16().collect();
        // SAFETY: the slice carries its own length.
        gdi_ok(unsafe { TextOutW(self.0, x, y, &wide) }, "TextOutW")
    }

    /// Draws a rectangle outlined with the current pen and filled with the
    /// current brush.
    pub fn rectangle(self, r: Rect) -> Result<()> {
        // SAFETY: plain values.
        gdi_ok(
            unsafe { Rectangle(self.0, r.x, r.y, r.x + r.width, r.y + r.height) },
            "Rectangle",
        )
    }

    /// Draws the ellipse bounded by `r`.
    pub fn ellipse(self, r: Rect) -> Result<()> {
        // SAFETY: plain values.
        gdi_ok(unsafe { Ellipse(self.0, r.x, r.y, r.x + r.width, r.y + r.height) }, "Ellipse")
    }

    /// Moves the current position.
    pub fn move_to(self, x: i32, y: i32) -> Result<()> {
        // SAFETY: the previous position is not requested.
        gdi_ok(unsafe { MoveToEx(self.0, x, y, None) }, "MoveToEx")
    }

    /// Draws a line from the current position, which then moves to `(x, y)`.
    pub fn line_to(self, x: i32, y: i32) -> Result<()> {
        // SAFETY: plain values.
        gdi_ok(unsafe { LineTo(self.0, x, y) }, "LineTo")
    }

    /// Fills a rectangle, excluding its right and bottom edges.
    pub fn fill_rect(self, r: Rect, brush: &Brush) -> Result<()> {
        let rc = from_rect(r);
        // SAFETY: `rc` lives during the call.
        if unsafe { FillRect(self.0, &rc, brush.handle) } == 0 {
            return Err(Error::custom("FillRect failed"));
        }
        Ok(())
    }

    /// Sets the text color and returns the previous one.
    pub fn set_text_color(self, color: Rgb) -> Result<Rgb> {
        // SAFETY: plain values.
        let old = unsafe { SetTextColor(self.0, color.raw()) };
        check_color(old, "SetTextColor")
    }

    /// Sets the background color and returns the previous one.
    pub fn set_bk_color(self, color: Rgb) -> Result<Rgb> {
        // SAFETY: plain values.
        let old = unsafe { SetBkColor(self.0, color.raw()) };
        check_color(old, "SetBkColor")
    }

    /// Sets the background mix mode.
    pub fn set_bk_mode(self, mode: BkMode) -> Result<()> {
        let m = match mode {
            BkMode::Transparent => TRANSPARENT,
            BkMode::Opaque => OPAQUE,
        };
        // SAFETY: plain values.
        if unsafe { SetBkMode(self.0, m) } == 0 {
            return Err(Error::custom("SetBkMode failed"));
        }
        Ok(())
    }

    /// Reads one pixel.
    pub fn pixel(self, x: i32, y: i32) -> Result<Rgb> {
        // SAFETY: plain values.
        let c = unsafe { GetPixel(self.0, x, y) };
        check_color(c, "GetPixel")
    }

    /// Selects an object into the context until the guard is dropped.
    pub fn select<'a, T: GdiObject>(self, obj: &'a T) -> Result<SelectGuard<'a>> {
        // SAFETY: `obj` outlives the guard, which selects the old object back.
        let old = unsafe { SelectObject(self.0, obj.as_gdi_obj()) };
        if old.is_invalid() {
            return Err(Error::custom("SelectObject failed"));
        }
        Ok(SelectGuard {
            hdc: self.0,
            old,
            _obj: PhantomData,
        })
    }
}

fn check_color(c: COLORREF, what: &str) -> Result<Rgb> {
    if c.0 == CLR_INVALID {
        return Err(Error::custom(format!("{what} failed")));
    }
    Ok(Rgb::from_colorref(c.0))
}

/// Restores the previously selected object when dropped.
#[must_use = "the object is deselected when the guard is dropped"]
pub struct SelectGuard<'a> {
    hdc: HDC,
    old: HGDIOBJ,
    _obj: PhantomData<&'a ()>,
}

impl Drop for SelectGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `old` came from the SelectObject call that built the guard.
        unsafe { SelectObject(self.hdc, self.old) };
    }
}

/// `BeginPaint`/`EndPaint` scope; build one when handling `WM_PAINT`.
pub struct PaintGuard {
    hwnd: Hwnd,
    ps: PAINTSTRUCT,
}

impl PaintGuard {
    /// Starts painting the invalid region of `hwnd`.
    pub fn new(hwnd: Hwnd) -> Result<Self> {
        let mut ps = PAINTSTRUCT::default();
        // SAFETY: `ps` is a valid out pointer.
        let hdc = unsafe { BeginPaint(hwnd.raw(), &mut ps) };
        if hdc.is_invalid() {
            return Err(Error::invalid_handle("BeginPaint returned no device context"));
        }
        Ok(Self { hwnd, ps })
    }

    /// The paint device context.
    pub fn hdc(&self) -> Hdc {
        Hdc(self.ps.hdc)
    }

    /// The area to repaint.
    pub fn paint_rect(&self) -> Rect {
        to_rect(self.ps.rcPaint)
    }

    /// Whether the background must be erased by the painter.
    pub fn erase(&self) -> bool {
        self.ps.fErase.as_bool()
    }
}

impl Drop for PaintGuard {
    fn drop(&mut self) {
        // SAFETY: pairs the BeginPaint of the constructor.
        let _ = unsafe { EndPaint(self.hwnd.raw(), &self.ps) };
    }
}

/// A window's device context, from `GetDC`; a null `Hwnd` gives the screen.
pub struct WindowDc {
    hwnd: Hwnd,
    hdc: HDC,
}

impl WindowDc {
    /// Retrieves the client-area device context.
    pub fn new(hwnd: Hwnd) -> Result<Self> {
        // SAFETY: a null window selects the screen.
        let hdc = unsafe { GetDC(hwnd.raw()) };
        if hdc.is_invalid() {
            return Err(Error::invalid_handle("GetDC returned no device context"));
        }
        Ok(Self { hwnd, hdc })
    }

    /// The device context.
    pub fn hdc(&self) -> Hdc {
        Hdc(self.hdc)
    }
}

impl Drop for WindowDc {
    fn drop(&mut self) {
        // SAFETY: pairs the GetDC of the constructor.
        unsafe { ReleaseDC(self.hwnd.raw(), self.hdc) };
    }
}

/// An off-screen bitmap to draw into, then copy in one go.
pub struct MemoryDc {
    hdc: HDC,
    bitmap: HBITMAP,
    old: HGDIOBJ,
    size: Size,
}

impl MemoryDc {
    /// Creates a `width` by `height` bitmap compatible with `like`.
    pub fn new(like: Hdc, width: i32, height: i32) -> Result<Self> {
        // SAFETY: `like` is valid by the `Hdc` contract.
        let hdc = unsafe { CreateCompatibleDC(like.0) };
        if hdc.is_invalid() {
            return Err(Error::invalid_handle("CreateCompatibleDC failed"));
        }
        // Compatible with `like`: a fresh memory DC only holds a monochrome bitmap.
        // SAFETY: as above.
        let bitmap = unsafe { CreateCompatibleBitmap(like.0, width, height) };
        if bitmap.is_invalid() {
            // SAFETY: created above, not yet shared.
            let _ = unsafe { DeleteDC(hdc) };
            return Err(Error::invalid_handle("CreateCompatibleBitmap failed"));
        }
        // SAFETY: both handles were just created.
        let old = unsafe { SelectObject(hdc, HGDIOBJ(bitmap.0)) };
        Ok(Self {
            hdc,
            bitmap,
            old,
            size: Size::new(width, height),
        })
    }

    /// The memory device context.
    pub fn hdc(&self) -> Hdc {
        Hdc(self.hdc)
    }

    /// Size of the bitmap.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Copies the whole bitmap to `dest` at `(x, y)`.
    pub fn blit_to(&self, dest: Hdc, x: i32, y: i32) -> Result<()> {
        // SAFETY: both contexts are alive.
        unsafe {
            BitBlt(
                dest.0,
                x,
                y,
                self.size.width,
                self.size.height,
                self.hdc,
                0,
                0,
                SRCCOPY,
            )?
        };
        Ok(())
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        // SAFETY: the bitmap is deselected before both handles are freed.
        unsafe {
            SelectObject(self.hdc, self.old);
            let _ = DeleteObject(HGDIOBJ(self.bitmap.0));
            let _ = DeleteDC(self.hdc);
        }
    }
}

fn stock(flag: GET_STOCK_OBJECT_FLAGS) -> *mut c_void {
    // SAFETY: stock objects are never freed.
    unsafe { GetStockObject(flag) }.0
}

/// Stock brushes, owned by the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockBrush {
    /// White.
    White,
    /// Light gray.
    LightGray,
    /// Gray.
    Gray,
    /// Dark gray.
    DarkGray,
    /// Black.
    Black,
    /// Paints nothing.
    Null,
}

/// A brush, deleted on drop unless it is a stock object.
#[derive(Debug)]
pub struct Brush {
    handle: HBRUSH,
    owned: bool,
}

impl Brush {
    /// Creates a solid brush.
    pub fn solid(color: Rgb) -> Result<Self> {
        // SAFETY: plain value.
        let handle = unsafe { CreateSolidBrush(color.raw()) };
        if handle.is_invalid() {
            return Err(Error::invalid_handle("CreateSolidBrush failed"));
        }
        Ok(Self { handle, owned: true })
    }

    /// One of the system's stock brushes.
    pub fn stock(which: StockBrush) -> Self {
        let flag = match which {
            StockBrush::White => WHITE_BRUSH,
            StockBrush::LightGray => LIGHTGRAY_BRUSH,
            StockBrush::Gray => GRAY_BRUSH,
            StockBrush::DarkGray => DKGRAY_BRUSH,
            StockBrush::Black => BLACK_BRUSH,
            StockBrush::Null => NULL_BRUSH,
        };
        Self {
            handle: HBRUSH(stock(flag)),
            owned: false,
        }
    }

    /// The raw handle.
    pub fn raw(&self) -> HBRUSH {
        self.handle
    }
}

impl GdiObject for Brush {
    fn as_gdi_obj(&self) -> HGDIOBJ {
        HGDIOBJ(self.handle.0)
    }
}

impl Drop for Brush {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: created by this wrapper.
            let _ = unsafe { DeleteObject(HGDIOBJ(self.handle.0)) };
        }
    }
}

/// Line style of a [`Pen`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PenStyle {
    /// Continuous.
    #[default]
    Solid,
    /// Dashes; width must be 1.
    Dash,
    /// Dots; width must be 1.
    Dot,
    /// Draws nothing.
    Null,
}

/// A pen, deleted on drop.
#[derive(Debug)]
pub struct Pen {
    handle: HPEN,
}

impl Pen {
    /// Creates a cosmetic pen.
    pub fn new(style: PenStyle, width: i32, color: Rgb) -> Result<Self> {
        let s: PEN_STYLE = match style {
            PenStyle::Solid => PS_SOLID,
            PenStyle::Dash => PS_DASH,
            PenStyle::Dot => PS_DOT,
            PenStyle::Null => PS_NULL,
        };
        // SAFETY: plain values.
        let handle = unsafe { CreatePen(s, width, color.raw()) };
        if handle.is_invalid() {
            return Err(Error::invalid_handle("CreatePen failed"));
        }
        Ok(Self { handle })
    }
}

impl GdiObject for Pen {
    fn as_gdi_obj(&self) -> HGDIOBJ {
        HGDIOBJ(self.handle.0)
    }
}

impl Drop for Pen {
    fn drop(&mut self) {
        // SAFETY: created by this wrapper.
        let _ = unsafe { DeleteObject(HGDIOBJ(self.handle.0)) };
    }
}

/// Options of [`Font::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontOpts {
    /// Typeface name, at most 31 characters.
    pub face: String,
    /// Character height in logical units; negative values match the em height.
    pub height: i32,
    /// Weight, 100 to 900; 400 is normal and 700 bold.
    pub weight: i32,
    /// Italic.
    pub italic: bool,
    /// Underlined.
    pub underline: bool,
    /// Struck out.
    pub strikeout: bool,
}

impl Default for FontOpts {
    fn default() -> Self {
        Self {
            face: "Segoe UI".to_owned(),
            height: -12,
            weight: 400,
            italic: false,
            underline: false,
            strikeout: false,
        }
    }
}

const LF_FACESIZE: usize = 32;

/// A font, deleted on drop unless it is a stock object.
#[derive(Debug)]
pub struct Font {
    handle: HFONT,
    owned: bool,
}

impl Font {
    /// Creates a font from `opts`.
    pub fn new(opts: &FontOpts) -> Result<Self> {
        let face = WideString::new(&opts.face);
        // Terminator included.
        let face = face.as_slice();
        if face.len() > LF_FACESIZE {
            return Err(Error::buffer_too_small(face.len(), LF_FACESIZE));
        }

        let mut lf = LOGFONTW {
            lfHeight: opts.height,
            lfWeight: opts.weight,
            lfItalic: opts.italic as u8,
            lfUnderline: opts.underline as u8,
            lfStrikeOut: opts.strikeout as u8,
            lfCharSet: DEFAULT_CHARSET,
            lfQuality: CLEARTYPE_QUALITY,
            ..Default::default()
        };
        lf.lfFaceName[..face.len()].copy_from_slice(face);

        // SAFETY: `lf` is fully initialized.
        let handle = unsafe { CreateFontIndirectW(&lf) };
        if handle.is_invalid() {
            return Err(Error::invalid_handle("CreateFontIndirectW failed"));
        }
        Ok(Self { handle, owned: true })
    }

    /// The stock GUI font used by controls.
    pub fn gui_default() -> Self {
        Self {
            handle: HFONT(stock(DEFAULT_GUI_FONT)),
            owned: false,
        }
    }

    /// Reads back the font attributes.
    pub fn opts(&self) -> Result<FontOpts> {
        let mut lf = LOGFONTW::default();
        let size = std::mem::size_of::<LOGFONTW>() as i32;
        // SAFETY: `lf` has room for `size` bytes.
        let written = unsafe { GetObjectW(self.as_gdi_obj(), size, Some(&mut lf as *mut LOGFONTW as *mut c_void)) };
        if written == 0 {
            return Err(Error::custom("GetObjectW failed"));
        }
        Ok(FontOpts {
            face: from_wide(&lf.lfFaceName)?,
            height: lf.lfHeight,
            weight: lf.lfWeight,
            italic: lf.lfItalic != 0,
            underline: lf.lfUnderline != 0,
            strikeout: lf.lfStrikeOut != 0,
        })
    }

    /// The raw handle.
    pub fn raw(&self) -> HFONT {
        self.handle
    }
}

impl GdiObject for Font {
    fn as_gdi_obj(&self) -> HGDIOBJ {
        HGDIOBJ(self.handle.0)
    }
}

impl Drop for Font {
    fn drop(&mut self) {
        if self.owned {
            // SAFETY: created by this wrapper.
            let _ = unsafe { DeleteObject(HGDIOBJ(self.handle.0)) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_packing() {
        let c = Rgb::new(0x12, 0x34, 0x56);
        assert_eq!(c.to_colorref(), 0x0056_3412);
        assert_eq!(Rgb::from_colorref(0xFF56_3412), c);
        assert_eq!(Rgb::WHITE.to_colorref(), 0x00FF_FFFF);
    }

    fn canvas(w: i32, h: i32) -> MemoryDc {
        let screen = WindowDc::new(Hwnd::NULL).unwrap();
        MemoryDc::new(screen.hdc(), w, h).unwrap()
    }

    #[test]
    fn test_fill_and_read_back() {
        let mem = canvas(16, 16);
        let hdc = mem.hdc();
        hdc.fill_rect(Rect::new(0, 0, 16, 16), &Brush::stock(StockBrush::White)).unwrap();
        let red = Brush::solid(Rgb::RED).unwrap();
        hdc.fill_rect(Rect::new(4, 4, 4, 4), &red).unwrap();

        assert_eq!(hdc.pixel(0, 0).unwrap(), Rgb::WHITE);
        assert_eq!(hdc.pixel(5, 5).unwrap(), Rgb::RED);
        // Right and bottom edges are excluded.
        assert_eq!(hdc.pixel(8, 8).unwrap(), Rgb::WHITE);
    }

    #[test]
    fn test_lines_with_selected_pen() {
        let mem = canvas(10, 10);
        let hdc = mem.hdc();
        hdc.fill_rect(Rect::new(0, 0, 10, 10), &Brush::stock(StockBrush::Black)).unwrap();
        let pen = Pen::new(PenStyle::Solid, 1, Rgb::GREEN).unwrap();
        {
            let _sel = hdc.select(&pen).unwrap();
            hdc.move_to(0, 2).unwrap();
            hdc.line_to(9, 2).unwrap();
        }
        assert_eq!(hdc.pixel(3, 2).unwrap(), Rgb::GREEN);
        assert_eq!(hdc.pixel(3, 3).unwrap(), Rgb::BLACK);
    }

    #[test]
    fn test_blit_between_memory_dcs() {
        let src = canvas(8, 8);
        let dst = canvas(8, 8);
        src.hdc().fill_rect(Rect::new(0, 0, 8, 8), &Brush::solid(Rgb::BLUE).unwrap()).unwrap();
        dst.hdc().fill_rect(Rect::new(0, 0, 8, 8), &Brush::stock(StockBrush::White)).unwrap();
        src.blit_to(dst.hdc(), 0, 0).unwrap();
        assert_eq!(dst.hdc().pixel(7, 7).unwrap(), Rgb::BLUE);
        assert_eq!(src.size(), Size::new(8, 8));
    }

    #[test]
    fn test_text_colors_and_mode() {
        let mem = canvas(50, 20);
        let hdc = mem.hdc();
        hdc.set_text_color(Rgb::RED).unwrap();
        assert_eq!(hdc.set_text_color(Rgb::BLUE).unwrap(), Rgb::RED);
        hdc.set_bk_color(Rgb::BLACK).unwrap();
        hdc.set_bk_mode(BkMode::Transparent).unwrap();
        let font = Font::gui_default();
        let _sel = hdc.select(&font).unwrap();
        hdc.text_out(0, 0, "Hi").unwrap();
    }

    #[test]
    fn test_font_round_trip() {
        let font = Font::new(&FontOpts {
            face: "Arial".to_owned(),
            height: -20,
            weight: 700,
            italic: true,
            ..Default::default()
        })
        .unwrap();
        let back = font.opts().unwrap();
        assert_eq!(back.face, "Arial");
        assert_eq!(back.height, -20);
        assert_eq!(back.weight, 700);
        assert!(back.italic);

        let long = FontOpts {
            face: "x".repeat(40),
            ..Default::default()
        };
        assert!(matches!(Font::new(&long), Err(Error::BufferTooSmall { .. })));
    }
}
