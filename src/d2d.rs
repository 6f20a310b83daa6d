//! Direct2D and DirectWrite drawing.
//!
//! A [`RenderTarget`] draws into a window. Device-dependent resources
//! (the target and its brushes) can be lost, for instance when the display
//! adapter is reset: [`RenderTarget::end_draw`] then returns `Ok(false)` and
//! the caller rebuilds them.
//!
//! ```ignore
//! let factory = D2DFactory::new()?;
//! let target = factory.create_hwnd_render_target(wnd.hwnd())?;
//! let brush = target.create_solid_brush(Color::from_hex(0x3366CC))?;
//!
//! target.begin_draw();
//! target.clear(Color::WHITE);
//! target.fill_ellipse(PointF::new(100.0, 100.0), 40.0, 40.0, &brush);
//! if !target.end_draw()? {
//!     // recreate `target` and `brush`
//! }
//! ```

use crate::error::{Error, HResult, Result};
use crate::gdi::Rgb;
use crate::handle::Hwnd;
use crate::string::WideString;
use windows::Foundation::Numerics::Matrix3x2;
use windows::Win32::Graphics::Direct2D::Common::{
    D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F, D2D1_PIXEL_FORMAT, D2D_POINT_2F, D2D_RECT_F,
    D2D_SIZE_U,
};
use windows::Win32::Graphics::Direct2D::{
    D2D1CreateFactory, ID2D1Factory, ID2D1HwndRenderTarget, ID2D1SolidColorBrush,
    D2D1_BRUSH_PROPERTIES, D2D1_DRAW_TEXT_OPTIONS_NONE, D2D1_ELLIPSE, D2D1_FACTORY_OPTIONS,
    D2D1_FACTORY_TYPE_SINGLE_THREADED, D2D1_HWND_RENDER_TARGET_PROPERTIES,
    D2D1_PRESENT_OPTIONS_NONE, D2D1_RENDER_TARGET_PROPERTIES, D2D1_RENDER_TARGET_TYPE_DEFAULT,
    D2D1_ROUNDED_RECT,
};
use windows::Win32::Graphics::DirectWrite::{
    DWriteCreateFactory, IDWriteFactory, IDWriteTextFormat, DWRITE_FACTORY_TYPE_SHARED,
    DWRITE_FONT_STRETCH_NORMAL, DWRITE_FONT_STYLE_ITALIC, DWRITE_FONT_STYLE_NORMAL,
    DWRITE_FONT_WEIGHT, DWRITE_MEASURING_MODE_NATURAL, DWRITE_PARAGRAPH_ALIGNMENT_CENTER,
    DWRITE_PARAGRAPH_ALIGNMENT_FAR, DWRITE_PARAGRAPH_ALIGNMENT_NEAR, DWRITE_TEXT_ALIGNMENT_CENTER,
    DWRITE_TEXT_ALIGNMENT_JUSTIFIED, DWRITE_TEXT_ALIGNMENT_LEADING, DWRITE_TEXT_ALIGNMENT_TRAILING,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;

/// The device behind a render target was lost; resources must be recreated.
pub const D2DERR_RECREATE_TARGET: HResult = HResult(0x8899_000C_u32 as i32);

/// A color with red, green, blue, and alpha components (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component (0.0 - 1.0).
    pub r: f32,
    /// Green component (0.0 - 1.0).
    pub g: f32,
    /// Blue component (0.0 - 1.0).
    pub b: f32,
    /// Alpha component (0.0 - 1.0).
    pub a: f32,
}

impl Color {
    /// Black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// White.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    /// Red.
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    /// Green.
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    /// Blue.
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Creates an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color with alpha.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from 8-bit components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Creates a color from `0xRRGGBB`.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_rgb8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Returns the same color with another alpha.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    fn raw(self) -> D2D1_COLOR_F {
        D2D1_COLOR_F {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<Rgb> for Color {
    fn from(c: Rgb) -> Self {
        Self::from_rgb8(c.r, c.g, c.b)
    }
}

/// A point in device-independent pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointF {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl PointF {
    /// Creates a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn raw(self) -> D2D_POINT_2F {
        D2D_POINT_2F { x: self.x, y: self.y }
    }
}

/// A rectangle in device-independent pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RectF {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl RectF {
    /// Creates a rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    fn raw(self) -> D2D_RECT_F {
        D2D_RECT_F {
            left: self.x,
            top: self.y,
            right: self.x + self.width,
            bottom: self.y + self.height,
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlignment {
    /// Leading edge.
    #[default]
    Left,
    /// Trailing edge.
    Right,
    /// Centered.
    Center,
    /// Justified.
    Justified,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphAlignment {
    /// Top.
    #[default]
    Top,
    /// Bottom.
    Bottom,
    /// Centered.
    Center,
}

/// Entry point for Direct2D resources.
#[derive(Clone, Debug)]
pub struct D2DFactory {
    factory: ID2D1Factory,
}

impl D2DFactory {
    /// Creates a single-threaded factory.
    pub fn new() -> Result<Self> {
        let options = D2D1_FACTORY_OPTIONS::default();
        // SAFETY: `options` lives during the call.
        let factory: ID2D1Factory =
            unsafe { D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, Some(&options))? };
        Ok(Self { factory })
    }

    /// Creates a render target covering the client area of `hwnd`.
    pub fn create_hwnd_render_target(&self, hwnd: Hwnd) -> Result<RenderTarget> {
        let client = hwnd.client_size()?;
        let props = D2D1_RENDER_TARGET_PROPERTIES {
            r#type: D2D1_RENDER_TARGET_TYPE_DEFAULT,
            pixelFormat: D2D1_PIXEL_FORMAT {
                format: DXGI_FORMAT_B8G8R8A8_UNORM,
                alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
            },
            ..Default::default()
        };
        let hwnd_props = D2D1_HWND_RENDER_TARGET_PROPERTIES {
            hwnd: hwnd.raw(),
            pixelSize: D2D_SIZE_U {
                width: client.width.max(0) as u32,
                height: client.height.max(0) as u32,
            },
            presentOptions: D2D1_PRESENT_OPTIONS_NONE,
        };
        // SAFETY: both property structs live during the call.
        let target = unsafe { self.factory.CreateHwndRenderTarget(&props, &hwnd_props)? };
        Ok(RenderTarget { target })
    }
}

/// Draws into a window.
#[derive(Clone, Debug)]
pub struct RenderTarget {
    target: ID2D1HwndRenderTarget,
}

impl RenderTarget {
    /// Resizes the target, usually from a `WM_SIZE` handler.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        // SAFETY: the size lives during the call.
        unsafe { self.target.Resize(&D2D_SIZE_U { width, height })? };
        Ok(())
    }

    /// Starts a batch of drawing calls.
    pub fn begin_draw(&self) {
        // SAFETY: plain call on a live interface.
        unsafe { self.target.BeginDraw() };
    }

    /// Ends the batch and presents it.
    ///
    /// Returns `Ok(false)` when the target was lost and must be recreated
    /// along with its brushes.
    pub fn end_draw(&self) -> Result<bool> {
        // SAFETY: tags are not requested.
        match unsafe { self.target.EndDraw(None, None) } {
            Ok(()) => Ok(true),
            Err(e) if HResult(e.code().0) == D2DERR_RECREATE_TARGET => {
                log::debug!("render target lost, recreate it");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs `f` between `begin_draw` and `end_draw`.
    ///
    /// `end_draw` runs even if `f` fails, so the batch is always closed.
    pub fn draw<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&Self) -> Result<()>,
    {
        self.begin_draw();
        let drawn = f(self);
        let presented = self.end_draw();
        drawn?;
        presented
    }

    /// Fills the whole target.
    pub fn clear(&self, color: Color) {
        // SAFETY: the color lives during the call.
        unsafe { self.target.Clear(Some(&color.raw())) };
    }

    /// Creates a solid brush.
    pub fn create_solid_brush(&self, color: Color) -> Result<SolidBrush> {
        let props = D2D1_BRUSH_PROPERTIES {
            opacity: 1.0,
            transform: Matrix3x2::identity(),
        };
        // SAFETY: both structs live during the call.
        let brush = unsafe { self.target.CreateSolidColorBrush(&color.raw(), Some(&props))? };
        Ok(SolidBrush { brush })
    }

    /// Draws a line.
    pub fn draw_line(&self, from: PointF, to: PointF, brush: &SolidBrush, stroke_width: f32) {
        // SAFETY: plain values and a live brush.
        unsafe {
            self.target
                .DrawLine(from.raw(), to.raw(), &brush.brush, stroke_width, None)
        };
    }

    /// Outlines a rectangle.
    pub fn draw_rect(&self, rect: RectF, brush: &SolidBrush, stroke_width: f32) {
        // SAFETY: as above.
        unsafe {
            self.target
                .DrawRectangle(&rect.raw(), &brush.brush, stroke_width, None)
        };
    }

    /// Fills a rectangle.
    pub fn fill_rect(&self, rect: RectF, brush: &SolidBrush) {
        // SAFETY: as above.
        unsafe { self.target.FillRectangle(&rect.raw(), &brush.brush) };
    }

    /// Outlines a rectangle with rounded corners.
    pub fn draw_rounded_rect(&self, rect: RectF, radius: f32, brush: &SolidBrush, stroke_width: f32) {
        let rr = rounded(rect, radius);
        // SAFETY: as above.
        unsafe {
            self.target
                .DrawRoundedRectangle(&rr, &brush.brush, stroke_width, None)
        };
    }

    /// Fills a rectangle with rounded corners.
    pub fn fill_rounded_rect(&self, rect: RectF, radius: f32, brush: &SolidBrush) {
        let rr = rounded(rect, radius);
        // SAFETY: as above.
        unsafe { self.target.FillRoundedRectangle(&rr, &brush.brush) };
    }

    /// Outlines an ellipse.
    pub fn draw_ellipse(&self, center: PointF, radius_x: f32, radius_y: f32, brush: &SolidBrush, stroke_width: f32) {
        let e = ellipse(center, radius_x, radius_y);
        // SAFETY: as above.
        unsafe {
            self.target
                .DrawEllipse(&e, &brush.brush, stroke_width, None)
        };
    }

    /// Fills an ellipse.
    pub fn fill_ellipse(&self, center: PointF, radius_x: f32, radius_y: f32, brush: &SolidBrush) {
        let e = ellipse(center, radius_x, radius_y);
        // SAFETY: as above.
        unsafe { self.target.FillEllipse(&e, &brush.brush) };
    }

    /// Draws text laid out inside `rect`.
    pub fn draw_text(&self, text: &str, format: &TextFormat, rect: RectF, brush: &SolidBrush) {
        let wide: Vec<u16> = text.encode_utf16().collect();
        // SAFETY: the slice carries its own length; the rest are live objects.
        unsafe {
            self.target.DrawText(
                &wide,
                &format.format,
                &rect.raw(),
                &brush.brush,
                D2D1_DRAW_TEXT_OPTIONS_NONE,
                DWRITE_MEASURING_MODE_NATURAL,
            )
        };
    }

    /// Size in device-independent pixels.
    pub fn size(&self) -> (f32, f32) {
        // SAFETY: plain call on a live interface.
        let size = unsafe { self.target.GetSize() };
        (size.width, size.height)
    }
}

fn rounded(rect: RectF, radius: f32) -> D2D1_ROUNDED_RECT {
    D2D1_ROUNDED_RECT {
        rect: rect.raw(),
        radiusX: radius,
        radiusY: radius,
    }
}

fn ellipse(center: PointF, radius_x: f32, radius_y: f32) -> D2D1_ELLIPSE {
    D2D1_ELLIPSE {
        point: center.raw(),
        radiusX: radius_x,
        radiusY: radius_y,
    }
}

/// A solid color brush, tied to the render target that created it.
#[derive(Clone, Debug)]
pub struct SolidBrush {
    brush: ID2D1SolidColorBrush,
}

impl SolidBrush {
    /// Changes the color.
    pub fn set_color(&self, color: Color) {
        // SAFETY: the color lives during the call.
        unsafe { self.brush.SetColor(&color.raw()) };
    }

    /// Returns the color.
    pub fn color(&self) -> Color {
        // SAFETY: plain call on a live interface.
        let c = unsafe { self.brush.GetColor() };
        Color::rgba(c.r, c.g, c.b, c.a)
    }

    /// Sets the opacity, 0.0 to 1.0, applied on top of the color's alpha.
    pub fn set_opacity(&self, opacity: f32) {
        // SAFETY: plain value.
        unsafe { self.brush.SetOpacity(opacity) };
    }
}

/// Options of [`DWriteFactory::create_text_format`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatOpts {
    /// Font family.
    pub family: String,
    /// Size in device-independent pixels.
    pub size: f32,
    /// Weight, 100 to 950; 400 is normal and 700 bold.
    pub weight: i32,
    /// Italic.
    pub italic: bool,
    /// Locale name.
    pub locale: String,
}

impl Default for TextFormatOpts {
    fn default() -> Self {
        Self {
            family: "Segoe UI".to_owned(),
            size: 14.0,
            weight: 400,
            italic: false,
            locale: "en-US".to_owned(),
        }
    }
}

/// Entry point for DirectWrite resources.
#[derive(Clone, Debug)]
pub struct DWriteFactory {
    factory: IDWriteFactory,
}

impl DWriteFactory {
    /// Creates the shared factory.
    pub fn new() -> Result<Self> {
        // SAFETY: plain call.
        let factory: IDWriteFactory = unsafe { DWriteCreateFactory(DWRITE_FACTORY_TYPE_SHARED)? };
        Ok(Self { factory })
    }

    /// Creates a text format.
    pub fn create_text_format(&self, opts: &TextFormatOpts) -> Result<TextFormat> {
        if opts.size.is_nan() || opts.size <= 0.0 {
            return Err(Error::custom(format!("Invalid font size {}", opts.size)));
        }
        let family = WideString::new(&opts.family);
        let locale = WideString::new(&opts.locale);
        let style = if opts.italic {
            DWRITE_FONT_STYLE_ITALIC
        } else {
            DWRITE_FONT_STYLE_NORMAL
        };
        // SAFETY: the strings live during the call.
        let format = unsafe {
            self.factory.CreateTextFormat(
                family.as_pcwstr(),
                None,
                DWRITE_FONT_WEIGHT(opts.weight),
                style,
                DWRITE_FONT_STRETCH_NORMAL,
                opts.size,
                locale.as_pcwstr(),
            )?
        };
        Ok(TextFormat { format })
    }
}

/// Font and layout settings for drawing text.
#[derive(Clone, Debug)]
pub struct TextFormat {
    format: IDWriteTextFormat,
}

impl TextFormat {
    /// Sets the horizontal alignment.
    pub fn set_text_alignment(&self, alignment: TextAlignment) -> Result<()> {
        let align = match alignment {
            TextAlignment::Left => DWRITE_TEXT_ALIGNMENT_LEADING,
            TextAlignment::Right => DWRITE_TEXT_ALIGNMENT_TRAILING,
            TextAlignment::Center => DWRITE_TEXT_ALIGNMENT_CENTER,
            TextAlignment::Justified => DWRITE_TEXT_ALIGNMENT_JUSTIFIED,
        };
        // SAFETY: plain value.
        unsafe { self.format.SetTextAlignment(align)? };
        Ok(())
    }

    /// Sets the vertical alignment.
    pub fn set_paragraph_alignment(&self, alignment: ParagraphAlignment) -> Result<()> {
        let align = match alignment {
            ParagraphAlignment::Top => DWRITE_PARAGRAPH_ALIGNMENT_NEAR,
            ParagraphAlignment::Bottom => DWRITE_PARAGRAPH_ALIGNMENT_FAR,
            ParagraphAlignment::Center => DWRITE_PARAGRAPH_ALIGNMENT_CENTER,
        };
        // SAFETY: plain value.
        unsafe { self.format.SetParagraphAlignment(align)? };
        Ok(())
    }

    /// Font size in device-independent pixels.
    pub fn font_size(&self) -> f32 {
        // SAFETY: plain call on a live interface.
        unsafe { self.format.GetFontSize() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{process_pending_messages, WindowClassOpts, WindowMain, WindowMainOpts};

    #[test]
    fn test_color_conversions() {
        let c = Color::from_hex(0xFF8040);
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.5).abs() < 0.01);
        assert!((c.b - 0.25).abs() < 0.01);
        assert_eq!(c.a, 1.0);
        assert_eq!(Color::from(Rgb::new(255, 0, 0)), Color::RED);
        assert_eq!(Color::WHITE.with_alpha(0.5).a, 0.5);
    }

    #[test]
    fn test_rect_edges() {
        let r = RectF::new(10.0, 20.0, 30.0, 40.0).raw();
        assert_eq!((r.left, r.top, r.right, r.bottom), (10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn test_text_format() {
        let dw = DWriteFactory::new().unwrap();
        let fmt = dw
            .create_text_format(&TextFormatOpts {
                size: 18.0,
                weight: 700,
                italic: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(fmt.font_size(), 18.0);
        fmt.set_text_alignment(TextAlignment::Center).unwrap();
        fmt.set_paragraph_alignment(ParagraphAlignment::Bottom).unwrap();

        let bad = TextFormatOpts {
            size: 0.0,
            ..Default::default()
        };
        assert!(dw.create_text_format(&bad).is_err());
    }

    #[test]
    fn test_draw_into_window() {
        let wnd = WindowMain::new(WindowMainOpts {
            title: "d2d".to_owned(),
            class: WindowClassOpts {
                class_name: "ErgonomicWin32.D2DTest".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        });
        wnd.create().unwrap();

        let factory = D2DFactory::new().unwrap();
        let target = factory.create_hwnd_render_target(wnd.hwnd()).unwrap();
        let brush = target.create_solid_brush(Color::BLUE).unwrap();
        brush.set_color(Color::GREEN);
        assert_eq!(brush.color(), Color::GREEN);

        let presented = target
            .draw(|t| {
                t.clear(Color::WHITE);
                t.fill_rect(RectF::new(0.0, 0.0, 10.0, 10.0), &brush);
                t.draw_line(PointF::new(0.0, 0.0), PointF::new(50.0, 50.0), &brush, 1.0);
                t.fill_ellipse(PointF::new(30.0, 30.0), 5.0, 5.0, &brush);
                Ok(())
            })
            .unwrap();
        // Lost devices report `false`; any other outcome is an error.
        let _ = presented;

        target.resize(200, 100).unwrap();
        let (w, h) = target.size();
        assert!(w > 0.0 && h > 0.0 && w > h);

        wnd.hwnd().destroy().unwrap();
        let _ = process_pending_messages();
    }
}
