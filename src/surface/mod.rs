//! Drawing surface contract.
//!
//! The engine issues drawing operations in a fixed order; a surface turns
//! them into a page description (or a raster, or a recording). Surfaces
//! also own font metrics.

mod recording;

pub use recording::{DrawOp, RecordingSurface};

use glam::DVec2;
use serde::Serialize;
use std::fmt;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0);

    #[inline]
    pub fn from_rgb(rgb: u32) -> Self {
        Self(rgb & 0x00FF_FFFF)
    }

    /// Six-digit uppercase hex, as written to page descriptions
    pub fn to_hex(self) -> String {
        format!("{:06X}", self.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineCap {
    Butt,
    ProjectingSquare,
    Round,
}

impl LineCap {
    /// Style keyword to cap; unknown or missing keywords yield `None`
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "none" => Some(LineCap::Butt),
            "square" => Some(LineCap::ProjectingSquare),
            "round" => Some(LineCap::Round),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineJoin {
    Miter,
    Bevel,
    Round,
}

impl LineJoin {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "miter" => Some(LineJoin::Miter),
            "bevel" => Some(LineJoin::Bevel),
            "round" => Some(LineJoin::Round),
            _ => None,
        }
    }
}

/// On/off dash lengths
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dash {
    pub on: f64,
    pub off: f64,
}

impl Dash {
    /// Parse `"on"` or `"on,off"`. A single length is used for both.
    pub fn parse(value: &str) -> Option<Self> {
        let mut lengths = value.split(',').map(|n| n.trim().parse::<f64>());
        let on = lengths.next()?.ok()?;
        let off = match lengths.next() {
            Some(n) => n.ok()?,
            None => on,
        };
        Some(Dash { on, off })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub style: FontStyle,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Helvetica".to_string(),
            size: 10.0,
            style: FontStyle::Normal,
        }
    }
}

/// Text is either filled, or stroked for a halo pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextMode {
    Fill,
    Stroke,
}

/// Rotation in degrees (counter-clockwise) around a page point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rotation {
    pub degrees: f64,
    pub origin: DVec2,
}

/// Size at which an image was actually placed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageExtent {
    pub width: f64,
    pub height: f64,
}

/// Output backend consumed by drawing items.
///
/// Coordinates are page units, y-up.
pub trait DrawingSurface {
    fn set_fill_color(&mut self, color: Color);
    fn set_stroke_color(&mut self, color: Color);
    /// Fill subsequent paths by tiling the named image
    fn set_fill_pattern(&mut self, source: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_cap(&mut self, cap: LineCap);
    fn set_line_join(&mut self, join: LineJoin);
    fn set_dash(&mut self, dash: Option<Dash>);

    fn begin_opacity(&mut self, opacity: f64);
    fn end_opacity(&mut self);

    fn move_to(&mut self, p: DVec2);
    fn line_to(&mut self, p: DVec2);
    /// Axis-aligned rectangle subpath from its lower-left corner
    fn rectangle(&mut self, corner: DVec2, width: f64, height: f64);
    fn circle(&mut self, center: DVec2, radius: f64);

    fn fill(&mut self, rule: FillRule);
    fn stroke(&mut self);
    fn fill_and_stroke(&mut self, rule: FillRule);

    fn set_font(&mut self, font: &Font);
    fn draw_text(&mut self, text: &str, at: DVec2, rotation: Option<Rotation>, mode: TextMode);
    /// Place an image centered on `center`, optionally scaled
    fn draw_image(
        &mut self,
        source: &str,
        center: DVec2,
        width: Option<f64>,
        height: Option<f64>,
    ) -> ImageExtent;

    fn clip_rect(&mut self, corner: DVec2, width: f64, height: f64);
    fn save_state(&mut self);
    fn restore_state(&mut self);

    /// Advance width of `text` in the current font
    fn text_width(&self, text: &str) -> f64;
    /// Ascender height of the current font
    fn ascender(&self) -> f64;
}

/// Run `draw` inside an opacity group
pub fn with_opacity<S, F, R>(surface: &mut S, opacity: f64, draw: F) -> R
where
    S: DrawingSurface + ?Sized,
    F: FnOnce(&mut S) -> R,
{
    surface.begin_opacity(opacity);
    let result = draw(surface);
    surface.end_opacity();
    result
}

/// Helvetica-like metrics for surfaces without a font engine
#[derive(Debug, Clone, PartialEq)]
pub struct ApproxMetrics {
    font: Font,
}

impl ApproxMetrics {
    const ADVANCE: f64 = 0.6;
    const ASCENDER: f64 = 0.718;
    /// Default size for images that carry no intrinsic size here
    pub const IMAGE_SIZE: f64 = 16.0;

    pub fn set_font(&mut self, font: &Font) {
        self.font = font.clone();
    }

    pub fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.font.size * Self::ADVANCE
    }

    pub fn ascender(&self) -> f64 {
        self.font.size * Self::ASCENDER
    }

    /// Resolve requested image dimensions, preserving a square aspect
    pub fn image_extent(width: Option<f64>, height: Option<f64>) -> ImageExtent {
        match (width, height) {
            (Some(w), Some(h)) => ImageExtent {
                width: w,
                height: h,
            },
            (Some(s), None) | (None, Some(s)) => ImageExtent {
                width: s,
                height: s,
            },
            (None, None) => ImageExtent {
                width: Self::IMAGE_SIZE,
                height: Self::IMAGE_SIZE,
            },
        }
    }
}

impl Default for ApproxMetrics {
    fn default() -> Self {
        Self {
            font: Font::default(),
        }
    }
}
