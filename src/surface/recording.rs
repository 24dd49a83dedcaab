use glam::DVec2;
use serde::Serialize;

use super::{
    ApproxMetrics, Color, Dash, DrawingSurface, FillRule, Font, ImageExtent, LineCap, LineJoin,
    Rotation, TextMode,
};

/// One recorded drawing operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    FillColor { color: String },
    StrokeColor { color: String },
    FillPattern { source: String },
    LineWidth { width: f64 },
    LineCap { cap: LineCap },
    LineJoin { join: LineJoin },
    Dash { dash: Option<Dash> },
    BeginOpacity { opacity: f64 },
    EndOpacity,
    MoveTo { p: DVec2 },
    LineTo { p: DVec2 },
    Rectangle { corner: DVec2, width: f64, height: f64 },
    Circle { center: DVec2, radius: f64 },
    Fill { rule: FillRule },
    Stroke,
    FillAndStroke { rule: FillRule },
    Font { font: Font },
    Text {
        text: String,
        at: DVec2,
        rotation: Option<Rotation>,
        mode: TextMode,
    },
    Image {
        source: String,
        center: DVec2,
        extent: ImageExtent,
    },
    Clip { corner: DVec2, width: f64, height: f64 },
    Save,
    Restore,
}

impl DrawOp {
    /// Does this operation paint pixels?
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            DrawOp::Fill { .. }
                | DrawOp::Stroke
                | DrawOp::FillAndStroke { .. }
                | DrawOp::Text { .. }
                | DrawOp::Image { .. }
        )
    }
}

/// Surface that records every operation, for tests and JSON dumps
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
    metrics: ApproxMetrics,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap operations recorded elsewhere, e.g. by an atlas worker
    pub fn from_ops(ops: Vec<DrawOp>) -> Self {
        Self {
            ops,
            ..Self::default()
        }
    }

    /// Number of subpaths started since the last paint before `index`
    pub fn subpaths_before(&self, index: usize) -> usize {
        self.ops[..index]
            .iter()
            .rev()
            .take_while(|op| !op.is_paint())
            .filter(|op| {
                matches!(
                    op,
                    DrawOp::MoveTo { .. } | DrawOp::Rectangle { .. } | DrawOp::Circle { .. }
                )
            })
            .count()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn to_json(&self) -> simd_json::Result<String> {
        simd_json::serde::to_string(&self.ops)
    }
}

impl DrawingSurface for RecordingSurface {
    fn set_fill_color(&mut self, color: Color) {
        self.ops.push(DrawOp::FillColor {
            color: color.to_hex(),
        });
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.ops.push(DrawOp::StrokeColor {
            color: color.to_hex(),
        });
    }

    fn set_fill_pattern(&mut self, source: &str) {
        self.ops.push(DrawOp::FillPattern {
            source: source.to_string(),
        });
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(DrawOp::LineWidth { width });
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ops.push(DrawOp::LineCap { cap });
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.ops.push(DrawOp::LineJoin { join });
    }

    fn set_dash(&mut self, dash: Option<Dash>) {
        self.ops.push(DrawOp::Dash { dash });
    }

    fn begin_opacity(&mut self, opacity: f64) {
        self.ops.push(DrawOp::BeginOpacity { opacity });
    }

    fn end_opacity(&mut self) {
        self.ops.push(DrawOp::EndOpacity);
    }

    fn move_to(&mut self, p: DVec2) {
        self.ops.push(DrawOp::MoveTo { p });
    }

    fn line_to(&mut self, p: DVec2) {
        self.ops.push(DrawOp::LineTo { p });
    }

    fn rectangle(&mut self, corner: DVec2, width: f64, height: f64) {
        self.ops.push(DrawOp::Rectangle {
            corner,
            width,
            height,
        });
    }

    fn circle(&mut self, center: DVec2, radius: f64) {
        self.ops.push(DrawOp::Circle { center, radius });
    }

    fn fill(&mut self, rule: FillRule) {
        self.ops.push(DrawOp::Fill { rule });
    }

    fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    fn fill_and_stroke(&mut self, rule: FillRule) {
        self.ops.push(DrawOp::FillAndStroke { rule });
    }

    fn set_font(&mut self, font: &Font) {
        self.metrics.set_font(font);
        self.ops.push(DrawOp::Font { font: font.clone() });
    }

    fn draw_text(&mut self, text: &str, at: DVec2, rotation: Option<Rotation>, mode: TextMode) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            at,
            rotation,
            mode,
        });
    }

    fn draw_image(
        &mut self,
        source: &str,
        center: DVec2,
        width: Option<f64>,
        height: Option<f64>,
    ) -> ImageExtent {
        let extent = ApproxMetrics::image_extent(width, height);
        self.ops.push(DrawOp::Image {
            source: source.to_string(),
            center,
            extent,
        });
        extent
    }

    fn clip_rect(&mut self, corner: DVec2, width: f64, height: f64) {
        self.ops.push(DrawOp::Clip {
            corner,
            width,
            height,
        });
    }

    fn save_state(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore_state(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn text_width(&self, text: &str) -> f64 {
        self.metrics.text_width(text)
    }

    fn ascender(&self) -> f64 {
        self.metrics.ascender()
    }
}
