use glam::DVec2;

use super::{draw_circle, draw_line, draw_marker, draw_thick_line, BrailleCanvas};
use crate::config::PageBox;
use crate::surface::{
    ApproxMetrics, Color, Dash, DrawingSurface, FillRule, Font, ImageExtent, LineCap, LineJoin,
    Rotation, TextMode,
};

/// Text placed on the terminal grid, in character cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub col: u16,
    pub row: u16,
    pub text: String,
}

/// Rasterizes drawing operations onto braille canvases for preview.
///
/// Fills are drawn as outlines. Strokes, area outlines and markers go to
/// separate canvases so the widget can color them independently.
pub struct BrailleSurface {
    pub areas: BrailleCanvas,
    pub lines: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub labels: Vec<Label>,
    page: PageBox,
    /// Pixel grid size (2x4 dots per cell)
    pixels: (f64, f64),
    subpaths: Vec<Vec<DVec2>>,
    circles: Vec<(DVec2, f64)>,
    line_width: f64,
    metrics: ApproxMetrics,
}

impl BrailleSurface {
    /// Line widths above this get a double pass
    const THICK: f64 = 2.5;

    /// Canvases of `cols` x `rows` cells showing `page`
    pub fn new(page: PageBox, cols: usize, rows: usize) -> Self {
        Self {
            areas: BrailleCanvas::new(cols, rows),
            lines: BrailleCanvas::new(cols, rows),
            markers: BrailleCanvas::new(cols, rows),
            labels: Vec::new(),
            page,
            pixels: ((cols * 2) as f64, (rows * 4) as f64),
            subpaths: Vec::new(),
            circles: Vec::new(),
            line_width: 1.0,
            metrics: ApproxMetrics::default(),
        }
    }

    /// Page point to canvas pixel; page y-up becomes screen y-down
    #[inline]
    fn to_pixel(&self, p: DVec2) -> (i32, i32) {
        let fx = (p.x - self.page.origin_x) / self.page.width;
        let fy = 1.0 - (p.y - self.page.origin_y) / self.page.height;
        ((fx * self.pixels.0) as i32, (fy * self.pixels.1) as i32)
    }

    #[inline]
    fn to_pixel_length(&self, len: f64) -> i32 {
        (len / self.page.width * self.pixels.0).round() as i32
    }

    fn flush(&mut self, filled: bool) {
        let thick = !filled && self.line_width > Self::THICK;
        let subpaths = std::mem::take(&mut self.subpaths);
        for path in &subpaths {
            let pixels: Vec<(i32, i32)> = path.iter().map(|&p| self.to_pixel(p)).collect();
            let canvas = if filled { &mut self.areas } else { &mut self.lines };
            for w in pixels.windows(2) {
                let ((x0, y0), (x1, y1)) = (w[0], w[1]);
                if thick {
                    draw_thick_line(canvas, x0, y0, x1, y1);
                } else {
                    draw_line(canvas, x0, y0, x1, y1);
                }
            }
        }
        for (center, radius) in std::mem::take(&mut self.circles) {
            let (x, y) = self.to_pixel(center);
            let r = self.to_pixel_length(radius).max(1);
            draw_circle(&mut self.markers, x, y, r);
        }
    }

    fn cell(&self, p: DVec2) -> Option<(u16, u16)> {
        let (x, y) = self.to_pixel(p);
        if x < 0 || y < 0 {
            return None;
        }
        let (col, row) = (x / 2, y / 4);
        (col < (self.pixels.0 / 2.0) as i32 && row < (self.pixels.1 / 4.0) as i32)
            .then(|| (col as u16, row as u16))
    }
}

impl DrawingSurface for BrailleSurface {
    fn set_fill_color(&mut self, _color: Color) {}

    fn set_stroke_color(&mut self, _color: Color) {}

    fn set_fill_pattern(&mut self, _source: &str) {}

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn set_line_cap(&mut self, _cap: LineCap) {}

    fn set_line_join(&mut self, _join: LineJoin) {}

    fn set_dash(&mut self, _dash: Option<Dash>) {}

    fn begin_opacity(&mut self, _opacity: f64) {}

    fn end_opacity(&mut self) {}

    fn move_to(&mut self, p: DVec2) {
        self.subpaths.push(vec![p]);
    }

    fn line_to(&mut self, p: DVec2) {
        match self.subpaths.last_mut() {
            Some(path) => path.push(p),
            None => self.subpaths.push(vec![p]),
        }
    }

    fn rectangle(&mut self, corner: DVec2, width: f64, height: f64) {
        self.subpaths.push(vec![
            corner,
            corner + DVec2::new(width, 0.0),
            corner + DVec2::new(width, height),
            corner + DVec2::new(0.0, height),
            corner,
        ]);
    }

    fn circle(&mut self, center: DVec2, radius: f64) {
        self.circles.push((center, radius));
    }

    fn fill(&mut self, _rule: FillRule) {
        self.flush(true);
    }

    fn stroke(&mut self) {
        self.flush(false);
    }

    fn fill_and_stroke(&mut self, _rule: FillRule) {
        self.flush(true);
    }

    fn set_font(&mut self, font: &Font) {
        self.metrics.set_font(font);
    }

    fn draw_text(&mut self, text: &str, at: DVec2, rotation: Option<Rotation>, mode: TextMode) {
        // halo passes would only duplicate the fill pass here
        if mode == TextMode::Stroke {
            return;
        }
        let anchor = rotation.map_or(at, |r| r.origin);
        if let Some((col, row)) = self.cell(anchor) {
            self.labels.push(Label {
                col,
                row,
                text: text.to_string(),
            });
        }
    }

    fn draw_image(
        &mut self,
        _source: &str,
        center: DVec2,
        width: Option<f64>,
        height: Option<f64>,
    ) -> ImageExtent {
        let extent = ApproxMetrics::image_extent(width, height);
        let (x, y) = self.to_pixel(center);
        let size = self.to_pixel_length(extent.width / 2.0).max(1);
        draw_marker(&mut self.markers, x, y, size);
        extent
    }

    fn clip_rect(&mut self, _corner: DVec2, _width: f64, _height: f64) {}

    fn save_state(&mut self) {}

    fn restore_state(&mut self) {}

    fn text_width(&self, text: &str) -> f64 {
        self.metrics.text_width(text)
    }

    fn ascender(&self) -> f64 {
        self.metrics.ascender()
    }
}
