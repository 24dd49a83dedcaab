use glam::DVec2;

use map_press::braille::BrailleSurface;
use map_press::config::{JobConfig, Orientation, PageSetup, PageSize};
use map_press::data::Database;
use map_press::error::ConfigError;
use map_press::geo::{lat2latp, latp2lat, GeoBounds};
use map_press::map::{MapRenderer, RenderSummary, Viewport};
use map_press::style::RuleSet;

/// Page units per braille dot. Keeps the default 10pt font close to one
/// character cell per glyph.
const UNITS_PER_DOT: f64 = 3.0;

/// Fraction of the visible extent moved per pan step
const PAN_STEP: f64 = 0.05;

/// Result of rendering one preview frame
pub struct Frame {
    pub surface: BrailleSurface,
    pub summary: Result<RenderSummary, ConfigError>,
}

/// Terminal preview state: the job being previewed and a movable window
/// onto its bounds.
pub struct App {
    pub job: JobConfig,
    pub db: Database,
    pub styles: RuleSet,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    initial: GeoBounds,
    /// Map area in cells, inside the border
    map_size: (usize, usize),
}

impl App {
    pub fn new(job: JobConfig, db: Database, styles: RuleSet, width: usize, height: usize) -> Self {
        let mut app = Self {
            initial: job.bounds,
            job,
            db,
            styles,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            map_size: (0, 0),
        };
        app.resize(width, height);
        app
    }

    /// Update map size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        // 2 columns of border, 2 rows of border plus the status bar
        self.map_size = (width.saturating_sub(2), height.saturating_sub(3));
    }

    /// Render the current window into a braille surface of `cols` x `rows`
    pub fn render(&self, cols: usize, rows: usize) -> Frame {
        let job = JobConfig {
            page: PageSetup {
                size: PageSize::Custom {
                    width: cols as f64 * 2.0 * UNITS_PER_DOT,
                    height: rows as f64 * 4.0 * UNITS_PER_DOT,
                },
                margin: 0.0,
                orientation: Orientation::Portrait,
            },
            ..self.job
        };
        let page = job.page.page_box();
        let mut surface = BrailleSurface::new(page, cols, rows);
        let summary = MapRenderer::new(&self.db, &self.styles).render(&job, &mut surface);
        Frame { surface, summary }
    }

    /// Pan by whole steps; positive `dy` moves south
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let b = &mut self.job.bounds;
        let shift_lon = (b.max_lon - b.min_lon) * PAN_STEP * dx as f64;
        let (lo, hi) = (lat2latp(b.min_lat), lat2latp(b.max_lat));
        let shift_latp = (hi - lo) * PAN_STEP * -dy as f64;
        b.min_lon += shift_lon;
        b.max_lon += shift_lon;
        self.set_latp_range(lo + shift_latp, hi + shift_latp);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(1.0 / 1.5);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.5);
    }

    /// Scale the window around its center by `factor`
    fn zoom_by(&mut self, factor: f64) {
        let b = self.job.bounds;
        let cx = (b.min_lon + b.max_lon) / 2.0;
        let half = (b.max_lon - b.min_lon) / 2.0 * factor;
        let (lo, hi) = (lat2latp(b.min_lat), lat2latp(b.max_lat));
        let (cy, half_p) = ((lo + hi) / 2.0, (hi - lo) / 2.0 * factor);

        self.job.bounds.min_lon = cx - half;
        self.job.bounds.max_lon = cx + half;
        self.set_latp_range(cy - half_p, cy + half_p);
    }

    fn set_latp_range(&mut self, lo: f64, hi: f64) {
        let limit = lat2latp(85.0);
        if lo < -limit || hi > limit {
            return;
        }
        self.job.bounds.min_lat = latp2lat(lo);
        self.job.bounds.max_lat = latp2lat(hi);
    }

    pub fn reset(&mut self) {
        self.job.bounds = self.initial;
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Zoom relative to the job's bounds, as a string
    pub fn zoom_level(&self) -> String {
        let current = self.job.bounds.max_lon - self.job.bounds.min_lon;
        let initial = self.initial.max_lon - self.initial.min_lon;
        format!("{:.1}x", initial / current)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let b = self.job.bounds;
        let lat = latp2lat((lat2latp(b.min_lat) + lat2latp(b.max_lat)) / 2.0);
        let lon = (b.min_lon + b.max_lon) / 2.0;
        format_coords(lon, lat)
    }

    /// Geographic position under the mouse, if it is over the map
    pub fn cursor_coords(&self) -> Option<String> {
        let (col, row) = self.mouse_pos?;
        let (cols, rows) = self.map_size;
        let (col, row) = (col.checked_sub(1)? as usize, row.checked_sub(1)? as usize);
        if col >= cols || row >= rows {
            return None;
        }
        let job = JobConfig {
            page: PageSetup {
                size: PageSize::Custom {
                    width: cols as f64,
                    height: rows as f64,
                },
                margin: 0.0,
                orientation: Orientation::Portrait,
            },
            ..self.job
        };
        let viewport = Viewport::new(&job).ok()?;
        let (lon, lat) = viewport.unproject(DVec2::new(col as f64 + 0.5, (rows - row) as f64 - 0.5));
        Some(format_coords(lon, lat))
    }

    /// Pan the map while dragging
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.pan(dx, dy);
            }
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Cursor cell inside the map area
    pub fn cursor_cell(&self) -> Option<(u16, u16)> {
        let (col, row) = self.mouse_pos?;
        Some((col.checked_sub(1)?, row.checked_sub(1)?))
    }
}

fn format_coords(lon: f64, lat: f64) -> String {
    format!(
        "{:.4}°{}, {:.4}°{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let job = JobConfig::new(GeoBounds::new(-1.5, 51.86, -1.47, 51.89), PageSetup::default());
        App::new(job, Database::new(), RuleSet::default(), 82, 43)
    }

    #[test]
    fn test_zoom_round_trip() {
        let mut app = app();
        app.zoom_in();
        assert_eq!(app.zoom_level(), "1.5x");
        app.zoom_out();
        let b = app.job.bounds;
        assert!((b.min_lon + 1.5).abs() < 1e-9);
        assert!((b.max_lat - 51.89).abs() < 1e-9);
    }

    #[test]
    fn test_pan_moves_window() {
        let mut app = app();
        app.pan(1, -1);
        assert!(app.job.bounds.min_lon > -1.5);
        assert!(app.job.bounds.min_lat > 51.86);
        app.reset();
        assert_eq!(app.job.bounds, app.initial);
    }

    #[test]
    fn test_render_empty_data() {
        let app = app();
        let frame = app.render(80, 40);
        let summary = frame.summary.unwrap();
        assert_eq!(summary.items, 0);
        assert!(frame.surface.labels.is_empty());
    }

    #[test]
    fn test_cursor_coords_inside_map() {
        let mut app = app();
        app.set_mouse_pos(40, 20);
        assert!(app.cursor_coords().unwrap().ends_with('W'));
        app.set_mouse_pos(0, 0);
        assert!(app.cursor_coords().is_none());
    }
}
