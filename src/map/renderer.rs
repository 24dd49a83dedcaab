use glam::DVec2;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::JobConfig;
use crate::data::Database;
use crate::error::ConfigError;
use crate::geo::{lat2latp, latp2lat, GeoBounds};
use crate::map::display_list::DisplayList;
use crate::map::items::DrawContext;
use crate::map::projection::Viewport;
use crate::style::StyleEngine;
use crate::surface::{DrawOp, DrawingSurface, RecordingSurface};

/// Counts from one page render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub items: usize,
    pub labels_placed: usize,
    pub labels_dropped: usize,
    pub reservations_skipped: usize,
}

/// One page of an atlas grid
#[derive(Debug, Clone)]
pub struct AtlasPage {
    pub column: usize,
    pub row: usize,
    pub bounds: GeoBounds,
    pub summary: RenderSummary,
    pub ops: Vec<DrawOp>,
}

/// Drives a render: picks visible entities, builds the display list and
/// draws it inside the page clip.
pub struct MapRenderer<'a, E: StyleEngine + ?Sized> {
    db: &'a Database,
    styles: &'a E,
}

impl<'a, E: StyleEngine + ?Sized> MapRenderer<'a, E> {
    pub fn new(db: &'a Database, styles: &'a E) -> Self {
        Self { db, styles }
    }

    /// Render one page described by `config`
    pub fn render(
        &self,
        config: &JobConfig,
        surface: &mut dyn DrawingSurface,
    ) -> Result<RenderSummary, ConfigError> {
        let mut viewport = Viewport::new(config)?;
        Ok(self.render_viewport(&mut viewport, surface))
    }

    /// Render into an existing viewport, keeping whatever it has reserved
    pub fn render_viewport(
        &self,
        viewport: &mut Viewport,
        surface: &mut dyn DrawingSurface,
    ) -> RenderSummary {
        let list = self.compile(viewport);
        let page = viewport.page_box();

        surface.save_state();
        surface.clip_rect(
            DVec2::new(page.origin_x, page.origin_y),
            page.width,
            page.height,
        );
        let mut ctx = DrawContext::new(self.db, viewport, surface);
        list.draw(&mut ctx);
        let stats = ctx.stats;
        surface.restore_state();

        let summary = RenderSummary {
            items: list.len(),
            labels_placed: stats.labels_placed,
            labels_dropped: stats.labels_dropped,
            reservations_skipped: stats.reservations_skipped,
        };
        info!(
            items = summary.items,
            labels = summary.labels_placed,
            dropped = summary.labels_dropped,
            "page rendered"
        );
        summary
    }

    /// Display list for everything visible in the viewport
    pub fn compile(&self, viewport: &mut Viewport) -> DisplayList {
        let mut list = DisplayList::new(viewport.layers());
        list.compile_canvas(self.styles, viewport.scale());

        let mut ways = 0;
        for way in self.db.ways() {
            if viewport.contains_way(self.db, way) {
                list.compile_way(self.db, viewport, self.styles, way);
                ways += 1;
            }
        }
        let mut nodes = 0;
        for node in self.db.nodes() {
            let standalone = !self.db.has_parent_ways(node.id) || node.has_interesting_tags();
            if standalone && viewport.contains_node(node) {
                list.compile_node(self.db, viewport, self.styles, node);
                nodes += 1;
            }
        }
        debug!(ways, nodes, items = list.len(), "display list compiled");
        list
    }
}

impl<'a, E: StyleEngine + Sync + ?Sized> MapRenderer<'a, E> {
    /// Render a `columns` x `rows` grid of pages covering `config.bounds`,
    /// each on its own worker with its own viewport.
    pub fn render_atlas(
        &self,
        config: &JobConfig,
        columns: usize,
        rows: usize,
    ) -> Result<Vec<AtlasPage>, ConfigError> {
        config.validate()?;
        split_bounds(config.bounds, columns, rows)
            .into_par_iter()
            .map(|(column, row, bounds)| {
                let job = JobConfig { bounds, ..*config };
                let mut surface = RecordingSurface::new();
                let summary = self.render(&job, &mut surface)?;
                Ok(AtlasPage {
                    column,
                    row,
                    bounds,
                    summary,
                    ops: surface.ops,
                })
            })
            .collect()
    }
}

/// Split bounds into a grid of (column, row, bounds), row 0 northmost.
///
/// Rows are equal in isometric latitude so every page shares one scale.
pub fn split_bounds(bounds: GeoBounds, columns: usize, rows: usize) -> Vec<(usize, usize, GeoBounds)> {
    let (columns, rows) = (columns.max(1), rows.max(1));
    let dlon = (bounds.max_lon - bounds.min_lon) / columns as f64;
    let top = lat2latp(bounds.max_lat);
    let dlatp = (top - lat2latp(bounds.min_lat)) / rows as f64;

    let mut pages = Vec::with_capacity(columns * rows);
    for row in 0..rows {
        let max_lat = if row == 0 {
            bounds.max_lat
        } else {
            latp2lat(top - dlatp * row as f64)
        };
        let min_lat = if row + 1 == rows {
            bounds.min_lat
        } else {
            latp2lat(top - dlatp * (row + 1) as f64)
        };
        for column in 0..columns {
            let min_lon = bounds.min_lon + dlon * column as f64;
            let max_lon = if column + 1 == columns {
                bounds.max_lon
            } else {
                bounds.min_lon + dlon * (column + 1) as f64
            };
            pages.push((column, row, GeoBounds::new(min_lon, min_lat, max_lon, max_lat)));
        }
    }
    pages
}
