//! Label layout: node labels, centered area labels and text along paths.
//!
//! A label is placed atomically. Every glyph box is checked against the
//! collision index before anything is drawn; one hit drops the whole label.

use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use glam::DVec2;
use tracing::trace;

use crate::data::{NodeId, Tags, WayId};
use crate::map::collision::{CollisionObject, ItemId};
use crate::map::geometry;
use crate::map::items::DrawContext;
use crate::style::ResolvedStyle;
use crate::surface::{Color, DrawingSurface, Font, FontStyle, Rotation, TextMode};

/// What a label is attached to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextTarget {
    /// Above the node's point item, when it has one
    Node { node: NodeId, anchor: Option<ItemId> },
    /// Along (or centered in) a way of known length
    Way { way: WayId, path_length: f64 },
}

#[derive(Debug, Clone)]
pub struct TextItem {
    pub style: ResolvedStyle,
    pub target: TextTarget,
    pub tags: Rc<Tags>,
}

/// One glyph's box in page space
#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    text: String,
    center: DVec2,
    width: f64,
    height: f64,
    degrees: f64,
}

impl Glyph {
    #[inline]
    fn half(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// A fully laid out label
#[derive(Debug, Clone, PartialEq)]
enum Layout {
    /// Whole string at one baseline origin
    Straight { origin: DVec2, glyphs: Vec<Glyph> },
    /// Each glyph drawn separately, rotated around its center
    OnPath { glyphs: Vec<Glyph> },
}

impl Layout {
    fn glyphs(&self) -> &[Glyph] {
        match self {
            Layout::Straight { glyphs, .. } | Layout::OnPath { glyphs } => glyphs,
        }
    }

    fn draw(&self, surface: &mut dyn DrawingSurface, text: &str, mode: TextMode) {
        match self {
            Layout::Straight { origin, .. } => surface.draw_text(text, *origin, None, mode),
            Layout::OnPath { glyphs } => {
                for g in glyphs {
                    surface.save_state();
                    let rotation = Rotation {
                        degrees: g.degrees,
                        origin: g.center,
                    };
                    surface.draw_text(&g.text, g.center - g.half(), Some(rotation), mode);
                    surface.restore_state();
                }
            }
        }
    }
}

impl TextItem {
    fn font(&self) -> Font {
        let (style, tags) = (&self.style, &*self.tags);
        Font {
            family: style
                .text(tags, "font_family")
                .unwrap_or_else(|| Font::default().family),
            size: style.number_or(tags, "font_size", Font::default().size),
            style: FontStyle::from_flags(
                style.flag(tags, "font_bold"),
                style.flag(tags, "font_italic"),
            ),
        }
    }

    /// Display text: the value of the tag named by `text`
    fn label(&self) -> Option<String> {
        let key = self.style.text(&self.tags, "text")?;
        let text = self.tags.get(&key)?;
        if self.style.flag(&self.tags, "font_caps") {
            Some(text.to_uppercase())
        } else {
            Some(text.clone())
        }
    }

    pub(crate) fn draw(&self, id: ItemId, ctx: &mut DrawContext<'_>) {
        let Some(text) = self.label() else {
            return;
        };
        ctx.surface.set_font(&self.font());

        let Some(layout) = self.layout(&text, ctx) else {
            return;
        };

        let free = layout
            .glyphs()
            .iter()
            .all(|g| ctx.viewport.space_at(g.center, g.half()).is_free());
        if !free {
            ctx.stats.labels_dropped += 1;
            trace!(label = %text, "label dropped, space taken");
            return;
        }

        let (style, tags) = (&self.style, &*self.tags);
        if style.defined("text_halo_color") {
            let s = &mut *ctx.surface;
            s.set_stroke_color(style.color_or(tags, "text_halo_color", 0));
            s.set_line_width(style.number_or(tags, "text_halo_width", 1.0));
            layout.draw(s, &text, TextMode::Stroke);
        }
        ctx.surface
            .set_fill_color(style.color_or(tags, "text_color", Color::BLACK.0));
        layout.draw(&mut *ctx.surface, &text, TextMode::Fill);

        for (i, g) in layout.glyphs().iter().enumerate() {
            let object = CollisionObject::new(g.center, g.half(), Some(id), Some(i));
            let reservation = ctx.viewport.reserve(object);
            ctx.stats.record(reservation);
        }
        ctx.stats.labels_placed += 1;
    }

    fn layout(&self, text: &str, ctx: &mut DrawContext<'_>) -> Option<Layout> {
        let surface = &*ctx.surface;
        let width = surface.text_width(text);
        let ascender = surface.ascender();

        match self.target {
            TextTarget::Node { node, anchor } => {
                let (center, height) = match anchor.and_then(|a| ctx.placement(a)) {
                    Some(p) => (p.center, p.extent.height),
                    None => {
                        let node = ctx.db.node(node)?;
                        (ctx.viewport.project(node.lon, node.lat), 0.0)
                    }
                };
                let origin = DVec2::new(center.x - width / 2.0, center.y + height / 2.0);
                Some(straight(&*ctx.surface, text, origin, ascender))
            }
            TextTarget::Way { way, path_length } => {
                let db = ctx.db;
                let way = db.way(way)?;
                if self.style.flag(&self.tags, "text_center") && way.is_closed() {
                    if let Some(c) = ctx.viewport.properties(db, way).centroid {
                        let origin = DVec2::new(c.x - width / 2.0, c.y - ascender / 2.0);
                        return Some(straight(&*ctx.surface, text, origin, ascender));
                    }
                }

                if path_length < width {
                    trace!(label = %text, path_length, width, "label longer than path");
                    return None;
                }
                let offset = self.style.number_or(&self.tags, "text_offset", 0.0);
                let path = ctx.viewport.path(db, way, offset);
                on_path(&*ctx.surface, text, path, width, ascender)
            }
        }
    }
}

/// Per-glyph boxes for an unrotated label starting at `origin`
fn straight(surface: &dyn DrawingSurface, text: &str, origin: DVec2, ascender: f64) -> Layout {
    let mut cx = origin.x;
    let glyphs = text
        .chars()
        .map(|ch| {
            let s = ch.to_string();
            let w = surface.text_width(&s);
            let g = Glyph {
                center: DVec2::new(cx + w / 2.0, origin.y + ascender / 2.0),
                text: s,
                width: w,
                height: ascender,
                degrees: 0.0,
            };
            cx += w;
            g
        })
        .collect();
    Layout::Straight { origin, glyphs }
}

/// Glyphs walked along `path`, centered on its midpoint, reading left to right
fn on_path(
    surface: &dyn DrawingSurface,
    text: &str,
    path: &[DVec2],
    width: f64,
    ascender: f64,
) -> Option<Layout> {
    let length = geometry::polyline_length(path);
    if !(length > 0.0) || length < width {
        return None;
    }
    let t1 = (length / 2.0 - width / 2.0) / length;
    let t2 = (length / 2.0 + width / 2.0) / length;
    let (p1, _) = geometry::point_at(path, t1)?;
    let (p2, _) = geometry::point_at(path, t2)?;
    let (_, mid_angle) = geometry::point_at(path, 0.5)?;

    // otherwise start from the far end and turn every glyph around
    let forward = p1.x < p2.x && mid_angle > -FRAC_PI_2 && mid_angle < FRAC_PI_2;
    let (t_start, sign, turn) = if forward { (t1, 1.0, 0.0) } else { (t2, -1.0, PI) };

    let mut along = 0.0;
    let mut glyphs = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let s = ch.to_string();
        let w = surface.text_width(&s);
        let (center, angle) = geometry::point_at(path, t_start + sign * (along + w / 2.0) / length)?;
        glyphs.push(Glyph {
            text: s,
            center,
            width: w,
            height: ascender,
            degrees: (angle + turn).to_degrees(),
        });
        along += w;
    }
    Some(Layout::OnPath { glyphs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn surface() -> RecordingSurface {
        RecordingSurface::new()
    }

    #[test]
    fn test_straight_boxes_follow_advance() {
        let s = surface();
        let layout = straight(&s, "abc", DVec2::new(100.0, 50.0), 7.18);
        let g = layout.glyphs();
        assert_eq!(g.len(), 3);
        assert!((g[0].center.x - 103.0).abs() < 1e-9);
        assert!((g[2].center.x - 115.0).abs() < 1e-9);
        assert!((g[1].center.y - 53.59).abs() < 1e-9);
    }

    #[test]
    fn test_on_path_reads_left_to_right() {
        let s = surface();
        let east = [DVec2::new(0.0, 0.0), DVec2::new(100.0, 0.0)];
        let west = [DVec2::new(100.0, 0.0), DVec2::new(0.0, 0.0)];

        let a = on_path(&s, "ab", &east, 12.0, 7.0).unwrap();
        let b = on_path(&s, "ab", &west, 12.0, 7.0).unwrap();
        for layout in [&a, &b] {
            let g = layout.glyphs();
            assert!(g[0].center.x < g[1].center.x);
            assert!((g[0].center.x - 47.0).abs() < 1e-9);
        }
        assert!(a.glyphs()[0].degrees.abs() < 1e-9);
        // west-running path: tangent is 180, turned around to 360
        assert!((b.glyphs()[0].degrees - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_on_path_rejects_short_path() {
        let s = surface();
        let short = [DVec2::ZERO, DVec2::new(5.0, 0.0)];
        assert!(on_path(&s, "long label", &short, 60.0, 7.0).is_none());
    }

    #[test]
    fn test_rotated_glyphs_saved_and_restored() {
        let mut s = surface();
        let path = [DVec2::new(0.0, 0.0), DVec2::new(0.0, 100.0)];
        let layout = on_path(&s, "hi", &path, 12.0, 7.0).unwrap();
        layout.draw(&mut s, "hi", TextMode::Fill);
        assert_eq!(s.texts().collect::<Vec<_>>(), vec!["h", "i"]);
        assert_eq!(s.ops.len(), 6);
    }
}
