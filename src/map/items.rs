//! Drawing items: one styled facet of one entity, ready to draw.

use std::collections::HashMap;
use std::rc::Rc;

use glam::DVec2;
use tracing::trace;

use crate::data::{Database, NodeId, Role, Tags, WayId};
use crate::map::collision::{CollisionObject, ItemId, Reservation};
use crate::map::projection::Viewport;
use crate::map::text::TextItem;
use crate::style::ResolvedStyle;
use crate::surface::{
    with_opacity, Color, Dash, DrawingSurface, FillRule, ImageExtent, LineCap, LineJoin,
};

/// Drawing classes, in the order they are painted within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Canvas,
    Fill,
    Casing,
    Stroke,
    Point,
    Text,
}

impl ItemKind {
    pub const DRAW_ORDER: [ItemKind; 6] = [
        ItemKind::Canvas,
        ItemKind::Fill,
        ItemKind::Casing,
        ItemKind::Stroke,
        ItemKind::Point,
        ItemKind::Text,
    ];
}

/// Where a point item ended up, for labels bound to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPlacement {
    pub center: DVec2,
    pub extent: ImageExtent,
}

/// Label and reservation counters for one draw pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub labels_placed: usize,
    pub labels_dropped: usize,
    pub reservations_skipped: usize,
}

impl DrawStats {
    pub(crate) fn record(&mut self, reservation: Reservation) {
        if let Reservation::Skipped(_) = reservation {
            self.reservations_skipped += 1;
        }
    }
}

/// Everything an item needs while drawing
pub struct DrawContext<'a> {
    pub db: &'a Database,
    pub viewport: &'a mut Viewport,
    pub surface: &'a mut dyn DrawingSurface,
    pub stats: DrawStats,
    placements: HashMap<ItemId, PointPlacement>,
}

impl<'a> DrawContext<'a> {
    pub fn new(
        db: &'a Database,
        viewport: &'a mut Viewport,
        surface: &'a mut dyn DrawingSurface,
    ) -> Self {
        Self {
            db,
            viewport,
            surface,
            stats: DrawStats::default(),
            placements: HashMap::new(),
        }
    }

    pub fn placement(&self, item: ItemId) -> Option<PointPlacement> {
        self.placements.get(&item).copied()
    }
}

/// Page background
#[derive(Debug, Clone)]
pub struct CanvasItem {
    pub style: ResolvedStyle,
}

impl CanvasItem {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let tags = Tags::new();
        let page = ctx.viewport.page_box();
        ctx.surface
            .set_fill_color(self.style.color_or(&tags, "fill_color", 0xFF_FFFF));
        let opacity = self.style.number_or(&tags, "fill_opacity", 1.0);
        with_opacity(&mut *ctx.surface, opacity, |s| {
            s.rectangle(
                DVec2::new(page.origin_x, page.origin_y),
                page.width,
                page.height,
            );
            s.fill(FillRule::NonZero);
        });
    }
}

/// A styled way: shared by Fill, Casing and Stroke
#[derive(Debug, Clone)]
pub struct ShapeItem {
    pub style: ResolvedStyle,
    pub way: WayId,
    /// Entity tags plus synthetic state tags
    pub tags: Rc<Tags>,
}

impl ShapeItem {
    pub fn new(style: ResolvedStyle, way: WayId, tags: Rc<Tags>) -> Self {
        Self { style, way, tags }
    }

    /// Own path, then the inner rings of every multipolygon it is outer of
    fn rings(&self, ctx: &mut DrawContext<'_>, with_inners: bool) -> Vec<Vec<DVec2>> {
        let db = ctx.db;
        let Some(way) = db.way(self.way) else {
            return Vec::new();
        };
        let mut rings = vec![ctx.viewport.path(db, way, 0.0).to_vec()];
        if with_inners {
            for inner in db.inner_ways_of(self.way) {
                if let Some(inner) = db.way(inner) {
                    rings.push(ctx.viewport.path(db, inner, 0.0).to_vec());
                }
            }
        }
        rings.retain(|r| !r.is_empty());
        rings
    }

    fn is_inner_ring(&self, db: &Database) -> bool {
        db.is_multipolygon_member(self.way, &Role::Inner)
    }

    fn draw_fill(&self, ctx: &mut DrawContext<'_>) {
        if self.is_inner_ring(ctx.db) {
            return;
        }
        let rings = self.rings(ctx, true);
        if rings.is_empty() {
            return;
        }
        let tags = &self.tags;
        if self.style.defined("fill_color") {
            ctx.surface
                .set_fill_color(self.style.color_or(tags, "fill_color", 0));
        }
        if let Some(source) = self.style.text(tags, "fill_image") {
            ctx.surface.set_fill_pattern(&source);
        }
        let opacity = self.style.number_or(tags, "fill_opacity", 1.0);
        with_opacity(&mut *ctx.surface, opacity, |s| {
            for ring in &rings {
                trace_path(s, ring);
            }
            s.fill(FillRule::EvenOdd);
        });
    }

    fn draw_casing(&self, ctx: &mut DrawContext<'_>) {
        let rings = self.rings(ctx, false);
        if rings.is_empty() {
            return;
        }
        let (style, tags) = (&self.style, &*self.tags);
        let width = style.number_or(tags, "width", 0.0) + style.number_or(tags, "casing_width", 0.0);
        let cap = keyword(style, tags, "casing_linecap", LineCap::parse)
            .or_else(|| keyword(style, tags, "linecap", LineCap::parse))
            .unwrap_or(LineCap::Butt);
        let join = keyword(style, tags, "casing_linejoin", LineJoin::parse)
            .or_else(|| keyword(style, tags, "linejoin", LineJoin::parse))
            .unwrap_or(LineJoin::Round);
        let dash = keyword(style, tags, "casing_dashes", Dash::parse);

        let s = &mut *ctx.surface;
        s.set_line_width(width);
        s.set_line_cap(cap);
        s.set_line_join(join);
        s.set_stroke_color(style.color_or(tags, "casing_color", 0));
        if dash.is_some() {
            s.set_dash(dash);
        }
        let opacity = style.number_or(tags, "casing_opacity", 1.0);
        with_opacity(s, opacity, |s| {
            trace_path(s, &rings[0]);
            s.stroke();
        });
        if dash.is_some() {
            s.set_dash(None);
        }
    }

    fn draw_stroke(&self, ctx: &mut DrawContext<'_>) {
        if self.is_inner_ring(ctx.db) {
            return;
        }
        let rings = self.rings(ctx, true);
        if rings.is_empty() {
            return;
        }
        let (style, tags) = (&self.style, &*self.tags);
        let dash = keyword(style, tags, "dashes", Dash::parse);

        let s = &mut *ctx.surface;
        s.set_line_width(style.number_or(tags, "width", 0.0));
        s.set_stroke_color(style.color_or(tags, "color", 0));
        s.set_line_cap(keyword(style, tags, "linecap", LineCap::parse).unwrap_or(LineCap::Butt));
        s.set_line_join(keyword(style, tags, "linejoin", LineJoin::parse).unwrap_or(LineJoin::Round));
        if dash.is_some() {
            s.set_dash(dash);
        }
        let opacity = style.number_or(tags, "opacity", 1.0);
        with_opacity(s, opacity, |s| {
            for ring in &rings {
                trace_path(s, ring);
            }
            s.stroke();
        });
        if dash.is_some() {
            s.set_dash(None);
        }
    }
}

/// Icon or primitive marker at a node
#[derive(Debug, Clone)]
pub struct PointItem {
    pub style: ResolvedStyle,
    /// Shape style of the same subpart; colors square and circle icons
    pub shape: Option<ResolvedStyle>,
    pub node: NodeId,
    pub tags: Rc<Tags>,
}

impl PointItem {
    const DEFAULT_WIDTH: f64 = 8.0;

    fn draw(&self, id: ItemId, ctx: &mut DrawContext<'_>) {
        let Some(node) = ctx.db.node(self.node) else {
            return;
        };
        let tags = &*self.tags;
        let Some(icon) = self.style.text(tags, "icon_image") else {
            return;
        };
        let center = ctx.viewport.project(node.lon, node.lat);
        let opacity = self.style.number_or(tags, "icon_opacity", 1.0);

        let extent = match icon.as_str() {
            "square" | "circle" => {
                let width = self.style.number_or(tags, "icon_width", Self::DEFAULT_WIDTH);
                let fill = self.shape_color(tags, "color");
                let stroke = self.shape_color(tags, "casing_color");
                with_opacity(&mut *ctx.surface, opacity, |s| {
                    if let Some(color) = fill {
                        s.set_fill_color(color);
                    }
                    if let Some(color) = stroke {
                        s.set_stroke_color(color);
                    }
                    if icon == "square" {
                        s.rectangle(center - DVec2::splat(width / 2.0), width, width);
                    } else {
                        s.circle(center, width / 2.0);
                    }
                    match (fill, stroke) {
                        (Some(_), Some(_)) => s.fill_and_stroke(FillRule::NonZero),
                        (Some(_), None) => s.fill(FillRule::NonZero),
                        _ => s.stroke(),
                    }
                });
                ImageExtent {
                    width,
                    height: width,
                }
            }
            source => {
                let width = self.style.number(tags, "icon_width");
                let height = self.style.number(tags, "icon_height");
                with_opacity(&mut *ctx.surface, opacity, |s| {
                    s.draw_image(source, center, width, height)
                })
            }
        };

        ctx.placements.insert(id, PointPlacement { center, extent });
        let half = DVec2::new(extent.width / 2.0, extent.height / 2.0);
        let reservation = ctx
            .viewport
            .reserve(CollisionObject::new(center, half, Some(id), None));
        ctx.stats.record(reservation);
        trace!(node = self.node.0, icon = %icon, "point drawn");
    }

    fn shape_color(&self, tags: &Tags, name: &str) -> Option<Color> {
        self.shape
            .as_ref()
            .filter(|s| s.defined(name))
            .map(|s| s.color_or(tags, name, 0))
    }
}

/// One drawable item in a display list
#[derive(Debug, Clone)]
pub enum DrawingItem {
    Canvas(CanvasItem),
    Fill(ShapeItem),
    Casing(ShapeItem),
    Stroke(ShapeItem),
    Point(PointItem),
    Text(TextItem),
}

impl DrawingItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            DrawingItem::Canvas(_) => ItemKind::Canvas,
            DrawingItem::Fill(_) => ItemKind::Fill,
            DrawingItem::Casing(_) => ItemKind::Casing,
            DrawingItem::Stroke(_) => ItemKind::Stroke,
            DrawingItem::Point(_) => ItemKind::Point,
            DrawingItem::Text(_) => ItemKind::Text,
        }
    }

    pub fn style(&self) -> &ResolvedStyle {
        match self {
            DrawingItem::Canvas(item) => &item.style,
            DrawingItem::Fill(item) | DrawingItem::Casing(item) | DrawingItem::Stroke(item) => {
                &item.style
            }
            DrawingItem::Point(item) => &item.style,
            DrawingItem::Text(item) => &item.style,
        }
    }

    #[inline]
    pub fn sublayer(&self) -> usize {
        self.style().sublayer
    }

    pub fn draw(&self, id: ItemId, ctx: &mut DrawContext<'_>) {
        match self {
            DrawingItem::Canvas(item) => item.draw(ctx),
            DrawingItem::Fill(item) => item.draw_fill(ctx),
            DrawingItem::Casing(item) => item.draw_casing(ctx),
            DrawingItem::Stroke(item) => item.draw_stroke(ctx),
            DrawingItem::Point(item) => item.draw(id, ctx),
            DrawingItem::Text(item) => item.draw(id, ctx),
        }
    }
}

/// Append one subpath through `points`
fn trace_path(surface: &mut dyn DrawingSurface, points: &[DVec2]) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    surface.move_to(*first);
    for &p in rest {
        surface.line_to(p);
    }
}

/// Text property mapped through a keyword parser
fn keyword<T>(
    style: &ResolvedStyle,
    tags: &Tags,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    style.text(tags, name).and_then(|v| parse(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobConfig, PageSetup};
    use crate::data::{EntityRef, Member, Node, Relation, RelationId, Way};
    use crate::geo::GeoBounds;
    use crate::style::StyleValue;
    use crate::surface::{DrawOp, RecordingSurface};

    fn viewport() -> Viewport {
        let job = JobConfig::new(GeoBounds::new(0.0, 0.0, 0.01, 0.01), PageSetup::default());
        Viewport::new(&job).unwrap()
    }

    fn ring(db: &mut Database, id: u64, first_node: u64, corners: [(f64, f64); 4]) {
        for (i, (lon, lat)) in corners.iter().enumerate() {
            db.add_node(Node {
                id: NodeId(first_node + i as u64),
                lon: *lon,
                lat: *lat,
                tags: Tags::new(),
            });
        }
        let mut nodes: Vec<NodeId> = (0..4).map(|i| NodeId(first_node + i)).collect();
        nodes.push(NodeId(first_node));
        db.add_way(Way {
            id: WayId(id),
            nodes,
            tags: Tags::new(),
        });
    }

    fn multipolygon() -> Database {
        let mut db = Database::new();
        ring(&mut db, 1, 10, [(0.001, 0.001), (0.009, 0.001), (0.009, 0.009), (0.001, 0.009)]);
        ring(&mut db, 2, 20, [(0.004, 0.004), (0.006, 0.004), (0.006, 0.006), (0.004, 0.006)]);
        let mut tags = Tags::new();
        tags.insert("type".into(), "multipolygon".into());
        db.add_relation(Relation {
            id: RelationId(1),
            tags,
            members: vec![
                Member {
                    entity: EntityRef::Way(WayId(1)),
                    role: Role::Outer,
                },
                Member {
                    entity: EntityRef::Way(WayId(2)),
                    role: Role::Inner,
                },
            ],
        });
        db
    }

    fn shape(way: u64, style: ResolvedStyle) -> ShapeItem {
        ShapeItem::new(style, WayId(way), Rc::new(Tags::new()))
    }

    #[test]
    fn test_fill_includes_inner_rings() {
        let db = multipolygon();
        let mut vp = viewport();
        let mut surface = RecordingSurface::new();
        let style = ResolvedStyle::new(0).with("fill_color", StyleValue::Number(255.0));
        {
            let mut ctx = DrawContext::new(&db, &mut vp, &mut surface);
            DrawingItem::Fill(shape(1, style.clone())).draw(ItemId(0), &mut ctx);
            // the inner ring never fills on its own
            DrawingItem::Fill(shape(2, style)).draw(ItemId(1), &mut ctx);
        }
        let fills: Vec<usize> = surface
            .ops
            .iter()
            .enumerate()
            .filter(|(_, op)| matches!(op, DrawOp::Fill { .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(fills.len(), 1);
        assert_eq!(surface.ops[fills[0]], DrawOp::Fill { rule: FillRule::EvenOdd });
        assert_eq!(surface.subpaths_before(fills[0]), 2);
    }

    #[test]
    fn test_fill_image_without_color_uses_pattern() {
        let db = multipolygon();
        let mut vp = viewport();
        let mut surface = RecordingSurface::new();
        let style = ResolvedStyle::new(0).with("fill_image", StyleValue::Text("orchard.png".into()));
        {
            let mut ctx = DrawContext::new(&db, &mut vp, &mut surface);
            DrawingItem::Fill(shape(1, style)).draw(ItemId(0), &mut ctx);
        }
        let ops = &surface.ops;
        assert!(!ops.iter().any(|op| matches!(op, DrawOp::FillColor { .. })));
        let pattern = ops
            .iter()
            .position(|op| *op == DrawOp::FillPattern { source: "orchard.png".into() })
            .unwrap();
        let fill = ops
            .iter()
            .position(|op| *op == DrawOp::Fill { rule: FillRule::EvenOdd })
            .unwrap();
        assert!(pattern < fill);
    }

    #[test]
    fn test_stroke_maps_keywords_and_restores_dash() {
        let db = multipolygon();
        let mut vp = viewport();
        let mut surface = RecordingSurface::new();
        let style = ResolvedStyle::new(0)
            .with("width", StyleValue::Number(2.0))
            .with("linecap", StyleValue::Text("square".into()))
            .with("dashes", StyleValue::Text("3,1".into()));
        {
            let mut ctx = DrawContext::new(&db, &mut vp, &mut surface);
            DrawingItem::Stroke(shape(1, style)).draw(ItemId(0), &mut ctx);
        }
        let ops = &surface.ops;
        assert!(ops.contains(&DrawOp::LineCap {
            cap: LineCap::ProjectingSquare
        }));
        assert!(ops.contains(&DrawOp::LineJoin {
            join: LineJoin::Round
        }));
        assert!(ops.contains(&DrawOp::Dash {
            dash: Some(Dash { on: 3.0, off: 1.0 })
        }));
        assert_eq!(ops.last(), Some(&DrawOp::Dash { dash: None }));
        let stroke = ops.iter().position(|op| *op == DrawOp::Stroke).unwrap();
        assert_eq!(surface.subpaths_before(stroke), 2);
    }

    #[test]
    fn test_casing_widens_and_falls_back() {
        let db = multipolygon();
        let mut vp = viewport();
        let mut surface = RecordingSurface::new();
        let style = ResolvedStyle::new(0)
            .with("width", StyleValue::Number(4.0))
            .with("casing_width", StyleValue::Number(1.5))
            .with("linejoin", StyleValue::Text("bevel".into()))
            .with("casing_color", StyleValue::Text("#102030".into()));
        {
            let mut ctx = DrawContext::new(&db, &mut vp, &mut surface);
            DrawingItem::Casing(shape(1, style)).draw(ItemId(0), &mut ctx);
        }
        let ops = &surface.ops;
        assert!(ops.contains(&DrawOp::LineWidth { width: 5.5 }));
        assert!(ops.contains(&DrawOp::LineCap { cap: LineCap::Butt }));
        assert!(ops.contains(&DrawOp::LineJoin {
            join: LineJoin::Bevel
        }));
        assert!(ops.contains(&DrawOp::StrokeColor {
            color: "102030".into()
        }));
        let stroke = ops.iter().position(|op| *op == DrawOp::Stroke).unwrap();
        assert_eq!(surface.subpaths_before(stroke), 1);
    }

    #[test]
    fn test_point_square_reserves_its_box() {
        let mut db = Database::new();
        db.add_node(Node {
            id: NodeId(1),
            lon: 0.005,
            lat: 0.005,
            tags: Tags::new(),
        });
        let mut vp = viewport();
        let mut surface = RecordingSurface::new();
        let item = PointItem {
            style: ResolvedStyle::new(0)
                .with("icon_image", StyleValue::Text("square".into()))
                .with("icon_width", StyleValue::Number(6.0)),
            shape: Some(
                ResolvedStyle::new(0)
                    .with("color", StyleValue::Number(0xFF0000 as f64))
                    .with("casing_color", StyleValue::Number(0x0000FF as f64)),
            ),
            node: NodeId(1),
            tags: Rc::new(Tags::new()),
        };
        let placement = {
            let mut ctx = DrawContext::new(&db, &mut vp, &mut surface);
            DrawingItem::Point(item).draw(ItemId(3), &mut ctx);
            ctx.placement(ItemId(3)).unwrap()
        };
        assert_eq!(placement.extent.width, 6.0);
        assert!(surface.ops.contains(&DrawOp::FillColor {
            color: "FF0000".into()
        }));
        assert!(surface.ops.contains(&DrawOp::StrokeColor {
            color: "0000FF".into()
        }));
        assert!(surface
            .ops
            .contains(&DrawOp::FillAndStroke { rule: FillRule::NonZero }));
        assert_eq!(vp.collisions().len(), 1);
        assert!(!vp.space_at(placement.center, DVec2::ONE).is_free());
    }
}
