use std::rc::Rc;

use tracing::debug;

use crate::config::LayerRange;
use crate::data::{Database, Node, Tags, Way};
use crate::map::collision::ItemId;
use crate::map::items::{CanvasItem, DrawContext, DrawingItem, ItemKind, PointItem, ShapeItem};
use crate::map::projection::Viewport;
use crate::map::text::{TextItem, TextTarget};
use crate::style::{StyleEngine, StyleList, StyleTarget};

/// Drawing items bucketed by layer, then sublayer.
///
/// Items live in one arena; buckets hold their ids in insertion order.
#[derive(Debug, Clone)]
pub struct DisplayList {
    layers: LayerRange,
    items: Vec<DrawingItem>,
    /// `buckets[layer - min][sublayer]`
    buckets: Vec<Vec<Vec<ItemId>>>,
}

impl DisplayList {
    pub fn new(layers: LayerRange) -> Self {
        Self {
            layers,
            items: Vec::new(),
            buckets: vec![Vec::new(); layers.count()],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&DrawingItem> {
        self.items.get(id.0)
    }

    /// Item ids in one (layer, sublayer) bucket
    pub fn bucket(&self, layer: i32, sublayer: usize) -> &[ItemId] {
        let Some(index) = self.layer_index(layer) else {
            return &[];
        };
        self.buckets[index]
            .get(sublayer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Add an item; its layer is clamped into range
    pub fn add_item(&mut self, layer: i32, item: DrawingItem) -> ItemId {
        let id = ItemId(self.items.len());
        let sublayer = item.sublayer();
        self.items.push(item);

        let index = (self.layers.clamp(layer) - self.layers.min) as usize;
        let layer = &mut self.buckets[index];
        if layer.len() <= sublayer {
            layer.resize_with(sublayer + 1, Vec::new);
        }
        layer[sublayer].push(id);
        id
    }

    /// Background items, all on the lowest layer
    pub fn compile_canvas<E: StyleEngine + ?Sized>(&mut self, styles: &E, scale: f64) -> usize {
        let list = styles.styles_for(StyleTarget::Canvas, &Tags::new(), scale);
        let before = self.len();
        for subpart in list.subparts {
            if let Some(style) = subpart.shape {
                self.add_item(self.layers.min, DrawingItem::Canvas(CanvasItem { style }));
            }
        }
        self.len() - before
    }

    /// Stroke, fill, casing and text items for one way
    pub fn compile_way<E: StyleEngine + ?Sized>(
        &mut self,
        db: &Database,
        viewport: &mut Viewport,
        styles: &E,
        way: &Way,
    ) -> usize {
        let mut tags = way.tags.clone();
        if way.is_closed() {
            tags.insert(":area".to_string(), "yes".to_string());
        }
        let list = styles.styles_for(StyleTarget::Way(way), &tags, viewport.scale());
        if list.is_empty() {
            return 0;
        }
        let tags = Rc::new(tags);
        let before = self.len();

        for subpart in list.subparts {
            let layer = self.resolve_layer(subpart.layer_override, &tags);
            if let Some(shape) = subpart.shape {
                let filled = shape.defined("fill_color") || shape.defined("fill_image");
                let stroked = shape.defined("width");
                let cased = shape.defined("casing_width");
                let item = ShapeItem::new(shape, way.id, Rc::clone(&tags));
                if stroked {
                    self.add_item(layer, DrawingItem::Stroke(item.clone()));
                }
                if filled {
                    self.add_item(layer, DrawingItem::Fill(item.clone()));
                }
                if cased {
                    self.add_item(layer, DrawingItem::Casing(item));
                }
            }
            if let Some(style) = subpart.text {
                let path_length = viewport.properties(db, way).length;
                let target = TextTarget::Way {
                    way: way.id,
                    path_length,
                };
                self.add_item(
                    layer,
                    DrawingItem::Text(TextItem {
                        style,
                        target,
                        tags: Rc::clone(&tags),
                    }),
                );
            }
        }
        self.len() - before
    }

    /// Point and text items for one node
    pub fn compile_node<E: StyleEngine + ?Sized>(
        &mut self,
        db: &Database,
        viewport: &Viewport,
        styles: &E,
        node: &Node,
    ) -> usize {
        let mut tags = node.tags.clone();
        if !db.has_parent_ways(node.id) {
            tags.insert(":poi".to_string(), "yes".to_string());
        } else if db.parent_way_count(node.id) > 1 {
            tags.insert(":junction".to_string(), "yes".to_string());
        }
        let list: StyleList = styles.styles_for(StyleTarget::Node(node), &tags, viewport.scale());
        if list.is_empty() {
            return 0;
        }
        let tags = Rc::new(tags);
        let before = self.len();

        for subpart in list.subparts {
            let layer = self.resolve_layer(subpart.layer_override, &tags);
            let mut anchor = None;
            if let Some(style) = subpart.point {
                let item = PointItem {
                    style,
                    shape: subpart.shape,
                    node: node.id,
                    tags: Rc::clone(&tags),
                };
                anchor = Some(self.add_item(layer, DrawingItem::Point(item)));
            }
            if let Some(style) = subpart.text {
                let target = TextTarget::Node {
                    node: node.id,
                    anchor,
                };
                self.add_item(
                    layer,
                    DrawingItem::Text(TextItem {
                        style,
                        target,
                        tags: Rc::clone(&tags),
                    }),
                );
            }
        }
        self.len() - before
    }

    /// Item ids in paint order: layer ascending, then drawing class, then
    /// sublayer, then insertion
    pub fn draw_order(&self) -> Vec<ItemId> {
        let mut order = Vec::with_capacity(self.items.len());
        for layer in &self.buckets {
            if layer.is_empty() {
                continue;
            }
            for kind in ItemKind::DRAW_ORDER {
                order.extend(
                    layer
                        .iter()
                        .flatten()
                        .copied()
                        .filter(|id| self.items[id.0].kind() == kind),
                );
            }
        }
        order
    }

    pub fn draw(&self, ctx: &mut DrawContext<'_>) {
        let order = self.draw_order();
        for &id in &order {
            self.items[id.0].draw(id, ctx);
        }
        debug!(items = order.len(), "display list drawn");
    }

    fn layer_index(&self, layer: i32) -> Option<usize> {
        (self.layers.min..=self.layers.max)
            .contains(&layer)
            .then(|| (layer - self.layers.min) as usize)
    }

    /// Explicit override, else the `layer` tag, else 0; always in range
    fn resolve_layer(&self, layer_override: Option<i32>, tags: &Tags) -> i32 {
        let layer = layer_override
            .or_else(|| tags.get("layer").map(|v| parse_layer_tag(v)))
            .unwrap_or(0);
        self.layers.clamp(layer)
    }
}

/// Leading integer of a tag value; anything unparseable is 0
fn parse_layer_tag(value: &str) -> i32 {
    let value = value.trim();
    let digits_end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..digits_end]
        .parse::<i64>()
        .map(|n| n.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{ResolvedStyle, StyleValue};

    fn list() -> DisplayList {
        DisplayList::new(LayerRange { min: -5, max: 5 })
    }

    fn canvas(sublayer: usize) -> DrawingItem {
        DrawingItem::Canvas(CanvasItem {
            style: ResolvedStyle::new(sublayer),
        })
    }

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_layer_tag_parsing() {
        assert_eq!(parse_layer_tag("3"), 3);
        assert_eq!(parse_layer_tag("-2"), -2);
        assert_eq!(parse_layer_tag(" 1;2"), 1);
        assert_eq!(parse_layer_tag("bridge"), 0);
        assert_eq!(parse_layer_tag("99999999999"), i32::MAX);
    }

    #[test]
    fn test_layer_clamp() {
        let l = list();
        assert_eq!(l.resolve_layer(None, &tags(&[("layer", "999")])), 5);
        assert_eq!(l.resolve_layer(None, &tags(&[("layer", "-999")])), -5);
        assert_eq!(l.resolve_layer(None, &Tags::new()), 0);
        assert_eq!(l.resolve_layer(Some(2), &tags(&[("layer", "-1")])), 2);
        assert_eq!(l.resolve_layer(Some(40), &Tags::new()), 5);
    }

    #[test]
    fn test_items_land_in_one_bucket() {
        let mut l = list();
        let a = l.add_item(0, canvas(2));
        let b = l.add_item(0, canvas(2));
        let c = l.add_item(12, canvas(0));
        assert_eq!(l.bucket(0, 2), &[a, b]);
        assert!(l.bucket(0, 0).is_empty());
        assert_eq!(l.bucket(5, 0), &[c]);
        assert!(l.bucket(6, 0).is_empty());
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn test_draw_order_groups_classes_within_layer() {
        let mut l = list();
        let way = crate::data::WayId(1);
        let shape = |sublayer| ShapeItem::new(ResolvedStyle::new(sublayer), way, Rc::new(Tags::new()));
        let stroke = l.add_item(1, DrawingItem::Stroke(shape(0)));
        let fill_high = l.add_item(1, DrawingItem::Fill(shape(4)));
        let casing = l.add_item(1, DrawingItem::Casing(shape(2)));
        let low = l.add_item(-1, DrawingItem::Stroke(shape(9)));
        let text = l.add_item(
            1,
            DrawingItem::Text(TextItem {
                style: ResolvedStyle::new(0),
                target: TextTarget::Way {
                    way,
                    path_length: 0.0,
                },
                tags: Rc::new(Tags::new()),
            }),
        );
        let fill_low = l.add_item(1, DrawingItem::Fill(shape(0)));

        assert_eq!(
            l.draw_order(),
            vec![low, fill_low, fill_high, casing, stroke, text]
        );
    }

    #[test]
    fn test_compile_canvas_uses_min_layer() {
        struct Background;
        impl StyleEngine for Background {
            fn styles_for(&self, target: StyleTarget<'_>, _: &Tags, _: f64) -> StyleList {
                let mut list = StyleList::default();
                if let StyleTarget::Canvas = target {
                    let mut subpart = crate::style::Subpart::named("default");
                    subpart.shape = Some(
                        ResolvedStyle::new(0).with("fill_color", StyleValue::Number(1.0)),
                    );
                    list.subparts.push(subpart);
                }
                list
            }
        }
        let mut l = list();
        assert_eq!(l.compile_canvas(&Background, 14.0), 1);
        assert_eq!(l.bucket(-5, 0).len(), 1);
        assert_eq!(l.item(ItemId(0)).map(DrawingItem::kind), Some(ItemKind::Canvas));
    }
}
