mod collision;
mod display_list;
mod geometry;
mod items;
mod projection;
mod renderer;
mod spatial;
mod text;

pub use collision::{
    CollisionMap, CollisionObject, ItemId, Reservation, SpaceCheck, SCAN_MARGIN,
    TOUCH_TOLERANCE,
};
pub use display_list::DisplayList;
pub use geometry::{offset_curve, point_at, polyline_length, PathProperties};
pub use items::{
    CanvasItem, DrawContext, DrawStats, DrawingItem, ItemKind, PointItem, PointPlacement,
    ShapeItem,
};
pub use projection::Viewport;
pub use renderer::{split_bounds, AtlasPage, MapRenderer, RenderSummary};
pub use spatial::{Payload, Payloads, QuadTree, Region};
pub use text::{TextItem, TextTarget};
