use std::collections::HashMap;

use glam::DVec2;
use tracing::debug;

use crate::config::{JobConfig, LayerRange, PageBox};
use crate::data::{Database, Node, Way, WayId};
use crate::error::ConfigError;
use crate::geo::{lat2latp, latp2lat, GeoBounds};
use crate::map::collision::{CollisionMap, CollisionObject, Reservation, SpaceCheck, SCAN_MARGIN};
use crate::map::geometry::{self, PathProperties};
use crate::map::spatial::Region;

/// One page's projection state.
///
/// Maps lon/lat to y-up page coordinates with a single uniform scale, and
/// owns everything memoized during a render: path properties, projected and
/// offset paths, and the collision index. Never shared between pages.
#[derive(Debug)]
pub struct Viewport {
    bounds: GeoBounds,
    layers: LayerRange,
    scale: f64,
    page: PageBox,
    base_latp: f64,
    /// Degrees (lon or latp) per page unit
    box_scale: f64,
    properties: HashMap<WayId, PathProperties>,
    paths: HashMap<(WayId, u64), Vec<DVec2>>,
    collisions: CollisionMap,
}

impl Viewport {
    /// Validate the job and fit its bounds onto the page.
    ///
    /// The page box shrinks along one axis so the data extent fills it
    /// exactly at the chosen scale.
    pub fn new(config: &JobConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bounds = config.bounds;
        let mut page = config.page.page_box();

        let base_latp = lat2latp(bounds.min_lat);
        let dlon = bounds.max_lon - bounds.min_lon;
        let dlatp = lat2latp(bounds.max_lat) - base_latp;
        let box_scale = (dlon / page.width).max(dlatp / page.height);
        if !(box_scale.is_finite() && box_scale > 0.0) {
            return Err(ConfigError::ZeroExtent { dlon, dlatp });
        }
        page.width = dlon / box_scale;
        page.height = dlatp / box_scale;

        let region = Region::new(
            DVec2::new(page.origin_x, page.origin_y + page.height),
            DVec2::new(page.origin_x + page.width, page.origin_y),
        );
        debug!(box_scale, width = page.width, height = page.height, "projection initialized");

        Ok(Self {
            bounds,
            layers: config.layers,
            scale: config.scale.current,
            page,
            base_latp,
            box_scale,
            properties: HashMap::new(),
            paths: HashMap::new(),
            collisions: CollisionMap::new(region),
        })
    }

    #[inline]
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    #[inline]
    pub fn layers(&self) -> LayerRange {
        self.layers
    }

    /// Current style scale
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Effective page box after fitting
    #[inline]
    pub fn page_box(&self) -> PageBox {
        self.page
    }

    #[inline(always)]
    pub fn x(&self, lon: f64) -> f64 {
        (lon - self.bounds.min_lon) / self.box_scale + self.page.origin_x
    }

    #[inline(always)]
    pub fn y(&self, lat: f64) -> f64 {
        (lat2latp(lat) - self.base_latp) / self.box_scale + self.page.origin_y
    }

    #[inline(always)]
    pub fn project(&self, lon: f64, lat: f64) -> DVec2 {
        DVec2::new(self.x(lon), self.y(lat))
    }

    /// Page point back to (lon, lat)
    pub fn unproject(&self, p: DVec2) -> (f64, f64) {
        let lon = (p.x - self.page.origin_x) * self.box_scale + self.bounds.min_lon;
        let latp = (p.y - self.page.origin_y) * self.box_scale + self.base_latp;
        (lon, latp2lat(latp))
    }

    pub fn contains_node(&self, node: &Node) -> bool {
        self.bounds.contains(node.lon, node.lat)
    }

    /// Does any segment's bounding box overlap the geographic bounds?
    pub fn contains_way(&self, db: &Database, way: &Way) -> bool {
        let coords = db.way_coords(way);
        match coords.as_slice() {
            [] => false,
            [(lon, lat)] => self.bounds.contains(*lon, *lat),
            _ => coords
                .windows(2)
                .any(|w| self.bounds.overlaps_segment(w[0], w[1])),
        }
    }

    /// Projected vertices of a way, optionally as a parallel offset curve.
    /// Memoized per (way, offset).
    pub fn path(&mut self, db: &Database, way: &Way, offset: f64) -> &[DVec2] {
        let key = (way.id, offset.to_bits());
        if !self.paths.contains_key(&key) {
            let points = if offset == 0.0 {
                self.project_way(db, way)
            } else {
                let base = self.path(db, way, 0.0).to_vec();
                geometry::offset_curve(&base, offset, way.is_closed())
            };
            self.paths.insert(key, points);
        }
        self.paths.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Memoized length, area, centroid and headings of a way
    pub fn properties(&mut self, db: &Database, way: &Way) -> &PathProperties {
        if !self.properties.contains_key(&way.id) {
            let closed = way.is_closed();
            let props = PathProperties::compute(self.path(db, way, 0.0), closed);
            self.properties.insert(way.id, props);
        }
        &self.properties[&way.id]
    }

    /// Position and tangent angle at fractional arc length `t`
    pub fn point_at(&mut self, db: &Database, way: &Way, t: f64, offset: f64) -> Option<(DVec2, f64)> {
        geometry::point_at(self.path(db, way, offset), t)
    }

    /// Is a box free of reservations? Uses the default scan margin.
    pub fn space_at(&self, center: DVec2, half: DVec2) -> SpaceCheck {
        self.collisions.space_at(center, half, SCAN_MARGIN)
    }

    pub fn reserve(&mut self, object: CollisionObject) -> Reservation {
        self.collisions.reserve(object)
    }

    pub fn collisions(&self) -> &CollisionMap {
        &self.collisions
    }

    fn project_way(&self, db: &Database, way: &Way) -> Vec<DVec2> {
        db.way_coords(way)
            .into_iter()
            .map(|(lon, lat)| self.project(lon, lat))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageSetup, PageSize};
    use crate::data::{NodeId, Tags};

    fn job() -> JobConfig {
        JobConfig::new(
            GeoBounds::new(-1.5, 51.86, -1.47, 51.89),
            PageSetup {
                size: PageSize::A4,
                margin: 10.0,
                ..PageSetup::default()
            },
        )
    }

    #[test]
    fn test_corners_map_to_page_box() {
        let vp = Viewport::new(&job()).unwrap();
        let page = vp.page_box();
        let sw = vp.project(-1.5, 51.86);
        let ne = vp.project(-1.47, 51.89);
        assert!((sw - DVec2::new(10.0, 10.0)).length() < 1e-9);
        assert!((ne.x - (page.origin_x + page.width)).abs() < 1e-9);
        assert!((ne.y - (page.origin_y + page.height)).abs() < 1e-9);
        // one axis fits exactly, the other shrinks
        assert!(page.width <= 575.0 + 1e-9 && page.height <= 822.0 + 1e-9);
        assert!((page.width - 575.0).abs() < 1e-9 || (page.height - 822.0).abs() < 1e-9);
    }

    #[test]
    fn test_unproject_round_trip() {
        let vp = Viewport::new(&job()).unwrap();
        let (lon, lat) = vp.unproject(vp.project(-1.4832, 51.8731));
        assert!((lon + 1.4832).abs() < 1e-9);
        assert!((lat - 51.8731).abs() < 1e-9);
    }

    #[test]
    fn test_scale_is_uniform() {
        let vp = Viewport::new(&job()).unwrap();
        let a = vp.project(-1.49, 51.87);
        let b = vp.project(-1.48, 51.87);
        let c = vp.unproject(a + DVec2::new(0.0, b.x - a.x));
        // equal page distance is equal isometric-latitude distance
        let dlatp = lat2latp(c.1) - lat2latp(51.87);
        assert!((dlatp - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_jobs() {
        let mut j = job();
        j.bounds.max_lon = j.bounds.min_lon;
        assert!(matches!(Viewport::new(&j), Err(ConfigError::ZeroExtent { .. })));

        let mut j = job();
        j.layers = LayerRange { min: 3, max: -3 };
        assert!(matches!(Viewport::new(&j), Err(ConfigError::InvertedLayers { .. })));
    }

    #[test]
    fn test_properties_are_memoized() {
        let mut db = Database::new();
        for (i, (lon, lat)) in [(-1.49, 51.87), (-1.48, 51.87), (-1.48, 51.88)].iter().enumerate() {
            db.add_node(Node {
                id: NodeId(i as u64),
                lon: *lon,
                lat: *lat,
                tags: Tags::new(),
            });
        }
        let way = Way {
            id: WayId(7),
            nodes: vec![NodeId(0), NodeId(1), NodeId(2)],
            tags: Tags::new(),
        };
        let mut vp = Viewport::new(&job()).unwrap();
        assert!(vp.contains_way(&db, &way));
        let length = vp.properties(&db, &way).length;
        assert!(length > 0.0);
        assert_eq!(vp.properties.len(), 1);
        vp.properties(&db, &way);
        assert_eq!(vp.properties.len(), 1);

        let shifted = vp.path(&db, &way, 3.0).to_vec();
        assert_eq!(shifted.len(), 3);
        assert_eq!(vp.paths.len(), 2);
        let (mid, _) = vp.point_at(&db, &way, 0.5, 0.0).unwrap();
        assert!((mid - vp.properties(&db, &way).centroid.unwrap()).length() < 1e-9);
    }
}
