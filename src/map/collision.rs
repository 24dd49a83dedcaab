use glam::DVec2;
use tracing::{debug, warn};

use crate::error::SpatialError;
use crate::map::spatial::{QuadTree, Region};

/// Default broad-phase scan margin in page units
pub const SCAN_MARGIN: f64 = 10.0;

/// Overlap below this many page units is rounding, not a collision
pub const TOUCH_TOLERANCE: f64 = 1e-9;

/// Index of a drawing item within its display list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub usize);

/// Reserved rectangle. Intervals are half-open, so boxes that merely
/// touch along an edge do not collide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionObject {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub owner: Option<ItemId>,
    pub sub_id: Option<usize>,
}

impl CollisionObject {
    pub fn new(center: DVec2, half: DVec2, owner: Option<ItemId>, sub_id: Option<usize>) -> Self {
        Self {
            left: center.x - half.x,
            right: center.x + half.x,
            top: center.y + half.y,
            bottom: center.y - half.y,
            owner,
            sub_id,
        }
    }

    /// Narrow-phase AABB overlap against a candidate box. Overlaps within
    /// [`TOUCH_TOLERANCE`] count as touching, so a box rebuilt from its
    /// center and half-extent still sits flush against its neighbour.
    #[inline]
    pub fn collides_with(&self, center: DVec2, half: DVec2) -> bool {
        let (cleft, cright) = (center.x - half.x, center.x + half.x);
        let (cbottom, ctop) = (center.y - half.y, center.y + half.y);
        let t = TOUCH_TOLERANCE;
        cleft + t < self.right
            && self.left + t < cright
            && cbottom + t < self.top
            && self.bottom + t < ctop
    }
}

/// Outcome of a space query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceCheck {
    Free,
    Occupied,
    /// The index could not answer; callers treat this as occupied
    Unavailable(SpatialError),
}

impl SpaceCheck {
    #[inline]
    pub fn is_free(self) -> bool {
        matches!(self, SpaceCheck::Free)
    }
}

/// Outcome of a reservation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reservation {
    Reserved,
    /// Not recorded; rendering carries on regardless
    Skipped(SpatialError),
}

/// Quadtree of reserved label and icon rectangles, keyed by center
#[derive(Debug)]
pub struct CollisionMap {
    tree: QuadTree<CollisionObject>,
    /// Largest half-extent reserved so far, per axis
    max_half: DVec2,
}

impl CollisionMap {
    pub fn new(region: Region) -> Self {
        Self {
            tree: QuadTree::new(region),
            max_half: DVec2::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Is the box free of every reservation? Broad phase scans the index
    /// `margin` plus the widest reserved half-extent beyond the box, so any
    /// reservation that can reach it has its center inside the scan. Narrow
    /// phase tests each candidate exactly.
    pub fn space_at(&self, center: DVec2, half: DVec2, margin: f64) -> SpaceCheck {
        if !center.is_finite() || !half.is_finite() {
            warn!(?center, ?half, "collision query with non-finite box");
            return SpaceCheck::Unavailable(SpatialError::NonFinite);
        }
        let reach = half + self.max_half + DVec2::splat(margin);
        let region = Region::new(
            DVec2::new(center.x - reach.x, center.y + reach.y),
            DVec2::new(center.x + reach.x, center.y - reach.y),
        );
        let hit = self
            .tree
            .payloads_in_region(region)
            .any(|p| p.data.collides_with(center, half));
        if hit {
            SpaceCheck::Occupied
        } else {
            SpaceCheck::Free
        }
    }

    pub fn reserve(&mut self, object: CollisionObject) -> Reservation {
        let center = DVec2::new(
            (object.left + object.right) / 2.0,
            (object.top + object.bottom) / 2.0,
        );
        match self.tree.insert(center, object) {
            Ok(()) => {
                let half = DVec2::new(
                    (object.right - object.left) / 2.0,
                    (object.top - object.bottom) / 2.0,
                );
                self.max_half = self.max_half.max(half);
                Reservation::Reserved
            }
            Err(err @ SpatialError::NonFinite) => {
                warn!(error = %err, "reservation skipped");
                Reservation::Skipped(err)
            }
            Err(err) => {
                debug!(error = %err, "reservation skipped");
                Reservation::Skipped(err)
            }
        }
    }
}
