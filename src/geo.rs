use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Isometric latitude in degrees for a latitude in degrees
#[inline(always)]
pub fn lat2latp(lat: f64) -> f64 {
    180.0 / PI * (PI / 4.0 + lat * (PI / 180.0) / 2.0).tan().ln()
}

/// Inverse of [`lat2latp`]
#[inline(always)]
pub fn latp2lat(latp: f64) -> f64 {
    180.0 / PI * (2.0 * (latp * PI / 180.0).exp().atan() - PI / 2.0)
}

/// Geographic bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Inclusive point containment
    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Does the box spanned by two corner points overlap these bounds?
    #[inline]
    pub fn overlaps_segment(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        let (x1, x2) = (a.0.min(b.0), a.0.max(b.0));
        let (y1, y2) = (a.1.min(b.1), a.1.max(b.1));
        x1 <= self.max_lon && x2 >= self.min_lon && y1 <= self.max_lat && y2 >= self.min_lat
    }
}
