//! Path geometry in projected page space.
//!
//! Everything here works on already-projected points; the [`Viewport`]
//! owns projection and memoization.
//!
//! [`Viewport`]: crate::map::Viewport

use glam::DVec2;

/// Derived properties of one projected path
#[derive(Debug, Clone, PartialEq)]
pub struct PathProperties {
    /// Total arc length
    pub length: f64,
    /// Signed shoelace area; positive when counter-clockwise
    pub area: f64,
    /// Area-weighted centroid for closed paths, arc-length midpoint otherwise
    pub centroid: Option<DVec2>,
    /// Heading per vertex, `atan2(dx, dy)`, last one repeated
    pub heading: Vec<f64>,
}

impl PathProperties {
    pub fn compute(points: &[DVec2], closed: bool) -> Self {
        let mut length = 0.0;
        let mut cross_sum = 0.0;
        let mut weighted = DVec2::ZERO;
        let mut heading = Vec::with_capacity(points.len());

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let d = b - a;
            length += d.length();
            heading.push(d.x.atan2(d.y));

            let cross = a.perp_dot(b);
            cross_sum += cross;
            weighted += (a + b) * cross;
        }
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            // closing pair; zero when the path repeats its first point
            let cross = last.perp_dot(first);
            cross_sum += cross;
            weighted += (last + first) * cross;
        }
        if !points.is_empty() {
            heading.push(heading.last().copied().unwrap_or(0.0));
        }

        let area = cross_sum / 2.0;
        let centroid = if closed && area != 0.0 {
            Some(weighted / (6.0 * area))
        } else if length > 0.0 {
            point_at(points, 0.5).map(|(p, _)| p)
        } else {
            None
        };

        Self {
            length,
            area,
            centroid,
            heading,
        }
    }
}

/// Euclidean length of a polyline
#[inline]
pub fn polyline_length(points: &[DVec2]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Position and tangent angle at fractional arc length `t`.
///
/// Zero-length segments are skipped. `t` past either end clamps to the
/// first or last segment. `None` for paths without length.
pub fn point_at(points: &[DVec2], t: f64) -> Option<(DVec2, f64)> {
    let total = polyline_length(points);
    if !(total > 0.0) || !t.is_finite() {
        return None;
    }
    let target = t.clamp(0.0, 1.0) * total;

    let mut walked = 0.0;
    let mut last = None;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let d = b - a;
        let seg = d.length();
        if seg == 0.0 {
            continue;
        }
        let angle = d.y.atan2(d.x);
        if target <= walked + seg {
            let p = a + d * ((target - walked) / seg);
            return Some((p, angle));
        }
        walked += seg;
        last = Some((b, angle));
    }
    last
}

#[inline(always)]
fn det(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Unit left-hand normal of the edge `a -> b`, zero for a degenerate edge
#[inline]
fn edge_normal(a: DVec2, b: DVec2) -> DVec2 {
    DVec2::new(a.y - b.y, b.x - a.x).normalize_or_zero()
}

/// Offset vertex `p` where the parallels of the incoming edge (`prev -> p`)
/// and the outgoing edge (`p -> next`) meet.
#[inline]
fn miter(prev: DVec2, p: DVec2, next: DVec2, offset: f64) -> DVec2 {
    let e_in = p - prev;
    let e_out = next - p;
    let n_in = edge_normal(prev, p);
    let n_out = edge_normal(p, next);
    let denom = det(e_in, e_out);
    let df = if denom != 0.0 {
        det(n_out - n_in, e_out) / denom
    } else {
        0.0
    };
    p + (n_in + e_in * df) * offset
}

/// Parallel copy of a path at `offset` (positive is left of travel).
///
/// Closed paths (first point repeated at the end) get a miter at every
/// vertex, including the seam. Open paths keep their end vertices on the
/// end edges' normals.
pub fn offset_curve(points: &[DVec2], offset: f64, closed: bool) -> Vec<DVec2> {
    let n = points.len();
    if offset == 0.0 || n < 2 {
        return points.to_vec();
    }

    if closed && n > 3 && points[0] == points[n - 1] {
        let ring = &points[..n - 1];
        let m = ring.len();
        let mut out: Vec<DVec2> = (0..m)
            .map(|i| miter(ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m], offset))
            .collect();
        out.push(out[0]);
        return out;
    }

    let mut out = Vec::with_capacity(n);
    out.push(points[0] + edge_normal(points[0], points[1]) * offset);
    for i in 1..n - 1 {
        out.push(miter(points[i - 1], points[i], points[i + 1], offset));
    }
    out.push(points[n - 1] + edge_normal(points[n - 2], points[n - 1]) * offset);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn square(s: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(s, 0.0),
            DVec2::new(s, s),
            DVec2::new(0.0, s),
            DVec2::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_square_area_and_centroid() {
        let props = PathProperties::compute(&square(4.0), true);
        assert!((props.area.abs() - 16.0).abs() < EPS);
        assert!(props.area > 0.0);
        let c = props.centroid.unwrap();
        assert!((c - DVec2::new(2.0, 2.0)).length() < EPS);
        assert!((props.length - 16.0).abs() < EPS);
    }

    #[test]
    fn test_clockwise_area_is_negative() {
        let mut pts = square(3.0);
        pts.reverse();
        let props = PathProperties::compute(&pts, true);
        assert!((props.area + 9.0).abs() < EPS);
        assert!((props.centroid.unwrap() - DVec2::splat(1.5)).length() < EPS);
    }

    #[test]
    fn test_open_path_centroid_is_midpoint() {
        let pts = [DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0), DVec2::new(10.0, 10.0)];
        let props = PathProperties::compute(&pts, false);
        assert!((props.centroid.unwrap() - DVec2::new(10.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_heading_duplicates_last() {
        let pts = [DVec2::new(0.0, 0.0), DVec2::new(0.0, 5.0), DVec2::new(5.0, 5.0)];
        let props = PathProperties::compute(&pts, false);
        assert_eq!(props.heading.len(), 3);
        assert!(props.heading[0].abs() < EPS); // due "north"
        assert!((props.heading[1] - std::f64::consts::FRAC_PI_2).abs() < EPS);
        assert_eq!(props.heading[1], props.heading[2]);

        let single = PathProperties::compute(&[DVec2::ONE], false);
        assert_eq!(single.heading, vec![0.0]);
        assert_eq!(single.centroid, None);
    }

    #[test]
    fn test_point_at_interpolates() {
        let pts = [DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0), DVec2::new(10.0, 10.0)];
        let (p, a) = point_at(&pts, 0.25).unwrap();
        assert!((p - DVec2::new(5.0, 0.0)).length() < EPS);
        assert!(a.abs() < EPS);
        let (p, a) = point_at(&pts, 0.75).unwrap();
        assert!((p - DVec2::new(10.0, 5.0)).length() < EPS);
        assert!((a - std::f64::consts::FRAC_PI_2).abs() < EPS);
        let (end, _) = point_at(&pts, 1.0).unwrap();
        assert!((end - DVec2::new(10.0, 10.0)).length() < EPS);
    }

    #[test]
    fn test_point_at_skips_zero_length_segments() {
        let pts = [DVec2::ZERO, DVec2::ZERO, DVec2::new(4.0, 0.0)];
        let (p, a) = point_at(&pts, 0.0).unwrap();
        assert_eq!(p, DVec2::ZERO);
        assert_eq!(a, 0.0);
        assert!(point_at(&[DVec2::ONE, DVec2::ONE], 0.5).is_none());
    }

    #[test]
    fn test_point_at_is_monotonic() {
        let pts = [
            DVec2::new(0.0, 0.0),
            DVec2::new(3.0, 4.0),
            DVec2::new(3.0, 4.0),
            DVec2::new(-2.0, 9.0),
        ];
        let mut prev = 0.0;
        for i in 0..=40 {
            let (p, _) = point_at(&pts, i as f64 / 40.0).unwrap();
            let along = along_distance(&pts, p);
            assert!(along + EPS >= prev);
            prev = along;
        }
    }

    fn along_distance(pts: &[DVec2], p: DVec2) -> f64 {
        let mut walked = 0.0;
        for w in pts.windows(2) {
            let seg = w[0].distance(w[1]);
            if seg > 0.0 && (w[0].distance(p) + p.distance(w[1]) - seg).abs() < 1e-7 {
                return walked + w[0].distance(p);
            }
            walked += seg;
        }
        walked
    }

    #[test]
    fn test_offset_square_grows_outward() {
        // counter-clockwise, so the right-hand side (negative offset) is outside
        let out = offset_curve(&square(10.0), -1.0, true);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], out[4]);
        assert!((out[0] - DVec2::new(-1.0, -1.0)).length() < EPS);
        assert!((out[2] - DVec2::new(11.0, 11.0)).length() < EPS);
        let props = PathProperties::compute(&out, true);
        assert!((props.area - 144.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_open_path_is_parallel() {
        let pts = [DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0), DVec2::new(20.0, 0.0)];
        let out = offset_curve(&pts, 2.0, false);
        for p in &out {
            assert!((p.y - 2.0).abs() < EPS);
        }
        assert_eq!(out[0].x, 0.0);
        assert_eq!(out[2].x, 20.0);
    }

    #[test]
    fn test_offset_degenerate_edge_is_finite() {
        let pts = [
            DVec2::new(0.0, 0.0),
            DVec2::new(5.0, 0.0),
            DVec2::new(5.0, 0.0),
            DVec2::new(5.0, 5.0),
        ];
        let out = offset_curve(&pts, 1.5, false);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_zero_offset_is_identity() {
        let pts = square(2.0);
        assert_eq!(offset_curve(&pts, 0.0, true), pts);
    }
}
