use super::{Point2, TOLERANCE};

/// Returns the minimum distance from point `p` to the line segment `a`–`b`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (p - a).norm();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;
    (p - closest).norm()
}

/// Returns the minimum distance between segments `a0`–`a1` and `b0`–`b1`.
///
/// Zero when the segments cross or touch.
#[must_use]
pub fn segment_to_segment_dist(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2) -> f64 {
    if super::intersect_2d::segments_cross(a0, a1, b0, b1) {
        return 0.0;
    }
    point_to_segment_dist(a0, b0, b1)
        .min(point_to_segment_dist(a1, b0, b1))
        .min(point_to_segment_dist(b0, a0, a1))
        .min(point_to_segment_dist(b1, a0, a1))
}

/// Returns the minimum distance from `p` to an open polyline.
///
/// Returns `f64::INFINITY` for an empty polyline.
#[must_use]
pub fn point_to_polyline_dist(p: &Point2, polyline: &[Point2]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => (p - only).norm(),
        _ => polyline
            .windows(2)
            .map(|w| point_to_segment_dist(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Returns the minimum distance between two open polylines.
#[must_use]
pub fn polyline_to_polyline_dist(a: &[Point2], b: &[Point2]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return a
            .iter()
            .map(|p| point_to_polyline_dist(p, b))
            .fold(f64::INFINITY, f64::min);
    }
    let mut best = f64::INFINITY;
    for wa in a.windows(2) {
        for wb in b.windows(2) {
            best = best.min(segment_to_segment_dist(&wa[0], &wa[1], &wb[0], &wb[1]));
            if best < TOLERANCE {
                return 0.0;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn segment_dist_perpendicular_projection() {
        // Point (1, 1) to segment (0,0)→(2,0). Closest at (1,0), dist = 1.
        let d = point_to_segment_dist(&p(1.0, 1.0), &p(0.0, 0.0), &p(2.0, 0.0));
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_endpoint_closest() {
        let d = point_to_segment_dist(&p(-1.0, 0.0), &p(0.0, 0.0), &p(2.0, 0.0));
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_degenerate() {
        // Zero-length segment: distance is point-to-point.
        let d = point_to_segment_dist(&p(3.0, 4.0), &p(0.0, 0.0), &p(0.0, 0.0));
        assert!((d - 5.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn crossing_segments_have_zero_distance() {
        let d = segment_to_segment_dist(&p(0.0, 0.0), &p(2.0, 2.0), &p(0.0, 2.0), &p(2.0, 0.0));
        assert!(d.abs() < TOL, "d={d}");
    }

    #[test]
    fn parallel_segments_distance() {
        let d = segment_to_segment_dist(&p(0.0, 0.0), &p(2.0, 0.0), &p(0.0, 3.0), &p(2.0, 3.0));
        assert!((d - 3.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn polyline_distance_uses_closest_pair() {
        let a = [p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)];
        let b = [p(0.0, 5.0), p(1.0, 1.5), p(2.0, 5.0)];
        let d = polyline_to_polyline_dist(&a, &b);
        assert!((d - 1.5).abs() < TOL, "d={d}");
    }

    #[test]
    fn empty_polyline_is_infinitely_far() {
        assert!(point_to_polyline_dist(&p(0.0, 0.0), &[]).is_infinite());
    }
}
