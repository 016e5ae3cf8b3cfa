use crate::geometry::{CubicBezier, Finger};

use super::{Polyline, TessellationParams};

/// Number of line segments needed to flatten `curve` within `params.tolerance`.
///
/// Uses Wang's bound for cubics, `n = ceil(sqrt(3/4 * M / tol))`, where `M` is
/// the largest second difference of the control points.
#[must_use]
pub fn segment_count_for(curve: &CubicBezier, params: &TessellationParams) -> usize {
    let tol = params.tolerance.max(1e-9);
    let n = (0.75 * curve.second_difference() / tol).sqrt().ceil();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = if n.is_finite() { n as usize } else { params.max_segments };
    n.clamp(params.min_segments.max(1), params.max_segments.max(1))
}

/// Flattens a finger into a polyline from its start anchor to its end anchor.
pub struct TessellateFinger<'a> {
    finger: &'a Finger,
    params: TessellationParams,
}

impl<'a> TessellateFinger<'a> {
    /// Creates a new `TessellateFinger` operation.
    #[must_use]
    pub fn new(finger: &'a Finger, params: TessellationParams) -> Self {
        Self { finger, params }
    }

    /// Executes the tessellation.
    ///
    /// Joints between segments appear once; both anchors are included exactly.
    #[must_use]
    pub fn execute(&self) -> Polyline {
        let mut points = vec![self.finger.start()];
        for segment in self.finger.segments() {
            let n = segment_count_for(segment, &self.params);
            for i in 1..n {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / n as f64;
                points.push(segment.evaluate(t));
            }
            points.push(segment.p3);
        }
        Polyline { points }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Lobe;
    use crate::math::distance_2d::point_to_polyline_dist;
    use crate::math::Point2;

    #[test]
    fn straight_finger_uses_minimum_segments() {
        let finger = Finger::straight(Lobe::Left, Point2::new(0.0, 5.0), Point2::new(100.0, 5.0));
        let params = TessellationParams::default();
        let poly = TessellateFinger::new(&finger, params).execute();
        assert_eq!(poly.len(), params.min_segments + 1);
        assert_eq!(poly.points[0], finger.start());
        assert_eq!(*poly.points.last().unwrap(), finger.end());
    }

    #[test]
    fn curved_finger_stays_within_tolerance() {
        let mut finger = Finger::straight(Lobe::Left, Point2::new(0.0, 50.0), Point2::new(100.0, 50.0));
        finger.set_point(1, Point2::new(30.0, 10.0)).unwrap();
        finger.set_point(2, Point2::new(70.0, 90.0)).unwrap();
        let params = TessellationParams {
            tolerance: 0.1,
            ..TessellationParams::default()
        };
        let poly = TessellateFinger::new(&finger, params).execute();
        assert!(poly.len() > params.min_segments + 1);
        let seg = finger.segments()[0];
        for i in 0..=100 {
            let p = seg.evaluate(f64::from(i) / 100.0);
            assert!(point_to_polyline_dist(&p, &poly.points) <= params.tolerance + 1e-9);
        }
    }

    #[test]
    fn joints_are_not_duplicated() {
        let mut finger = Finger::straight(Lobe::Right, Point2::new(20.0, 0.0), Point2::new(20.0, 100.0));
        finger.split_segment(0, 0.5).unwrap();
        let params = TessellationParams::default();
        let poly = TessellateFinger::new(&finger, params).execute();
        assert_eq!(poly.len(), 2 * params.min_segments + 1);
        assert!(poly.edges().all(|(a, b)| a != b));
    }
}
