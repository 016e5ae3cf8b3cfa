use crate::error::{GeometryError, Result};
use crate::math::{lerp, Point2, Vector2, TOLERANCE};

use super::Aabb;

/// A cubic Bézier segment.
///
/// `p0` and `p3` are the endpoints, `p1` and `p2` the control handles.
/// The parametric form is
/// `B(t) = (1-t)³·p0 + 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³·p3`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point2,
    pub p1: Point2,
    pub p2: Point2,
    pub p3: Point2,
}

impl CubicBezier {
    /// Creates a segment from its four control points.
    #[must_use]
    pub fn new(p0: Point2, p1: Point2, p2: Point2, p3: Point2) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Creates a straight segment with handles at 1/3 and 2/3 of the chord.
    #[must_use]
    pub fn line(start: Point2, end: Point2) -> Self {
        Self {
            p0: start,
            p1: lerp(&start, &end, 1.0 / 3.0),
            p2: lerp(&start, &end, 2.0 / 3.0),
            p3: end,
        }
    }

    /// Returns the control points in order.
    #[must_use]
    pub fn points(&self) -> [Point2; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }

    /// Evaluates the curve at parameter `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point2 {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Point2::new(
            b0 * self.p0.x + b1 * self.p1.x + b2 * self.p2.x + b3 * self.p3.x,
            b0 * self.p0.y + b1 * self.p1.y + b2 * self.p2.y + b3 * self.p3.y,
        )
    }

    /// First derivative at parameter `t`.
    #[must_use]
    pub fn derivative(&self, t: f64) -> Vector2 {
        let u = 1.0 - t;
        let d0 = self.p1 - self.p0;
        let d1 = self.p2 - self.p1;
        let d2 = self.p3 - self.p2;
        (d0 * (u * u) + d1 * (2.0 * u * t) + d2 * (t * t)) * 3.0
    }

    /// Splits the segment at `t` using de Casteljau's algorithm.
    #[must_use]
    pub fn split(&self, t: f64) -> (Self, Self) {
        let p01 = lerp(&self.p0, &self.p1, t);
        let p12 = lerp(&self.p1, &self.p2, t);
        let p23 = lerp(&self.p2, &self.p3, t);
        let p012 = lerp(&p01, &p12, t);
        let p123 = lerp(&p12, &p23, t);
        let mid = lerp(&p012, &p123, t);
        (
            Self::new(self.p0, p01, p012, mid),
            Self::new(mid, p123, p23, self.p3),
        )
    }

    /// Splits the segment at `t`, rejecting parameters outside the open interval `(0, 1)`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ParameterOutOfRange` if `t` is not strictly inside `(0, 1)`.
    pub fn try_split(&self, t: f64) -> Result<(Self, Self)> {
        if !(t > TOLERANCE && t < 1.0 - TOLERANCE) {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "t",
                value: t,
                min: 0.0,
                max: 1.0,
            }
            .into());
        }
        Ok(self.split(t))
    }

    /// Box around the control polygon; always contains the curve.
    #[must_use]
    pub fn hull_bounds(&self) -> Aabb {
        let mut aabb = Aabb::new(self.p0, self.p3);
        aabb.include(&self.p1);
        aabb.include(&self.p2);
        aabb
    }

    /// Tight bounding box of the curve, using the roots of the derivative.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::new(self.p0, self.p3);
        let xs = derivative_roots(self.p0.x, self.p1.x, self.p2.x, self.p3.x);
        let ys = derivative_roots(self.p0.y, self.p1.y, self.p2.y, self.p3.y);
        for t in xs.into_iter().chain(ys).flatten() {
            aabb.include(&self.evaluate(t));
        }
        aabb
    }

    /// Largest distance from a handle to the chord `p0`–`p3`.
    ///
    /// The curve lies within this distance of its chord.
    #[must_use]
    pub fn flatness(&self) -> f64 {
        use crate::math::distance_2d::point_to_segment_dist;
        point_to_segment_dist(&self.p1, &self.p0, &self.p3)
            .max(point_to_segment_dist(&self.p2, &self.p0, &self.p3))
    }

    /// Whether the handles sit at 1/3 and 2/3 of the chord (within `tolerance`).
    #[must_use]
    pub fn is_straight(&self, tolerance: f64) -> bool {
        let reference = Self::line(self.p0, self.p3);
        (self.p1 - reference.p1).norm() <= tolerance && (self.p2 - reference.p2).norm() <= tolerance
    }

    /// The same curve traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.p3, self.p2, self.p1, self.p0)
    }

    /// Applies `f` to every control point.
    #[must_use]
    pub fn map(&self, f: impl Fn(&Point2) -> Point2) -> Self {
        Self::new(f(&self.p0), f(&self.p1), f(&self.p2), f(&self.p3))
    }

    /// Length of the control polygon; an upper bound of the arc length.
    #[must_use]
    pub fn control_length(&self) -> f64 {
        (self.p1 - self.p0).norm() + (self.p2 - self.p1).norm() + (self.p3 - self.p2).norm()
    }

    /// Largest second difference of the control points, used to size flattening.
    #[must_use]
    pub fn second_difference(&self) -> f64 {
        let a = self.p0.coords - self.p1.coords * 2.0 + self.p2.coords;
        let b = self.p1.coords - self.p2.coords * 2.0 + self.p3.coords;
        a.norm().max(b.norm())
    }

    /// Whether all coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.points()
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// Roots in `(0, 1)` of the derivative of one coordinate of a cubic Bézier.
fn derivative_roots(a0: f64, a1: f64, a2: f64, a3: f64) -> [Option<f64>; 2] {
    let d0 = a1 - a0;
    let d1 = a2 - a1;
    let d2 = a3 - a2;
    // B'(t)/3 = A t² + B t + C
    let a = d0 - 2.0 * d1 + d2;
    let b = 2.0 * (d1 - d0);
    let c = d0;
    let inside = |t: f64| (t > 0.0 && t < 1.0).then_some(t);

    if a.abs() < TOLERANCE {
        if b.abs() < TOLERANCE {
            return [None, None];
        }
        return [inside(-c / b), None];
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let sq = disc.sqrt();
    [inside((-b - sq) / (2.0 * a)), inside((-b + sq) / (2.0 * a))]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn arch() -> CubicBezier {
        CubicBezier::new(
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
        )
    }

    #[test]
    fn evaluate_endpoints_and_midpoint() {
        let c = arch();
        assert_eq!(c.evaluate(0.0), c.p0);
        assert_eq!(c.evaluate(1.0), c.p3);
        let mid = c.evaluate(0.5);
        assert_abs_diff_eq!(mid.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mid.y, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn split_halves_meet_on_curve() {
        let c = arch();
        let (a, b) = c.split(0.3);
        let on_curve = c.evaluate(0.3);
        assert_abs_diff_eq!(a.p3.x, on_curve.x, epsilon = 1e-12);
        assert_abs_diff_eq!(a.p3.y, on_curve.y, epsilon = 1e-12);
        assert_eq!(a.p3, b.p0);
        // A point on the second half matches the original curve.
        let q = b.evaluate(0.5);
        let r = c.evaluate(0.3 + 0.7 * 0.5);
        assert_abs_diff_eq!(q.x, r.x, epsilon = 1e-9);
        assert_abs_diff_eq!(q.y, r.y, epsilon = 1e-9);
    }

    #[test]
    fn try_split_rejects_endpoints() {
        assert!(arch().try_split(0.0).is_err());
        assert!(arch().try_split(1.0).is_err());
        assert!(arch().try_split(0.5).is_ok());
    }

    #[test]
    fn tight_bounds_are_inside_hull_bounds() {
        let c = arch();
        let tight = c.bounds();
        assert_abs_diff_eq!(tight.max.y, 7.5, epsilon = 1e-9);
        assert!(c.hull_bounds().contains_box(&tight));
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let c = arch();
        let h = 1e-6;
        let fd = (c.evaluate(0.4 + h) - c.evaluate(0.4 - h)) / (2.0 * h);
        let d = c.derivative(0.4);
        assert_abs_diff_eq!(d.x, fd.x, epsilon = 1e-5);
        assert_abs_diff_eq!(d.y, fd.y, epsilon = 1e-5);
    }

    #[test]
    fn straight_line_is_straight_and_flat() {
        let line = CubicBezier::line(Point2::new(0.0, 0.0), Point2::new(9.0, 3.0));
        assert!(line.is_straight(1e-9));
        assert!(line.flatness() < 1e-9);
        assert!(!arch().is_straight(1e-3));
    }

    #[test]
    fn reversed_traverses_backwards() {
        let c = arch();
        let r = c.reversed();
        let a = c.evaluate(0.25);
        let b = r.evaluate(0.75);
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-12);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-12);
    }
}
