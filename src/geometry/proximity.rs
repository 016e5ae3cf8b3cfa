use crate::math::distance_2d::segment_to_segment_dist;

use super::CubicBezier;

/// Deepest subdivision level before a pair is conservatively reported as touching.
const MAX_DEPTH: u32 = 40;

/// Upper bound on the number of sub-curve pairs examined per query.
const MAX_PAIRS: usize = 50_000;

/// Returns whether two cubic segments come closer than `tolerance`.
///
/// Works on the exact curves by recursive subdivision: pairs whose control
/// hulls are at least `tolerance` apart are pruned, and once both pieces are
/// flat they are compared as chords, widened by their flatness. Crossings and
/// tangential contacts are both reported.
///
/// A `false` result guarantees the curves are at least `tolerance` apart.
/// Pathological inputs that exhaust the depth or pair budget report `true`.
#[must_use]
pub fn curves_within(a: &CubicBezier, b: &CubicBezier, tolerance: f64) -> bool {
    let flat_limit = (tolerance * 0.25).max(1e-9);
    let mut stack = vec![(*a, *b, 0_u32)];
    let mut examined = 0_usize;

    while let Some((ca, cb, depth)) = stack.pop() {
        examined += 1;
        if examined > MAX_PAIRS {
            return true;
        }

        if ca.hull_bounds().distance_to(&cb.hull_bounds()) >= tolerance {
            continue;
        }

        let fa = ca.flatness();
        let fb = cb.flatness();
        if fa <= flat_limit && fb <= flat_limit {
            let chord_gap = segment_to_segment_dist(&ca.p0, &ca.p3, &cb.p0, &cb.p3);
            if chord_gap - fa - fb < tolerance {
                return true;
            }
            continue;
        }

        if depth >= MAX_DEPTH {
            return true;
        }

        // Subdivide the less flat piece.
        if fa >= fb {
            let (l, r) = ca.split(0.5);
            stack.push((l, cb, depth + 1));
            stack.push((r, cb, depth + 1));
        } else {
            let (l, r) = cb.split(0.5);
            stack.push((ca, l, depth + 1));
            stack.push((ca, r, depth + 1));
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn transversal_crossing_is_detected() {
        let a = CubicBezier::line(p(0.0, 0.0), p(10.0, 10.0));
        let b = CubicBezier::new(p(0.0, 10.0), p(3.0, 2.0), p(7.0, 8.0), p(10.0, 0.0));
        assert!(curves_within(&a, &b, 0.01));
    }

    #[test]
    fn separated_curves_are_not_reported() {
        let a = CubicBezier::new(p(0.0, 0.0), p(3.0, 4.0), p(7.0, -4.0), p(10.0, 0.0));
        let b = CubicBezier::new(p(0.0, 10.0), p(3.0, 14.0), p(7.0, 6.0), p(10.0, 10.0));
        assert!(!curves_within(&a, &b, 0.5));
    }

    #[test]
    fn tangential_contact_is_detected() {
        // An arch whose apex (y = 7.5) touches the horizontal line y = 7.5.
        let arch = CubicBezier::new(p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0));
        let line = CubicBezier::line(p(-5.0, 7.5), p(15.0, 7.5));
        assert!(curves_within(&arch, &line, 0.01));
    }

    #[test]
    fn near_miss_respects_tolerance() {
        let arch = CubicBezier::new(p(0.0, 0.0), p(0.0, 10.0), p(10.0, 10.0), p(10.0, 0.0));
        let line = CubicBezier::line(p(-5.0, 8.0), p(15.0, 8.0));
        // Gap of 0.5 between apex and line.
        assert!(curves_within(&arch, &line, 0.75));
        assert!(!curves_within(&arch, &line, 0.25));
    }
}
