use super::{Point2, TOLERANCE};

/// Returns whether two segments cross or touch, including collinear overlap.
#[must_use]
pub fn segments_cross(a0: &Point2, a1: &Point2, b0: &Point2, b1: &Point2) -> bool {
    let o1 = orientation(a0, a1, b0);
    let o2 = orientation(a0, a1, b1);
    let o3 = orientation(b0, b1, a0);
    let o4 = orientation(b0, b1, a1);

    if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
        return true;
    }

    (o1 == 0.0 && on_segment(a0, a1, b0))
        || (o2 == 0.0 && on_segment(a0, a1, b1))
        || (o3 == 0.0 && on_segment(b0, b1, a0))
        || (o4 == 0.0 && on_segment(b0, b1, a1))
}

/// Sign of the turn `a → b → c`: positive for counter-clockwise, zero when collinear.
fn orientation(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    let v = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if v.abs() < TOLERANCE {
        0.0
    } else {
        v.signum()
    }
}

/// Whether collinear point `p` lies within the bounding box of `a`–`b`.
fn on_segment(a: &Point2, b: &Point2, p: &Point2) -> bool {
    p.x >= a.x.min(b.x) - TOLERANCE
        && p.x <= a.x.max(b.x) + TOLERANCE
        && p.y >= a.y.min(b.y) - TOLERANCE
        && p.y <= a.y.max(b.y) + TOLERANCE
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn crossing_detects_touching_endpoint() {
        assert!(segments_cross(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 0.0), &p(1.0, 3.0)));
    }

    #[test]
    fn crossing_detects_collinear_overlap() {
        assert!(segments_cross(&p(0.0, 0.0), &p(2.0, 0.0), &p(1.0, 0.0), &p(3.0, 0.0)));
        assert!(!segments_cross(&p(0.0, 0.0), &p(1.0, 0.0), &p(2.0, 0.0), &p(3.0, 0.0)));
    }
}
