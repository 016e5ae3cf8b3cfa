use crate::math::Point2;

use super::{Aabb, Finger, Lobe};

/// The square shared by both lobes, in which all interior fingers live.
///
/// The origin is the top-left corner and `y` grows downward. Left-lobe
/// fingers run from the left edge to the right edge; right-lobe fingers run
/// from the top edge to the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingSquare {
    size: f64,
}

impl WorkingSquare {
    /// Creates the square for `grid_size` strips of `strip_width` each.
    #[must_use]
    pub fn new(grid_size: usize, strip_width: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let size = grid_size as f64 * strip_width;
        Self { size }
    }

    /// Creates a square with an explicit side length.
    #[must_use]
    pub fn with_size(size: f64) -> Self {
        Self { size }
    }

    /// Side length.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(self.size * 0.5, self.size * 0.5)
    }

    /// Bounds of the square.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(Point2::origin(), Point2::new(self.size, self.size))
    }

    /// Corners in drawing order.
    #[must_use]
    pub fn corners(&self) -> [Point2; 4] {
        let s = self.size;
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    /// Position along the order axis of boundary `order` out of `grid_size` strips.
    #[must_use]
    pub fn order_position(&self, order: usize, grid_size: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let frac = order as f64 / grid_size as f64;
        self.size * frac
    }

    /// Projects `p` onto the edge holding the start (`at_start`) or end anchor of a finger.
    ///
    /// Only the order-axis coordinate survives; it is clamped into the square.
    #[must_use]
    pub fn project_anchor(&self, lobe: Lobe, at_start: bool, p: &Point2) -> Point2 {
        let edge = if at_start { 0.0 } else { self.size };
        match lobe {
            Lobe::Left => Point2::new(edge, p.y.clamp(0.0, self.size)),
            Lobe::Right => Point2::new(p.x.clamp(0.0, self.size), edge),
        }
    }

    /// Moves both anchors of `finger` onto their edges.
    ///
    /// The handle next to each anchor is translated by the same correction so
    /// the curve does not kink at the edge.
    pub fn pin_anchors(&self, finger: &mut Finger) {
        let lobe = finger.lobe();
        let last = finger.point_count() - 1;

        let start = finger.start();
        let pinned = self.project_anchor(lobe, true, &start);
        finger.set_raw(0, pinned);
        finger.translate_raw(1, pinned - start);

        let end = finger.end();
        let pinned = self.project_anchor(lobe, false, &end);
        finger.set_raw(last, pinned);
        finger.translate_raw(last - 1, pinned - end);
    }

    /// Whether an anchor lies exactly on its edge.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn anchor_on_edge(&self, lobe: Lobe, at_start: bool, p: &Point2) -> bool {
        let edge = if at_start { 0.0 } else { self.size };
        match lobe {
            Lobe::Left => p.x == edge,
            Lobe::Right => p.y == edge,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn size_follows_grid() {
        let sq = WorkingSquare::new(4, 25.0);
        assert!((sq.size() - 100.0).abs() < 1e-12);
        assert!((sq.order_position(1, 4) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn project_keeps_order_axis_only() {
        let sq = WorkingSquare::with_size(100.0);
        let p = sq.project_anchor(Lobe::Left, false, &Point2::new(97.0, 40.0));
        assert_eq!(p, Point2::new(100.0, 40.0));
        let q = sq.project_anchor(Lobe::Right, true, &Point2::new(30.0, 3.0));
        assert_eq!(q, Point2::new(30.0, 0.0));
        let clamped = sq.project_anchor(Lobe::Left, true, &Point2::new(2.0, 140.0));
        assert_eq!(clamped, Point2::new(0.0, 100.0));
    }

    #[test]
    fn pinning_translates_adjacent_handle() {
        let sq = WorkingSquare::with_size(100.0);
        let mut finger = Finger::straight(Lobe::Left, Point2::new(3.0, 50.0), Point2::new(100.0, 50.0));
        let handle_before = finger.point(1).unwrap();
        sq.pin_anchors(&mut finger);
        assert_eq!(finger.start(), Point2::new(0.0, 50.0));
        let handle_after = finger.point(1).unwrap();
        assert!((handle_before.x - handle_after.x - 3.0).abs() < 1e-12);
        assert!((handle_before.y - handle_after.y).abs() < 1e-12);
    }
}
