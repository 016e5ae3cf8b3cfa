use crate::constraints::OverrideSet;
use crate::geometry::{Finger, Lobe};
use crate::math::Point2;
use crate::model::{FingerId, HeartModel};
use crate::tessellation::{TessellateFinger, TessellationParams};

/// Samples taken per cubic segment of a candidate finger.
///
/// Fixed so the clearance functions stay continuous in the dragged point.
const CANDIDATE_SAMPLES: usize = 16;

/// A flattened neighbor curve the candidate must stay on one side of.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// Neighbor curve, in its own running direction.
    pub polyline: Vec<Point2>,
    /// `1.0` if the candidate must lie on the greater-order side, `-1.0` otherwise.
    pub side: f64,
}

/// Smooth stand-in for the oracle's constraints, used by the gradient-based solvers.
///
/// Each constraint is a clearance that is positive when satisfied: one per
/// neighbor obstacle, plus the distance of the candidate to the square's
/// span-axis edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleField {
    lobe: Lobe,
    size: f64,
    obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    /// A field with bounds only.
    #[must_use]
    pub fn empty(lobe: Lobe, size: f64) -> Self {
        Self {
            lobe,
            size,
            obstacles: Vec::new(),
        }
    }

    /// Adds an obstacle.
    #[must_use]
    pub fn with_obstacle(mut self, polyline: Vec<Point2>, side: f64) -> Self {
        self.obstacles.push(Obstacle { polyline, side });
        self
    }

    /// The order-neighbors of finger `id`, read from `overrides` where present.
    #[must_use]
    pub fn around(
        model: &HeartModel,
        id: FingerId,
        overrides: Option<&OverrideSet>,
        params: TessellationParams,
    ) -> Self {
        let size = model.square().size();
        let Some((lobe, _)) = model.order_of(id) else {
            return Self::empty(Lobe::Left, size);
        };
        let mut field = Self::empty(lobe, size);
        if let Some((prev, next)) = model.neighbors(id) {
            for (neighbor, side) in [(prev, 1.0), (next, -1.0)] {
                let finger = overrides
                    .and_then(|set| set.get(neighbor))
                    .or_else(|| model.finger(neighbor).ok());
                if let Some(finger) = finger {
                    let polyline = TessellateFinger::new(finger, params).execute().points;
                    field = field.with_obstacle(polyline, side);
                }
            }
        }
        field
    }

    /// The obstacles.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// One clearance per obstacle, then the bounds clearance.
    #[must_use]
    pub fn clearances(&self, finger: &Finger) -> Vec<f64> {
        let samples = sample(finger);
        let mut out: Vec<f64> = self
            .obstacles
            .iter()
            .map(|o| {
                samples
                    .iter()
                    .map(|q| self.signed_distance(o, q))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let interior = samples.get(1..samples.len().saturating_sub(1)).unwrap_or(&[]);
        let bounds = interior
            .iter()
            .map(|q| {
                let s = self.lobe.span_coord(q);
                s.min(self.size - s)
            })
            .fold(f64::INFINITY, f64::min);
        out.push(if bounds.is_finite() { bounds } else { self.size });
        out
    }

    /// `Σ max(0, margin - g)²` over all clearances.
    #[must_use]
    pub fn penalty(&self, finger: &Finger, margin: f64) -> f64 {
        self.clearances(finger)
            .iter()
            .map(|g| (margin - g).max(0.0).powi(2))
            .sum()
    }

    /// Distance to the obstacle, negative on the wrong side.
    fn signed_distance(&self, obstacle: &Obstacle, q: &Point2) -> f64 {
        let mut best = f64::INFINITY;
        let mut cross = 0.0;
        for w in obstacle.polyline.windows(2) {
            let (a, b) = (w[0], w[1]);
            let d = crate::math::distance_2d::point_to_segment_dist(q, &a, &b);
            if d < best {
                best = d;
                let ab = b - a;
                let aq = q - a;
                cross = ab.x * aq.y - ab.y * aq.x;
            }
        }
        if !best.is_finite() {
            return self.size;
        }
        // Left-lobe curves run +x, right-lobe curves run +y; with y pointing
        // down the greater-order side has positive cross for the left lobe and
        // negative cross for the right lobe.
        let greater = match self.lobe {
            Lobe::Left => cross >= 0.0,
            Lobe::Right => cross <= 0.0,
        };
        let sign = if greater { 1.0 } else { -1.0 };
        sign * obstacle.side * best
    }
}

fn sample(finger: &Finger) -> Vec<Point2> {
    let mut points = vec![finger.start()];
    for seg in finger.segments() {
        for i in 1..=CANDIDATE_SAMPLES {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / CANDIDATE_SAMPLES as f64;
            points.push(seg.evaluate(t));
        }
    }
    points
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    #[test]
    fn clearances_have_signs() {
        let field = ObstacleField::empty(Lobe::Left, 100.0)
            .with_obstacle(vec![Point2::new(0.0, 40.0), Point2::new(100.0, 40.0)], 1.0)
            .with_obstacle(vec![Point2::new(0.0, 60.0), Point2::new(100.0, 60.0)], -1.0);
        let inside = Finger::straight(Lobe::Left, Point2::new(0.0, 50.0), Point2::new(100.0, 50.0));
        let c = field.clearances(&inside);
        assert_eq!(c.len(), 3);
        assert!((c[0] - 10.0).abs() < 1e-9);
        assert!((c[1] - 10.0).abs() < 1e-9);

        let crossing = Finger::straight(Lobe::Left, Point2::new(0.0, 50.0), Point2::new(100.0, 70.0));
        let c = field.clearances(&crossing);
        assert!(c[1] < 0.0);
        assert!(field.penalty(&crossing, 2.0) > field.penalty(&inside, 2.0));
    }

    #[test]
    fn right_lobe_sides() {
        let field = ObstacleField::empty(Lobe::Right, 100.0)
            .with_obstacle(vec![Point2::new(30.0, 0.0), Point2::new(30.0, 100.0)], 1.0);
        let right_of = Finger::straight(Lobe::Right, Point2::new(40.0, 0.0), Point2::new(40.0, 100.0));
        let left_of = Finger::straight(Lobe::Right, Point2::new(20.0, 0.0), Point2::new(20.0, 100.0));
        assert!(field.clearances(&right_of)[0] > 0.0);
        assert!(field.clearances(&left_of)[0] < 0.0);
    }

    #[test]
    fn bounds_clearance_goes_negative_outside() {
        let field = ObstacleField::empty(Lobe::Left, 100.0);
        let mut finger = Finger::straight(Lobe::Left, Point2::new(0.0, 50.0), Point2::new(100.0, 50.0));
        assert!(field.clearances(&finger)[0] > 0.0);
        finger.set_point(1, Point2::new(-40.0, 50.0)).unwrap();
        assert!(field.clearances(&finger)[0] < 0.0);
    }

    #[test]
    fn around_uses_model_neighbors() {
        let model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let id = model.finger_at(Lobe::Left, 1).unwrap();
        let field = ObstacleField::around(&model, id, None, TessellationParams::default());
        assert_eq!(field.obstacles().len(), 2);
        let c = field.clearances(model.finger(id).unwrap());
        assert!((c[0] - 50.0).abs() < 1e-9);
        assert!((c[1] - 50.0).abs() < 1e-9);
    }
}
