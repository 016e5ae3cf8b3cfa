mod tessellate_finger;

pub use tessellate_finger::{segment_count_for, TessellateFinger};

use serde::{Deserialize, Serialize};

use crate::math::Point2;

/// Parameters controlling tessellation quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Maximum allowed deviation from the true geometry.
    pub tolerance: f64,
    /// Minimum number of line segments per cubic segment.
    pub min_segments: usize,
    /// Maximum number of line segments per cubic segment.
    pub max_segments: usize,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            min_segments: 4,
            max_segments: 64,
        }
    }
}

/// A polyline approximation of a curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point2>,
}

impl Polyline {
    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the polyline has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consecutive vertex pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&Point2, &Point2)> {
        self.points.windows(2).map(|w| (&w[0], &w[1]))
    }
}
