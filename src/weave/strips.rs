use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use crate::geometry::{Lobe, WorkingSquare};
use crate::math::Point2;
use crate::model::HeartModel;
use crate::tessellation::{TessellateFinger, TessellationParams};

/// The region between two consecutive fingers of a lobe.
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub lobe: Lobe,
    /// Order index of the lower bounding finger.
    pub index: usize,
    /// Strip region clipped to the working square.
    pub region: MultiPolygon<f64>,
}

/// Builds every strip of both lobes.
#[derive(Debug)]
pub struct BuildStrips<'a> {
    model: &'a HeartModel,
    params: TessellationParams,
}

impl<'a> BuildStrips<'a> {
    /// Creates a new strip builder.
    #[must_use]
    pub fn new(model: &'a HeartModel, params: TessellationParams) -> Self {
        Self { model, params }
    }

    /// Strips of `lobe`, in order.
    #[must_use]
    pub fn lobe(&self, lobe: Lobe) -> Vec<Strip> {
        let square = square_polygon(self.model.square());
        let curves: Vec<Vec<Point2>> = self
            .model
            .lobe_fingers(lobe)
            .map(|f| TessellateFinger::new(f, self.params).execute().points)
            .collect();

        curves
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                let ring: Vec<Coord<f64>> = pair[0]
                    .iter()
                    .chain(pair[1].iter().rev())
                    .map(|p| Coord { x: p.x, y: p.y })
                    .collect();
                let raw = Polygon::new(LineString::new(ring), Vec::new());
                Strip {
                    lobe,
                    index,
                    region: raw.intersection(&square),
                }
            })
            .collect()
    }

    /// Strips of both lobes, left first.
    #[must_use]
    pub fn execute(&self) -> [Vec<Strip>; 2] {
        [self.lobe(Lobe::Left), self.lobe(Lobe::Right)]
    }
}

/// The working square as a polygon.
pub(crate) fn square_polygon(square: &WorkingSquare) -> Polygon<f64> {
    let ring = square.corners().iter().map(|c| Coord { x: c.x, y: c.y }).collect();
    Polygon::new(LineString::new(ring), Vec::new())
}
