use geo::{BooleanOps, MultiPolygon};
use tracing::trace;

use crate::geometry::Lobe;
use crate::model::HeartModel;
use crate::tessellation::TessellationParams;

use super::strips::{BuildStrips, Strip};
use super::{left_on_top, region_path_data, union_all, FillRule, RenderedShape, WeaveStyle};

/// A strip with every cell where it lies under the other lobe cut away.
#[derive(Debug, Clone, PartialEq)]
pub struct WovenStrip {
    pub lobe: Lobe,
    pub index: usize,
    /// Visible part of the strip.
    pub region: MultiPolygon<f64>,
}

/// Interactive renderer: exact polygon booleans per strip.
#[derive(Debug)]
pub struct BooleanWeave<'a> {
    model: &'a HeartModel,
    params: TessellationParams,
}

impl<'a> BooleanWeave<'a> {
    /// Creates a new boolean weave operation.
    #[must_use]
    pub fn new(model: &'a HeartModel, params: TessellationParams) -> Self {
        Self { model, params }
    }

    /// Visible regions of every strip, left lobe first.
    #[must_use]
    pub fn execute(&self) -> Vec<WovenStrip> {
        let parity = self.model.weave_parity();
        let [left, right] = BuildStrips::new(self.model, self.params).execute();

        // Strips of one lobe with the same index parity are either all over
        // or all under a given strip of the other lobe.
        let by_parity = |strips: &[Strip]| -> [MultiPolygon<f64>; 2] {
            [0, 1].map(|class| {
                union_all(
                    strips
                        .iter()
                        .filter(|s| s.index % 2 == class)
                        .map(|s| s.region.clone()),
                )
            })
        };
        let left_classes = by_parity(&left);
        let right_classes = by_parity(&right);

        let mut woven = Vec::with_capacity(left.len() + right.len());
        for strip in &left {
            // Right strip j covers left strip i where (i + j + parity) is odd.
            let class = (strip.index + usize::from(parity) + 1) % 2;
            debug_assert!(!left_on_top(strip.index, class, parity));
            woven.push(cut(strip, &right_classes[class]));
        }
        for strip in &right {
            let class = (strip.index + usize::from(parity)) % 2;
            debug_assert!(left_on_top(class, strip.index, parity));
            woven.push(cut(strip, &left_classes[class]));
        }
        trace!(strips = woven.len(), parity, "boolean weave built");
        woven
    }

    /// One shape per strip, filled with its lobe colour.
    #[must_use]
    pub fn render(&self, style: &WeaveStyle) -> Vec<RenderedShape> {
        self.execute()
            .iter()
            .filter(|s| !s.region.0.is_empty())
            .map(|s| RenderedShape {
                path_data: region_path_data(&s.region),
                fill: style.colour(s.lobe).to_owned(),
                fill_rule: FillRule::NonZero,
            })
            .collect()
    }
}

/// Region where `lobe`'s colour is visible.
#[must_use]
pub fn visible_region(strips: &[WovenStrip], lobe: Lobe) -> MultiPolygon<f64> {
    union_all(
        strips
            .iter()
            .filter(|s| s.lobe == lobe)
            .map(|s| s.region.clone()),
    )
}

fn cut(strip: &Strip, over: &MultiPolygon<f64>) -> WovenStrip {
    WovenStrip {
        lobe: strip.lobe,
        index: strip.index,
        region: strip.region.difference(over),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use approx::assert_relative_eq;
    use geo::Area;

    #[test]
    fn default_grid_is_a_checkerboard() {
        let model = HeartModel::new(4, &EditorConfig::default()).unwrap();
        let strips = BooleanWeave::new(&model, TessellationParams::default()).execute();
        assert_eq!(strips.len(), 8);
        for s in &strips {
            // Each strip keeps half of its four cells.
            assert_relative_eq!(s.region.unsigned_area(), 2.0 * 50.0 * 50.0, epsilon = 1e-2);
        }
        let left = visible_region(&strips, Lobe::Left).unsigned_area();
        let right = visible_region(&strips, Lobe::Right).unsigned_area();
        assert_relative_eq!(left + right, 200.0 * 200.0, epsilon = 1e-2);
    }

    #[test]
    fn parity_swaps_the_top_cells() {
        let mut model = HeartModel::new(2, &EditorConfig::default()).unwrap();
        let cell_is_left = |model: &HeartModel| {
            let strips = BooleanWeave::new(model, TessellationParams::default()).execute();
            let first = strips
                .iter()
                .find(|s| s.lobe == Lobe::Left && s.index == 0)
                .unwrap();
            // The top-left cell spans x 0..50 of left strip 0.
            first.region.0.iter().any(|p| {
                p.exterior().coords().any(|c| c.x < 1e-6) && p.exterior().coords().all(|c| c.x < 50.0 + 1e-6)
            })
        };
        assert!(cell_is_left(&model));
        model.set_weave_parity(true);
        assert!(!cell_is_left(&model));
    }

    #[test]
    fn render_uses_lobe_colours() {
        let model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let style = WeaveStyle::default();
        let shapes = BooleanWeave::new(&model, TessellationParams::default()).render(&style);
        assert_eq!(shapes.len(), 6);
        assert_eq!(shapes.iter().filter(|s| s.fill == style.left_colour).count(), 3);
        assert!(shapes.iter().all(|s| s.fill_rule == FillRule::NonZero));
        assert!(shapes.iter().all(|s| s.path_data.starts_with('M')));
    }
}
