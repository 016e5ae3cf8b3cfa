use geo::{BooleanOps, MultiPolygon, Polygon};

use crate::geometry::{Lobe, WorkingSquare};
use crate::model::HeartModel;
use crate::tessellation::TessellationParams;

use super::strips::{square_polygon, BuildStrips};
use super::{append_polygon, region_path_data, union_all, FillRule, RenderedShape, WeaveStyle};

/// Output of the static renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct EvenOddPattern {
    /// Background square.
    pub square: WorkingSquare,
    /// The compound path: even left strips and shifted-even right strips.
    pub compound_path: String,
    /// Region the compound fills under the even-odd rule.
    pub filled: MultiPolygon<f64>,
}

impl EvenOddPattern {
    /// Background square in the left colour, then the compound in the right colour.
    #[must_use]
    pub fn render(&self, style: &WeaveStyle) -> Vec<RenderedShape> {
        vec![
            RenderedShape {
                path_data: region_path_data(&MultiPolygon::new(vec![self.background()])),
                fill: style.left_colour.clone(),
                fill_rule: FillRule::NonZero,
            },
            RenderedShape {
                path_data: self.compound_path.clone(),
                fill: style.right_colour.clone(),
                fill_rule: FillRule::EvenOdd,
            },
        ]
    }

    /// Region where `lobe`'s colour shows.
    #[must_use]
    pub fn visible_region(&self, lobe: Lobe) -> MultiPolygon<f64> {
        match lobe {
            Lobe::Right => self.filled.clone(),
            Lobe::Left => self.background().difference(&self.filled),
        }
    }

    fn background(&self) -> Polygon<f64> {
        square_polygon(&self.square)
    }
}

/// Static renderer: one even-odd compound path over a left-coloured square.
///
/// A cell is covered by exactly one compound strip iff the right strip is on
/// top there, which is what the even-odd rule paints.
#[derive(Debug)]
pub struct EvenOddWeave<'a> {
    model: &'a HeartModel,
    params: TessellationParams,
}

impl<'a> EvenOddWeave<'a> {
    /// Creates a new even-odd weave operation.
    #[must_use]
    pub fn new(model: &'a HeartModel, params: TessellationParams) -> Self {
        Self { model, params }
    }

    /// Builds the compound path.
    #[must_use]
    pub fn execute(&self) -> EvenOddPattern {
        let shift = usize::from(self.model.weave_parity());
        let [left, right] = BuildStrips::new(self.model, self.params).execute();

        let left_even: Vec<_> = left.into_iter().filter(|s| s.index % 2 == 0).collect();
        let right_even: Vec<_> = right
            .into_iter()
            .filter(|s| (s.index + shift) % 2 == 0)
            .collect();

        let mut compound_path = String::new();
        for strip in left_even.iter().chain(&right_even) {
            for polygon in &strip.region.0 {
                append_polygon(&mut compound_path, polygon);
            }
        }

        let left_union = union_all(left_even.into_iter().map(|s| s.region));
        let right_union = union_all(right_even.into_iter().map(|s| s.region));
        EvenOddPattern {
            square: *self.model.square(),
            compound_path,
            filled: left_union.xor(&right_union),
        }
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
    fn compound_has_one_subpath_per_even_strip() {
        let model = HeartModel::new(4, &EditorConfig::default()).unwrap();
        let pattern = EvenOddWeave::new(&model, TessellationParams::default()).execute();
        assert_eq!(pattern.compound_path.matches('M').count(), 4);
        assert_relative_eq!(pattern.filled.unsigned_area(), 200.0 * 200.0 / 2.0, epsilon = 1e-2);
    }

    #[test]
    fn render_paints_background_then_compound() {
        let model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let style = WeaveStyle::default();
        let shapes = EvenOddWeave::new(&model, TessellationParams::default())
            .execute()
            .render(&style);
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].fill, style.left_colour);
        assert_eq!(shapes[0].path_data, "M 0 0 L 150 0 L 150 150 L 0 150 Z");
        assert_eq!(shapes[1].fill, style.right_colour);
        assert_eq!(shapes[1].fill_rule, FillRule::EvenOdd);
    }

    #[test]
    fn parity_shifts_right_strips() {
        let mut model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let plain = EvenOddWeave::new(&model, TessellationParams::default()).execute();
        model.set_weave_parity(true);
        let flipped = EvenOddWeave::new(&model, TessellationParams::default()).execute();
        // Three left strips: two even. Right strips 0 and 2 vs strip 1.
        assert_eq!(plain.compound_path.matches('M').count(), 4);
        assert_eq!(flipped.compound_path.matches('M').count(), 3);
        let total = plain.filled.unsigned_area() + flipped.filled.unsigned_area();
        assert_relative_eq!(total, 150.0 * 150.0, epsilon = 1e-2);
    }
}
