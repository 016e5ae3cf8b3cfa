//! Strip and weave decomposition.
//!
//! Consecutive fingers of a lobe bound one strip; left strip `i` and right
//! strip `j` cross in one cell of the square, where the strip on top is
//! decided by [`left_on_top`]. Two renderers turn the strips into fills:
//! [`BooleanWeave`] cuts every under-strip with exact polygon booleans,
//! [`EvenOddWeave`] paints a single even-odd compound path over a
//! left-coloured square.

mod boolean;
mod even_odd;
mod strips;

pub use boolean::{visible_region, BooleanWeave, WovenStrip};
pub use even_odd::{EvenOddPattern, EvenOddWeave};
pub use strips::{BuildStrips, Strip};

use std::fmt::Write as _;

use geo::{BooleanOps, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::geometry::Lobe;
use crate::model::path::format_number;

/// Fill colours of the two lobes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveStyle {
    /// Colour of the left lobe, also the background of the even-odd renderer.
    pub left_colour: String,
    /// Colour of the right lobe.
    pub right_colour: String,
}

impl Default for WeaveStyle {
    fn default() -> Self {
        Self {
            left_colour: "#d62828".to_owned(),
            right_colour: "#ffffff".to_owned(),
        }
    }
}

impl WeaveStyle {
    /// Colour of a lobe.
    #[must_use]
    pub fn colour(&self, lobe: Lobe) -> &str {
        match lobe {
            Lobe::Left => &self.left_colour,
            Lobe::Right => &self.right_colour,
        }
    }
}

/// SVG fill rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// The `fill-rule` attribute value.
    #[must_use]
    pub fn as_svg(self) -> &'static str {
        match self {
            Self::NonZero => "nonzero",
            Self::EvenOdd => "evenodd",
        }
    }
}

/// One filled path, ready for an SVG `<path>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedShape {
    pub path_data: String,
    pub fill: String,
    pub fill_rule: FillRule,
}

/// Whether left strip `i` lies over right strip `j`.
#[must_use]
pub fn left_on_top(i: usize, j: usize, parity: bool) -> bool {
    (i + j + usize::from(parity)) % 2 == 0
}

/// Union of polygons; empty input gives an empty region.
pub(crate) fn union_all<I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = MultiPolygon<f64>>,
{
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(&p))
}

/// SVG path data of a region: one closed subpath per ring.
#[must_use]
pub fn region_path_data(region: &MultiPolygon<f64>) -> String {
    let mut out = String::new();
    for polygon in &region.0 {
        append_polygon(&mut out, polygon);
    }
    out
}

/// Appends the rings of `polygon` as closed subpaths.
pub(crate) fn append_polygon(out: &mut String, polygon: &Polygon<f64>) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let mut coords: Vec<_> = ring.coords().collect();
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        let Some((first, rest)) = coords.split_first() else {
            continue;
        };
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "M {} {}", format_number(first.x), format_number(first.y));
        for c in rest {
            let _ = write!(out, " L {} {}", format_number(c.x), format_number(c.y));
        }
        out.push_str(" Z");
    }
}
