use serde::Serialize;

use crate::geometry::{Finger, Lobe};
use crate::model::HeartModel;

use super::symmetry::{SymmetryMap, SymmetryVariant};

/// Point tolerance used when none is given.
pub const DEFAULT_CLASSIFY_TOLERANCE: f64 = 1e-3;

/// Symmetry properties of a finished design. All fields are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetryReport {
    pub all_straight: bool,
    pub within_curve_mirror: bool,
    pub within_curve_point: bool,
    pub within_lobe_mirror: bool,
    pub within_lobe_point: bool,
    pub between_lobes_mirror: bool,
    pub between_lobes_point: bool,
}

impl SymmetryReport {
    /// Human-readable label, e.g. `"classic"` or `"mirrored within lobes, rotated between lobes"`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.all_straight {
            return "classic".to_owned();
        }
        let labels = [
            (self.within_curve_mirror, "mirrored fingers"),
            (self.within_curve_point, "rotated fingers"),
            (self.within_lobe_mirror, "mirrored within lobes"),
            (self.within_lobe_point, "rotated within lobes"),
            (self.between_lobes_mirror, "mirrored between lobes"),
            (self.between_lobes_point, "rotated between lobes"),
        ];
        let parts: Vec<&str> = labels
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, label)| *label)
            .collect();
        if parts.is_empty() {
            "asymmetric".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

/// Read-only symmetry analysis of a model's interior fingers.
#[derive(Debug, Clone, Copy)]
pub struct SymmetryClassifier<'a> {
    model: &'a HeartModel,
    tolerance: f64,
}

impl<'a> SymmetryClassifier<'a> {
    /// Creates a classifier with [`DEFAULT_CLASSIFY_TOLERANCE`].
    #[must_use]
    pub fn new(model: &'a HeartModel) -> Self {
        Self {
            model,
            tolerance: DEFAULT_CLASSIFY_TOLERANCE,
        }
    }

    /// Overrides the point tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Runs every test.
    #[must_use]
    pub fn classify(&self) -> SymmetryReport {
        use SymmetryVariant::{Mirror, Point};
        SymmetryReport {
            all_straight: self.all_straight(),
            within_curve_mirror: self.within_curve(Mirror),
            within_curve_point: self.within_curve(Point),
            within_lobe_mirror: self.lobe_pairs(SymmetryMap::WithinLobe(Mirror)),
            within_lobe_point: self.lobe_pairs(SymmetryMap::WithinLobe(Point)),
            between_lobes_mirror: self.lobe_pairs(SymmetryMap::BetweenLobes(Mirror)),
            between_lobes_point: self.lobe_pairs(SymmetryMap::BetweenLobes(Point)),
        }
    }

    /// Whether every interior finger is a straight line.
    #[must_use]
    pub fn all_straight(&self) -> bool {
        self.interior().all(|(_, _, f)| f.is_straight(self.tolerance))
    }

    /// Whether every interior finger maps onto itself.
    #[must_use]
    pub fn within_curve(&self, variant: SymmetryVariant) -> bool {
        let map = SymmetryMap::WithinCurve(variant);
        let square = self.model.square();
        self.interior()
            .all(|(_, _, f)| map.apply(f, square).approx_eq(f, self.tolerance))
    }

    fn lobe_pairs(&self, map: SymmetryMap) -> bool {
        let square = self.model.square();
        let grid = self.model.grid_size();
        self.interior().all(|(lobe, order, finger)| {
            let partner = self
                .model
                .finger_at(map.target_lobe(lobe), map.target_order(order, grid))
                .and_then(|id| self.model.finger(id).ok());
            partner.is_some_and(|p| map.apply(finger, square).approx_eq(p, self.tolerance))
        })
    }

    fn interior(&self) -> impl Iterator<Item = (Lobe, usize, &'a Finger)> + 'a {
        let model = self.model;
        Lobe::ALL.into_iter().flat_map(move |lobe| {
            model
                .interior_fingers(lobe)
                .iter()
                .enumerate()
                .filter_map(move |(i, id)| Some((lobe, i + 1, model.finger(*id).ok()?)))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::constraints::{OverrideSet, SymmetryDeriver, SymmetryFlags, ValidityOracle};
    use crate::math::Point2;

    fn apply(model: &mut HeartModel, set: OverrideSet) {
        let validated = ValidityOracle::new(model, *model.oracle_config())
            .validate(set)
            .unwrap();
        model.apply_overrides(validated).unwrap();
    }

    #[test]
    fn default_grid_is_classic() {
        let model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let report = SymmetryClassifier::new(&model).classify();
        assert!(report.all_straight);
        assert!(report.within_lobe_mirror);
        assert!(report.between_lobes_mirror);
        assert_eq!(report.describe(), "classic");
    }

    #[test]
    fn single_bent_finger_is_asymmetric() {
        let mut model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let id = model.finger_at(Lobe::Left, 1).unwrap();
        let mut finger = model.finger(id).unwrap().clone();
        finger.set_point(1, Point2::new(40.0, 70.0)).unwrap();
        apply(&mut model, OverrideSet::single(id, finger));

        let report = SymmetryClassifier::new(&model).classify();
        assert!(!report.all_straight);
        assert_eq!(report.describe(), "asymmetric");
    }

    #[test]
    fn tolerance_decides_straightness() {
        let mut model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let id = model.finger_at(Lobe::Right, 1).unwrap();
        let mut finger = model.finger(id).unwrap().clone();
        let p = finger.point(2).unwrap();
        finger.set_point(2, Point2::new(p.x + 0.01, p.y)).unwrap();
        apply(&mut model, OverrideSet::single(id, finger));

        assert!(!SymmetryClassifier::new(&model).all_straight());
        let loose = SymmetryClassifier::new(&model).with_tolerance(0.05);
        assert_eq!(loose.classify().describe(), "classic");
    }

    #[test]
    fn derived_companions_are_recognized() {
        let mut model = HeartModel::new(3, &EditorConfig::default()).unwrap();
        let flags = SymmetryFlags {
            between_lobes: Some(SymmetryVariant::Mirror),
            ..SymmetryFlags::default()
        };
        for order in 1..=2 {
            let id = model.finger_at(Lobe::Left, order).unwrap();
            let mut finger = model.finger(id).unwrap().clone();
            let p = finger.point(2).unwrap();
            finger.set_point(2, Point2::new(p.x, p.y + 12.0)).unwrap();
            let set = SymmetryDeriver::new(&model, flags, 1e-6).derive_overrides(id, finger);
            apply(&mut model, set);
        }
        let report = SymmetryClassifier::new(&model).classify();
        assert!(report.between_lobes_mirror);
        assert!(!report.within_lobe_mirror);
        assert_eq!(report.describe(), "mirrored between lobes");
    }
}
