use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Finger, Lobe, WorkingSquare};
use crate::math::{lerp, Point2};
use crate::model::{FingerId, HeartModel};

/// Mirror reflection or 180° rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryVariant {
    Mirror,
    /// Point symmetry ("anti"): rotation by 180°.
    Point,
}

/// Active symmetry constraints. `None` disables a constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymmetryFlags {
    /// Each finger is symmetric about its own center.
    pub within_curve: Option<SymmetryVariant>,
    /// Fingers of a lobe pair up about the lobe's center.
    pub within_lobe: Option<SymmetryVariant>,
    /// The two lobes map onto each other across the diagonal.
    pub between_lobes: Option<SymmetryVariant>,
}

impl SymmetryFlags {
    /// Whether no constraint is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.within_curve.is_none() && self.within_lobe.is_none() && self.between_lobes.is_none()
    }
}

/// One point mapping of the symmetry group, for a square of side `S` and `n` strips.
///
/// | map | left lobe | right lobe | target order |
/// |---|---|---|---|
/// | within-lobe mirror | `(x, S-y)` | `(S-x, y)` | `n-k` |
/// | within-lobe point | `(S-x, S-y)` | same | `n-k` |
/// | between-lobes mirror | `(y, x)` | same | `k` |
/// | between-lobes point | `(S-y, S-x)` | same | `n-k` |
/// | within-curve mirror | `(S-x, y)` | `(x, S-y)` | same finger |
/// | within-curve point | `2m - p` about the chord midpoint `m` | same | same finger |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryMap {
    WithinCurve(SymmetryVariant),
    WithinLobe(SymmetryVariant),
    BetweenLobes(SymmetryVariant),
}

impl SymmetryMap {
    /// Lobe of the finger a `lobe` finger maps onto.
    #[must_use]
    pub fn target_lobe(self, lobe: Lobe) -> Lobe {
        match self {
            Self::BetweenLobes(_) => lobe.opposite(),
            Self::WithinCurve(_) | Self::WithinLobe(_) => lobe,
        }
    }

    /// Order index of the finger an `order` finger maps onto.
    #[must_use]
    pub fn target_order(self, order: usize, grid_size: usize) -> usize {
        match self {
            Self::WithinCurve(_) | Self::BetweenLobes(SymmetryVariant::Mirror) => order,
            Self::WithinLobe(_) | Self::BetweenLobes(SymmetryVariant::Point) => grid_size - order,
        }
    }

    /// Maps one point of a `lobe` finger. `pivot` is only used by the
    /// within-curve point variant.
    #[must_use]
    pub fn map_point(self, lobe: Lobe, p: &Point2, size: f64, pivot: &Point2) -> Point2 {
        use SymmetryVariant::{Mirror, Point};
        match (self, lobe) {
            (Self::WithinLobe(Mirror), Lobe::Left) | (Self::WithinCurve(Mirror), Lobe::Right) => {
                Point2::new(p.x, size - p.y)
            }
            (Self::WithinLobe(Mirror), Lobe::Right) | (Self::WithinCurve(Mirror), Lobe::Left) => {
                Point2::new(size - p.x, p.y)
            }
            (Self::WithinLobe(Point), _) => Point2::new(size - p.x, size - p.y),
            (Self::BetweenLobes(Mirror), _) => Point2::new(p.y, p.x),
            (Self::BetweenLobes(Point), _) => Point2::new(size - p.y, size - p.x),
            (Self::WithinCurve(Point), _) => Point2::new(2.0 * pivot.x - p.x, 2.0 * pivot.y - p.y),
        }
    }

    /// Maps a whole finger onto its partner.
    ///
    /// The result is reoriented so its start anchor sits on the start edge of
    /// the target lobe, and both anchors are pinned onto their edges.
    #[must_use]
    pub fn apply(self, finger: &Finger, square: &WorkingSquare) -> Finger {
        let lobe = finger.lobe();
        let target = self.target_lobe(lobe);
        let pivot = lerp(&finger.start(), &finger.end(), 0.5);
        let size = square.size();
        let mut mapped = finger.mapped(target, |p| self.map_point(lobe, p, size, &pivot));
        if target.span_coord(&mapped.start()) > target.span_coord(&mapped.end()) {
            mapped = mapped.reversed();
        }
        square.pin_anchors(&mut mapped);
        mapped
    }
}

/// Replacement fingers for one edit and the companions it implies.
///
/// Always holds the primary finger. Entries are ordered by id, so iteration
/// is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideSet {
    primary: FingerId,
    entries: BTreeMap<FingerId, Finger>,
    consistent: bool,
}

impl OverrideSet {
    /// A set holding only the primary edit.
    #[must_use]
    pub fn single(primary: FingerId, finger: Finger) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(primary, finger);
        Self {
            primary,
            entries,
            consistent: true,
        }
    }

    /// Adds or replaces an entry unconditionally.
    pub fn insert(&mut self, id: FingerId, finger: Finger) {
        self.entries.insert(id, finger);
    }

    /// Adds a companion entry. If the target already has an entry that does
    /// not match within `tolerance`, the set is marked inconsistent.
    pub fn insert_companion(&mut self, id: FingerId, finger: Finger, tolerance: f64) {
        match self.entries.get(&id) {
            Some(existing) => {
                if !existing.approx_eq(&finger, tolerance) {
                    debug!(?id, "symmetry companions disagree");
                    self.consistent = false;
                }
            }
            None => {
                self.entries.insert(id, finger);
            }
        }
    }

    /// Id of the edited finger.
    #[must_use]
    pub fn primary(&self) -> FingerId {
        self.primary
    }

    /// The replacement for `id`, if any.
    #[must_use]
    pub fn get(&self, id: FingerId) -> Option<&Finger> {
        self.entries.get(&id)
    }

    /// Whether `id` has a replacement.
    #[must_use]
    pub fn contains(&self, id: FingerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a set holds at least its primary.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether all companion mappings agreed with each other.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FingerId, &Finger)> {
        self.entries.iter().map(|(id, finger)| (*id, finger))
    }
}

/// An [`OverrideSet`] that passed the validity oracle as a whole.
///
/// Only [`super::ValidityOracle::validate`] creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOverrides(OverrideSet);

impl ValidatedOverrides {
    pub(crate) fn new(set: OverrideSet) -> Self {
        Self(set)
    }

    /// The validated set.
    #[must_use]
    pub fn as_set(&self) -> &OverrideSet {
        &self.0
    }

    pub(crate) fn into_entries(self) -> BTreeMap<FingerId, Finger> {
        self.0.entries
    }
}

/// Derives the companion edits implied by the active symmetry flags.
#[derive(Debug, Clone, Copy)]
pub struct SymmetryDeriver<'a> {
    model: &'a HeartModel,
    flags: SymmetryFlags,
    tolerance: f64,
}

impl<'a> SymmetryDeriver<'a> {
    /// Creates a deriver; `tolerance` is the point tolerance for companions
    /// that land on an already edited finger.
    #[must_use]
    pub fn new(model: &'a HeartModel, flags: SymmetryFlags, tolerance: f64) -> Self {
        Self {
            model,
            flags,
            tolerance,
        }
    }

    /// The active flags.
    #[must_use]
    pub fn flags(&self) -> SymmetryFlags {
        self.flags
    }

    /// The primary candidate plus one companion per active lobe-level map.
    ///
    /// Within-lobe and between-lobes compose, giving up to four fingers.
    /// Within-curve symmetry does not add entries; see [`Self::mirror_edits`].
    #[must_use]
    pub fn derive_overrides(&self, primary: FingerId, candidate: Finger) -> OverrideSet {
        let Some((lobe, order)) = self.model.order_of(primary) else {
            return OverrideSet::single(primary, candidate);
        };

        let mut chains: Vec<Vec<SymmetryMap>> = Vec::with_capacity(3);
        if let Some(v) = self.flags.within_lobe {
            chains.push(vec![SymmetryMap::WithinLobe(v)]);
        }
        if let Some(b) = self.flags.between_lobes {
            chains.push(vec![SymmetryMap::BetweenLobes(b)]);
            if let Some(v) = self.flags.within_lobe {
                chains.push(vec![SymmetryMap::WithinLobe(v), SymmetryMap::BetweenLobes(b)]);
            }
        }

        let square = self.model.square();
        let grid = self.model.grid_size();
        let mut set = OverrideSet::single(primary, candidate.clone());
        for chain in chains {
            let (mut finger, mut target_lobe, mut target_order) = (candidate.clone(), lobe, order);
            for map in chain {
                finger = map.apply(&finger, square);
                target_lobe = map.target_lobe(target_lobe);
                target_order = map.target_order(target_order, grid);
            }
            if let Some(target) = self.model.finger_at(target_lobe, target_order) {
                set.insert_companion(target, finger, self.tolerance);
            }
        }
        set
    }

    /// Enforces within-curve symmetry on an edited finger.
    ///
    /// Every control point of `edited` that differs from `original` is mapped
    /// onto its partner (index `N-1-i`); a point that is its own partner is
    /// moved halfway towards its image. When both points of a pair changed,
    /// the lower index wins. The point variant rotates about the chord
    /// midpoint of `original`.
    pub fn mirror_edits(&self, original: &Finger, edited: &mut Finger) {
        let Some(variant) = self.flags.within_curve else {
            return;
        };
        let map = SymmetryMap::WithinCurve(variant);
        let lobe = edited.lobe();
        let size = self.model.square().size();
        let pivot = lerp(&original.start(), &original.end(), 0.5);

        let before = original.points();
        let after = edited.points();
        if before.len() != after.len() {
            return;
        }
        let n = after.len();
        let changed: Vec<bool> = before.iter().zip(&after).map(|(a, b)| a != b).collect();

        for j in 0..n {
            if !changed[j] {
                continue;
            }
            let partner = n - 1 - j;
            let image = map.map_point(lobe, &after[j], size, &pivot);
            if partner == j {
                edited.set_raw(j, lerp(&after[j], &image, 0.5));
            } else if !(changed[partner] && partner < j) {
                edited.set_raw(partner, image);
            }
        }
    }
}
