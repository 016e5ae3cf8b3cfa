pub mod design;
pub mod path;

pub use design::{DesignLoad, FingerRecord, HeartDesign};

use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use crate::config::{EditorConfig, OracleConfig};
use crate::constraints::{OverrideSet, ValidatedOverrides, ValidityOracle};
use crate::error::{ModelError, Result};
use crate::geometry::{Aabb, Finger, Lobe, WorkingSquare};
use crate::math::Point2;

slotmap::new_key_type! {
    /// Unique identifier for a finger in a [`HeartModel`].
    pub struct FingerId;
}

/// Smallest supported number of strips per lobe.
pub const MIN_GRID_SIZE: usize = 2;

/// Largest supported number of strips per lobe.
pub const MAX_GRID_SIZE: usize = 32;

/// Derived geometry of one finger, memoized by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerGeometry {
    /// Tight bounds of the whole finger.
    pub bounds: Aabb,
    /// Tight bounds of each segment.
    pub segment_bounds: Vec<Aabb>,
}

impl FingerGeometry {
    /// Computes the geometry of `finger`.
    #[must_use]
    pub fn of(finger: &Finger) -> Self {
        let segment_bounds: Vec<Aabb> = finger.segments().iter().map(|s| s.bounds()).collect();
        let bounds = segment_bounds
            .iter()
            .copied()
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Aabb::new(finger.start(), finger.end()));
        Self {
            bounds,
            segment_bounds,
        }
    }
}

/// Interior finger geometry of a model, detached from its identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    /// Strips per lobe.
    pub grid_size: usize,
    /// Weave parity flag.
    pub weave_parity: bool,
    /// Interior fingers per lobe (left, right), in order.
    pub lobes: [Vec<Finger>; 2],
}

/// The boundary curves of both lobes.
///
/// Fingers live in an arena keyed by [`FingerId`]. Each lobe keeps its
/// fingers in order, outer boundary fingers included at both ends. Bounds of
/// every finger are memoized in a table keyed by the same ids and refreshed
/// whenever a finger is replaced.
#[derive(Debug, Clone)]
pub struct HeartModel {
    grid_size: usize,
    strip_width: f64,
    square: WorkingSquare,
    weave_parity: bool,
    oracle_config: OracleConfig,
    fingers: SlotMap<FingerId, Finger>,
    order: [Vec<FingerId>; 2],
    placement: SecondaryMap<FingerId, (Lobe, usize)>,
    geometry: SecondaryMap<FingerId, FingerGeometry>,
}

impl HeartModel {
    /// Creates a model with default straight fingers.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` if `grid_size` is unsupported.
    pub fn new(grid_size: usize, config: &EditorConfig) -> Result<Self> {
        let mut model = Self {
            grid_size,
            strip_width: config.strip_width,
            square: WorkingSquare::new(grid_size, config.strip_width),
            weave_parity: false,
            oracle_config: config.oracle,
            fingers: SlotMap::with_key(),
            order: [Vec::new(), Vec::new()],
            placement: SecondaryMap::new(),
            geometry: SecondaryMap::new(),
        };
        model.reset_grid(grid_size)?;
        Ok(model)
    }

    /// Replaces every finger with the default straight layout for `grid_size`.
    ///
    /// Weave parity is kept.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` if `grid_size` is unsupported; the
    /// model is left unchanged in that case.
    pub fn reset_grid(&mut self, grid_size: usize) -> Result<()> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid_size) {
            return Err(ModelError::InvalidGridSize(grid_size).into());
        }
        self.grid_size = grid_size;
        self.square = WorkingSquare::new(grid_size, self.strip_width);
        self.fingers.clear();
        self.placement.clear();
        self.geometry.clear();

        for lobe in Lobe::ALL {
            let mut ids = Vec::with_capacity(grid_size + 1);
            for k in 0..=grid_size {
                let finger = self.default_finger(lobe, k);
                let id = self.fingers.insert(finger);
                self.placement.insert(id, (lobe, k));
                ids.push(id);
            }
            self.order[lobe.index()] = ids;
        }
        for (id, finger) in &self.fingers {
            self.geometry.insert(id, FingerGeometry::of(finger));
        }
        debug!(grid_size, size = self.square.size(), "grid reset");
        Ok(())
    }

    /// The straight finger at order index `order`.
    #[must_use]
    pub fn default_finger(&self, lobe: Lobe, order: usize) -> Finger {
        let s = self.square.size();
        let c = self.square.order_position(order, self.grid_size);
        let (start, end) = match lobe {
            Lobe::Left => (Point2::new(0.0, c), Point2::new(s, c)),
            Lobe::Right => (Point2::new(c, 0.0), Point2::new(c, s)),
        };
        Finger::straight(lobe, start, end)
    }

    /// Strips per lobe.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Width of one strip.
    #[must_use]
    pub fn strip_width(&self) -> f64 {
        self.strip_width
    }

    /// The working square.
    #[must_use]
    pub fn square(&self) -> &WorkingSquare {
        &self.square
    }

    /// Tolerances the model validates its own edits with.
    #[must_use]
    pub fn oracle_config(&self) -> &OracleConfig {
        &self.oracle_config
    }

    /// Whether the over/under assignment is flipped.
    #[must_use]
    pub fn weave_parity(&self) -> bool {
        self.weave_parity
    }

    /// Flips the over/under assignment.
    pub fn set_weave_parity(&mut self, parity: bool) {
        self.weave_parity = parity;
    }

    /// Returns the finger, or an error if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FingerNotFound` if `id` is not in the model.
    pub fn finger(&self, id: FingerId) -> Result<&Finger> {
        self.fingers
            .get(id)
            .ok_or_else(|| ModelError::FingerNotFound(format!("{id:?}")).into())
    }

    /// Memoized geometry of a finger.
    #[must_use]
    pub fn geometry(&self, id: FingerId) -> Option<&FingerGeometry> {
        self.geometry.get(id)
    }

    /// The finger id at `order` in `lobe`, outer fingers included.
    #[must_use]
    pub fn finger_at(&self, lobe: Lobe, order: usize) -> Option<FingerId> {
        self.order[lobe.index()].get(order).copied()
    }

    /// Lobe and order index of a finger.
    #[must_use]
    pub fn order_of(&self, id: FingerId) -> Option<(Lobe, usize)> {
        self.placement.get(id).copied()
    }

    /// All finger ids of a lobe in order, outer fingers included.
    #[must_use]
    pub fn lobe_order(&self, lobe: Lobe) -> &[FingerId] {
        &self.order[lobe.index()]
    }

    /// Interior finger ids of a lobe in order.
    #[must_use]
    pub fn interior_fingers(&self, lobe: Lobe) -> &[FingerId] {
        let ids = &self.order[lobe.index()];
        &ids[1..ids.len() - 1]
    }

    /// Fingers of a lobe in order, outer fingers included.
    pub fn lobe_fingers(&self, lobe: Lobe) -> impl Iterator<Item = &Finger> + '_ {
        self.order[lobe.index()]
            .iter()
            .filter_map(move |id| self.fingers.get(*id))
    }

    /// Whether `id` is one of the synthetic outer boundary fingers.
    #[must_use]
    pub fn is_outer(&self, id: FingerId) -> bool {
        matches!(self.order_of(id), Some((_, k)) if k == 0 || k == self.grid_size)
    }

    /// Order-neighbors `(previous, next)` of an interior finger.
    #[must_use]
    pub fn neighbors(&self, id: FingerId) -> Option<(FingerId, FingerId)> {
        let (lobe, k) = self.order_of(id)?;
        if k == 0 || k == self.grid_size {
            return None;
        }
        Some((self.finger_at(lobe, k - 1)?, self.finger_at(lobe, k + 1)?))
    }

    /// Persisted identifier of a finger, e.g. `"L2"`.
    #[must_use]
    pub fn record_id(&self, id: FingerId) -> Option<String> {
        let (lobe, k) = self.order_of(id)?;
        Some(format!("{}{k}", lobe.tag()))
    }

    /// Resolves a persisted identifier to an interior finger.
    #[must_use]
    pub fn resolve_record_id(&self, record_id: &str) -> Option<FingerId> {
        let mut chars = record_id.chars();
        let lobe = match chars.next()? {
            'L' => Lobe::Left,
            'R' => Lobe::Right,
            _ => return None,
        };
        let order: usize = chars.as_str().parse().ok()?;
        if order == 0 || order >= self.grid_size {
            return None;
        }
        self.finger_at(lobe, order)
    }

    /// Replaces every finger of a validated override set at once.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::FingerNotFound` or `ModelError::OuterBoundary`
    /// before touching anything if an entry cannot be written.
    pub fn apply_overrides(&mut self, overrides: ValidatedOverrides) -> Result<()> {
        let entries = overrides.into_entries();
        for id in entries.keys() {
            if !self.fingers.contains_key(*id) {
                return Err(ModelError::FingerNotFound(format!("{id:?}")).into());
            }
            if self.is_outer(*id) {
                return Err(ModelError::OuterBoundary.into());
            }
        }
        for (id, finger) in entries {
            self.replace(id, finger);
        }
        Ok(())
    }

    /// Splits one segment of a finger at `t`; the curve itself is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or outer finger, or an invalid
    /// segment index or parameter.
    pub fn split_segment(&mut self, id: FingerId, segment: usize, t: f64) -> Result<()> {
        let mut finger = self.editable(id)?.clone();
        finger.split_segment(segment, t)?;
        debug!(?id, segment, t, "segment split");
        self.replace(id, finger);
        Ok(())
    }

    /// Merges segment `segment` of a finger with the following one.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Rejected` if the merged curve would not be valid,
    /// and the usual lookup and index errors otherwise.
    pub fn merge_segments(&mut self, id: FingerId, segment: usize) -> Result<()> {
        let mut finger = self.editable(id)?.clone();
        finger.merge_segments(segment)?;
        self.square.pin_anchors(&mut finger);

        let oracle = ValidityOracle::new(self, self.oracle_config);
        let validated = oracle.validate(OverrideSet::single(id, finger));
        let validated = validated.map_err(|_| {
            ModelError::Rejected(format!("merging segment {segment} would break the design"))
        })?;
        debug!(?id, segment, "segments merged");
        self.apply_overrides(validated)
    }

    /// Captures the interior finger geometry.
    #[must_use]
    pub fn snapshot(&self) -> ModelSnapshot {
        let lobes = Lobe::ALL.map(|lobe| {
            self.interior_fingers(lobe)
                .iter()
                .filter_map(|id| self.fingers.get(*id).cloned())
                .collect()
        });
        ModelSnapshot {
            grid_size: self.grid_size,
            weave_parity: self.weave_parity,
            lobes,
        }
    }

    /// Restores a snapshot.
    ///
    /// Finger ids are kept when the grid size matches; otherwise the grid is
    /// rebuilt first.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` or `ModelError::Rejected` if the
    /// snapshot does not describe a complete grid.
    pub fn restore(&mut self, snapshot: &ModelSnapshot) -> Result<()> {
        for lobe in Lobe::ALL {
            let fingers = &snapshot.lobes[lobe.index()];
            if fingers.len() + 1 != snapshot.grid_size || fingers.iter().any(|f| f.lobe() != lobe) {
                return Err(ModelError::Rejected(format!(
                    "snapshot does not hold {} {lobe} fingers",
                    snapshot.grid_size.saturating_sub(1)
                ))
                .into());
            }
        }
        if snapshot.grid_size != self.grid_size {
            self.reset_grid(snapshot.grid_size)?;
        }
        for lobe in Lobe::ALL {
            let ids = self.interior_fingers(lobe).to_vec();
            for (id, finger) in ids.into_iter().zip(&snapshot.lobes[lobe.index()]) {
                self.replace(id, finger.clone());
            }
        }
        self.weave_parity = snapshot.weave_parity;
        Ok(())
    }

    fn editable(&self, id: FingerId) -> Result<&Finger> {
        let finger = self.finger(id)?;
        if self.is_outer(id) {
            return Err(ModelError::OuterBoundary.into());
        }
        Ok(finger)
    }

    fn replace(&mut self, id: FingerId, finger: Finger) {
        self.geometry.insert(id, FingerGeometry::of(&finger));
        if let Some(slot) = self.fingers.get_mut(id) {
            *slot = finger;
        }
    }
}
