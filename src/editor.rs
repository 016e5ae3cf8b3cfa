//! Drag sessions and the editor data contract.
//!
//! [`HeartEditor`] owns the model and is the only thing that mutates it while
//! the user edits. Each pointer move runs the active snapping strategy
//! against the validity oracle (wrapped around the symmetry deriver) and
//! applies the accepted override set atomically, so the model always holds
//! the last valid state.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::EditorConfig;
use crate::constraints::{
    OracleStats, StatsSnapshot, SymmetryDeriver, SymmetryFlags, ValidatedOverrides, ValidityOracle,
};
use crate::error::{GeometryError, ModelError, Result};
use crate::geometry::{Finger, PointRole};
use crate::math::Point2;
use crate::model::{DesignLoad, FingerId, FingerRecord, HeartDesign, HeartModel};
use crate::snapping::{ObstacleField, SnapOutcome, SnapProblem, SnapSolver, SnapStrategy};

/// Payload sent to change listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorUpdate {
    pub fingers: Vec<FingerRecord>,
    pub grid_size: usize,
    pub weave_parity: bool,
}

type ChangeListener = Box<dyn FnMut(&EditorUpdate)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragSession {
    finger: FingerId,
    point: usize,
}

/// Interactive editor over one [`HeartModel`].
pub struct HeartEditor {
    model: HeartModel,
    config: EditorConfig,
    symmetry: SymmetryFlags,
    strategy: SnapStrategy,
    drag: Option<DragSession>,
    listeners: Vec<ChangeListener>,
    stats: OracleStats,
}

impl fmt::Debug for HeartEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartEditor")
            .field("model", &self.model)
            .field("symmetry", &self.symmetry)
            .field("strategy", &self.strategy)
            .field("drag", &self.drag)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl HeartEditor {
    /// Wraps `model`; the configured strategy becomes the active one.
    #[must_use]
    pub fn new(model: HeartModel, config: EditorConfig) -> Self {
        Self {
            model,
            strategy: config.strategy,
            config,
            symmetry: SymmetryFlags::default(),
            drag: None,
            listeners: Vec::new(),
            stats: OracleStats::new(),
        }
    }

    /// The current model.
    #[must_use]
    pub fn model(&self) -> &HeartModel {
        &self.model
    }

    /// The configuration the editor was built with.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Active symmetry constraints.
    #[must_use]
    pub fn symmetry(&self) -> SymmetryFlags {
        self.symmetry
    }

    /// Active snapping strategy.
    #[must_use]
    pub fn strategy(&self) -> SnapStrategy {
        self.strategy
    }

    /// The finger and point being dragged, if any.
    #[must_use]
    pub fn dragging(&self) -> Option<(FingerId, usize)> {
        self.drag.map(|d| (d.finger, d.point))
    }

    /// Registers a callback invoked after every model change.
    pub fn on_change(&mut self, listener: impl FnMut(&EditorUpdate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Starts dragging control point `point` of `finger`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or outer finger, or a point index out
    /// of range.
    pub fn begin_drag(&mut self, finger: FingerId, point: usize) -> Result<()> {
        let current = self.model.finger(finger)?;
        if self.model.is_outer(finger) {
            return Err(ModelError::OuterBoundary.into());
        }
        if current.point(point).is_none() {
            return Err(GeometryError::PointOutOfRange {
                index: point,
                count: current.point_count(),
            }
            .into());
        }
        debug!(?finger, point, strategy = %self.strategy, "drag started");
        self.drag = Some(DragSession { finger, point });
        Ok(())
    }

    /// Moves the dragged point as close to `desired` as the constraints allow.
    ///
    /// Returns the point's new position, or `None` when no drag is active.
    pub fn drag_to(&mut self, desired: Point2) -> Option<Point2> {
        let session = self.drag?;
        let solver = self.strategy.solver(&self.config.solver);
        let (outcome, accepted) = self.snap(solver.as_ref(), session.finger, session.point, desired)?;
        trace!(
            desired = ?desired,
            position = ?outcome.position,
            calls = outcome.evaluations,
            fast_path = outcome.fast_path,
            "drag step"
        );
        if let Some(validated) = accepted {
            if self.model.apply_overrides(validated).is_ok() {
                self.emit();
            }
        }
        self.model
            .finger(session.finger)
            .ok()
            .and_then(|f| f.point(session.point))
    }

    /// Ends the current drag; the model keeps the last accepted state.
    pub fn end_drag(&mut self) {
        if let Some(session) = self.drag.take() {
            debug!(finger = ?session.finger, "drag ended");
        }
    }

    /// Replaces the symmetry constraints used by later drags.
    pub fn set_symmetry(&mut self, flags: SymmetryFlags) {
        debug!(?flags, "symmetry changed");
        self.symmetry = flags;
    }

    /// Selects the snapping strategy used by later drags.
    pub fn set_strategy(&mut self, strategy: SnapStrategy) {
        self.strategy = strategy;
    }

    pub fn set_weave_parity(&mut self, parity: bool) {
        if self.model.weave_parity() != parity {
            self.model.set_weave_parity(parity);
            self.emit();
        }
    }

    /// Rebuilds the grid with default fingers.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` for an unsupported size.
    pub fn set_grid_size(&mut self, grid_size: usize) -> Result<()> {
        self.end_drag();
        self.model.reset_grid(grid_size)?;
        self.emit();
        Ok(())
    }

    /// Splits a segment of a finger.
    ///
    /// # Errors
    ///
    /// See [`HeartModel::split_segment`].
    pub fn split_segment(&mut self, finger: FingerId, segment: usize, t: f64) -> Result<()> {
        self.end_drag();
        self.model.split_segment(finger, segment, t)?;
        self.emit();
        Ok(())
    }

    /// Merges a segment of a finger with the next one.
    ///
    /// # Errors
    ///
    /// See [`HeartModel::merge_segments`].
    pub fn merge_segments(&mut self, finger: FingerId, segment: usize) -> Result<()> {
        self.end_drag();
        self.model.merge_segments(finger, segment)?;
        self.emit();
        Ok(())
    }

    /// Replaces the model with a loaded design.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` if the design's grid is unsupported.
    pub fn load_design(&mut self, design: &HeartDesign) -> Result<DesignLoad> {
        let (model, load) = HeartModel::from_design(design, &self.config)?;
        self.end_drag();
        self.model = model;
        self.emit();
        Ok(load)
    }

    /// The current design, without metadata.
    #[must_use]
    pub fn design(&self) -> HeartDesign {
        HeartDesign::capture(&self.model)
    }

    /// Oracle counters accumulated since the last reset.
    #[must_use]
    pub fn oracle_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_oracle_stats(&self) {
        self.stats.reset();
    }

    pub(crate) fn model_mut(&mut self) -> &mut HeartModel {
        &mut self.model
    }

    /// Runs `solver` for point `point` of `finger` without touching the model.
    ///
    /// Returns the outcome and, when the solver moved the point, the override
    /// set to apply. `None` if the finger or point does not exist.
    pub(crate) fn snap(
        &self,
        solver: &dyn SnapSolver,
        finger: FingerId,
        point: usize,
        desired: Point2,
    ) -> Option<(SnapOutcome, Option<ValidatedOverrides>)> {
        let base = self.model.finger(finger).ok()?.clone();
        let last_valid = base.point(point)?;
        let role = base.role(point)?;
        let square = self.model.square();
        let oracle = ValidityOracle::new(&self.model, *self.model.oracle_config()).with_stats(&self.stats);
        let deriver = SymmetryDeriver::new(&self.model, self.symmetry, oracle.config().symmetry_tolerance);

        let build = |p: Point2| -> Finger {
            let mut candidate = base.clone();
            if role == PointRole::Anchor {
                let at_start = point == 0;
                let pinned = square.project_anchor(candidate.lobe(), at_start, &p);
                let handle = if at_start { 1 } else { point - 1 };
                candidate.set_raw(point, pinned);
                candidate.translate_raw(handle, pinned - last_valid);
            } else if candidate.set_point(point, p).is_err() {
                return base.clone();
            }
            deriver.mirror_edits(&base, &mut candidate);
            square.pin_anchors(&mut candidate);
            candidate
        };
        let is_valid = |candidate: &Finger| {
            let set = deriver.derive_overrides(finger, candidate.clone());
            oracle.overrides_are_valid(&set)
        };
        let obstacles = ObstacleField::around(&self.model, finger, None, self.config.tessellation);
        let problem = SnapProblem {
            build: &build,
            is_valid: &is_valid,
            last_valid,
            desired,
            obstacles: &obstacles,
        };

        let outcome = solver.snap(&problem);
        if outcome.position == last_valid {
            return Some((outcome, None));
        }
        let set = deriver.derive_overrides(finger, build(outcome.position));
        Some((outcome, oracle.validate(set).ok()))
    }

    fn emit(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let update = EditorUpdate {
            fingers: self.model.finger_records(),
            grid_size: self.model.grid_size(),
            weave_parity: self.model.weave_parity(),
        };
        for listener in &mut self.listeners {
            listener(&update);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::constraints::SymmetryVariant;
    use crate::geometry::Lobe;

    fn editor(grid: usize) -> HeartEditor {
        let config = EditorConfig::default();
        HeartEditor::new(HeartModel::new(grid, &config).unwrap(), config)
    }

    #[test]
    fn drag_without_session_is_ignored() {
        let mut e = editor(3);
        assert_eq!(e.drag_to(Point2::new(10.0, 10.0)), None);
    }

    #[test]
    fn begin_drag_rejects_outer_and_bad_points() {
        let mut e = editor(3);
        let outer = e.model().finger_at(Lobe::Left, 0).unwrap();
        assert!(e.begin_drag(outer, 1).is_err());
        let inner = e.model().finger_at(Lobe::Left, 1).unwrap();
        assert!(e.begin_drag(inner, 4).is_err());
        assert!(e.begin_drag(inner, 2).is_ok());
        assert_eq!(e.dragging(), Some((inner, 2)));
        e.end_drag();
        assert_eq!(e.dragging(), None);
    }

    #[test]
    fn free_drag_follows_the_pointer() {
        let mut e = editor(3);
        let id = e.model().finger_at(Lobe::Left, 1).unwrap();
        e.begin_drag(id, 1).unwrap();
        let target = Point2::new(50.0, 60.0);
        assert_eq!(e.drag_to(target), Some(target));
        assert_eq!(e.model().finger(id).unwrap().point(1), Some(target));
    }

    #[test]
    fn blocked_drag_stops_short_and_stays_valid() {
        let mut e = editor(3);
        let id = e.model().finger_at(Lobe::Left, 1).unwrap();
        e.begin_drag(id, 1).unwrap();
        // Far past the next finger at y = 100.
        let got = e.drag_to(Point2::new(50.0, 400.0)).unwrap();
        assert!(got.y > 50.0);
        assert!(got.y < 400.0);
        let oracle = ValidityOracle::new(e.model(), *e.model().oracle_config());
        let finger = e.model().finger(id).unwrap();
        assert!(oracle.is_valid(id, finger, None));
    }

    #[test]
    fn anchors_stay_on_their_edge() {
        let mut e = editor(3);
        let id = e.model().finger_at(Lobe::Right, 1).unwrap();
        e.begin_drag(id, 0).unwrap();
        let got = e.drag_to(Point2::new(60.0, 12.0)).unwrap();
        assert_eq!(got, Point2::new(60.0, 0.0));
        let f = e.model().finger(id).unwrap();
        assert_eq!(f.point(1), Some(Point2::new(60.0, 50.0)));
    }

    #[test]
    fn within_lobe_symmetry_moves_the_partner() {
        let mut e = editor(4);
        e.set_symmetry(SymmetryFlags {
            within_lobe: Some(SymmetryVariant::Mirror),
            ..SymmetryFlags::default()
        });
        let id = e.model().finger_at(Lobe::Left, 1).unwrap();
        let partner = e.model().finger_at(Lobe::Left, 3).unwrap();
        e.begin_drag(id, 1).unwrap();
        e.drag_to(Point2::new(60.0, 70.0)).unwrap();
        let f = e.model().finger(partner).unwrap();
        assert_eq!(f.point(1), Some(Point2::new(60.0, 130.0)));
    }

    #[test]
    fn listeners_receive_updates() {
        let mut e = editor(3);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        e.on_change(move |u| sink.borrow_mut().push(u.clone()));

        e.set_weave_parity(true);
        let id = e.model().finger_at(Lobe::Right, 2).unwrap();
        e.begin_drag(id, 2).unwrap();
        e.drag_to(Point2::new(95.0, 90.0));
        e.set_grid_size(4).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].weave_parity);
        assert_eq!(seen[1].fingers.len(), 4);
        assert_eq!(seen[2].grid_size, 4);
        assert_eq!(seen[2].fingers.len(), 6);
    }

    #[test]
    fn load_design_replaces_the_model() {
        let mut source = editor(4);
        let id = source.model().finger_at(Lobe::Left, 1).unwrap();
        source.begin_drag(id, 1).unwrap();
        source.drag_to(Point2::new(70.0, 60.0)).unwrap();
        let design = source.design();

        let mut e = editor(3);
        let updates = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&updates);
        e.on_change(move |_| *sink.borrow_mut() += 1);
        let id = e.model().finger_at(Lobe::Right, 1).unwrap();
        e.begin_drag(id, 1).unwrap();

        assert_eq!(e.load_design(&design).unwrap(), DesignLoad::Loaded);
        assert_eq!(e.dragging(), None);
        assert_eq!(e.model().grid_size(), 4);
        assert_eq!(e.design().fingers, design.fingers);
        assert_eq!(*updates.borrow(), 1);
    }

    #[test]
    fn stats_count_oracle_calls() {
        let mut e = editor(3);
        let id = e.model().finger_at(Lobe::Left, 2).unwrap();
        e.begin_drag(id, 2).unwrap();
        e.drag_to(Point2::new(100.0, 110.0));
        assert!(e.oracle_stats().calls > 0);
        e.reset_oracle_stats();
        assert_eq!(e.oracle_stats().calls, 0);
    }
}
