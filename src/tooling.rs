//! Narrow interface for debug and benchmark tools.
//!
//! Tools see snapshots, single solver runs and rendered output, never the
//! editor's internals.

use crate::constraints::{OverrideSet, StatsSnapshot, ValidityOracle};
use crate::editor::HeartEditor;
use crate::error::{GeometryError, ModelError, Result};
use crate::geometry::Lobe;
use crate::math::Point2;
use crate::model::ModelSnapshot;
use crate::snapping::SnapStrategy;
use crate::weave::{BooleanWeave, RenderedShape};

/// A control point addressed by lobe, order index and flat point index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlPointRef {
    pub lobe: Lobe,
    pub order: usize,
    pub index: usize,
}

/// One solver run, reported without touching the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverRun {
    /// Position the solver settled on.
    pub position: Point2,
    /// Predicate calls spent.
    pub evaluations: usize,
    /// Whether the desired position was accepted outright.
    pub fast_path: bool,
    /// Independent re-check of the resulting override set.
    pub valid: bool,
}

/// Operations available to tooling.
pub trait DesignTooling {
    /// Captures the interior finger geometry.
    fn snapshot(&self) -> ModelSnapshot;

    /// Restores a captured state.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not describe a complete grid.
    fn restore(&mut self, snapshot: &ModelSnapshot) -> Result<()>;

    /// Runs one strategy for one control point, leaving the model unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error for an outer or missing finger, or a bad point index.
    fn run_solver(&self, strategy: SnapStrategy, target: ControlPointRef, desired: Point2) -> Result<SolverRun>;

    /// Moves one control point directly, without snapping or symmetry.
    ///
    /// Anchors are pinned to their edge. The move is applied only if the
    /// oracle accepts the result; returns whether it was.
    ///
    /// # Errors
    ///
    /// Returns an error for an outer or missing finger, or a bad point index.
    fn nudge_point(&mut self, target: ControlPointRef, position: Point2) -> Result<bool>;

    /// Renders the current weave.
    fn draw(&self) -> Vec<RenderedShape>;

    /// Oracle counters since the last reset.
    fn oracle_stats(&self) -> StatsSnapshot;

    /// Zeroes the oracle counters.
    fn reset_oracle_stats(&self);
}

impl DesignTooling for HeartEditor {
    fn snapshot(&self) -> ModelSnapshot {
        self.model().snapshot()
    }

    fn restore(&mut self, snapshot: &ModelSnapshot) -> Result<()> {
        self.end_drag();
        self.model_mut().restore(snapshot)
    }

    fn run_solver(&self, strategy: SnapStrategy, target: ControlPointRef, desired: Point2) -> Result<SolverRun> {
        let ControlPointRef { lobe, order, index: point } = target;
        let finger = self
            .model()
            .finger_at(lobe, order)
            .ok_or(ModelError::NoFingerAtOrder { lobe, order })?;
        let current = self.model().finger(finger)?;
        if self.model().is_outer(finger) {
            return Err(ModelError::OuterBoundary.into());
        }
        let count = current.point_count();
        let solver = strategy.solver(&self.config().solver);
        let (outcome, accepted) = self
            .snap(solver.as_ref(), finger, point, desired)
            .ok_or(GeometryError::PointOutOfRange { index: point, count })?;

        // An unmoved point keeps the current state, valid iff the model is.
        let unmoved = current.point(point) == Some(outcome.position);
        let valid = accepted.is_some()
            || (unmoved
                && ValidityOracle::new(self.model(), *self.model().oracle_config())
                    .is_valid(finger, current, None));
        Ok(SolverRun {
            position: outcome.position,
            evaluations: outcome.evaluations,
            fast_path: outcome.fast_path,
            valid,
        })
    }

    fn nudge_point(&mut self, target: ControlPointRef, position: Point2) -> Result<bool> {
        let ControlPointRef { lobe, order, index } = target;
        let id = self
            .model()
            .finger_at(lobe, order)
            .ok_or(ModelError::NoFingerAtOrder { lobe, order })?;
        if self.model().is_outer(id) {
            return Err(ModelError::OuterBoundary.into());
        }
        let mut finger = self.model().finger(id)?.clone();
        finger.set_point(index, position)?;
        self.model().square().pin_anchors(&mut finger);

        let verdict = ValidityOracle::new(self.model(), *self.model().oracle_config())
            .validate(OverrideSet::single(id, finger));
        let Ok(validated) = verdict else {
            return Ok(false);
        };
        self.end_drag();
        self.model_mut().apply_overrides(validated)?;
        Ok(true)
    }

    fn draw(&self) -> Vec<RenderedShape> {
        BooleanWeave::new(self.model(), self.config().tessellation).render(&self.config().style)
    }

    fn oracle_stats(&self) -> StatsSnapshot {
        HeartEditor::oracle_stats(self)
    }

    fn reset_oracle_stats(&self) {
        HeartEditor::reset_oracle_stats(self);
    }
}
