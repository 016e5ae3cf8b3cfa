use std::cell::Cell;

use tracing::trace;

use crate::config::OracleConfig;
use crate::geometry::{curves_within, Aabb, Finger, Lobe};
use crate::model::{FingerGeometry, FingerId, HeartModel};

use super::symmetry::{OverrideSet, ValidatedOverrides};

/// Evaluation counters for benchmarking.
///
/// Counters use interior mutability so that the oracle can stay `&self`.
#[derive(Debug, Default)]
pub struct OracleStats {
    calls: Cell<u64>,
    rejections: Cell<u64>,
    curve_tests: Cell<u64>,
}

/// Plain copy of [`OracleStats`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub rejections: u64,
    pub curve_tests: u64,
}

impl OracleStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes all counters.
    pub fn reset(&self) {
        self.calls.set(0);
        self.rejections.set(0);
        self.curve_tests.set(0);
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.get(),
            rejections: self.rejections.get(),
            curve_tests: self.curve_tests.get(),
        }
    }

    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

/// Reasons a candidate is rejected, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// An anchor reached or passed an order-neighbor's anchor.
    Ordering,
    /// The curve leaves the working square.
    Bounds,
    /// The curve comes too close to another finger of its lobe.
    Intersection,
}

/// Decides whether candidate fingers keep the design legal.
///
/// Pure over the borrowed model; the only side effect is counting into an
/// optional [`OracleStats`].
#[derive(Debug, Clone, Copy)]
pub struct ValidityOracle<'a> {
    model: &'a HeartModel,
    config: OracleConfig,
    stats: Option<&'a OracleStats>,
}

impl<'a> ValidityOracle<'a> {
    /// Creates an oracle over the current state of `model`.
    #[must_use]
    pub fn new(model: &'a HeartModel, config: OracleConfig) -> Self {
        Self {
            model,
            config,
            stats: None,
        }
    }

    /// Counts every evaluation into `stats`.
    #[must_use]
    pub fn with_stats(mut self, stats: &'a OracleStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// The model being checked against.
    #[must_use]
    pub fn model(&self) -> &'a HeartModel {
        self.model
    }

    /// Tolerances in use.
    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Whether `candidate` may replace finger `id`.
    ///
    /// Neighbors and obstacles are read from `overrides` where present, so a
    /// batch of simultaneous edits can be checked against itself.
    #[must_use]
    pub fn is_valid(&self, id: FingerId, candidate: &Finger, overrides: Option<&OverrideSet>) -> bool {
        let verdict = self.check(id, candidate, overrides);
        if let Some(stats) = self.stats {
            OracleStats::bump(&stats.calls);
            if verdict.is_err() {
                OracleStats::bump(&stats.rejections);
            }
        }
        if let Err(violation) = verdict {
            trace!(?id, ?violation, "candidate rejected");
        }
        verdict.is_ok()
    }

    /// Runs the checks and reports the first violation.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn check(
        &self,
        id: FingerId,
        candidate: &Finger,
        overrides: Option<&OverrideSet>,
    ) -> std::result::Result<(), Violation> {
        let Some((lobe, order)) = self.model.order_of(id) else {
            return Err(Violation::Ordering);
        };
        if candidate.lobe() != lobe || order == 0 || order >= self.model.grid_size() {
            return Err(Violation::Ordering);
        }
        self.check_ordering(lobe, order, candidate, overrides)?;

        let bounds = candidate.bounds();
        let square = self
            .model
            .square()
            .bounds()
            .inflated(self.config.bounds_tolerance);
        if !square.contains_box(&bounds) {
            return Err(Violation::Bounds);
        }

        self.check_intersections(id, lobe, candidate, &bounds, overrides)
    }

    /// Validates every entry of `set` against the whole set.
    #[must_use]
    pub fn overrides_are_valid(&self, set: &OverrideSet) -> bool {
        set.is_consistent()
            && set
                .iter()
                .all(|(id, finger)| self.is_valid(id, finger, Some(set)))
    }

    /// Turns a set that passes [`Self::overrides_are_valid`] into an
    /// applicable one; hands the set back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the rejected set unchanged.
    pub fn validate(&self, set: OverrideSet) -> std::result::Result<ValidatedOverrides, OverrideSet> {
        if self.overrides_are_valid(&set) {
            Ok(ValidatedOverrides::new(set))
        } else {
            Err(set)
        }
    }

    fn check_ordering(
        &self,
        lobe: Lobe,
        order: usize,
        candidate: &Finger,
        overrides: Option<&OverrideSet>,
    ) -> std::result::Result<(), Violation> {
        let eps = self.config.ordering_epsilon;
        let (Some(prev_id), Some(next_id)) = (
            self.model.finger_at(lobe, order - 1),
            self.model.finger_at(lobe, order + 1),
        ) else {
            return Err(Violation::Ordering);
        };
        let lookup = |nid| {
            overrides
                .and_then(|set| set.get(nid))
                .or_else(|| self.model.finger(nid).ok())
        };
        let (Some(prev), Some(next)) = (lookup(prev_id), lookup(next_id)) else {
            return Err(Violation::Ordering);
        };

        let between = |p: f64, lo: f64, hi: f64| p > lo + eps && p < hi - eps;
        let ok = between(
            lobe.order_coord(&candidate.start()),
            lobe.order_coord(&prev.start()),
            lobe.order_coord(&next.start()),
        ) && between(
            lobe.order_coord(&candidate.end()),
            lobe.order_coord(&prev.end()),
            lobe.order_coord(&next.end()),
        );
        if ok {
            Ok(())
        } else {
            Err(Violation::Ordering)
        }
    }

    fn check_intersections(
        &self,
        id: FingerId,
        lobe: Lobe,
        candidate: &Finger,
        bounds: &Aabb,
        overrides: Option<&OverrideSet>,
    ) -> std::result::Result<(), Violation> {
        let tol = self.config.intersection_tolerance;
        let reach = bounds.inflated(tol);
        let candidate_bounds: Vec<Aabb> = candidate.segments().iter().map(|s| s.bounds()).collect();

        for &other_id in self.model.lobe_order(lobe) {
            if other_id == id {
                continue;
            }
            let overridden = overrides.and_then(|set| set.get(other_id));
            let computed;
            let (other, geometry) = match (overridden, self.model.geometry(other_id)) {
                (Some(finger), _) => {
                    computed = FingerGeometry::of(finger);
                    (finger, &computed)
                }
                (None, Some(geometry)) => match self.model.finger(other_id) {
                    Ok(finger) => (finger, geometry),
                    Err(_) => continue,
                },
                (None, None) => continue,
            };
            if reach.distance_to(&geometry.bounds) > 0.0 {
                continue;
            }

            for (seg, seg_bounds) in candidate.segments().iter().zip(&candidate_bounds) {
                for (other_seg, other_bounds) in other.segments().iter().zip(&geometry.segment_bounds) {
                    if seg_bounds.distance_to(other_bounds) >= tol {
                        continue;
                    }
                    if let Some(stats) = self.stats {
                        OracleStats::bump(&stats.curve_tests);
                    }
                    if curves_within(seg, other_seg, tol) {
                        return Err(Violation::Intersection);
                    }
                }
            }
        }
        Ok(())
    }
}
