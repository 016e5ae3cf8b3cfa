//! Solver benchmark harness.
//!
//! Perturbs the design with a seeded generator, draws a fixed set of
//! pointer trials on the perturbed design and runs every strategy on the
//! same trials through [`DesignTooling`], so reports are reproducible and
//! comparable across strategies. Timing lives in the `solver_timing`
//! criterion bench; this module measures solution quality only.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::geometry::Lobe;
use crate::math::{Point2, Vector2};
use crate::model::ModelSnapshot;
use crate::snapping::SnapStrategy;
use crate::tooling::{ControlPointRef, DesignTooling};

/// Benchmark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub seed: u64,
    pub trials: usize,
    /// Largest pointer offset per axis, in square units.
    pub perturbation: f64,
    /// Random control-point moves tried on the design before the trials.
    pub design_moves: usize,
    /// Largest offset per axis of a design move.
    pub design_perturbation: f64,
    /// A run counts as a success when it ends this close to the pointer.
    pub success_tolerance: f64,
    pub strategies: Vec<SnapStrategy>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            trials: 64,
            perturbation: 40.0,
            design_moves: 24,
            design_perturbation: 15.0,
            success_tolerance: 1.0,
            strategies: SnapStrategy::ALL.to_vec(),
        }
    }
}

/// One pointer target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub target: ControlPointRef,
    pub desired: Point2,
}

/// Aggregates for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyReport {
    pub strategy: SnapStrategy,
    pub trials: usize,
    /// Runs that ended within the success tolerance of the pointer.
    pub successes: usize,
    /// Runs whose result failed the independent re-check. Always zero for a
    /// correct solver.
    pub invalid: usize,
    /// Mean distance between the result and the pointer.
    pub mean_error: f64,
    pub mean_evaluations: f64,
    /// Oracle evaluations counted during this strategy's runs.
    pub oracle_calls: u64,
}

impl StrategyReport {
    /// Fraction of successful runs.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.successes as f64 / self.trials as f64;
        rate
    }
}

/// Per-strategy results in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    /// Design moves the oracle accepted before the trials.
    pub design_moves: usize,
    pub strategies: Vec<StrategyReport>,
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "design perturbed by {} accepted moves", self.design_moves)?;
        writeln!(
            f,
            "{:<24} {:>8} {:>10} {:>10} {:>8}",
            "strategy", "success", "error", "calls", "invalid"
        )?;
        for r in &self.strategies {
            writeln!(
                f,
                "{:<24} {:>7.1}% {:>10.3} {:>10.1} {:>8}",
                r.strategy.name(),
                100.0 * r.success_rate(),
                r.mean_error,
                r.mean_evaluations,
                r.invalid,
            )?;
        }
        Ok(())
    }
}

/// A random interior control point and its current position.
fn pick_point(snapshot: &ModelSnapshot, rng: &mut StdRng) -> Option<(ControlPointRef, Point2)> {
    let lobe = if rng.gen_bool(0.5) { Lobe::Left } else { Lobe::Right };
    let fingers = &snapshot.lobes[lobe.index()];
    if fingers.is_empty() {
        return None;
    }
    let slot = rng.gen_range(0..fingers.len());
    let finger = &fingers[slot];
    let index = rng.gen_range(0..finger.point_count());
    let current = finger.point(index)?;
    let target = ControlPointRef {
        lobe,
        order: slot + 1,
        index,
    };
    Some((target, current))
}

fn random_offset(rng: &mut StdRng, spread: f64) -> Vector2 {
    let spread = spread.abs();
    if spread > 0.0 {
        Vector2::new(rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
    } else {
        Vector2::zeros()
    }
}

/// Applies `config.design_moves` random control-point moves to the tool's
/// design, keeping only those the oracle accepts.
///
/// Returns the number of accepted moves.
///
/// # Errors
///
/// Returns the first error reported by the tooling.
pub fn perturb_design<T: DesignTooling>(tool: &mut T, config: &BenchmarkConfig) -> Result<usize> {
    let mut rng = StdRng::seed_from_u64(config.seed.rotate_left(32));
    let mut accepted = 0;
    for _ in 0..config.design_moves {
        let Some((target, current)) = pick_point(&tool.snapshot(), &mut rng) else {
            break;
        };
        let offset = random_offset(&mut rng, config.design_perturbation);
        if tool.nudge_point(target, current + offset)? {
            accepted += 1;
        }
    }
    debug!(tried = config.design_moves, accepted, "design perturbed");
    Ok(accepted)
}

/// Draws `config.trials` random control-point drags on the design in `snapshot`.
///
/// Each trial picks an interior finger, one of its control points and a
/// pointer position offset by up to `perturbation` on each axis. A snapshot
/// without interior fingers yields no trials.
#[must_use]
pub fn draw_trials(snapshot: &ModelSnapshot, config: &BenchmarkConfig) -> Vec<Trial> {
    if snapshot.lobes.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut trials = Vec::with_capacity(config.trials);
    for _ in 0..config.trials {
        let Some((target, current)) = pick_point(snapshot, &mut rng) else {
            continue;
        };
        let offset = random_offset(&mut rng, config.perturbation);
        trials.push(Trial {
            target,
            desired: current + offset,
        });
    }
    trials
}

/// Perturbs the design, then runs every configured strategy on the same trials.
///
/// The tool's design is restored before returning.
///
/// # Errors
///
/// Returns the first error reported by the tooling, e.g. for a trial that
/// addresses a missing finger.
pub fn run_benchmark<T: DesignTooling>(tool: &mut T, config: &BenchmarkConfig) -> Result<BenchmarkReport> {
    let base = tool.snapshot();
    let design_moves = perturb_design(tool, config)?;
    let start = tool.snapshot();
    let trials = draw_trials(&start, config);
    info!(trials = trials.len(), design_moves, seed = config.seed, "benchmark started");

    let mut strategies = Vec::with_capacity(config.strategies.len());
    for &strategy in &config.strategies {
        tool.restore(&start)?;
        tool.reset_oracle_stats();

        let (mut successes, mut invalid) = (0, 0);
        let (mut error_sum, mut calls_sum) = (0.0, 0usize);
        for trial in &trials {
            let run = tool.run_solver(strategy, trial.target, trial.desired)?;
            let error = (run.position - trial.desired).norm();
            error_sum += error;
            calls_sum += run.evaluations;
            if !run.valid {
                invalid += 1;
            } else if error <= config.success_tolerance {
                successes += 1;
            }
        }

        let n = trials.len().max(1);
        #[allow(clippy::cast_precision_loss)]
        let report = StrategyReport {
            strategy,
            trials: trials.len(),
            successes,
            invalid,
            mean_error: error_sum / n as f64,
            mean_evaluations: calls_sum as f64 / n as f64,
            oracle_calls: tool.oracle_stats().calls,
        };
        debug!(strategy = %strategy, successes, invalid, "strategy finished");
        strategies.push(report);
    }
    tool.restore(&base)?;
    Ok(BenchmarkReport {
        design_moves,
        strategies,
    })
}
