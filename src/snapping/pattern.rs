use std::f64::consts::TAU;

use crate::config::SolverConfig;
use crate::math::Vector2;

use super::ray::bisect;
use super::{Evaluator, SnapSolver};

/// Compass search around the current best point.
///
/// Each round probes `directions` equally spaced rays (the first one aimed
/// at the desired position), resolving each by a short bisection so probes
/// stay on the valid side. The step starts at the distance to the desired
/// position and halves every round. The search stops after a round without
/// progress, when the step drops below `min_step`, or after `rounds` rounds.
#[derive(Debug, Clone, Copy)]
pub struct PatternSearch {
    name: &'static str,
    directions: usize,
    rounds: usize,
    ray_iterations: usize,
    min_step: f64,
    budget: usize,
}

impl PatternSearch {
    /// Few directions, more rounds.
    #[must_use]
    pub fn coarse(config: &SolverConfig) -> Self {
        Self {
            name: "pattern-search-coarse",
            directions: config.coarse_directions,
            rounds: config.coarse_rounds,
            ray_iterations: config.pattern_ray_iterations,
            min_step: config.min_step,
            budget: config.max_evaluations,
        }
    }

    /// Many directions, fewer rounds.
    #[must_use]
    pub fn fine(config: &SolverConfig) -> Self {
        Self {
            name: "pattern-search-fine",
            directions: config.fine_directions,
            rounds: config.fine_rounds,
            ray_iterations: config.pattern_ray_iterations,
            min_step: config.min_step,
            budget: config.max_evaluations,
        }
    }
}

impl SnapSolver for PatternSearch {
    fn name(&self) -> &'static str {
        self.name
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn search(&self, eval: &Evaluator<'_>) {
        let desired = eval.desired();
        let mut step = eval.distance(&eval.best());

        for _ in 0..self.rounds {
            if step < self.min_step || eval.exhausted() {
                break;
            }
            let center = eval.best();
            let before = eval.distance(&center);
            let to_target = desired - center;
            let base = to_target.y.atan2(to_target.x);

            for k in 0..self.directions {
                #[allow(clippy::cast_precision_loss)]
                let angle = base + TAU * k as f64 / self.directions as f64;
                let dir = Vector2::new(angle.cos(), angle.sin());
                // Rays pointing away from the target cannot help.
                if dir.dot(&to_target) <= 0.0 {
                    continue;
                }
                bisect(eval, center, center + dir * step, self.ray_iterations);
                if eval.exhausted() {
                    break;
                }
            }

            if eval.distance(&eval.best()) >= before {
                break;
            }
            step *= 0.5;
        }
    }
}
