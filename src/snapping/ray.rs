use crate::config::SolverConfig;
use crate::math::{lerp, Point2};

use super::{Evaluator, SnapSolver};

/// Binary search along the segment from the last valid position to the desired one.
#[derive(Debug, Clone, Copy)]
pub struct RayBisection {
    iterations: usize,
    budget: usize,
}

impl RayBisection {
    /// Creates the solver from configuration.
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            iterations: config.ray_iterations,
            budget: config.max_evaluations,
        }
    }
}

impl SnapSolver for RayBisection {
    fn name(&self) -> &'static str {
        "ray-bisection"
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn search(&self, eval: &Evaluator<'_>) {
        let from = eval.problem().last_valid;
        bisect(eval, from, eval.desired(), self.iterations);
    }
}

/// Farthest accepted point on `from → to`, `from` assumed valid.
///
/// Keeps the largest parameter that validated after `iterations` halvings.
pub(crate) fn bisect(eval: &Evaluator<'_>, from: Point2, to: Point2, iterations: usize) -> Point2 {
    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..iterations {
        if eval.exhausted() {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if eval.accepts(lerp(&from, &to, mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lerp(&from, &to, lo)
}
