use crate::config::SolverConfig;
use crate::math::Point2;

use super::{fd_gradient, Evaluator, SnapSolver};

/// Gradient descent on the penalized distance objective.
///
/// Each step follows the negative gradient with a length equal to the current
/// distance to the target, halved until the objective decreases and the
/// predicate accepts the point.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedGradient {
    iterations: usize,
    max_backtracks: usize,
    weight: f64,
    margin: f64,
    fd_step: f64,
    budget: usize,
}

impl ProjectedGradient {
    /// Creates the solver from configuration.
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            iterations: config.gradient_iterations,
            max_backtracks: config.max_backtracks,
            weight: config.penalty_weight,
            margin: config.clearance_margin,
            fd_step: config.fd_step,
            budget: config.max_evaluations,
        }
    }
}

impl SnapSolver for ProjectedGradient {
    fn name(&self) -> &'static str {
        "projected-gradient"
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn search(&self, eval: &Evaluator<'_>) {
        let objective = |p: Point2| eval.objective(p, self.weight, self.margin);
        let mut x = eval.best();
        let mut fx = objective(x);

        for _ in 0..self.iterations {
            let reach = eval.distance(&x);
            if reach < 1e-9 || eval.exhausted() {
                break;
            }
            let grad = fd_gradient(&objective, x, self.fd_step);
            let norm = grad.norm();
            if norm.is_nan() || norm <= 1e-12 {
                break;
            }
            let dir = -grad / norm;

            let mut length = reach;
            let mut moved = false;
            for _ in 0..=self.max_backtracks {
                let candidate = x + dir * length;
                let fc = objective(candidate);
                if fc < fx && eval.accepts(candidate) {
                    x = candidate;
                    fx = fc;
                    moved = true;
                    break;
                }
                if eval.exhausted() {
                    break;
                }
                length *= 0.5;
            }
            if !moved {
                break;
            }
        }
    }
}
