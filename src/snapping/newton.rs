use crate::config::SolverConfig;
use crate::math::{Matrix2, Point2};

use super::{fd_gradient, fd_hessian, Evaluator, SnapSolver};

/// Sufficient-decrease constant of the Armijo line search.
const ARMIJO: f64 = 1e-4;

/// Damped Newton iteration on the penalized distance objective.
///
/// Gradient and Hessian come from central finite differences. The Hessian is
/// regularized and, if needed, shifted until positive definite, so the step
/// is always a descent direction.
#[derive(Debug, Clone, Copy)]
pub struct PenalizedNewton {
    iterations: usize,
    max_backtracks: usize,
    weight: f64,
    margin: f64,
    fd_step: f64,
    regularization: f64,
    budget: usize,
}

impl PenalizedNewton {
    /// Creates the solver from configuration.
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            iterations: config.newton_iterations,
            max_backtracks: config.max_backtracks,
            weight: config.penalty_weight,
            margin: config.clearance_margin,
            fd_step: config.fd_step,
            regularization: config.newton_regularization,
            budget: config.max_evaluations,
        }
    }
}

/// Smallest eigenvalue of a symmetric 2×2 matrix.
fn min_eigenvalue(h: &Matrix2) -> f64 {
    let (a, b, c) = (h[(0, 0)], h[(0, 1)], h[(1, 1)]);
    let mean = 0.5 * (a + c);
    let radius = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    mean - radius
}

/// Shifts `h` by a multiple of the identity so its smallest eigenvalue is at least `floor`.
fn make_positive_definite(h: Matrix2, floor: f64) -> Matrix2 {
    let lambda = min_eigenvalue(&h);
    if lambda >= floor {
        h
    } else {
        h + Matrix2::identity() * (floor - lambda)
    }
}

impl SnapSolver for PenalizedNewton {
    fn name(&self) -> &'static str {
        "penalized-newton"
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn search(&self, eval: &Evaluator<'_>) {
        let objective = |p: Point2| eval.objective(p, self.weight, self.margin);
        let mut x = eval.best();
        let mut fx = objective(x);

        for _ in 0..self.iterations {
            if eval.distance(&x) < 1e-9 || eval.exhausted() {
                break;
            }
            let grad = fd_gradient(&objective, x, self.fd_step);
            if !grad.norm().is_finite() || grad.norm() <= 1e-12 {
                break;
            }
            let raw = fd_hessian(&objective, x, self.fd_step);
            if !raw.iter().all(|v| v.is_finite()) {
                break;
            }
            let hessian = make_positive_definite(
                raw + Matrix2::identity() * self.regularization,
                self.regularization,
            );
            let Some(inverse) = hessian.try_inverse() else {
                break;
            };
            let step = -(inverse * grad);
            let slope = grad.dot(&step);

            let mut alpha = 1.0;
            let mut moved = false;
            for _ in 0..=self.max_backtracks {
                let candidate = x + step * alpha;
                let fc = objective(candidate);
                if fc <= fx + ARMIJO * alpha * slope && eval.accepts(candidate) {
                    x = candidate;
                    fx = fc;
                    moved = true;
                    break;
                }
                if eval.exhausted() {
                    break;
                }
                alpha *= 0.5;
            }
            if !moved {
                break;
            }
        }
    }
}
