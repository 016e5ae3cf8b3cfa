use crate::config::SolverConfig;
use crate::math::{Matrix2, Point2, Vector2};

use super::{Evaluator, SnapSolver};

/// Feasibility slack when checking QP candidates.
const QP_SLACK: f64 = 1e-9;

/// A linearized constraint `a · s >= b`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HalfPlane {
    a: Vector2,
    b: f64,
}

impl HalfPlane {
    fn holds(&self, s: &Vector2) -> bool {
        self.a.dot(s) >= self.b - QP_SLACK
    }
}

/// Sequential quadratic programming with a trust region.
///
/// At each iterate every clearance is linearized by finite differences and
/// the step closest to the target that satisfies all linearized constraints
/// is found exactly. The step is halved until the predicate accepts it.
#[derive(Debug, Clone, Copy)]
pub struct SqpProjection {
    iterations: usize,
    max_backtracks: usize,
    margin: f64,
    fd_step: f64,
    budget: usize,
}

impl SqpProjection {
    /// Creates the solver from configuration.
    #[must_use]
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            iterations: config.sqp_iterations,
            max_backtracks: config.max_backtracks,
            margin: config.clearance_margin,
            fd_step: config.fd_step,
            budget: config.max_evaluations,
        }
    }

    fn linearize(&self, eval: &Evaluator<'_>, x: Point2) -> Vec<HalfPlane> {
        let problem = eval.problem();
        let clear = |p: Point2| problem.obstacles.clearances(&(problem.build)(p));
        let h = self.fd_step;
        let g0 = clear(x);
        let gx = clear(x + Vector2::new(h, 0.0));
        let gy = clear(x + Vector2::new(0.0, h));

        g0.iter()
            .zip(gx.iter().zip(&gy))
            .filter_map(|(c, (cx, cy))| {
                let a = Vector2::new((cx - c) / h, (cy - c) / h);
                (a.norm() > 1e-9 && c.is_finite()).then_some(HalfPlane {
                    a,
                    b: self.margin.min(*c) - c,
                })
            })
            .collect()
    }
}

/// Minimizes `|s - target|` subject to the half-planes.
///
/// The optimum of a 2D QP lies at the unconstrained minimum, on one
/// constraint line, or at the intersection of two; all are enumerated.
fn solve_qp(target: Vector2, planes: &[HalfPlane]) -> Option<Vector2> {
    let mut candidates = vec![target];
    for p in planes {
        let shift = (p.b - p.a.dot(&target)) / p.a.norm_squared();
        candidates.push(target + p.a * shift);
    }
    for (i, p) in planes.iter().enumerate() {
        for q in &planes[i + 1..] {
            let m = Matrix2::new(p.a.x, p.a.y, q.a.x, q.a.y);
            if let Some(inv) = m.try_inverse() {
                candidates.push(inv * Vector2::new(p.b, q.b));
            }
        }
    }
    candidates
        .into_iter()
        .filter(|s| planes.iter().all(|p| p.holds(s)))
        .min_by(|a, b| (a - target).norm().total_cmp(&(b - target).norm()))
}

impl SnapSolver for SqpProjection {
    fn name(&self) -> &'static str {
        "sqp-projection"
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn search(&self, eval: &Evaluator<'_>) {
        let desired = eval.desired();
        let mut x = eval.best();

        for _ in 0..self.iterations {
            let radius = eval.distance(&x);
            if radius < 1e-9 || eval.exhausted() {
                break;
            }
            let planes = self.linearize(eval, x);
            let Some(mut step) = solve_qp(desired - x, &planes) else {
                break;
            };
            // Trust region: never overshoot the target distance.
            let len = step.norm();
            if len > radius {
                step *= radius / len;
            }
            if step.norm() < 1e-9 {
                break;
            }

            let mut moved = false;
            for _ in 0..=self.max_backtracks {
                let candidate = x + step;
                if eval.distance(&candidate) < eval.distance(&x) && eval.accepts(candidate) {
                    x = candidate;
                    moved = true;
                    break;
                }
                if eval.exhausted() {
                    break;
                }
                step *= 0.5;
            }
            if !moved {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_qp_hits_target() {
        let target = Vector2::new(3.0, 4.0);
        assert_eq!(solve_qp(target, &[]), Some(target));
    }

    #[test]
    fn single_constraint_projects() {
        // s.y >= 1
        let plane = HalfPlane {
            a: Vector2::new(0.0, 1.0),
            b: 1.0,
        };
        let s = solve_qp(Vector2::new(2.0, -3.0), &[plane]).unwrap_or_default();
        assert!((s.x - 2.0).abs() < 1e-12);
        assert!((s.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn corner_of_two_constraints() {
        // s.x <= 1 and s.y <= 1, target outside both.
        let planes = [
            HalfPlane {
                a: Vector2::new(-1.0, 0.0),
                b: -1.0,
            },
            HalfPlane {
                a: Vector2::new(0.0, -1.0),
                b: -1.0,
            },
        ];
        let s = solve_qp(Vector2::new(5.0, 5.0), &planes).unwrap_or_default();
        assert!((s.x - 1.0).abs() < 1e-12);
        assert!((s.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn infeasible_pair_has_no_solution() {
        // s.x >= 1 and s.x <= -1
        let planes = [
            HalfPlane {
                a: Vector2::new(1.0, 0.0),
                b: 1.0,
            },
            HalfPlane {
                a: Vector2::new(-1.0, 0.0),
                b: 1.0,
            },
        ];
        assert!(solve_qp(Vector2::new(0.0, 0.0), &planes).is_none());
    }
}
