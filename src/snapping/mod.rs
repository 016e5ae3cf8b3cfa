//! Control-point snapping.
//!
//! Every solver moves a dragged control point from its last valid position
//! towards the pointer, using the validity predicate as a black box. The
//! [`Evaluator`] counts predicate calls against a hard budget and remembers
//! the closest accepted point; solvers only ever return that point, so a
//! rejected position can never leak out.

mod gradient;
mod newton;
mod obstacles;
mod pattern;
mod ray;
mod sqp;

pub use gradient::ProjectedGradient;
pub use newton::PenalizedNewton;
pub use obstacles::{Obstacle, ObstacleField};
pub use pattern::PatternSearch;
pub use ray::RayBisection;
pub use sqp::SqpProjection;

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::SolverConfig;
use crate::geometry::Finger;
use crate::math::{Matrix2, Point2, Vector2};

/// Inputs of one snap.
pub struct SnapProblem<'p> {
    /// Builds the full candidate finger for a trial control-point position.
    pub build: &'p dyn Fn(Point2) -> Finger,
    /// Validity predicate; usually the oracle wrapped around the symmetry deriver.
    pub is_valid: &'p dyn Fn(&Finger) -> bool,
    /// Last position known to validate.
    pub last_valid: Point2,
    /// Where the pointer wants the point to be.
    pub desired: Point2,
    /// Smooth view of the constraints for the gradient-based strategies.
    pub obstacles: &'p ObstacleField,
}

impl fmt::Debug for SnapProblem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapProblem")
            .field("last_valid", &self.last_valid)
            .field("desired", &self.desired)
            .finish_non_exhaustive()
    }
}

/// Result of one snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapOutcome {
    /// A position the predicate accepted (or the untouched last-valid one).
    pub position: Point2,
    /// Predicate calls spent.
    pub evaluations: usize,
    /// Whether the desired position was accepted outright.
    pub fast_path: bool,
}

/// Budgeted access to the validity predicate.
pub struct Evaluator<'p> {
    problem: &'p SnapProblem<'p>,
    budget: usize,
    calls: Cell<usize>,
    best: Cell<Point2>,
    best_distance: Cell<f64>,
}

impl<'p> Evaluator<'p> {
    /// Starts with `last_valid` as the best known point.
    #[must_use]
    pub fn new(problem: &'p SnapProblem<'p>, budget: usize) -> Self {
        Self {
            problem,
            budget,
            calls: Cell::new(0),
            best: Cell::new(problem.last_valid),
            best_distance: Cell::new((problem.last_valid - problem.desired).norm()),
        }
    }

    /// Tests `p`, remembering it if it is the closest accepted point so far.
    ///
    /// Returns `false` without calling the predicate once the budget is spent.
    pub fn accepts(&self, p: Point2) -> bool {
        if self.exhausted() || !(p.x.is_finite() && p.y.is_finite()) {
            return false;
        }
        self.calls.set(self.calls.get() + 1);
        let finger = (self.problem.build)(p);
        if !(self.problem.is_valid)(&finger) {
            return false;
        }
        let d = self.distance(&p);
        if d < self.best_distance.get() {
            self.best.set(p);
            self.best_distance.set(d);
        }
        true
    }

    /// Distance from `p` to the desired position.
    #[must_use]
    pub fn distance(&self, p: &Point2) -> f64 {
        (p - self.problem.desired).norm()
    }

    /// Closest accepted point so far.
    #[must_use]
    pub fn best(&self) -> Point2 {
        self.best.get()
    }

    /// Predicate calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Whether the budget is spent.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.calls.get() >= self.budget
    }

    /// The problem being solved.
    #[must_use]
    pub fn problem(&self) -> &'p SnapProblem<'p> {
        self.problem
    }

    /// The pointer position.
    #[must_use]
    pub fn desired(&self) -> Point2 {
        self.problem.desired
    }

    /// Penalized objective `|p - desired|² + weight * penalty(build(p))`.
    ///
    /// Does not call the predicate.
    #[must_use]
    pub fn objective(&self, p: Point2, weight: f64, margin: f64) -> f64 {
        let d2 = (p - self.problem.desired).norm_squared();
        if weight == 0.0 {
            return d2;
        }
        let finger = (self.problem.build)(p);
        d2 + weight * self.problem.obstacles.penalty(&finger, margin)
    }
}

/// A snapping strategy.
pub trait SnapSolver {
    /// Short identifier used in reports.
    fn name(&self) -> &'static str;

    /// Hard cap on predicate calls for one snap.
    fn budget(&self) -> usize;

    /// Moves towards the desired position through `eval`.
    ///
    /// Called only when `last_valid` validates and `desired` does not.
    fn search(&self, eval: &Evaluator<'_>);

    /// Runs the fast paths, then [`Self::search`].
    fn snap(&self, problem: &SnapProblem<'_>) -> SnapOutcome {
        let eval = Evaluator::new(problem, self.budget().max(2));
        if eval.accepts(problem.desired) {
            return SnapOutcome {
                position: problem.desired,
                evaluations: eval.calls(),
                fast_path: true,
            };
        }
        if !eval.accepts(problem.last_valid) {
            trace!(solver = self.name(), "last valid position no longer validates");
            return SnapOutcome {
                position: problem.last_valid,
                evaluations: eval.calls(),
                fast_path: false,
            };
        }
        self.search(&eval);
        trace!(solver = self.name(), calls = eval.calls(), "snap finished");
        SnapOutcome {
            position: eval.best(),
            evaluations: eval.calls(),
            fast_path: false,
        }
    }
}

/// Selectable snapping strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapStrategy {
    RayBisection,
    #[default]
    PatternSearchCoarse,
    PatternSearchFine,
    ProjectedGradient,
    SqpProjection,
    PenalizedNewton,
}

impl SnapStrategy {
    /// Every strategy, in report order.
    pub const ALL: [SnapStrategy; 6] = [
        SnapStrategy::RayBisection,
        SnapStrategy::PatternSearchCoarse,
        SnapStrategy::PatternSearchFine,
        SnapStrategy::ProjectedGradient,
        SnapStrategy::SqpProjection,
        SnapStrategy::PenalizedNewton,
    ];

    /// Instantiates the solver.
    #[must_use]
    pub fn solver(self, config: &SolverConfig) -> Box<dyn SnapSolver> {
        match self {
            Self::RayBisection => Box::new(RayBisection::new(config)),
            Self::PatternSearchCoarse => Box::new(PatternSearch::coarse(config)),
            Self::PatternSearchFine => Box::new(PatternSearch::fine(config)),
            Self::ProjectedGradient => Box::new(ProjectedGradient::new(config)),
            Self::SqpProjection => Box::new(SqpProjection::new(config)),
            Self::PenalizedNewton => Box::new(PenalizedNewton::new(config)),
        }
    }

    /// Identifier as used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RayBisection => "ray-bisection",
            Self::PatternSearchCoarse => "pattern-search-coarse",
            Self::PatternSearchFine => "pattern-search-fine",
            Self::ProjectedGradient => "projected-gradient",
            Self::SqpProjection => "sqp-projection",
            Self::PenalizedNewton => "penalized-newton",
        }
    }
}

impl fmt::Display for SnapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Central finite-difference gradient.
pub(crate) fn fd_gradient(f: &dyn Fn(Point2) -> f64, x: Point2, h: f64) -> Vector2 {
    let dx = Vector2::new(h, 0.0);
    let dy = Vector2::new(0.0, h);
    Vector2::new(
        (f(x + dx) - f(x - dx)) / (2.0 * h),
        (f(x + dy) - f(x - dy)) / (2.0 * h),
    )
}

/// Central finite-difference Hessian.
pub(crate) fn fd_hessian(f: &dyn Fn(Point2) -> f64, x: Point2, h: f64) -> Matrix2 {
    let dx = Vector2::new(h, 0.0);
    let dy = Vector2::new(0.0, h);
    let f0 = f(x);
    let fxx = (f(x + dx) - 2.0 * f0 + f(x - dx)) / (h * h);
    let fyy = (f(x + dy) - 2.0 * f0 + f(x - dy)) / (h * h);
    let fxy = (f(x + dx + dy) - f(x + dx - dy) - f(x - dx + dy) + f(x - dx - dy)) / (4.0 * h * h);
    Matrix2::new(fxx, fxy, fxy, fyy)
}
