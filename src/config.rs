use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::snapping::SnapStrategy;
use crate::tessellation::TessellationParams;
use crate::weave::WeaveStyle;

/// Tolerances used by the validity oracle and the symmetry deriver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Minimum gap between a finger's anchors and its order-neighbors' anchors.
    pub ordering_epsilon: f64,
    /// How far a finger's bounding box may leave the working square.
    pub bounds_tolerance: f64,
    /// Curves closer than this count as intersecting.
    pub intersection_tolerance: f64,
    /// Point tolerance for comparing symmetric partners.
    pub symmetry_tolerance: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            ordering_epsilon: 0.5,
            bounds_tolerance: 0.5,
            intersection_tolerance: 0.5,
            symmetry_tolerance: 1e-6,
        }
    }
}

/// Iteration counts and step controls for the snapping strategies.
///
/// Every strategy's oracle calls are bounded by these numbers and by
/// `max_evaluations`, whichever is hit first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Hard cap on predicate calls for one snap.
    pub max_evaluations: usize,
    /// Bisection steps along the last-valid to desired segment.
    pub ray_iterations: usize,
    /// Directions probed per round by the coarse pattern search.
    pub coarse_directions: usize,
    /// Rounds of the coarse pattern search.
    pub coarse_rounds: usize,
    /// Directions probed per round by the fine pattern search.
    pub fine_directions: usize,
    /// Rounds of the fine pattern search.
    pub fine_rounds: usize,
    /// Bisection steps used to resolve one pattern-search direction.
    pub pattern_ray_iterations: usize,
    /// Smallest pattern-search step, in square units.
    pub min_step: f64,
    /// Gradient descent iterations.
    pub gradient_iterations: usize,
    /// SQP outer iterations.
    pub sqp_iterations: usize,
    /// Newton iterations.
    pub newton_iterations: usize,
    /// Step halvings tried before an iterate is abandoned.
    pub max_backtracks: usize,
    /// Weight of the clearance penalty in the smooth objectives.
    pub penalty_weight: f64,
    /// Clearance below which an obstacle starts to contribute.
    pub clearance_margin: f64,
    /// Finite-difference step used for gradients and Jacobians.
    pub fd_step: f64,
    /// Diagonal added to the Newton Hessian.
    pub newton_regularization: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 400,
            ray_iterations: 8,
            coarse_directions: 8,
            coarse_rounds: 10,
            fine_directions: 32,
            fine_rounds: 3,
            pattern_ray_iterations: 4,
            min_step: 0.25,
            gradient_iterations: 24,
            sqp_iterations: 12,
            newton_iterations: 16,
            max_backtracks: 6,
            penalty_weight: 40.0,
            clearance_margin: 2.0,
            fd_step: 1e-3,
            newton_regularization: 1e-3,
        }
    }
}

/// Complete configuration of the editor core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Width of one strip; the working square side is `grid_size * strip_width`.
    pub strip_width: f64,
    /// Solver used for drags until changed.
    pub strategy: SnapStrategy,
    pub oracle: OracleConfig,
    pub solver: SolverConfig,
    pub tessellation: TessellationParams,
    pub style: WeaveStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            strip_width: 50.0,
            strategy: SnapStrategy::default(),
            oracle: OracleConfig::default(),
            solver: SolverConfig::default(),
            tessellation: TessellationParams::default(),
            style: WeaveStyle::default(),
        }
    }
}

impl EditorConfig {
    /// Parses a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Invalid` for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Serialize` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    /// Loads a TOML file, falling back to defaults when it is missing or broken.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "configuration loaded");
                    config
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "configuration rejected, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("strip_width", self.strip_width),
            ("oracle.intersection_tolerance", self.oracle.intersection_tolerance),
            ("solver.min_step", self.solver.min_step),
            ("solver.fd_step", self.solver.fd_step),
            ("tessellation.tolerance", self.tessellation.tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")).into());
            }
        }
        let non_negative = [
            ("oracle.ordering_epsilon", self.oracle.ordering_epsilon),
            ("oracle.bounds_tolerance", self.oracle.bounds_tolerance),
            ("oracle.symmetry_tolerance", self.oracle.symmetry_tolerance),
            ("solver.penalty_weight", self.solver.penalty_weight),
            ("solver.clearance_margin", self.solver.clearance_margin),
            ("solver.newton_regularization", self.solver.newton_regularization),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must not be negative, got {value}")).into());
            }
        }
        if self.solver.max_evaluations == 0 {
            return Err(ConfigError::Invalid("solver.max_evaluations must be at least 1".to_owned()).into());
        }
        if self.solver.coarse_directions < 3 || self.solver.fine_directions < 3 {
            return Err(ConfigError::Invalid("pattern search needs at least 3 directions".to_owned()).into());
        }
        if self.tessellation.min_segments == 0 || self.tessellation.min_segments > self.tessellation.max_segments {
            return Err(ConfigError::Invalid("tessellation segment bounds are inconsistent".to_owned()).into());
        }
        Ok(())
    }
}
