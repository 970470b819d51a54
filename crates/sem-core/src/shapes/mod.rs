//! Radial shape functions `q(d̂, σ)` that give each eddy its footprint, and
//! the name → [`Shape`] registry used at the CLI boundary.
//!
//! `Shape` is a closed sum type rather than a mutable global function
//! pointer: callers carry the active shape explicitly (see
//! [`crate::field::EvaluationContext`]) instead of mutating process-wide
//! state mid-evaluation.

use crate::error::{CoreError, CoreResult};

/// Precomputed normalization constant so the 1D Gaussian integral matches
/// the quadratic shape's under the SEM convention. Keep exact; do not
/// re-derive it at call sites.
pub const GAUSSIAN_C: f64 = 3.6276;
pub const HALF_PI: f64 = std::f64::consts::FRAC_PI_2;

/// Default global cut-off (in units of σ) for shapes that honor one.
pub const DEFAULT_CUTOFF: f64 = 2.0;

/// An active radial shape function, carried by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// `C · exp(-(π/2) d̂²)` for `d̂ < cutoff`, else 0.
    Gaussian { cutoff: f64 },
    /// `σ · (1 - d̂)²` for `d̂ < 1`, else 0. Cut-off is intrinsic.
    Quadratic,
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Gaussian { cutoff: DEFAULT_CUTOFF }
    }
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Gaussian { .. } => "gaussian",
            Shape::Quadratic => "quadratic",
        }
    }

    /// The cut-off radius (in units of σ) beyond which `q` is identically zero.
    pub fn cutoff(&self) -> f64 {
        match self {
            Shape::Gaussian { cutoff } => *cutoff,
            Shape::Quadratic => 1.0,
        }
    }

    /// Set the global cut-off for shapes that honor one (`gaussian`).
    /// No-op for shapes with an intrinsic cut-off (`quadratic`).
    pub fn with_cutoff(self, cutoff: f64) -> CoreResult<Shape> {
        if !(cutoff > 0.0) {
            return Err(CoreError::InvalidConfig("cut-off must be positive".into()));
        }
        Ok(match self {
            Shape::Gaussian { .. } => Shape::Gaussian { cutoff },
            Shape::Quadratic => Shape::Quadratic,
        })
    }

    /// Evaluate `q(d̂, σ)`. Pure, side-effect free, called once per
    /// (grid node, eddy) pair from [`crate::tile::TileEvaluator`].
    #[inline]
    pub fn eval(&self, d_hat: f64, sigma: f64) -> f64 {
        match self {
            Shape::Gaussian { cutoff } => {
                if d_hat < *cutoff {
                    GAUSSIAN_C * (-HALF_PI * d_hat * d_hat).exp()
                } else {
                    0.0
                }
            }
            Shape::Quadratic => {
                if d_hat < 1.0 {
                    sigma * (1.0 - d_hat).powi(2)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Resolves shape names from the CLI boundary into [`Shape`] values. The
/// core itself never parses a string; `sem-cli` is the only caller.
pub struct ShapeRegistry;

impl ShapeRegistry {
    pub const NAMES: [&'static str; 2] = ["gaussian", "quadratic"];

    /// Build the named shape with the default cut-off for shapes that have one.
    pub fn by_name(name: &str) -> CoreResult<Shape> {
        match name {
            "gaussian" => Ok(Shape::Gaussian { cutoff: DEFAULT_CUTOFF }),
            "quadratic" => Ok(Shape::Quadratic),
            other => Err(CoreError::UnknownShape(other.to_string())),
        }
    }

    pub fn names() -> &'static [&'static str] {
        &Self::NAMES
    }
}
