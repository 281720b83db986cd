//! Comparison policies

use std::fmt;

use judge_core::{JudgeError, Result};
use serde::{Deserialize, Serialize};

/// Rule set governing how expected and actual output are compared.
/// Chosen per test case and fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ComparisonPolicy {
    /// Token sequences must be identical
    #[default]
    ExactToken,
    /// Trimmed answer lines must be identical; token-equal output with a
    /// different layout is a presentation error
    Lines,
    /// Tokens compared as real numbers, passing within either bound
    NumericTolerance { abs_eps: f64, rel_eps: f64 },
}

impl ComparisonPolicy {
    pub fn tolerance(abs_eps: f64, rel_eps: f64) -> Self {
        ComparisonPolicy::NumericTolerance { abs_eps, rel_eps }
    }

    /// Same bound for absolute and relative error, e.g. `1e-6`
    pub fn within(eps: f64) -> Self {
        Self::tolerance(eps, eps)
    }

    pub fn validate(&self) -> Result<()> {
        if let ComparisonPolicy::NumericTolerance { abs_eps, rel_eps } = *self {
            for (name, eps) in [("absolute", abs_eps), ("relative", rel_eps)] {
                if !eps.is_finite() || eps < 0.0 {
                    return Err(JudgeError::InvalidConfig(format!(
                        "{} tolerance must be a finite non-negative number, got {}",
                        name, eps
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComparisonPolicy::ExactToken => "exact-token",
            ComparisonPolicy::Lines => "lines",
            ComparisonPolicy::NumericTolerance { .. } => "numeric-tolerance",
        }
    }
}

impl fmt::Display for ComparisonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonPolicy::NumericTolerance { abs_eps, rel_eps } => {
                write!(f, "{} (abs {:e}, rel {:e})", self.name(), abs_eps, rel_eps)
            }
            _ => f.write_str(self.name()),
        }
    }
}
