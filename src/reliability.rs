//! Log-product linearization of the joint reliability constraint.
//!
//! Surgeries sharing a resource-day are each buffered at some alpha level.
//! Requiring the product of their individual non-exceedance probabilities to
//! stay above `1 − ε`
//!
//! ```text
//! Π (1 − α_t) ≥ 1 − ε
//! ```
//!
//! becomes linear after taking logarithms:
//!
//! ```text
//! Σ ln(1 − α_t) · w_t ≥ ln(1 − ε)
//! ```
//!
//! Both sides are negative; every selected surgery consumes part of the
//! budget `ln(1 − ε)`.
//!
//! # Reference
//! Charnes & Cooper (1959), "Chance-constrained programming", Management
//! Science 6(1)

use crate::error::ScheduleError;
use crate::models::AlphaSet;

/// `ln(1 − α)`; the (negative) budget one surgery at level α consumes.
pub fn log_survival(alpha: f64) -> f64 {
    (-alpha).ln_1p()
}

/// Coefficients and right-hand side of one reliability cut.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityCut {
    coefficients: Vec<f64>,
    rhs: f64,
}

impl ReliabilityCut {
    /// Builds the cut for an alpha set and a tolerance ε.
    ///
    /// # Errors
    /// `InvalidParameter` unless `0 < ε < 1`.
    pub fn new(alphas: &AlphaSet, epsilon: f64) -> Result<Self, ScheduleError> {
        if !(epsilon.is_finite() && epsilon > 0.0 && epsilon < 1.0) {
            return Err(ScheduleError::invalid(
                "epsilon",
                format!("must lie strictly in (0, 1), got {epsilon}"),
            ));
        }
        Ok(Self {
            coefficients: alphas.levels().iter().map(|&a| log_survival(a)).collect(),
            rhs: log_survival(epsilon),
        })
    }

    /// Coefficient of a choice buffered at alpha index `t`.
    pub fn coefficient(&self, t: usize) -> f64 {
        self.coefficients[t]
    }

    /// All coefficients, by alpha index.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Right-hand side `ln(1 − ε)`.
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Left-hand side minus right-hand side for the given alpha indices.
    pub fn slack(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|&t| self.coefficients[t]).sum::<f64>() - self.rhs
    }

    /// Whether surgeries at the given alpha indices may share a resource-day.
    pub fn is_satisfied_by(&self, selected: &[usize]) -> bool {
        self.slack(selected) >= -1e-12
    }
}

/// Tolerance reached by `k` surgeries all at level α: `1 − (1 − α)^k`.
pub fn joint_exceedance(alpha: f64, k: usize) -> f64 {
    1.0 - (1.0 - alpha).powi(k as i32)
}

/// Largest α such that `k` surgeries at that level satisfy tolerance ε:
/// `1 − (1 − ε)^(1/k)`.
pub fn alpha_for_sharing(epsilon: f64, k: usize) -> f64 {
    1.0 - (1.0 - epsilon).powf(1.0 / k.max(1) as f64)
}
