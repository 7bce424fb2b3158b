//! Error taxonomy.
//!
//! Parameter and structural errors are unrecoverable for a compilation and
//! are surfaced immediately. Pre-check violations are advisory and only
//! become an error when the scheduler façade is asked to solve without an
//! explicit override. Solver outcomes (infeasible, timed out) are not errors;
//! see [`crate::solver::SolveOutcome`].

use thiserror::Error;

use crate::eligibility::StructuralIssue;
use crate::precheck::FeasibilityVerdict;
use crate::validation::ValidationError;

/// Errors raised while loading, validating, or compiling an instance.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed alpha, epsilon, duration, cost, cap, or hours input.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// Instance integrity problems, collected exhaustively.
    #[error("instance failed validation with {} error(s): {}", .0.len(), join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// At least one surgery has no legal (room, doctor, day) choice.
    #[error("structurally infeasible: {}", join_issues(.0))]
    StructuralInfeasibility(Vec<StructuralIssue>),

    /// Necessary feasibility conditions failed and no override was given.
    #[error("feasibility pre-check failed with {} violation(s)", .0.violation_count())]
    PrecheckFailed(Box<FeasibilityVerdict>),

    /// The solver backend failed for a reason other than infeasibility.
    #[error("solver backend error: {0}")]
    Solver(String),

    /// Instance or configuration document could not be parsed.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ScheduleError {
    /// Shorthand for [`ScheduleError::InvalidParameter`].
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_issues(issues: &[StructuralIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = ScheduleError::invalid("alpha", "must lie strictly in (0, 1), got 1.5");
        assert_eq!(
            err.to_string(),
            "invalid parameter `alpha`: must lie strictly in (0, 1), got 1.5"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ScheduleError = parsed.unwrap_err().into();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }
}
