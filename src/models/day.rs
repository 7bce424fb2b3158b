//! Planning day.
//!
//! Every room opens at minute 0 of a day and has `regular_minutes` of
//! regular hours; work past that point is overtime.

use serde::{Deserialize, Serialize};

/// A planning day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// Unique day identifier.
    pub id: String,
    /// Regular-hours budget H (minutes).
    #[serde(alias = "H")]
    pub regular_minutes: f64,
}

impl Day {
    /// Creates a day.
    pub fn new(id: impl Into<String>, regular_minutes: f64) -> Self {
        Self {
            id: id.into(),
            regular_minutes,
        }
    }
}
