//! Reliability levels.
//!
//! An alpha level is the per-surgery probability that the actual duration
//! exceeds its buffered allowance. Smaller alpha means a larger buffer.

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Default alpha levels, ascending.
pub const DEFAULT_ALPHAS: [f64; 7] = [0.005, 0.008, 0.01, 0.02, 0.03, 0.05, 0.10];

/// An ordered, deduplicated set of alpha levels, each strictly in (0, 1).
///
/// Index `0` is the smallest alpha (largest buffer, loosest for the
/// reliability cut); the last index is the largest alpha (smallest buffer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct AlphaSet {
    levels: Vec<f64>,
}

impl AlphaSet {
    /// Builds a set from arbitrary-order levels.
    ///
    /// # Errors
    /// `InvalidParameter` if the set is empty or any level lies outside (0, 1).
    pub fn new(levels: impl IntoIterator<Item = f64>) -> Result<Self, ScheduleError> {
        let mut levels: Vec<f64> = levels.into_iter().collect();
        if levels.is_empty() {
            return Err(ScheduleError::invalid("alphas", "at least one level is required"));
        }
        if let Some(bad) = levels
            .iter()
            .find(|a| !(a.is_finite() && **a > 0.0 && **a < 1.0))
        {
            return Err(ScheduleError::invalid(
                "alphas",
                format!("every level must lie strictly in (0, 1), got {bad}"),
            ));
        }
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        Ok(Self { levels })
    }

    /// Levels in ascending order.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at index `t`.
    pub fn get(&self, t: usize) -> f64 {
        self.levels[t]
    }

    /// Smallest alpha (largest buffer).
    pub fn smallest(&self) -> f64 {
        self.levels[0]
    }

    /// Largest alpha (smallest buffer).
    pub fn largest(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    /// Index of the largest alpha.
    pub fn largest_index(&self) -> usize {
        self.levels.len() - 1
    }

    /// Iterates `(index, alpha)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.levels.iter().copied().enumerate()
    }
}

impl Default for AlphaSet {
    fn default() -> Self {
        Self {
            levels: DEFAULT_ALPHAS.to_vec(),
        }
    }
}

impl TryFrom<Vec<f64>> for AlphaSet {
    type Error = ScheduleError;

    fn try_from(levels: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<AlphaSet> for Vec<f64> {
    fn from(set: AlphaSet) -> Self {
        set.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_deduplicated() {
        let set = AlphaSet::new([0.05, 0.01, 0.05, 0.1]).unwrap();
        assert_eq!(set.levels(), &[0.01, 0.05, 0.1]);
        assert_eq!(set.smallest(), 0.01);
        assert_eq!(set.largest(), 0.1);
        assert_eq!(set.largest_index(), 2);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(AlphaSet::new([0.0]).is_err());
        assert!(AlphaSet::new([1.0]).is_err());
        assert!(AlphaSet::new([0.1, -0.2]).is_err());
        assert!(AlphaSet::new(Vec::new()).is_err());
    }

    #[test]
    fn test_serde_roundtrip_through_vec() {
        let set: AlphaSet = serde_json::from_str("[0.1, 0.02]").unwrap();
        assert_eq!(set.levels(), &[0.02, 0.1]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[0.02,0.1]");
    }
}
