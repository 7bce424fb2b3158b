//! Buffered durations via Cantelli's one-sided inequality.
//!
//! For a duration with mean μ and standard deviation σ, reserving
//!
//! ```text
//! δ(α) = μ + σ · √((1 − α) / α)
//! ```
//!
//! minutes guarantees `P(duration > δ) ≤ α` for any distribution with those
//! two moments. Smaller α means a larger buffer.
//!
//! # Reference
//! Cantelli (1928), "Sui confini della probabilità", Atti del Congresso
//! Internazionale dei Matematici

use tracing::debug;

use crate::eligibility::EligibilityIndex;
use crate::error::ScheduleError;
use crate::models::{AlphaSet, Instance};

/// Cantelli multiplier `√((1 − α) / α)`.
///
/// # Errors
/// `InvalidParameter` unless `0 < α < 1`.
pub fn cantelli_multiplier(alpha: f64) -> Result<f64, ScheduleError> {
    if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
        return Err(ScheduleError::invalid(
            "alpha",
            format!("must lie strictly in (0, 1), got {alpha}"),
        ));
    }
    Ok(((1.0 - alpha) / alpha).sqrt())
}

/// Buffered duration `μ + σ · √((1 − α) / α)`.
///
/// # Errors
/// `InvalidParameter` for α outside (0, 1), a non-finite or negative mean,
/// or a negative standard deviation.
pub fn cantelli_buffer(mean: f64, std: f64, alpha: f64) -> Result<f64, ScheduleError> {
    if !(mean.is_finite() && mean >= 0.0) {
        return Err(ScheduleError::invalid(
            "duration_mean",
            format!("must be finite and non-negative, got {mean}"),
        ));
    }
    if !(std.is_finite() && std >= 0.0) {
        return Err(ScheduleError::invalid(
            "duration_std",
            format!("must be finite and non-negative, got {std}"),
        ));
    }
    let m = cantelli_multiplier(alpha)?;
    if std == 0.0 {
        return Ok(mean);
    }
    Ok(mean + std * m)
}

/// Smallest α whose buffer fits within `limit` minutes.
///
/// Every α in `[result, 1)` satisfies `δ(α) ≤ limit`. Returns `None` when
/// no α in (0, 1) fits, and `Some(0.0)` when every α fits.
pub fn alpha_to_fit(mean: f64, std: f64, limit: f64) -> Option<f64> {
    let slack = limit - mean;
    if slack < 0.0 {
        return None;
    }
    if std == 0.0 {
        return Some(0.0);
    }
    if slack == 0.0 {
        return None;
    }
    let q = (slack / std).powi(2);
    Some(1.0 / (1.0 + q))
}

/// Buffered durations for every eligible triple and alpha level.
///
/// Surgeries without duration overrides are computed once per
/// (surgery, alpha) and shared by all of their triples.
#[derive(Debug, Clone)]
pub struct BufferTable {
    /// `[triple * levels + t]`
    values: Vec<f64>,
    levels: usize,
    min_by_surgery: Vec<f64>,
    max_by_surgery: Vec<f64>,
}

impl BufferTable {
    /// Computes the table.
    ///
    /// # Errors
    /// `InvalidParameter` if any duration moment is malformed.
    pub fn build(
        instance: &Instance,
        eligibility: &EligibilityIndex,
        alphas: &AlphaSet,
    ) -> Result<Self, ScheduleError> {
        let levels = alphas.len();
        let mut values = vec![0.0; eligibility.triples().len() * levels];
        let mut min_by_surgery = vec![f64::INFINITY; instance.surgeries.len()];
        let mut max_by_surgery = vec![0.0_f64; instance.surgeries.len()];
        let largest = alphas.largest_index();

        let mut computed = 0usize;
        for (j, surgery) in instance.surgeries.iter().enumerate() {
            let intrinsic = if surgery.has_overrides() {
                None
            } else {
                computed += levels;
                Some(buffers_for(surgery.duration_mean, surgery.duration_std, alphas)?)
            };

            for (id, triple) in eligibility.for_surgery(j) {
                let row = &mut values[id * levels..(id + 1) * levels];
                match &intrinsic {
                    Some(shared) => row.copy_from_slice(shared),
                    None => {
                        let (mean, std) = surgery.moments_for(
                            &instance.rooms[triple.room].id,
                            &instance.doctors[triple.doctor].id,
                        );
                        computed += levels;
                        row.copy_from_slice(&buffers_for(mean, std, alphas)?);
                    }
                }
                min_by_surgery[j] = min_by_surgery[j].min(row[largest]);
                max_by_surgery[j] = max_by_surgery[j].max(row[0]);
            }
        }

        debug!(
            triples = eligibility.triples().len(),
            levels,
            computed,
            "buffer table built"
        );

        Ok(Self {
            values,
            levels,
            min_by_surgery,
            max_by_surgery,
        })
    }

    /// Buffered duration of a triple at alpha index `t`.
    pub fn get(&self, triple: usize, t: usize) -> f64 {
        self.values[triple * self.levels + t]
    }

    /// All levels of a triple, ascending alpha (descending duration).
    pub fn for_triple(&self, triple: usize) -> &[f64] {
        &self.values[triple * self.levels..(triple + 1) * self.levels]
    }

    /// Smallest buffer of a surgery: largest alpha, best triple.
    ///
    /// Infinite for a surgery without eligible triples.
    pub fn min_for_surgery(&self, surgery: usize) -> f64 {
        self.min_by_surgery[surgery]
    }

    /// Largest buffer of a surgery: smallest alpha, worst triple.
    pub fn max_for_surgery(&self, surgery: usize) -> f64 {
        self.max_by_surgery[surgery]
    }

    /// Sum of the largest buffers; bounds any useful overtime.
    pub fn total_max_work(&self) -> f64 {
        self.max_by_surgery.iter().sum()
    }
}

fn buffers_for(mean: f64, std: f64, alphas: &AlphaSet) -> Result<Vec<f64>, ScheduleError> {
    alphas
        .levels()
        .iter()
        .map(|&a| cantelli_buffer(mean, std, a))
        .collect()
}
