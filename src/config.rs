//! Compiler and solver configuration.
//!
//! Both configurations deserialize from JSON with every field optional
//! (missing fields take the documented defaults) and offer builder methods
//! in the style of the domain models. Call `validate` before use; the
//! scheduler façade does this for you.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::AlphaSet;

/// Which sequencing formulation the compiler emits.
///
/// All variants share assignment, capacity, reliability, and objective
/// constraints and describe the same feasible region on the original
/// decision variables. They differ in LP relaxation tightness and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulationVariant {
    /// Independent order binaries with a double Big-M deactivation.
    Base,
    /// McCormick AND of the two assignment indicators, single pair-specific Big-M.
    #[default]
    Strengthened,
    /// McCormick envelope of (order indicator × start-time difference).
    Perspective,
}

impl FormulationVariant {
    /// All variants, loosest first.
    pub const ALL: [FormulationVariant; 3] = [
        FormulationVariant::Base,
        FormulationVariant::Strengthened,
        FormulationVariant::Perspective,
    ];

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Strengthened => "strengthened",
            Self::Perspective => "perspective",
        }
    }
}

/// Granularity of the log-product reliability constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReliabilityScope {
    /// One cut per (day, room) and one per (day, doctor).
    #[default]
    Resource,
    /// One cut per day over every surgery held that day.
    Day,
}

/// Parameters of the model compiler and the feasibility pre-checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Discrete reliability levels a surgery may be buffered at.
    pub alphas: AlphaSet,
    /// Maximum probability that a resource-day exceeds its buffered plan.
    pub epsilon: f64,
    /// Per-day epsilon overrides (day id → epsilon).
    pub epsilon_by_day: BTreeMap<String, f64>,
    /// Granularity of the reliability cut.
    pub reliability_scope: ReliabilityScope,
    /// Cost per minute of room overtime.
    pub room_overtime_cost: f64,
    /// Cost per minute of doctor overtime.
    pub doctor_overtime_cost: f64,
    /// Hard cap on room overtime per day (minutes). `None` = uncapped.
    pub max_room_overtime: Option<f64>,
    /// Hard cap on doctor overtime per day (minutes). `None` = uncapped.
    pub max_doctor_overtime: Option<f64>,
    /// Objective weight on start times; prefers earlier starts among ties.
    pub start_time_weight: f64,
    /// Sequencing formulation.
    pub variant: FormulationVariant,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            alphas: AlphaSet::default(),
            epsilon: 0.25,
            epsilon_by_day: BTreeMap::new(),
            reliability_scope: ReliabilityScope::Resource,
            room_overtime_cost: 3.0,
            doctor_overtime_cost: 1.5,
            max_room_overtime: Some(120.0),
            max_doctor_overtime: Some(60.0),
            start_time_weight: 0.001,
            variant: FormulationVariant::Strengthened,
        }
    }
}

impl CompilerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ScheduleError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the alpha levels.
    pub fn with_alphas(mut self, alphas: AlphaSet) -> Self {
        self.alphas = alphas;
        self
    }

    /// Sets the default epsilon.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Overrides epsilon for one day.
    pub fn with_day_epsilon(mut self, day_id: impl Into<String>, epsilon: f64) -> Self {
        self.epsilon_by_day.insert(day_id.into(), epsilon);
        self
    }

    /// Sets the reliability scope.
    pub fn with_reliability_scope(mut self, scope: ReliabilityScope) -> Self {
        self.reliability_scope = scope;
        self
    }

    /// Sets the overtime unit costs (room, doctor).
    pub fn with_overtime_costs(mut self, room: f64, doctor: f64) -> Self {
        self.room_overtime_cost = room;
        self.doctor_overtime_cost = doctor;
        self
    }

    /// Sets the overtime caps (room, doctor). `None` = uncapped.
    pub fn with_overtime_caps(mut self, room: Option<f64>, doctor: Option<f64>) -> Self {
        self.max_room_overtime = room;
        self.max_doctor_overtime = doctor;
        self
    }

    /// Sets the start-time tie-breaking weight.
    pub fn with_start_time_weight(mut self, weight: f64) -> Self {
        self.start_time_weight = weight;
        self
    }

    /// Sets the formulation variant.
    pub fn with_variant(mut self, variant: FormulationVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Epsilon in force for a day.
    pub fn epsilon_for(&self, day_id: &str) -> f64 {
        self.epsilon_by_day
            .get(day_id)
            .copied()
            .unwrap_or(self.epsilon)
    }

    /// Largest epsilon over the given days (the most lenient one).
    pub fn max_epsilon<'a>(&self, day_ids: impl IntoIterator<Item = &'a str>) -> f64 {
        day_ids
            .into_iter()
            .map(|d| self.epsilon_for(d))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Checks every numeric parameter.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        check_probability("epsilon", self.epsilon)?;
        for (day, eps) in &self.epsilon_by_day {
            check_probability(&format!("epsilon_by_day[{day}]"), *eps)?;
        }
        check_non_negative("room_overtime_cost", self.room_overtime_cost)?;
        check_non_negative("doctor_overtime_cost", self.doctor_overtime_cost)?;
        check_non_negative("start_time_weight", self.start_time_weight)?;
        if let Some(cap) = self.max_room_overtime {
            check_non_negative("max_room_overtime", cap)?;
        }
        if let Some(cap) = self.max_doctor_overtime {
            check_non_negative("max_doctor_overtime", cap)?;
        }
        Ok(())
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), ScheduleError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ScheduleError::invalid(
            name,
            format!("must lie strictly in (0, 1), got {value}"),
        ))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ScheduleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ScheduleError::invalid(
            name,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

/// Largest accepted solver time limit (seconds, about 31 years).
pub const MAX_TIME_LIMIT_SECS: f64 = 1e9;

/// Solver call parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for one solve attempt (seconds).
    pub time_limit_secs: f64,
    /// Target relative optimality gap.
    pub mip_gap: f64,
    /// Extra attempts with a relaxed budget after a timeout without incumbent.
    pub retries: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 900.0,
            mip_gap: 0.15,
            retries: 0,
        }
    }
}

impl SolverConfig {
    /// Creates the default solver configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs_f64();
        self
    }

    /// Sets the optimality gap.
    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = gap;
        self
    }

    /// Sets the number of relaxed retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Time limit as a `Duration`, saturating at [`MAX_TIME_LIMIT_SECS`].
    pub fn time_limit(&self) -> Duration {
        let secs = self.time_limit_secs.clamp(0.0, MAX_TIME_LIMIT_SECS);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    /// Configuration for the next retry: twice the time, twice the gap (capped at 1).
    pub fn relaxed(&self) -> Self {
        Self {
            time_limit_secs: (self.time_limit_secs * 2.0).min(MAX_TIME_LIMIT_SECS),
            mip_gap: (self.mip_gap * 2.0).min(1.0),
            retries: self.retries.saturating_sub(1),
        }
    }

    /// Checks the time limit and gap.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(self.time_limit_secs > 0.0 && self.time_limit_secs <= MAX_TIME_LIMIT_SECS) {
            return Err(ScheduleError::invalid(
                "time_limit_secs",
                format!(
                    "must lie in (0, {MAX_TIME_LIMIT_SECS}], got {}",
                    self.time_limit_secs
                ),
            ));
        }
        if !(self.mip_gap.is_finite() && (0.0..=1.0).contains(&self.mip_gap)) {
            return Err(ScheduleError::invalid(
                "mip_gap",
                format!("must lie in [0, 1], got {}", self.mip_gap),
            ));
        }
        Ok(())
    }
}
