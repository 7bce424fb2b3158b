//! Surgery model.
//!
//! A surgery is the unit of work to schedule: one room, one doctor, one day.
//! Its duration is stochastic and known only through its mean and standard
//! deviation.
//!
//! # Resource-dependent durations
//! By default the duration is intrinsic to the surgery. An instance may
//! supply per-(room, doctor) overrides; when present they replace the
//! intrinsic moments for that pair only.

use serde::{Deserialize, Serialize};

/// A surgery to be scheduled.
///
/// # Time Representation
/// Durations are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surgery {
    /// Unique surgery identifier.
    pub id: String,
    /// Type category (e.g., "Small", "Large"); informational.
    #[serde(default, alias = "type")]
    pub category: String,
    /// Specialty required from both the room and the doctor.
    pub specialty: String,
    /// Mean duration (minutes).
    #[serde(alias = "mu")]
    pub duration_mean: f64,
    /// Standard deviation of the duration (minutes).
    #[serde(alias = "sigma")]
    pub duration_std: f64,
    /// Per-(room, doctor) duration moments.
    #[serde(default)]
    pub duration_overrides: Vec<DurationOverride>,
}

/// Duration moments for a specific room and doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationOverride {
    /// Room identifier.
    pub room_id: String,
    /// Doctor identifier.
    pub doctor_id: String,
    /// Mean duration (minutes).
    pub mean: f64,
    /// Standard deviation (minutes).
    pub std: f64,
}

impl Surgery {
    /// Creates a surgery with intrinsic duration moments.
    pub fn new(id: impl Into<String>, specialty: impl Into<String>, mean: f64, std: f64) -> Self {
        Self {
            id: id.into(),
            category: String::new(),
            specialty: specialty.into(),
            duration_mean: mean,
            duration_std: std,
            duration_overrides: Vec::new(),
        }
    }

    /// Sets the type category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Adds a per-(room, doctor) duration override.
    pub fn with_override(
        mut self,
        room_id: impl Into<String>,
        doctor_id: impl Into<String>,
        mean: f64,
        std: f64,
    ) -> Self {
        self.duration_overrides.push(DurationOverride {
            room_id: room_id.into(),
            doctor_id: doctor_id.into(),
            mean,
            std,
        });
        self
    }

    /// Whether any override exists.
    pub fn has_overrides(&self) -> bool {
        !self.duration_overrides.is_empty()
    }

    /// Duration moments `(mean, std)` in the given room with the given doctor.
    pub fn moments_for(&self, room_id: &str, doctor_id: &str) -> (f64, f64) {
        self.duration_overrides
            .iter()
            .find(|o| o.room_id == room_id && o.doctor_id == doctor_id)
            .map(|o| (o.mean, o.std))
            .unwrap_or((self.duration_mean, self.duration_std))
    }
}
