//! Resource models: operating rooms and doctors.
//!
//! Both resources are disjunctive (one surgery at a time) and restricted to
//! a set of specialties. Doctors additionally carry a per-day working
//! capacity in minutes.
//!
//! # Reference
//! Cardoen, Demeulemeester & Beliën (2010), "Operating room planning and
//! scheduling: A literature review", EJOR 201(3)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Day;

/// An operating room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Specialties this room can host.
    #[serde(alias = "types")]
    pub specialties: Vec<String>,
}

/// A surgeon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    /// Unique doctor identifier.
    pub id: String,
    /// Specialties this doctor performs.
    pub specialties: Vec<String>,
    /// Working minutes per day (day id → minutes).
    ///
    /// A day absent from the map falls back to that day's regular hours.
    /// Zero means the doctor does not work that day.
    #[serde(default)]
    pub daily_capacity: BTreeMap<String, f64>,
}

impl Room {
    /// Creates a room with no specialties.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            specialties: Vec::new(),
        }
    }

    /// Adds a hosted specialty.
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialties.push(specialty.into());
        self
    }

    /// Whether the room hosts a specialty.
    pub fn hosts(&self, specialty: &str) -> bool {
        self.specialties.iter().any(|s| s == specialty)
    }
}

impl Doctor {
    /// Creates a doctor with no specialties and default capacity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            specialties: Vec::new(),
            daily_capacity: BTreeMap::new(),
        }
    }

    /// Adds a specialty.
    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialties.push(specialty.into());
        self
    }

    /// Sets the capacity for one day.
    pub fn with_capacity(mut self, day_id: impl Into<String>, minutes: f64) -> Self {
        self.daily_capacity.insert(day_id.into(), minutes);
        self
    }

    /// Whether the doctor performs a specialty.
    pub fn performs(&self, specialty: &str) -> bool {
        self.specialties.iter().any(|s| s == specialty)
    }

    /// Working minutes on a day.
    pub fn capacity_on(&self, day: &Day) -> f64 {
        self.daily_capacity
            .get(&day.id)
            .copied()
            .unwrap_or(day.regular_minutes)
    }

    /// Whether the doctor works on a day.
    pub fn works_on(&self, day: &Day) -> bool {
        self.capacity_on(day) > 0.0
    }
}
