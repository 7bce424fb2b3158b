//! Scheduling instance: the aggregate of surgeries, days, rooms, doctors.

use serde::{Deserialize, Serialize};
use std::io::Read;

use super::{Day, Doctor, Room, Surgery};
use crate::error::ScheduleError;
use crate::validation::validate_instance;

/// A complete operating-room scheduling instance.
///
/// Collections are positional: the compiler and the pre-checker refer to
/// surgeries, days, rooms, and doctors by their index in these vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Surgeries to schedule.
    pub surgeries: Vec<Surgery>,
    /// Planning days.
    pub days: Vec<Day>,
    /// Operating rooms.
    pub rooms: Vec<Room>,
    /// Doctors.
    pub doctors: Vec<Doctor>,
}

impl Instance {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a surgery.
    pub fn with_surgery(mut self, surgery: Surgery) -> Self {
        self.surgeries.push(surgery);
        self
    }

    /// Adds a day.
    pub fn with_day(mut self, day: Day) -> Self {
        self.days.push(day);
        self
    }

    /// Adds a room.
    pub fn with_room(mut self, room: Room) -> Self {
        self.rooms.push(room);
        self
    }

    /// Adds a doctor.
    pub fn with_doctor(mut self, doctor: Doctor) -> Self {
        self.doctors.push(doctor);
        self
    }

    /// Parses and validates an instance document.
    pub fn from_json_str(json: &str) -> Result<Self, ScheduleError> {
        let instance: Self = serde_json::from_str(json)?;
        instance.validate()?;
        Ok(instance)
    }

    /// Reads and validates an instance document.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScheduleError> {
        let instance: Self = serde_json::from_reader(reader)?;
        instance.validate()?;
        Ok(instance)
    }

    /// Validates integrity and parameters.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        validate_instance(self).map_err(ScheduleError::Validation)
    }

    /// Distinct specialties requested by surgeries, sorted.
    pub fn requested_specialties(&self) -> Vec<&str> {
        let mut specialties: Vec<&str> = self
            .surgeries
            .iter()
            .map(|s| s.specialty.as_str())
            .collect();
        specialties.sort_unstable();
        specialties.dedup();
        specialties
    }

    /// Index of a surgery by id.
    pub fn surgery_index(&self, id: &str) -> Option<usize> {
        self.surgeries.iter().position(|s| s.id == id)
    }

    /// Doctor capacity on day `d` (minutes).
    pub fn doctor_capacity(&self, k: usize, d: usize) -> f64 {
        self.doctors[k].capacity_on(&self.days[d])
    }
}
