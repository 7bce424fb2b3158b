//! Decoded surgery schedule.
//!
//! A schedule assigns every surgery to one (day, room, doctor, alpha)
//! choice and a start time. Durations are the buffered durations the
//! model was compiled with, so `end = start + duration`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ScheduleError;
use crate::mip::ModelLayout;
use crate::models::{AlphaSet, Instance};
use crate::solver::MipSolution;

/// Overlap tolerance (minutes) when comparing solver start times.
const OVERLAP_TOLERANCE: f64 = 1e-6;

/// A complete surgery schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurgerySchedule {
    /// One entry per scheduled surgery.
    pub assignments: Vec<ScheduledSurgery>,
}

/// One surgery's placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSurgery {
    /// Surgery ID.
    pub surgery_id: String,
    /// Day ID.
    pub day_id: String,
    /// Room ID.
    pub room_id: String,
    /// Doctor ID.
    pub doctor_id: String,
    /// Chosen exceedance probability.
    pub alpha: f64,
    /// Start (minutes after the day opens).
    pub start: f64,
    /// Buffered duration (minutes).
    pub duration: f64,
}

impl ScheduledSurgery {
    /// Creates a placement.
    pub fn new(
        surgery_id: impl Into<String>,
        day_id: impl Into<String>,
        room_id: impl Into<String>,
        doctor_id: impl Into<String>,
        alpha: f64,
        start: f64,
        duration: f64,
    ) -> Self {
        Self {
            surgery_id: surgery_id.into(),
            day_id: day_id.into(),
            room_id: room_id.into(),
            doctor_id: doctor_id.into(),
            alpha,
            start,
            duration,
        }
    }

    /// Buffered completion time.
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() - OVERLAP_TOLERANCE && other.start < self.end() - OVERLAP_TOLERANCE
    }
}

impl SurgerySchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a solver assignment.
    ///
    /// Each surgery takes the choice whose assignment variable is set; its
    /// start is read from the surgery's start variable and clamped at zero.
    ///
    /// # Errors
    /// `Solver` if a surgery has no set assignment variable.
    pub fn decode(
        instance: &Instance,
        alphas: &AlphaSet,
        layout: &ModelLayout,
        solution: &MipSolution,
    ) -> Result<Self, ScheduleError> {
        let mut chosen: Vec<Option<usize>> = vec![None; instance.surgeries.len()];
        for (id, (choice, &w)) in layout.choices.iter().zip(&layout.assignment).enumerate() {
            if solution.is_set(w) && chosen[choice.surgery].is_none() {
                chosen[choice.surgery] = Some(id);
            }
        }

        let mut schedule = Self::new();
        for (j, surgery) in instance.surgeries.iter().enumerate() {
            let id = chosen[j].ok_or_else(|| {
                ScheduleError::Solver(format!("solution leaves surgery '{}' unassigned", surgery.id))
            })?;
            let c = &layout.choices[id];
            schedule.add(ScheduledSurgery::new(
                &surgery.id,
                &instance.days[c.day].id,
                &instance.rooms[c.room].id,
                &instance.doctors[c.doctor].id,
                alphas.get(c.alpha),
                solution.value(layout.start[j]).max(0.0),
                c.duration,
            ));
        }
        Ok(schedule)
    }

    /// Adds a placement.
    pub fn add(&mut self, surgery: ScheduledSurgery) {
        self.assignments.push(surgery);
    }

    /// Number of scheduled surgeries.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Placement of one surgery.
    pub fn for_surgery(&self, surgery_id: &str) -> Option<&ScheduledSurgery> {
        self.assignments.iter().find(|a| a.surgery_id == surgery_id)
    }

    /// Surgeries in a room on a day, ordered by start.
    pub fn in_room(&self, day_id: &str, room_id: &str) -> Vec<&ScheduledSurgery> {
        self.ordered(|a| a.day_id == day_id && a.room_id == room_id)
    }

    /// Surgeries of a doctor on a day, ordered by start.
    pub fn for_doctor(&self, day_id: &str, doctor_id: &str) -> Vec<&ScheduledSurgery> {
        self.ordered(|a| a.day_id == day_id && a.doctor_id == doctor_id)
    }

    fn ordered(&self, keep: impl Fn(&ScheduledSurgery) -> bool) -> Vec<&ScheduledSurgery> {
        let mut out: Vec<_> = self.assignments.iter().filter(|a| keep(a)).collect();
        out.sort_by(|a, b| a.start.total_cmp(&b.start));
        out
    }

    /// Total buffered minutes in a room on a day.
    pub fn room_load(&self, day_id: &str, room_id: &str) -> f64 {
        self.in_room(day_id, room_id).iter().map(|a| a.duration).sum()
    }

    /// Total buffered minutes of a doctor on a day.
    pub fn doctor_load(&self, day_id: &str, doctor_id: &str) -> f64 {
        self.for_doctor(day_id, doctor_id).iter().map(|a| a.duration).sum()
    }

    /// Latest buffered completion in a room on a day (0 when idle).
    pub fn room_completion(&self, day_id: &str, room_id: &str) -> f64 {
        self.in_room(day_id, room_id)
            .iter()
            .map(|a| a.end())
            .fold(0.0, f64::max)
    }

    /// Whether two surgeries sharing a room-day or doctor-day overlap.
    pub fn has_overlaps(&self) -> bool {
        let mut by_room: BTreeMap<(&str, &str), Vec<&ScheduledSurgery>> = BTreeMap::new();
        let mut by_doctor: BTreeMap<(&str, &str), Vec<&ScheduledSurgery>> = BTreeMap::new();
        for a in &self.assignments {
            by_room.entry((&a.day_id, &a.room_id)).or_default().push(a);
            by_doctor.entry((&a.day_id, &a.doctor_id)).or_default().push(a);
        }
        by_room
            .values()
            .chain(by_doctor.values())
            .any(|group| {
                group
                    .iter()
                    .enumerate()
                    .any(|(i, a)| group[i + 1..].iter().any(|b| a.overlaps(b)))
            })
    }

    /// Joint probability that no surgery exceeds its buffer, assuming
    /// independence.
    pub fn joint_reliability(&self) -> f64 {
        self.assignments.iter().map(|a| 1.0 - a.alpha).product()
    }
}
