//! Eligibility and clique analysis.
//!
//! Builds, once per instance, the immutable index every later stage works
//! from:
//!
//! - legal (surgery, room, doctor) triples, stored in one arena with a
//!   contiguous range per surgery ([`EligibilityIndex`]);
//! - doctor-day availability (capacity > 0);
//! - surviving (triple, day, alpha) choices after variable fixing, grouped
//!   per room-day and doctor-day, with conflict cliques and sequencing pairs
//!   ([`ChoiceIndex`]).
//!
//! A surgery without any legal, available choice is reported as a
//! [`StructuralIssue`] before a single constraint is generated.
//!
//! # Reference
//! Atamtürk, Nemhauser & Savelsbergh (2000), "Conflict graphs in solving
//! integer programming problems", EJOR 121(1)

mod choices;

pub use choices::{
    Choice, ChoiceIndex, CliqueGroup, GroupMember, OvertimeLimits, ResourceGroup, ResourceKind,
    SequencingPair,
};

use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::error::ScheduleError;
use crate::models::Instance;

/// A specialty-compatible (surgery, room, doctor) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triple {
    /// Surgery index.
    pub surgery: usize,
    /// Room index.
    pub room: usize,
    /// Doctor index.
    pub doctor: usize,
}

/// Why a surgery cannot be placed at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StructuralIssue {
    /// No room and doctor share the surgery's specialty.
    NoEligibleTriple {
        /// Surgery id.
        surgery: String,
        /// Requested specialty.
        specialty: String,
        /// Rooms hosting the specialty.
        rooms: usize,
        /// Doctors performing the specialty.
        doctors: usize,
    },
    /// Eligible doctors exist but none works on any day.
    NoAvailableDoctorDay {
        /// Surgery id.
        surgery: String,
        /// Requested specialty.
        specialty: String,
    },
}

impl StructuralIssue {
    /// Id of the affected surgery.
    pub fn surgery(&self) -> &str {
        match self {
            Self::NoEligibleTriple { surgery, .. } | Self::NoAvailableDoctorDay { surgery, .. } => {
                surgery
            }
        }
    }
}

impl fmt::Display for StructuralIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEligibleTriple {
                surgery,
                specialty,
                rooms,
                doctors,
            } => write!(
                f,
                "surgery '{surgery}' ({specialty}) has no eligible room/doctor pair \
                 ({rooms} room(s), {doctors} doctor(s) with that specialty)"
            ),
            Self::NoAvailableDoctorDay { surgery, specialty } => write!(
                f,
                "surgery '{surgery}' ({specialty}) has no eligible doctor working on any day"
            ),
        }
    }
}

/// Immutable index of legal triples and doctor availability.
#[derive(Debug, Clone)]
pub struct EligibilityIndex {
    triples: Vec<Triple>,
    by_surgery: Vec<Range<usize>>,
    /// `[doctor][day]`
    doctor_available: Vec<Vec<bool>>,
    issues: Vec<StructuralIssue>,
}

impl EligibilityIndex {
    /// Enumerates legal triples and records structural issues.
    ///
    /// Never fails; call [`ensure_feasible`](Self::ensure_feasible) to turn
    /// issues into an error.
    pub fn build(instance: &Instance) -> Self {
        let doctor_available: Vec<Vec<bool>> = instance
            .doctors
            .iter()
            .map(|k| instance.days.iter().map(|d| k.works_on(d)).collect())
            .collect();

        let mut triples = Vec::new();
        let mut by_surgery = Vec::with_capacity(instance.surgeries.len());
        let mut issues = Vec::new();

        for (j, surgery) in instance.surgeries.iter().enumerate() {
            let start = triples.len();
            let spec = surgery.specialty.as_str();
            for (r, room) in instance.rooms.iter().enumerate() {
                if !room.hosts(spec) {
                    continue;
                }
                for (k, doctor) in instance.doctors.iter().enumerate() {
                    if doctor.performs(spec) {
                        triples.push(Triple {
                            surgery: j,
                            room: r,
                            doctor: k,
                        });
                    }
                }
            }
            let range = start..triples.len();

            if range.is_empty() {
                issues.push(StructuralIssue::NoEligibleTriple {
                    surgery: surgery.id.clone(),
                    specialty: surgery.specialty.clone(),
                    rooms: instance.rooms.iter().filter(|r| r.hosts(spec)).count(),
                    doctors: instance.doctors.iter().filter(|k| k.performs(spec)).count(),
                });
            } else if !triples[range.clone()]
                .iter()
                .any(|t| doctor_available[t.doctor].iter().any(|&a| a))
            {
                issues.push(StructuralIssue::NoAvailableDoctorDay {
                    surgery: surgery.id.clone(),
                    specialty: surgery.specialty.clone(),
                });
            }
            by_surgery.push(range);
        }

        debug!(
            triples = triples.len(),
            issues = issues.len(),
            "eligibility index built"
        );

        Self {
            triples,
            by_surgery,
            doctor_available,
            issues,
        }
    }

    /// All triples.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Arena ids of a surgery's triples.
    pub fn triple_ids(&self, surgery: usize) -> Range<usize> {
        self.by_surgery[surgery].clone()
    }

    /// `(id, triple)` pairs of a surgery.
    pub fn for_surgery(&self, surgery: usize) -> impl Iterator<Item = (usize, Triple)> + '_ {
        self.triple_ids(surgery).map(move |id| (id, self.triples[id]))
    }

    /// Whether doctor `k` works on day `d`.
    pub fn doctor_available(&self, doctor: usize, day: usize) -> bool {
        self.doctor_available[doctor][day]
    }

    /// Issues found while indexing.
    pub fn structural_issues(&self) -> &[StructuralIssue] {
        &self.issues
    }

    /// Fails with every structural issue, if any.
    pub fn ensure_feasible(&self) -> Result<(), ScheduleError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ScheduleError::StructuralInfeasibility(self.issues.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, Doctor, Room, Surgery};

    fn instance() -> Instance {
        Instance::new()
            .with_surgery(Surgery::new("S1", "General", 60.0, 10.0))
            .with_surgery(Surgery::new("S2", "Ortho", 90.0, 15.0))
            .with_day(Day::new("Mon", 480.0))
            .with_day(Day::new("Tue", 480.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_room(Room::new("OR2").with_specialty("General").with_specialty("Ortho"))
            .with_doctor(Doctor::new("D1").with_specialty("General"))
            .with_doctor(
                Doctor::new("D2")
                    .with_specialty("Ortho")
                    .with_specialty("General")
                    .with_capacity("Tue", 0.0),
            )
    }

    #[test]
    fn test_triples_respect_specialties() {
        let idx = EligibilityIndex::build(&instance());
        // S1: 2 rooms x 2 doctors; S2: OR2 x D2
        assert_eq!(idx.triple_ids(0).len(), 4);
        let s2: Vec<Triple> = idx.for_surgery(1).map(|(_, t)| t).collect();
        assert_eq!(
            s2,
            vec![Triple {
                surgery: 1,
                room: 1,
                doctor: 1
            }]
        );
        assert!(idx.ensure_feasible().is_ok());
    }

    #[test]
    fn test_doctor_availability() {
        let idx = EligibilityIndex::build(&instance());
        assert!(idx.doctor_available(1, 0));
        assert!(!idx.doctor_available(1, 1));
    }

    #[test]
    fn test_no_eligible_triple() {
        let inst = instance().with_surgery(Surgery::new("S3", "Cardiac", 120.0, 20.0));
        let idx = EligibilityIndex::build(&inst);
        assert_eq!(idx.structural_issues().len(), 1);
        assert_eq!(idx.structural_issues()[0].surgery(), "S3");
        let err = idx.ensure_feasible().unwrap_err();
        assert!(matches!(err, ScheduleError::StructuralInfeasibility(ref v) if v.len() == 1));
        assert!(err.to_string().contains("S3"));
    }

    #[test]
    fn test_no_available_doctor_day() {
        let mut inst = instance();
        inst.doctors[1] = Doctor::new("D2")
            .with_specialty("Ortho")
            .with_capacity("Mon", 0.0)
            .with_capacity("Tue", 0.0);
        let idx = EligibilityIndex::build(&inst);
        assert!(matches!(
            idx.structural_issues(),
            [StructuralIssue::NoAvailableDoctorDay { surgery, .. }] if surgery == "S2"
        ));
    }
}
