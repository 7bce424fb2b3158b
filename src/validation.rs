//! Input validation for scheduling instances.
//!
//! Checks structural integrity of surgeries, days, rooms, and doctors
//! before any derived structure is built. Detects:
//! - Duplicate IDs
//! - Empty collections
//! - Resources with no specialty
//! - Non-finite or out-of-range durations, hours, and capacities
//! - Duration overrides and capacities that reference unknown ids
//!
//! All problems are collected; validation never stops at the first one.

use crate::models::Instance;
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities of the same kind share an ID.
    DuplicateId,
    /// The instance has no surgeries, days, rooms, or doctors.
    EmptyCollection,
    /// A room or doctor lists no specialty.
    EmptySpecialties,
    /// A duration, hour budget, or capacity is negative or not finite.
    InvalidParameter,
    /// A reference to a room, doctor, or day that doesn't exist.
    UnknownReference,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a scheduling instance.
///
/// Checks:
/// 1. No collection is empty
/// 2. No duplicate IDs within surgeries, days, rooms, doctors
/// 3. Every room and doctor has at least one specialty
/// 4. Surgery moments are finite, mean positive, std non-negative
/// 5. Day hours are finite and non-negative
/// 6. Doctor capacities are finite, non-negative, and keyed by known days
/// 7. Duration overrides reference known rooms and doctors
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &Instance) -> ValidationResult {
    let mut errors = Vec::new();

    for (name, empty) in [
        ("surgeries", instance.surgeries.is_empty()),
        ("days", instance.days.is_empty()),
        ("rooms", instance.rooms.is_empty()),
        ("doctors", instance.doctors.is_empty()),
    ] {
        if empty {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyCollection,
                format!("Instance has no {name}"),
            ));
        }
    }

    check_unique("surgery", instance.surgeries.iter().map(|s| s.id.as_str()), &mut errors);
    let day_ids = check_unique("day", instance.days.iter().map(|d| d.id.as_str()), &mut errors);
    let room_ids = check_unique("room", instance.rooms.iter().map(|r| r.id.as_str()), &mut errors);
    let doctor_ids = check_unique(
        "doctor",
        instance.doctors.iter().map(|k| k.id.as_str()),
        &mut errors,
    );

    for room in &instance.rooms {
        if room.specialties.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptySpecialties,
                format!("Room '{}' has no specialties", room.id),
            ));
        }
    }

    for day in &instance.days {
        if !(day.regular_minutes.is_finite() && day.regular_minutes > 0.0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParameter,
                format!(
                    "Day '{}' has invalid regular hours {}",
                    day.id, day.regular_minutes
                ),
            ));
        }
    }

    for doctor in &instance.doctors {
        if doctor.specialties.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptySpecialties,
                format!("Doctor '{}' has no specialties", doctor.id),
            ));
        }
        for (day, minutes) in &doctor.daily_capacity {
            if !day_ids.contains(day.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!("Doctor '{}' has capacity for unknown day '{day}'", doctor.id),
                ));
            }
            if !non_negative(*minutes) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidParameter,
                    format!(
                        "Doctor '{}' has invalid capacity {minutes} on '{day}'",
                        doctor.id
                    ),
                ));
            }
        }
    }

    for surgery in &instance.surgeries {
        check_moments(
            &surgery.id,
            surgery.duration_mean,
            surgery.duration_std,
            &mut errors,
        );
        for o in &surgery.duration_overrides {
            if !room_ids.contains(o.room_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!(
                        "Surgery '{}' overrides duration for unknown room '{}'",
                        surgery.id, o.room_id
                    ),
                ));
            }
            if !doctor_ids.contains(o.doctor_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownReference,
                    format!(
                        "Surgery '{}' overrides duration for unknown doctor '{}'",
                        surgery.id, o.doctor_id
                    ),
                ));
            }
            check_moments(&surgery.id, o.mean, o.std, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
    seen
}

fn check_moments(surgery_id: &str, mean: f64, std: f64, errors: &mut Vec<ValidationError>) {
    if !(mean.is_finite() && mean > 0.0) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidParameter,
            format!("Surgery '{surgery_id}' has invalid mean duration {mean}"),
        ));
    }
    if !non_negative(std) {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidParameter,
            format!("Surgery '{surgery_id}' has invalid duration std {std}"),
        ));
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
