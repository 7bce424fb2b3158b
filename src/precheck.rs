//! Solver-free feasibility pre-checks.
//!
//! Evaluates necessary conditions only: a failed check proves the compiled
//! model infeasible, a passed verdict proves nothing. Every check runs; the
//! verdict lists all of them with numeric margins and suggests remediations.
//!
//! # Checks
//! - **Structural**: every surgery has a legal, available choice
//! - **Capacity** (finite overtime caps only): minimum buffered work per
//!   specialty pool and overall fits the resource-days able to host it, and
//!   each surgery's smallest buffer fits some eligible room-day and doctor-day
//! - **Reliability**: one surgery alone satisfies the cut at the smallest
//!   alpha, and by pigeonhole `⌈n/m⌉` surgeries sharing a resource-day do too

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::buffer::{alpha_to_fit, BufferTable};
use crate::config::{CompilerConfig, ReliabilityScope};
use crate::eligibility::{EligibilityIndex, OvertimeLimits, ResourceKind, StructuralIssue};
use crate::error::ScheduleError;
use crate::models::Instance;
use crate::reliability::{alpha_for_sharing, joint_exceedance, log_survival};

/// Category of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Legal choice exists.
    Structural,
    /// Aggregate work fits a pool of resource-days.
    PoolCapacity,
    /// One surgery fits some resource-day.
    SurgeryFit,
    /// A lone surgery satisfies the reliability cut.
    SingleReliability,
    /// Forced sharing satisfies the reliability cut.
    SharedReliability,
}

/// Violation category of a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// No legal choice.
    StructuralInfeasibility,
    /// Not enough minutes.
    CapacityInfeasible,
    /// Reliability budget exhausted.
    ReliabilityInfeasible,
}

impl CheckKind {
    /// Violation raised when this check fails.
    pub fn violation(&self) -> ViolationKind {
        match self {
            Self::Structural => ViolationKind::StructuralInfeasibility,
            Self::PoolCapacity | Self::SurgeryFit => ViolationKind::CapacityInfeasible,
            Self::SingleReliability | Self::SharedReliability => {
                ViolationKind::ReliabilityInfeasible
            }
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Check performed.
    pub check: CheckKind,
    /// What was checked (pool, surgery, ...).
    pub scope: String,
    /// Whether the condition holds.
    pub passed: bool,
    /// Required amount (minutes, or log-probability budget).
    pub required: f64,
    /// Available amount in the same unit.
    pub available: f64,
    /// `available − required`; negative when failed.
    pub margin: f64,
    /// Human-readable summary.
    pub message: String,
}

impl CheckResult {
    fn new(check: CheckKind, scope: impl Into<String>, required: f64, available: f64) -> Self {
        let scope = scope.into();
        let margin = available - required;
        let passed = margin >= -1e-9;
        let message = format!(
            "{scope}: required {required:.3}, available {available:.3} ({})",
            if passed { "ok" } else { "violated" }
        );
        Self {
            check,
            scope,
            passed,
            required,
            available,
            margin,
            message,
        }
    }

    /// Violation category, if failed.
    pub fn violation(&self) -> Option<ViolationKind> {
        (!self.passed).then(|| self.check.violation())
    }
}

/// Suggested change that removes at least one violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Remediation {
    /// Raise the room overtime cap by at least `by` minutes.
    IncreaseRoomOvertimeCap {
        /// Minutes.
        by: f64,
    },
    /// Raise the doctor overtime cap by at least `by` minutes.
    IncreaseDoctorOvertimeCap {
        /// Minutes.
        by: f64,
    },
    /// Relax epsilon to at least `to`.
    RelaxEpsilon {
        /// New epsilon.
        to: f64,
    },
    /// Add an alpha level at least `min_alpha` (shorter buffers).
    AddLargerAlpha {
        /// Smallest level that fits.
        min_alpha: f64,
    },
    /// Add an alpha level at most `max_alpha` (cheaper reliability).
    AddSmallerAlpha {
        /// Largest level that satisfies the cut.
        max_alpha: f64,
    },
    /// Add regular minutes to a pool of resources.
    AddCapacity {
        /// Resource type.
        resource: ResourceKind,
        /// Specialty pool, `None` for all resources.
        specialty: Option<String>,
        /// Missing minutes.
        minutes: f64,
    },
    /// Give a surgery a compatible room and doctor.
    FixEligibility {
        /// Surgery id.
        surgery: String,
    },
}

impl fmt::Display for Remediation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncreaseRoomOvertimeCap { by } => {
                write!(f, "increase the room overtime cap by at least {by:.1} min")
            }
            Self::IncreaseDoctorOvertimeCap { by } => {
                write!(f, "increase the doctor overtime cap by at least {by:.1} min")
            }
            Self::RelaxEpsilon { to } => write!(f, "relax epsilon to at least {to:.4}"),
            Self::AddLargerAlpha { min_alpha } => {
                write!(f, "add an alpha level of at least {min_alpha:.4}")
            }
            Self::AddSmallerAlpha { max_alpha } => {
                write!(f, "add an alpha level of at most {max_alpha:.4}")
            }
            Self::AddCapacity {
                resource,
                specialty,
                minutes,
            } => match specialty {
                Some(s) => write!(
                    f,
                    "add {minutes:.1} min of {} capacity for {s}",
                    resource.name()
                ),
                None => write!(f, "add {minutes:.1} min of {} capacity", resource.name()),
            },
            Self::FixEligibility { surgery } => write!(
                f,
                "give surgery '{surgery}' a room and a doctor with its specialty"
            ),
        }
    }
}

/// Result of the pre-check.
#[derive(Debug, Clone, Serialize)]
pub struct FeasibilityVerdict {
    checks: Vec<CheckResult>,
    structural_issues: Vec<StructuralIssue>,
    hints: Vec<Remediation>,
}

impl FeasibilityVerdict {
    /// Whether every necessary condition holds.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Every check run.
    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    /// Failed checks.
    pub fn violations(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Number of failed checks.
    pub fn violation_count(&self) -> usize {
        self.violations().count()
    }

    /// Whether some failed check has this category.
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations().any(|c| c.violation() == Some(kind))
    }

    /// Structural issues found.
    pub fn structural_issues(&self) -> &[StructuralIssue] {
        &self.structural_issues
    }

    /// Remediation hints, one per kind and pool.
    pub fn hints(&self) -> &[Remediation] {
        &self.hints
    }
}

/// Evaluates necessary feasibility conditions for an instance.
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityPreChecker<'a> {
    instance: &'a Instance,
    config: &'a CompilerConfig,
}

impl<'a> FeasibilityPreChecker<'a> {
    /// Creates a checker.
    pub fn new(instance: &'a Instance, config: &'a CompilerConfig) -> Self {
        Self { instance, config }
    }

    /// Runs every check.
    ///
    /// # Errors
    /// `InvalidParameter` for malformed configuration or durations.
    pub fn check(&self) -> Result<FeasibilityVerdict, ScheduleError> {
        self.config.validate()?;
        let eligibility = EligibilityIndex::build(self.instance);
        let buffers = BufferTable::build(self.instance, &eligibility, &self.config.alphas)?;
        let limits = OvertimeLimits::resolve(self.config, &buffers);

        let mut run = Run {
            instance: self.instance,
            config: self.config,
            eligibility: &eligibility,
            buffers: &buffers,
            limits,
            checks: Vec::new(),
            hints: Hints::default(),
        };
        run.structural();
        run.capacity();
        run.reliability();

        let verdict = FeasibilityVerdict {
            checks: run.checks,
            structural_issues: eligibility.structural_issues().to_vec(),
            hints: run.hints.into_vec(),
        };

        for v in verdict.violations() {
            warn!(check = ?v.check, scope = %v.scope, margin = v.margin, "pre-check violation");
        }
        info!(
            checks = verdict.checks.len(),
            violations = verdict.violation_count(),
            passed = verdict.passed(),
            "feasibility pre-check finished"
        );
        Ok(verdict)
    }
}

#[derive(Debug, Default)]
struct Hints {
    room_overtime: Option<f64>,
    doctor_overtime: Option<f64>,
    epsilon: Option<f64>,
    larger_alpha: Option<f64>,
    smaller_alpha: Option<f64>,
    capacity: BTreeMap<(ResourceKind, Option<String>), f64>,
    eligibility: Vec<String>,
}

impl Hints {
    fn raise(slot: &mut Option<f64>, value: f64) {
        *slot = Some(slot.map_or(value, |v| v.max(value)));
    }

    fn lower(slot: &mut Option<f64>, value: f64) {
        *slot = Some(slot.map_or(value, |v| v.min(value)));
    }

    fn overtime(&mut self, kind: ResourceKind, by: f64) {
        match kind {
            ResourceKind::Room => Self::raise(&mut self.room_overtime, by),
            ResourceKind::Doctor => Self::raise(&mut self.doctor_overtime, by),
        }
    }

    fn capacity(&mut self, kind: ResourceKind, specialty: Option<&str>, minutes: f64) {
        let key = (kind, specialty.map(str::to_string));
        let slot = self.capacity.entry(key).or_insert(0.0);
        *slot = slot.max(minutes);
    }

    fn into_vec(self) -> Vec<Remediation> {
        let mut out = Vec::new();
        out.extend(
            self.eligibility
                .into_iter()
                .map(|surgery| Remediation::FixEligibility { surgery }),
        );
        if let Some(by) = self.room_overtime {
            out.push(Remediation::IncreaseRoomOvertimeCap { by });
        }
        if let Some(by) = self.doctor_overtime {
            out.push(Remediation::IncreaseDoctorOvertimeCap { by });
        }
        for ((resource, specialty), minutes) in self.capacity {
            out.push(Remediation::AddCapacity {
                resource,
                specialty,
                minutes,
            });
        }
        if let Some(min_alpha) = self.larger_alpha {
            out.push(Remediation::AddLargerAlpha { min_alpha });
        }
        if let Some(to) = self.epsilon {
            out.push(Remediation::RelaxEpsilon { to });
        }
        if let Some(max_alpha) = self.smaller_alpha {
            out.push(Remediation::AddSmallerAlpha { max_alpha });
        }
        out
    }
}

/// A pool of resource-days and the surgeries that must be placed in it.
struct Pool {
    kind: ResourceKind,
    specialty: Option<String>,
    /// Resource-days in the pool.
    slots: usize,
    /// Σ (capacity + limit) over the pool.
    minutes: f64,
    /// Surgeries that can only go to this pool.
    surgeries: Vec<usize>,
}

impl Pool {
    fn scope(&self) -> String {
        match &self.specialty {
            Some(s) => format!("{} pool '{s}'", self.kind.name()),
            None => format!("all {}s", self.kind.name()),
        }
    }
}

struct Run<'r> {
    instance: &'r Instance,
    config: &'r CompilerConfig,
    eligibility: &'r EligibilityIndex,
    buffers: &'r BufferTable,
    limits: OvertimeLimits,
    checks: Vec<CheckResult>,
    hints: Hints,
}

impl Run<'_> {
    fn placeable(&self) -> Vec<usize> {
        (0..self.instance.surgeries.len())
            .filter(|&j| {
                !self
                    .eligibility
                    .structural_issues()
                    .iter()
                    .any(|i| i.surgery() == self.instance.surgeries[j].id)
            })
            .collect()
    }

    fn structural(&mut self) {
        let issues = self.eligibility.structural_issues();
        if issues.is_empty() {
            let n = self.instance.surgeries.len() as f64;
            self.checks
                .push(CheckResult::new(CheckKind::Structural, "all surgeries", n, n));
            return;
        }
        for issue in issues {
            let mut c = CheckResult::new(
                CheckKind::Structural,
                format!("surgery '{}'", issue.surgery()),
                1.0,
                0.0,
            );
            c.message = issue.to_string();
            self.checks.push(c);
            self.hints.eligibility.push(issue.surgery().to_string());
        }
    }

    /// Pools per resource kind: one per requested specialty plus the global one.
    fn pools(&self, kind: ResourceKind) -> Vec<Pool> {
        let inst = self.instance;
        let placeable = self.placeable();
        let limit = self.limits.for_kind(kind);

        let slot_capacity = |specialty: Option<&str>| -> (usize, f64) {
            let mut slots = 0;
            let mut minutes = 0.0;
            for (d, day) in inst.days.iter().enumerate() {
                match kind {
                    ResourceKind::Room => {
                        for room in &inst.rooms {
                            if specialty.map_or(true, |s| room.hosts(s)) {
                                slots += 1;
                                minutes += day.regular_minutes + limit;
                            }
                        }
                    }
                    ResourceKind::Doctor => {
                        for (k, doctor) in inst.doctors.iter().enumerate() {
                            if self.eligibility.doctor_available(k, d)
                                && specialty.map_or(true, |s| doctor.performs(s))
                            {
                                slots += 1;
                                minutes += inst.doctor_capacity(k, d) + limit;
                            }
                        }
                    }
                }
            }
            (slots, minutes)
        };

        let mut pools = Vec::new();
        for specialty in inst.requested_specialties() {
            let (slots, minutes) = slot_capacity(Some(specialty));
            pools.push(Pool {
                kind,
                specialty: Some(specialty.to_string()),
                slots,
                minutes,
                surgeries: placeable
                    .iter()
                    .copied()
                    .filter(|&j| inst.surgeries[j].specialty == specialty)
                    .collect(),
            });
        }
        let (slots, minutes) = slot_capacity(None);
        pools.push(Pool {
            kind,
            specialty: None,
            slots,
            minutes,
            surgeries: placeable,
        });
        pools.retain(|p| !p.surgeries.is_empty());
        pools
    }

    fn capacity(&mut self) {
        for (kind, capped) in [
            (ResourceKind::Room, self.limits.room_capped),
            (ResourceKind::Doctor, self.limits.doctor_capped),
        ] {
            if !capped {
                continue;
            }
            for pool in self.pools(kind) {
                let required: f64 = pool
                    .surgeries
                    .iter()
                    .map(|&j| self.buffers.min_for_surgery(j))
                    .sum();
                let c = CheckResult::new(CheckKind::PoolCapacity, pool.scope(), required, pool.minutes);
                if !c.passed {
                    let shortfall = -c.margin;
                    self.hints
                        .overtime(kind, shortfall / pool.slots.max(1) as f64);
                    self.hints
                        .capacity(kind, pool.specialty.as_deref(), shortfall);
                }
                self.checks.push(c);
            }
        }
        if self.limits.room_capped || self.limits.doctor_capped {
            for j in self.placeable() {
                self.surgery_fit(j);
            }
        }
    }

    /// Whether the surgery's smallest buffer fits some eligible room-day and
    /// doctor-day at once.
    fn surgery_fit(&mut self, j: usize) {
        let inst = self.instance;
        let surgery = &inst.surgeries[j];
        let largest = self.config.alphas.largest_index();

        // (total excess, room excess, doctor excess, buffer, capacity, mean, std)
        let mut best: Option<(f64, f64, f64, f64, f64, f64, f64)> = None;
        for (id, triple) in self.eligibility.for_surgery(j) {
            let duration = self.buffers.get(id, largest);
            let (mean, std) = surgery.moments_for(
                &inst.rooms[triple.room].id,
                &inst.doctors[triple.doctor].id,
            );
            for (d, day) in inst.days.iter().enumerate() {
                if !self.eligibility.doctor_available(triple.doctor, d) {
                    continue;
                }
                let room_space = if self.limits.room_capped {
                    day.regular_minutes + self.limits.room
                } else {
                    f64::INFINITY
                };
                let doctor_space = if self.limits.doctor_capped {
                    inst.doctor_capacity(triple.doctor, d) + self.limits.doctor
                } else {
                    f64::INFINITY
                };
                let room_excess = (duration - room_space).max(0.0);
                let doctor_excess = (duration - doctor_space).max(0.0);
                let total = room_excess + doctor_excess;
                let capacity = room_space.min(doctor_space);
                if best.map_or(true, |b| total < b.0) {
                    best = Some((total, room_excess, doctor_excess, duration, capacity, mean, std));
                }
            }
        }

        let Some((_, room_excess, doctor_excess, duration, capacity, mean, std)) = best else {
            return;
        };
        let c = CheckResult::new(
            CheckKind::SurgeryFit,
            format!("surgery '{}'", surgery.id),
            duration,
            capacity,
        );
        if !c.passed {
            if room_excess > 0.0 {
                self.hints.overtime(ResourceKind::Room, room_excess);
            }
            if doctor_excess > 0.0 {
                self.hints.overtime(ResourceKind::Doctor, doctor_excess);
            }
            if let Some(a) = alpha_to_fit(mean, std, capacity).filter(|a| *a < 1.0) {
                Hints::raise(&mut self.hints.larger_alpha, a);
            }
        }
        self.checks.push(c);
    }

    fn reliability(&mut self) {
        let placeable = self.placeable();
        if placeable.is_empty() {
            return;
        }
        let alpha_min = self.config.alphas.smallest();
        let eps_max = self
            .config
            .max_epsilon(self.instance.days.iter().map(|d| d.id.as_str()));
        let budget = log_survival(eps_max);
        let per_surgery = log_survival(alpha_min);

        // budgets are compared as magnitudes |ln(1 − p)|
        let mut single = CheckResult::new(
            CheckKind::SingleReliability,
            "single surgery",
            -per_surgery,
            -budget,
        );
        single.message = format!(
            "one surgery at alpha {alpha_min} against epsilon {eps_max}: {}",
            if single.passed { "ok" } else { "violated" }
        );
        if !single.passed {
            Hints::raise(&mut self.hints.epsilon, alpha_min);
            Hints::lower(&mut self.hints.smaller_alpha, eps_max);
            self.checks.push(single);
            return;
        }
        self.checks.push(single);

        let mut forced: Vec<(String, usize, usize)> = Vec::new();
        match self.config.reliability_scope {
            ReliabilityScope::Day => {
                forced.push((
                    "all surgeries per day".to_string(),
                    placeable.len(),
                    self.instance.days.len(),
                ));
            }
            ReliabilityScope::Resource => {
                for kind in [ResourceKind::Room, ResourceKind::Doctor] {
                    for pool in self.pools(kind) {
                        forced.push((pool.scope(), pool.surgeries.len(), pool.slots));
                    }
                }
            }
        }

        for (scope, n, m) in forced {
            if m == 0 {
                continue;
            }
            let k = n.div_ceil(m);
            let used = k as f64 * per_surgery;
            let passed = used - budget >= -1e-12;
            let c = CheckResult {
                check: CheckKind::SharedReliability,
                scope: scope.clone(),
                passed,
                required: -used,
                available: -budget,
                margin: used - budget,
                message: format!(
                    "{scope}: {n} surgeries over {m} resource-days force {k} to share; \
                     joint exceedance {:.4} vs epsilon {eps_max} ({})",
                    joint_exceedance(alpha_min, k),
                    if passed { "ok" } else { "violated" }
                ),
            };
            if !passed {
                Hints::raise(&mut self.hints.epsilon, joint_exceedance(alpha_min, k));
                Hints::lower(&mut self.hints.smaller_alpha, alpha_for_sharing(eps_max, k));
            }
            self.checks.push(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlphaSet, Day, Doctor, Room, Surgery};

    fn two_surgeries() -> Instance {
        Instance::new()
            .with_surgery(Surgery::new("S1", "General", 60.0, 10.0))
            .with_surgery(Surgery::new("S2", "General", 90.0, 15.0))
            .with_day(Day::new("Mon", 120.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General").with_capacity("Mon", 480.0))
    }

    fn config() -> CompilerConfig {
        CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.01, 0.05]).unwrap())
            .with_epsilon(0.25)
    }

    #[test]
    fn test_zero_overtime_is_capacity_infeasible() {
        let inst = two_surgeries();
        let cfg = config().with_overtime_caps(Some(0.0), Some(0.0));
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();

        assert!(!v.passed());
        assert!(v.has_violation(ViolationKind::CapacityInfeasible));
        assert!(!v.has_violation(ViolationKind::ReliabilityInfeasible));
        // S2 alone cannot fit; rooms and global room pool short by 138.97
        let s2 = v
            .violations()
            .find(|c| c.check == CheckKind::SurgeryFit)
            .unwrap();
        assert_eq!(s2.scope, "surgery 'S2'");
        assert!((s2.margin - (120.0 - 155.383_484_2)).abs() < 1e-6);

        let room_hint = v.hints().iter().find_map(|h| match h {
            Remediation::IncreaseRoomOvertimeCap { by } => Some(*by),
            _ => None,
        });
        assert!((room_hint.unwrap() - 138.972_473_6).abs() < 1e-6);
        let alpha_hint = v.hints().iter().find_map(|h| match h {
            Remediation::AddLargerAlpha { min_alpha } => Some(*min_alpha),
            _ => None,
        });
        // 90 + 15·√((1−α)/α) ≤ 120  ⇔  α ≥ 0.2
        assert!((alpha_hint.unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_room_overtime_makes_it_pass() {
        let inst = two_surgeries();
        let cfg = config().with_overtime_caps(Some(200.0), Some(0.0));
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        assert!(v.passed(), "{:?}", v.violations().collect::<Vec<_>>());
        assert!(v.hints().is_empty());
        assert!(v.checks().iter().any(|c| c.check == CheckKind::SharedReliability));
    }

    #[test]
    fn test_uncapped_skips_capacity_checks() {
        let inst = two_surgeries();
        let cfg = config().with_overtime_caps(None, None);
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        assert!(v.passed());
        assert!(!v
            .checks()
            .iter()
            .any(|c| matches!(c.check, CheckKind::PoolCapacity | CheckKind::SurgeryFit)));
    }

    #[test]
    fn test_single_surgery_reliability() {
        let inst = two_surgeries();
        let cfg = CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.05, 0.1]).unwrap())
            .with_epsilon(0.01)
            .with_overtime_caps(None, None);
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        assert!(v.has_violation(ViolationKind::ReliabilityInfeasible));
        assert!(v.hints().contains(&Remediation::RelaxEpsilon { to: 0.05 }));
        assert!(v.hints().contains(&Remediation::AddSmallerAlpha { max_alpha: 0.01 }));
    }

    #[test]
    fn test_pigeonhole_reliability() {
        // ln(0.75)/ln(0.95) = 5.6: six surgeries cannot share one room-day
        let mut inst = Instance::new()
            .with_day(Day::new("Mon", 480.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General"));
        for i in 0..6 {
            inst = inst.with_surgery(Surgery::new(format!("S{i}"), "General", 10.0, 1.0));
        }
        let cfg = CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.05]).unwrap())
            .with_epsilon(0.25)
            .with_overtime_caps(None, None);
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        let shared: Vec<&CheckResult> = v
            .violations()
            .filter(|c| c.check == CheckKind::SharedReliability)
            .collect();
        // room pool, global rooms, doctor pool, global doctors
        assert_eq!(shared.len(), 4);
        assert!(shared.iter().all(|c| c.margin < 0.0));
        let to = v.hints().iter().find_map(|h| match h {
            Remediation::RelaxEpsilon { to } => Some(*to),
            _ => None,
        });
        assert!((to.unwrap() - joint_exceedance(0.05, 6)).abs() < 1e-12);

        // five surgeries are fine
        inst.surgeries.pop();
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        assert!(v.passed());
    }

    #[test]
    fn test_structural_reported_and_others_still_run() {
        let inst = two_surgeries().with_surgery(Surgery::new("S3", "Cardiac", 30.0, 5.0));
        let cfg = config().with_overtime_caps(Some(0.0), Some(0.0));
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        assert!(v.has_violation(ViolationKind::StructuralInfeasibility));
        assert!(v.has_violation(ViolationKind::CapacityInfeasible));
        assert_eq!(v.structural_issues().len(), 1);
        assert!(v.hints().contains(&Remediation::FixEligibility {
            surgery: "S3".into()
        }));
        assert!(v.violation_count() >= 3);
    }

    #[test]
    fn test_verdict_serializes() {
        let inst = two_surgeries();
        let cfg = config().with_overtime_caps(Some(0.0), Some(0.0));
        let v = FeasibilityPreChecker::new(&inst, &cfg).check().unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("\"action\":\"increase_room_overtime_cap\""));
        assert!(json.contains("\"check\":\"surgery_fit\""));
    }

    #[test]
    fn test_remediation_display() {
        let h = Remediation::AddCapacity {
            resource: ResourceKind::Room,
            specialty: Some("Ortho".into()),
            minutes: 42.0,
        };
        assert_eq!(h.to_string(), "add 42.0 min of room capacity for Ortho");
    }
}
