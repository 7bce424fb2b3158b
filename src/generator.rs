//! Seeded synthetic instance generator.
//!
//! Produces reproducible instances with a fixed mix of surgery sizes:
//! about 35% small, 35% medium and the remaining 30% large. Durations grow
//! with the index inside each size class, and every (room, doctor) pair
//! gets its own duration override shifted by the pair's position, so rooms
//! and doctors are not interchangeable.
//!
//! | Class | Mean (i-th) | Std (i-th) |
//! |-------|-------------|------------|
//! | Small | 60 + 5i | 18 + i |
//! | Medium | 150 + 8i | 40 + 1.5i |
//! | Large | 280 + 11i | 65 + 2.5i |
//!
//! With `jitter > 0` each base mean is scaled by a uniform factor in
//! `[1 - jitter, 1 + jitter]` drawn from the seeded RNG.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::{Day, Doctor, Instance, Room, Surgery};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Size class of a generated surgery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Short procedures.
    Small,
    /// Mid-length procedures.
    Medium,
    /// Long procedures.
    Large,
}

impl SizeClass {
    /// Category label written to [`Surgery::category`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }

    /// Base `(mean, std)` of the `i`-th surgery (1-based) in this class.
    pub fn base_moments(&self, i: usize) -> (f64, f64) {
        let i = i as f64;
        match self {
            Self::Small => (60.0 + 5.0 * i, 18.0 + i),
            Self::Medium => (150.0 + 8.0 * i, 40.0 + 1.5 * i),
            Self::Large => (280.0 + 11.0 * i, 65.0 + 2.5 * i),
        }
    }

    /// Override slopes: (mean per doctor, mean per room, std per doctor).
    fn slopes(&self) -> (f64, f64, f64) {
        match self {
            Self::Small => (2.0, 1.0, 0.5),
            Self::Medium => (3.0, 1.5, 1.0),
            Self::Large => (4.0, 2.0, 1.5),
        }
    }
}

/// Generator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of surgeries.
    pub surgeries: usize,
    /// Number of planning days.
    pub days: usize,
    /// Number of operating rooms.
    pub rooms: usize,
    /// Number of doctors.
    pub doctors: usize,
    /// Regular hours per day (minutes).
    pub regular_minutes: f64,
    /// Specialties, assigned to surgeries round-robin. Every room and
    /// doctor serves all of them.
    pub specialties: Vec<String>,
    /// Emit per-(room, doctor) duration overrides.
    pub resource_dependent: bool,
    /// Relative spread of the random mean scaling (0 = deterministic).
    pub jitter: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            surgeries: 35,
            days: 5,
            rooms: 5,
            doctors: 6,
            regular_minutes: 960.0,
            specialties: vec!["General".into()],
            resource_dependent: true,
            jitter: 0.0,
            seed: 42,
        }
    }
}

impl GeneratorConfig {
    /// Creates the default configuration (35 surgeries, 5 days, 5 rooms, 6 doctors).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instance dimensions.
    pub fn with_size(mut self, surgeries: usize, days: usize, rooms: usize, doctors: usize) -> Self {
        self.surgeries = surgeries;
        self.days = days;
        self.rooms = rooms;
        self.doctors = doctors;
        self
    }

    /// Sets the regular hours per day.
    pub fn with_regular_minutes(mut self, minutes: f64) -> Self {
        self.regular_minutes = minutes;
        self
    }

    /// Sets the specialty list.
    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = specialties.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables per-(room, doctor) overrides.
    pub fn with_resource_dependent(mut self, enabled: bool) -> Self {
        self.resource_dependent = enabled;
        self
    }

    /// Sets the mean jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        for (name, n) in [
            ("surgeries", self.surgeries),
            ("days", self.days),
            ("rooms", self.rooms),
            ("doctors", self.doctors),
        ] {
            if n == 0 {
                return Err(ScheduleError::invalid(name, "must be at least 1"));
            }
        }
        if !(self.regular_minutes.is_finite() && self.regular_minutes > 0.0) {
            return Err(ScheduleError::invalid(
                "regular_minutes",
                format!("must be finite and positive, got {}", self.regular_minutes),
            ));
        }
        if self.specialties.is_empty() {
            return Err(ScheduleError::invalid("specialties", "must not be empty"));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(ScheduleError::invalid(
                "jitter",
                format!("must lie in [0, 1), got {}", self.jitter),
            ));
        }
        Ok(())
    }
}

/// Generates an instance from a seeded [`SmallRng`].
///
/// # Errors
/// `InvalidParameter` for zero dimensions, non-positive hours, an empty
/// specialty list, or jitter outside `[0, 1)`.
pub fn generate(config: &GeneratorConfig) -> Result<Instance, ScheduleError> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    generate_with(config, &mut rng)
}

/// Generates an instance drawing jitter from `rng`.
///
/// # Errors
/// See [`generate`].
pub fn generate_with<R: Rng>(config: &GeneratorConfig, rng: &mut R) -> Result<Instance, ScheduleError> {
    config.validate()?;
    let h = config.regular_minutes;
    let mut instance = Instance::new();

    for i in 0..config.days {
        let name = DAY_NAMES[i % DAY_NAMES.len()];
        let id = match i / DAY_NAMES.len() {
            0 => name.to_string(),
            week => format!("{name}_{}", week + 1),
        };
        instance = instance.with_day(Day::new(id, h));
    }

    for i in 1..=config.rooms {
        let room = config
            .specialties
            .iter()
            .fold(Room::new(format!("OR{i}")), |r, s| r.with_specialty(s.clone()));
        instance = instance.with_room(room);
    }

    for i in 0..config.doctors {
        // capacity drops by 5% of H for every block of three doctors
        let share = 0.9 - 0.05 * (i / 3) as f64;
        let minutes = (h * share).floor().max(0.0);
        let mut doctor = config
            .specialties
            .iter()
            .fold(Doctor::new(format!("Doctor_{}", i + 1)), |d, s| {
                d.with_specialty(s.clone())
            });
        for day in &instance.days {
            doctor = doctor.with_capacity(day.id.clone(), minutes);
        }
        instance = instance.with_doctor(doctor);
    }

    let small = config.surgeries * 35 / 100;
    let medium = config.surgeries * 35 / 100;
    let large = config.surgeries - small - medium;
    let classes = [
        (SizeClass::Small, small),
        (SizeClass::Medium, medium),
        (SizeClass::Large, large),
    ];

    let mut count = 0;
    for (class, n) in classes {
        for i in 1..=n {
            let (base_mean, base_std) = class.base_moments(i);
            let scale = if config.jitter > 0.0 {
                rng.random_range((1.0 - config.jitter)..=(1.0 + config.jitter))
            } else {
                1.0
            };
            let mean = base_mean * scale;
            let specialty = &config.specialties[count % config.specialties.len()];
            count += 1;

            let mut surgery = Surgery::new(format!("{}_{i}", class.name()), specialty.clone(), mean, base_std)
                .with_category(class.name());
            if config.resource_dependent {
                surgery = with_pair_overrides(surgery, class, config, mean, base_std);
            }
            instance = instance.with_surgery(surgery);
        }
    }

    instance.validate()?;
    Ok(instance)
}

/// Adds one override per (room, doctor) pair, shifted by the pair's
/// distance from the middle of each resource list.
fn with_pair_overrides(
    mut surgery: Surgery,
    class: SizeClass,
    config: &GeneratorConfig,
    mean: f64,
    std: f64,
) -> Surgery {
    let (per_doctor, per_room, std_per_doctor) = class.slopes();
    let doctor_mid = config.doctors as f64 / 2.0;
    let room_mid = config.rooms as f64 / 2.0;
    for r in 1..=config.rooms {
        for k in 1..=config.doctors {
            let dk = k as f64 - doctor_mid;
            let dr = r as f64 - room_mid;
            let pair_mean = (mean + dk * per_doctor + dr * per_room).max(1.0);
            let pair_std = (std + dk * std_per_doctor).max(0.0);
            surgery = surgery.with_override(format!("OR{r}"), format!("Doctor_{k}"), pair_mean, pair_std);
        }
    }
    surgery
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions_and_mix() {
        let inst = generate(&GeneratorConfig::default()).unwrap();
        assert_eq!(inst.surgeries.len(), 35);
        assert_eq!(inst.days.len(), 5);
        assert_eq!(inst.rooms.len(), 5);
        assert_eq!(inst.doctors.len(), 6);

        let count = |c: &str| inst.surgeries.iter().filter(|s| s.category == c).count();
        assert_eq!(count("Small"), 12);
        assert_eq!(count("Medium"), 12);
        assert_eq!(count("Large"), 11);
        assert_eq!(inst.days[0].id, "Monday");
    }

    #[test]
    fn test_base_moments() {
        let inst = generate(&GeneratorConfig::default()).unwrap();
        let s1 = &inst.surgeries[0];
        assert_eq!(s1.id, "Small_1");
        assert_eq!((s1.duration_mean, s1.duration_std), (65.0, 19.0));
        assert_eq!(SizeClass::Large.base_moments(2), (302.0, 70.0));
    }

    #[test]
    fn test_pair_overrides() {
        let inst = generate(&GeneratorConfig::default()).unwrap();
        let s1 = &inst.surgeries[0];
        assert_eq!(s1.duration_overrides.len(), 30);
        // mean 65 + (6 - 3) * 2 + (1 - 2.5) * 1
        let (mean, std) = s1.moments_for("OR1", "Doctor_6");
        assert!((mean - 69.5).abs() < 1e-10);
        assert!((std - 20.5).abs() < 1e-10);
    }

    #[test]
    fn test_doctor_capacity_tiers() {
        let inst = generate(&GeneratorConfig::default()).unwrap();
        assert_eq!(inst.doctor_capacity(0, 0), 864.0);
        assert_eq!(inst.doctor_capacity(3, 0), 816.0);
    }

    #[test]
    fn test_long_horizon_day_ids_unique() {
        let cfg = GeneratorConfig::new().with_size(3, 9, 1, 1);
        let inst = generate(&cfg).unwrap();
        assert_eq!(inst.days[7].id, "Monday_2");
        assert_eq!(inst.days[8].id, "Tuesday_2");
    }

    #[test]
    fn test_jitter_is_seeded() {
        let cfg = GeneratorConfig::new().with_size(6, 1, 1, 1).with_jitter(0.2).with_seed(7);
        let a = generate(&cfg).unwrap();
        let b = generate(&cfg).unwrap();
        let means = |i: &Instance| i.surgeries.iter().map(|s| s.duration_mean).collect::<Vec<_>>();
        assert_eq!(means(&a), means(&b));
        for (s, class_mean) in a.surgeries.iter().zip([65.0, 70.0, 158.0, 166.0, 291.0, 302.0]) {
            assert!(s.duration_mean >= class_mean * 0.8 - 1e-9);
            assert!(s.duration_mean <= class_mean * 1.2 + 1e-9);
        }
    }

    #[test]
    fn test_specialties_round_robin() {
        let cfg = GeneratorConfig::new()
            .with_size(4, 1, 2, 2)
            .with_specialties(["Ortho", "Cardio"])
            .with_resource_dependent(false);
        let inst = generate(&cfg).unwrap();
        assert_eq!(inst.surgeries[0].specialty, "Ortho");
        assert_eq!(inst.surgeries[1].specialty, "Cardio");
        assert!(!inst.surgeries[0].has_overrides());
        assert!(inst.rooms[0].hosts("Cardio"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(generate(&GeneratorConfig::new().with_size(0, 1, 1, 1)).is_err());
        assert!(generate(&GeneratorConfig::new().with_jitter(1.0)).is_err());
        assert!(generate(&GeneratorConfig::new().with_specialties(Vec::<String>::new())).is_err());
    }
}
