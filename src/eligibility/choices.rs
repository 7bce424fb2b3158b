//! Decision choices, resource-day groups, cliques, and sequencing pairs.
//!
//! A choice is one (triple, day, alpha) combination that survives variable
//! fixing. Each choice belongs to exactly one room-day group and one
//! doctor-day group; the compiler emits load, reliability, and sequencing
//! constraints per group.

use serde::Serialize;
use tracing::debug;

use super::EligibilityIndex;
use crate::buffer::BufferTable;
use crate::config::CompilerConfig;
use crate::models::{AlphaSet, Instance};

/// Disjunctive resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Operating room.
    Room,
    /// Doctor.
    Doctor,
}

impl ResourceKind {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Doctor => "doctor",
        }
    }
}

/// Effective overtime limits per resource-day (minutes).
///
/// An uncapped resource gets the total maximum buffered work as its limit;
/// no schedule can use more overtime than that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvertimeLimits {
    /// Room overtime limit.
    pub room: f64,
    /// Doctor overtime limit.
    pub doctor: f64,
    /// Whether the room limit is a configured cap.
    pub room_capped: bool,
    /// Whether the doctor limit is a configured cap.
    pub doctor_capped: bool,
}

impl OvertimeLimits {
    /// Resolves configured caps against the buffer table.
    pub fn resolve(config: &CompilerConfig, buffers: &BufferTable) -> Self {
        let fallback = buffers.total_max_work();
        Self {
            room: config.max_room_overtime.unwrap_or(fallback),
            doctor: config.max_doctor_overtime.unwrap_or(fallback),
            room_capped: config.max_room_overtime.is_some(),
            doctor_capped: config.max_doctor_overtime.is_some(),
        }
    }

    /// Limit for a resource kind.
    pub fn for_kind(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Room => self.room,
            ResourceKind::Doctor => self.doctor,
        }
    }
}

/// One surviving (surgery, room, doctor, day, alpha) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    /// Eligibility triple id.
    pub triple: usize,
    /// Surgery index.
    pub surgery: usize,
    /// Room index.
    pub room: usize,
    /// Doctor index.
    pub doctor: usize,
    /// Day index.
    pub day: usize,
    /// Alpha index.
    pub alpha: usize,
    /// Buffered duration (minutes).
    pub duration: f64,
}

/// A surgery's choices within one resource-day group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// Surgery index.
    pub surgery: usize,
    /// Choice ids placing the surgery in this group.
    pub choices: Vec<usize>,
    /// Smallest buffered duration among those choices.
    pub min_duration: f64,
    /// Largest buffered duration among those choices.
    pub max_duration: f64,
}

/// All choices that use one room on one day, or one doctor on one day.
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    /// Resource type.
    pub kind: ResourceKind,
    /// Day index.
    pub day: usize,
    /// Room or doctor index.
    pub resource: usize,
    /// Regular minutes: H for rooms, doctor-day capacity for doctors.
    pub capacity: f64,
    /// Overtime limit.
    pub limit: f64,
    /// Surgeries that may be placed here, in surgery order.
    pub members: Vec<GroupMember>,
}

impl ResourceGroup {
    /// Most work the resource-day can absorb.
    pub fn max_load(&self) -> f64 {
        self.capacity + self.limit
    }
}

/// Surgeries no two of which fit the same resource-day.
#[derive(Debug, Clone)]
pub struct CliqueGroup {
    /// Resource type.
    pub kind: ResourceKind,
    /// Group index within its kind.
    pub group: usize,
    /// Member indices within the group.
    pub members: Vec<usize>,
}

/// Two surgeries that may share a resource-day and must then be sequenced.
#[derive(Debug, Clone, Copy)]
pub struct SequencingPair {
    /// Resource type.
    pub kind: ResourceKind,
    /// Group index within its kind.
    pub group: usize,
    /// Member index of the earlier-indexed surgery.
    pub first: usize,
    /// Member index of the later-indexed surgery.
    pub second: usize,
}

/// Surviving choices and everything derived from their grouping.
#[derive(Debug, Clone)]
pub struct ChoiceIndex {
    choices: Vec<Choice>,
    by_surgery: Vec<Vec<usize>>,
    room_groups: Vec<ResourceGroup>,
    doctor_groups: Vec<ResourceGroup>,
    cliques: Vec<CliqueGroup>,
    pairs: Vec<SequencingPair>,
    n_rooms: usize,
    n_doctors: usize,
    horizon: f64,
    pruned: usize,
    unfit: Vec<usize>,
}

impl ChoiceIndex {
    /// Enumerates, prunes, and groups choices.
    ///
    /// A choice is fixed to zero when its buffer exceeds the doctor-day
    /// capacity plus the doctor limit, or the day's regular hours plus the
    /// room limit. When that would leave a surgery without any choice its
    /// unpruned choices are kept so the infeasibility surfaces in the
    /// pre-check or the solver rather than as a structural error.
    pub fn build(
        instance: &Instance,
        eligibility: &EligibilityIndex,
        buffers: &BufferTable,
        limits: &OvertimeLimits,
        alphas: &AlphaSet,
    ) -> Self {
        let n_days = instance.days.len();
        let n_rooms = instance.rooms.len();
        let n_doctors = instance.doctors.len();

        let mut room_groups = Vec::with_capacity(n_days * n_rooms);
        let mut doctor_groups = Vec::with_capacity(n_days * n_doctors);
        for (d, day) in instance.days.iter().enumerate() {
            for r in 0..n_rooms {
                room_groups.push(ResourceGroup {
                    kind: ResourceKind::Room,
                    day: d,
                    resource: r,
                    capacity: day.regular_minutes,
                    limit: limits.room,
                    members: Vec::new(),
                });
            }
            for k in 0..n_doctors {
                doctor_groups.push(ResourceGroup {
                    kind: ResourceKind::Doctor,
                    day: d,
                    resource: k,
                    capacity: instance.doctor_capacity(k, d),
                    limit: limits.doctor,
                    members: Vec::new(),
                });
            }
        }

        let mut choices = Vec::new();
        let mut by_surgery = Vec::with_capacity(instance.surgeries.len());
        let mut pruned = 0usize;
        let mut unfit = Vec::new();

        for j in 0..instance.surgeries.len() {
            let mut candidates = Vec::new();
            for (id, triple) in eligibility.for_surgery(j) {
                for d in 0..instance.days.len() {
                    if !eligibility.doctor_available(triple.doctor, d) {
                        continue;
                    }
                    for (t, _) in alphas.iter() {
                        candidates.push(Choice {
                            triple: id,
                            surgery: j,
                            room: triple.room,
                            doctor: triple.doctor,
                            day: d,
                            alpha: t,
                            duration: buffers.get(id, t),
                        });
                    }
                }
            }

            let fits = |c: &Choice| {
                c.duration <= doctor_groups[c.day * n_doctors + c.doctor].max_load()
                    && c.duration <= instance.days[c.day].regular_minutes + limits.room
            };
            let kept: Vec<Choice> = candidates.iter().copied().filter(fits).collect();
            let kept = if kept.is_empty() && !candidates.is_empty() {
                unfit.push(j);
                candidates
            } else {
                pruned += candidates.len() - kept.len();
                kept
            };

            let mut ids = Vec::with_capacity(kept.len());
            for choice in kept {
                let id = choices.len();
                add_to_group(&mut room_groups[choice.day * n_rooms + choice.room], &choice, id);
                add_to_group(
                    &mut doctor_groups[choice.day * n_doctors + choice.doctor],
                    &choice,
                    id,
                );
                choices.push(choice);
                ids.push(id);
            }
            by_surgery.push(ids);
        }

        let mut cliques = Vec::new();
        let mut pairs = Vec::new();
        for (kind, groups) in [
            (ResourceKind::Room, &room_groups),
            (ResourceKind::Doctor, &doctor_groups),
        ] {
            for (g, group) in groups.iter().enumerate() {
                let half = group.max_load() / 2.0;
                let clique: Vec<usize> = group
                    .members
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.min_duration > half)
                    .map(|(i, _)| i)
                    .collect();
                for a in 0..group.members.len() {
                    for b in (a + 1)..group.members.len() {
                        if clique.len() >= 2 && clique.contains(&a) && clique.contains(&b) {
                            continue;
                        }
                        pairs.push(SequencingPair {
                            kind,
                            group: g,
                            first: a,
                            second: b,
                        });
                    }
                }
                if clique.len() >= 2 {
                    cliques.push(CliqueGroup {
                        kind,
                        group: g,
                        members: clique,
                    });
                }
            }
        }

        let horizon = instance
            .days
            .iter()
            .map(|d| d.regular_minutes + limits.room)
            .fold(0.0, f64::max);

        debug!(
            choices = choices.len(),
            pruned,
            unfit = unfit.len(),
            cliques = cliques.len(),
            pairs = pairs.len(),
            "choice index built"
        );

        Self {
            choices,
            by_surgery,
            room_groups,
            doctor_groups,
            cliques,
            pairs,
            n_rooms,
            n_doctors,
            horizon,
            pruned,
            unfit,
        }
    }

    /// All surviving choices.
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Choice by id.
    pub fn choice(&self, id: usize) -> &Choice {
        &self.choices[id]
    }

    /// Choice ids of a surgery.
    pub fn for_surgery(&self, surgery: usize) -> &[usize] {
        &self.by_surgery[surgery]
    }

    /// Groups of one kind, indexed `day * count + resource`.
    pub fn groups(&self, kind: ResourceKind) -> &[ResourceGroup] {
        match kind {
            ResourceKind::Room => &self.room_groups,
            ResourceKind::Doctor => &self.doctor_groups,
        }
    }

    /// Group by kind and index.
    pub fn group(&self, kind: ResourceKind, index: usize) -> &ResourceGroup {
        &self.groups(kind)[index]
    }

    /// Room-day group.
    pub fn room_group(&self, day: usize, room: usize) -> &ResourceGroup {
        &self.room_groups[day * self.n_rooms + room]
    }

    /// Doctor-day group.
    pub fn doctor_group(&self, day: usize, doctor: usize) -> &ResourceGroup {
        &self.doctor_groups[day * self.n_doctors + doctor]
    }

    /// Conflict cliques with at least two members.
    pub fn cliques(&self) -> &[CliqueGroup] {
        &self.cliques
    }

    /// Pairs needing sequencing constraints.
    pub fn pairs(&self) -> &[SequencingPair] {
        &self.pairs
    }

    /// Upper bound S on any start time: `max_d (H_d + room limit)`.
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Number of choices fixed to zero.
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    /// Surgeries whose every choice exceeds the limits.
    pub fn unfit_surgeries(&self) -> &[usize] {
        &self.unfit
    }
}

fn add_to_group(group: &mut ResourceGroup, choice: &Choice, id: usize) {
    match group.members.last_mut() {
        Some(m) if m.surgery == choice.surgery => {
            m.choices.push(id);
            m.min_duration = m.min_duration.min(choice.duration);
            m.max_duration = m.max_duration.max(choice.duration);
        }
        _ => group.members.push(GroupMember {
            surgery: choice.surgery,
            choices: vec![id],
            min_duration: choice.duration,
            max_duration: choice.duration,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, Doctor, Room, Surgery};

    fn build(inst: &Instance, config: &CompilerConfig) -> ChoiceIndex {
        let elig = EligibilityIndex::build(inst);
        let buffers = BufferTable::build(inst, &elig, &config.alphas).unwrap();
        let limits = OvertimeLimits::resolve(config, &buffers);
        ChoiceIndex::build(inst, &elig, &buffers, &limits, &config.alphas)
    }

    fn two_surgeries() -> Instance {
        Instance::new()
            .with_surgery(Surgery::new("S1", "General", 60.0, 10.0))
            .with_surgery(Surgery::new("S2", "General", 90.0, 15.0))
            .with_day(Day::new("Mon", 120.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General").with_capacity("Mon", 480.0))
    }

    fn config(room_cap: f64) -> CompilerConfig {
        CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.01, 0.05]).unwrap())
            .with_overtime_caps(Some(room_cap), Some(0.0))
    }

    #[test]
    fn test_groups_and_pairs() {
        let idx = build(&two_surgeries(), &config(200.0));
        assert_eq!(idx.choices().len(), 4);
        let g = idx.room_group(0, 0);
        assert_eq!(g.members.len(), 2);
        assert_eq!(g.members[0].choices.len(), 2);
        // one room pair and one doctor pair
        assert_eq!(idx.pairs().len(), 2);
        assert!(idx.cliques().is_empty());
        assert!((idx.horizon() - 320.0).abs() < 1e-12);
    }

    #[test]
    fn test_pruning_drops_oversized_alpha() {
        // S2 at 0.01: 90 + 15*sqrt(99) = 239.2 > 120 + 110; at 0.05: 155.4 fits
        let idx = build(&two_surgeries(), &config(110.0));
        assert_eq!(idx.pruned(), 1);
        let s2 = idx.for_surgery(1);
        assert_eq!(s2.len(), 1);
        assert_eq!(idx.choice(s2[0]).alpha, 1);
    }

    #[test]
    fn test_pruning_never_empties_a_surgery() {
        let idx = build(&two_surgeries(), &config(0.0));
        // S1 at 0.05 = 103.6 fits 120; S2 never fits and keeps both choices
        assert_eq!(idx.unfit_surgeries(), &[1]);
        assert_eq!(idx.for_surgery(1).len(), 2);
        assert_eq!(idx.for_surgery(0).len(), 1);
    }

    #[test]
    fn test_clique_removes_pair() {
        // Both min buffers exceed (120 + 40) / 2 = 80
        let inst = Instance::new()
            .with_surgery(Surgery::new("S1", "General", 90.0, 0.0))
            .with_surgery(Surgery::new("S2", "General", 100.0, 0.0))
            .with_day(Day::new("Mon", 120.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General").with_capacity("Mon", 480.0));
        let idx = build(&inst, &config(40.0));
        assert_eq!(idx.cliques().len(), 1);
        assert_eq!(idx.cliques()[0].kind, ResourceKind::Room);
        assert_eq!(idx.cliques()[0].members, vec![0, 1]);
        // doctor pair remains
        assert_eq!(idx.pairs().len(), 1);
        assert_eq!(idx.pairs()[0].kind, ResourceKind::Doctor);
    }

    #[test]
    fn test_unavailable_doctor_day_has_no_choices() {
        let inst = two_surgeries()
            .with_day(Day::new("Tue", 120.0))
            .with_doctor(
                Doctor::new("D2")
                    .with_specialty("General")
                    .with_capacity("Tue", 0.0),
            );
        let idx = build(&inst, &config(200.0));
        assert!(idx.doctor_group(1, 1).members.is_empty());
        assert!(!idx.doctor_group(0, 1).members.is_empty());
    }

    #[test]
    fn test_uncapped_limits_use_total_work() {
        let inst = two_surgeries();
        let cfg = config(0.0).with_overtime_caps(None, None);
        let elig = EligibilityIndex::build(&inst);
        let buffers = BufferTable::build(&inst, &elig, &cfg.alphas).unwrap();
        let limits = OvertimeLimits::resolve(&cfg, &buffers);
        assert!(!limits.room_capped);
        assert!((limits.room - buffers.total_max_work()).abs() < 1e-12);
        let idx = ChoiceIndex::build(&inst, &elig, &buffers, &limits, &cfg.alphas);
        assert_eq!(idx.pruned(), 0);
    }
}
