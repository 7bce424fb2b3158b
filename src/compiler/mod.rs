//! Chance-constrained MIP compiler.
//!
//! Translates an [`Instance`] and a [`CompilerConfig`] into a deterministic
//! [`CompiledModel`]. One pipeline emits the constraints every formulation
//! shares; the pairwise sequencing block is delegated to a
//! [`SequencingStrategy`] chosen by [`FormulationVariant`].
//!
//! # Variables
//! - `w[j,d,r,k,t]` binary, one per surviving choice
//! - `s[j] ∈ [0, S]`, start of surgery `j` on its day
//! - `ot_room[d,r]`, `ot_doc[d,k]` ∈ [0, limit]
//! - `idle[d,r] ≥ 0`
//!
//! # Shared constraints
//! Assignment, conflict cliques, room load and completion, doctor load,
//! idle link, aggregate day cut (finite room cap), log-product reliability.
//!
//! # Objective
//! `Σ idle + c_room Σ ot_room + c_doc Σ ot_doc + λ Σ s`
//!
//! # Reference
//! - Denton, Miller, Balasubramanian & Huschka (2010), "Optimal allocation of
//!   surgery blocks to operating rooms under uncertainty", Operations
//!   Research 58(4)
//! - Shylo, Prokopyev & Schaefer (2013), "Stochastic operating room
//!   scheduling for high-volume specialties under block booking", INFORMS
//!   Journal on Computing 25(4)

mod sequencing;

pub use sequencing::{
    link_and, strategy_for, BaseSequencing, PairTerms, PerspectiveSequencing, SequencingStrategy,
    StrengthenedSequencing,
};

use tracing::{info, warn};

use crate::buffer::BufferTable;
use crate::config::{CompilerConfig, ReliabilityScope};
use crate::eligibility::{
    ChoiceIndex, EligibilityIndex, GroupMember, OvertimeLimits, ResourceGroup, ResourceKind,
};
use crate::error::ScheduleError;
use crate::mip::{
    CompiledModel, ConstraintFamily, LinearConstraint, LinearExpr, ModelBuilder, ModelLayout,
    Sense, VarId,
};
use crate::models::Instance;
use crate::reliability::ReliabilityCut;

/// Everything derived from an instance before model assembly.
///
/// Built once and shared by the compiler, the pre-checker, and decoding.
#[derive(Debug, Clone)]
pub struct ProblemContext<'a> {
    /// Source instance.
    pub instance: &'a Instance,
    /// Compiler parameters.
    pub config: &'a CompilerConfig,
    /// Legal triples and availability.
    pub eligibility: EligibilityIndex,
    /// Buffered durations.
    pub buffers: BufferTable,
    /// Effective overtime limits.
    pub limits: OvertimeLimits,
    /// Surviving choices, groups, cliques, pairs.
    pub choices: ChoiceIndex,
}

impl<'a> ProblemContext<'a> {
    /// Validates parameters and derives every index.
    ///
    /// # Errors
    /// - `InvalidParameter` for malformed configuration or durations
    /// - `StructuralInfeasibility` if any surgery has no legal choice
    pub fn build(instance: &'a Instance, config: &'a CompilerConfig) -> Result<Self, ScheduleError> {
        config.validate()?;
        let eligibility = EligibilityIndex::build(instance);
        eligibility.ensure_feasible()?;
        let buffers = BufferTable::build(instance, &eligibility, &config.alphas)?;
        let limits = OvertimeLimits::resolve(config, &buffers);
        let choices = ChoiceIndex::build(instance, &eligibility, &buffers, &limits, &config.alphas);
        for &j in choices.unfit_surgeries() {
            warn!(
                surgery = %instance.surgeries[j].id,
                "no choice fits the overtime limits; model will be infeasible"
            );
        }
        Ok(Self {
            instance,
            config,
            eligibility,
            buffers,
            limits,
            choices,
        })
    }
}

/// Name suffix identifying a sequencing pair.
pub fn pair_tag(kind: ResourceKind, day: usize, resource: usize, first: usize, second: usize) -> String {
    let r = match kind {
        ResourceKind::Room => 'r',
        ResourceKind::Doctor => 'k',
    };
    format!("{}_d{day}_{r}{resource}_j{first}_j{second}", kind.name())
}

/// Assembles a [`CompiledModel`] from a [`ProblemContext`].
///
/// # Example
/// ```no_run
/// use u_or_schedule::compiler::{ModelCompiler, ProblemContext};
/// use u_or_schedule::config::CompilerConfig;
/// use u_or_schedule::models::Instance;
///
/// let instance = Instance::from_json_str("{ ... }").unwrap();
/// let config = CompilerConfig::default();
/// let ctx = ProblemContext::build(&instance, &config).unwrap();
/// let model = ModelCompiler::new(&ctx).compile().unwrap();
/// println!("{}", model.to_lp_format());
/// ```
#[derive(Debug)]
pub struct ModelCompiler<'c, 'a> {
    ctx: &'c ProblemContext<'a>,
    strategy: Box<dyn SequencingStrategy>,
}

impl<'c, 'a> ModelCompiler<'c, 'a> {
    /// Creates a compiler using the configured variant.
    pub fn new(ctx: &'c ProblemContext<'a>) -> Self {
        Self {
            ctx,
            strategy: strategy_for(ctx.config.variant),
        }
    }

    /// Replaces the sequencing strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn SequencingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    /// `InvalidParameter` if an epsilon is out of range.
    pub fn compile(&self) -> Result<CompiledModel, ScheduleError> {
        let ctx = self.ctx;
        let instance = ctx.instance;
        let config = ctx.config;
        let choices = &ctx.choices;
        let horizon = choices.horizon();

        info!(
            variant = self.strategy.name(),
            surgeries = instance.surgeries.len(),
            choices = choices.choices().len(),
            pairs = choices.pairs().len(),
            "compiling model"
        );

        let mut mb = ModelBuilder::new();
        let mut layout = ModelLayout {
            choices: choices.choices().to_vec(),
            ..ModelLayout::default()
        };

        // Variables
        for c in choices.choices() {
            layout.assignment.push(mb.add_binary(format!(
                "w_j{}_d{}_r{}_k{}_t{}",
                c.surgery, c.day, c.room, c.doctor, c.alpha
            )));
        }
        for j in 0..instance.surgeries.len() {
            layout
                .start
                .push(mb.add_continuous(format!("s_j{j}"), 0.0, Some(horizon)));
        }
        for g in choices.groups(ResourceKind::Room) {
            layout.room_overtime.push(mb.add_continuous(
                format!("otr_d{}_r{}", g.day, g.resource),
                0.0,
                Some(g.limit),
            ));
            layout.idle.push(mb.add_continuous(
                format!("idle_d{}_r{}", g.day, g.resource),
                0.0,
                None,
            ));
        }
        for g in choices.groups(ResourceKind::Doctor) {
            layout.doctor_overtime.push(mb.add_continuous(
                format!("otd_d{}_k{}", g.day, g.resource),
                0.0,
                Some(g.limit),
            ));
        }

        let w = &layout.assignment;
        let assigned = |m: &GroupMember| LinearExpr::sum(m.choices.iter().map(|&c| w[c]));
        let buffered = |m: &GroupMember| {
            let mut e = LinearExpr::zero();
            for &c in &m.choices {
                e.add_term(w[c], choices.choice(c).duration);
            }
            e
        };
        let load = |g: &ResourceGroup| {
            g.members
                .iter()
                .fold(LinearExpr::zero(), |acc, m| acc.plus(&buffered(m)))
        };

        // Assignment
        for j in 0..instance.surgeries.len() {
            mb.add_constraint(LinearConstraint::new(
                format!("assign_j{j}"),
                ConstraintFamily::Assignment,
                LinearExpr::sum(choices.for_surgery(j).iter().map(|&c| w[c])),
                Sense::Eq,
                1.0,
            ));
        }

        // Conflict cliques
        for clique in choices.cliques() {
            let g = choices.group(clique.kind, clique.group);
            let lhs = clique
                .members
                .iter()
                .fold(LinearExpr::zero(), |acc, &m| acc.plus(&assigned(&g.members[m])));
            mb.add_constraint(LinearConstraint::new(
                format!("clique_{}", group_name(g)),
                ConstraintFamily::Clique,
                lhs,
                Sense::Le,
                1.0,
            ));
        }

        let cuts = self.reliability_cuts()?;

        // Rooms
        for (gi, g) in choices.groups(ResourceKind::Room).iter().enumerate() {
            let ot = layout.room_overtime[gi];
            let room_load = load(g);
            let h = g.capacity;

            mb.add_constraint(LinearConstraint::new(
                format!("idle_{}", group_name(g)),
                ConstraintFamily::IdleLink,
                room_load.clone().with_term(layout.idle[gi], 1.0),
                Sense::Ge,
                h,
            ));
            if g.members.is_empty() {
                continue;
            }
            mb.add_constraint(LinearConstraint::new(
                format!("load_{}", group_name(g)),
                ConstraintFamily::RoomLoad,
                room_load.with_term(ot, -1.0),
                Sense::Le,
                h,
            ));
            for m in &g.members {
                // s_j + δ_j + M x_j − ot ≤ H + M,  M = S + D_j − H
                let big_m = horizon + m.max_duration - h;
                mb.add_constraint(LinearConstraint::new(
                    format!("end_j{}_{}", m.surgery, group_name(g)),
                    ConstraintFamily::RoomCompletion,
                    buffered(m)
                        .plus_scaled(&assigned(m), big_m)
                        .with_term(layout.start[m.surgery], 1.0)
                        .with_term(ot, -1.0),
                    Sense::Le,
                    h + big_m,
                ));
            }
            if config.reliability_scope == ReliabilityScope::Resource {
                mb.add_constraint(reliability_constraint(
                    format!("rel_{}", group_name(g)),
                    &cuts[g.day],
                    g.members.iter().flat_map(|m| m.choices.iter().copied()),
                    choices,
                    w,
                ));
            }
        }

        // Doctors
        for (gi, g) in choices.groups(ResourceKind::Doctor).iter().enumerate() {
            if g.members.is_empty() {
                continue;
            }
            mb.add_constraint(LinearConstraint::new(
                format!("load_{}", group_name(g)),
                ConstraintFamily::DoctorLoad,
                load(g).with_term(layout.doctor_overtime[gi], -1.0),
                Sense::Le,
                g.capacity,
            ));
            if config.reliability_scope == ReliabilityScope::Resource {
                mb.add_constraint(reliability_constraint(
                    format!("rel_{}", group_name(g)),
                    &cuts[g.day],
                    g.members.iter().flat_map(|m| m.choices.iter().copied()),
                    choices,
                    w,
                ));
            }
        }

        // Per-day cuts
        let n_rooms = instance.rooms.len() as f64;
        for (d, day) in instance.days.iter().enumerate() {
            let on_day: Vec<usize> = choices
                .choices()
                .iter()
                .enumerate()
                .filter(|(_, c)| c.day == d)
                .map(|(id, _)| id)
                .collect();
            if on_day.is_empty() {
                continue;
            }
            if ctx.limits.room_capped {
                let mut lhs = LinearExpr::zero();
                for &c in &on_day {
                    lhs.add_term(w[c], ctx.buffers.min_for_surgery(choices.choice(c).surgery));
                }
                mb.add_constraint(LinearConstraint::new(
                    format!("daycap_d{d}"),
                    ConstraintFamily::AggregateDay,
                    lhs,
                    Sense::Le,
                    n_rooms * (day.regular_minutes + ctx.limits.room),
                ));
            }
            if config.reliability_scope == ReliabilityScope::Day {
                mb.add_constraint(reliability_constraint(
                    format!("rel_d{d}"),
                    &cuts[d],
                    on_day.iter().copied(),
                    choices,
                    w,
                ));
            }
        }

        // Sequencing
        let big_m = horizon
            + choices
                .choices()
                .iter()
                .map(|c| c.duration)
                .fold(0.0, f64::max);
        for pair in choices.pairs() {
            let g = choices.group(pair.kind, pair.group);
            let first = &g.members[pair.first];
            let second = &g.members[pair.second];
            let terms = PairTerms {
                kind: pair.kind,
                tag: pair_tag(pair.kind, g.day, g.resource, first.surgery, second.surgery),
                start_first: layout.start[first.surgery],
                start_second: layout.start[second.surgery],
                assigned_first: assigned(first),
                assigned_second: assigned(second),
                duration_first: buffered(first),
                duration_second: buffered(second),
                max_duration_first: first.max_duration,
                max_duration_second: second.max_duration,
                horizon,
                big_m,
            };
            self.strategy.emit_pair(&mut mb, &terms);
        }

        // Objective
        for &v in &layout.idle {
            mb.add_objective_term(v, 1.0);
        }
        for &v in &layout.room_overtime {
            mb.add_objective_term(v, config.room_overtime_cost);
        }
        for &v in &layout.doctor_overtime {
            mb.add_objective_term(v, config.doctor_overtime_cost);
        }
        for &v in &layout.start {
            mb.add_objective_term(v, config.start_time_weight);
        }

        let model = mb.finish(self.strategy.variant(), layout);
        info!(
            variant = self.strategy.name(),
            variables = model.num_variables(),
            binaries = model.num_binaries(),
            constraints = model.num_constraints(),
            "model compiled"
        );
        Ok(model)
    }

    fn reliability_cuts(&self) -> Result<Vec<ReliabilityCut>, ScheduleError> {
        let config = self.ctx.config;
        self.ctx
            .instance
            .days
            .iter()
            .map(|d| ReliabilityCut::new(&config.alphas, config.epsilon_for(&d.id)))
            .collect()
    }
}

/// Compiles an instance in one call.
///
/// # Errors
/// See [`ProblemContext::build`].
pub fn compile(instance: &Instance, config: &CompilerConfig) -> Result<CompiledModel, ScheduleError> {
    let ctx = ProblemContext::build(instance, config)?;
    ModelCompiler::new(&ctx).compile()
}

fn group_name(g: &ResourceGroup) -> String {
    match g.kind {
        ResourceKind::Room => format!("room_d{}_r{}", g.day, g.resource),
        ResourceKind::Doctor => format!("doctor_d{}_k{}", g.day, g.resource),
    }
}

fn reliability_constraint(
    name: String,
    cut: &ReliabilityCut,
    choice_ids: impl Iterator<Item = usize>,
    choices: &ChoiceIndex,
    w: &[VarId],
) -> LinearConstraint {
    let mut lhs = LinearExpr::zero();
    for c in choice_ids {
        lhs.add_term(w[c], cut.coefficient(choices.choice(c).alpha));
    }
    LinearConstraint::new(name, ConstraintFamily::Reliability, lhs, Sense::Ge, cut.rhs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormulationVariant;
    use crate::models::{AlphaSet, Day, Doctor, Room, Surgery};
    use std::collections::HashMap;

    fn two_surgeries() -> Instance {
        Instance::new()
            .with_surgery(Surgery::new("S1", "General", 60.0, 10.0))
            .with_surgery(Surgery::new("S2", "General", 90.0, 15.0))
            .with_day(Day::new("Mon", 120.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General").with_capacity("Mon", 480.0))
    }

    fn config(variant: FormulationVariant) -> CompilerConfig {
        CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.01, 0.05]).unwrap())
            .with_epsilon(0.25)
            .with_overtime_caps(Some(200.0), Some(60.0))
            .with_variant(variant)
    }

    /// Point for a given placement: `(alpha index, start)` per surgery,
    /// all on day 0, room 0, doctor 0. Auxiliary variables follow the
    /// order chosen by `first_before`.
    fn point(
        model: &CompiledModel,
        ctx: &ProblemContext<'_>,
        placement: &[(usize, f64)],
        first_before: impl Fn(usize, usize) -> bool,
    ) -> Vec<f64> {
        let layout = model.layout();
        let mut x = vec![0.0; model.num_variables()];
        let mut load = 0.0;
        for (j, &(t, s)) in placement.iter().enumerate() {
            let id = layout
                .choices
                .iter()
                .position(|c| c.surgery == j && c.alpha == t)
                .unwrap();
            x[layout.assignment[id].index()] = 1.0;
            x[layout.start[j].index()] = s;
            load += layout.choices[id].duration;
        }
        let h = ctx.instance.days[0].regular_minutes;
        x[layout.room_overtime[0].index()] = (load - h).max(0.0);
        x[layout.doctor_overtime[0].index()] = (load - 480.0).max(0.0);
        x[layout.idle[0].index()] = (h - load).max(0.0);

        let by_name: HashMap<&str, usize> = model
            .variables()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.as_str(), i))
            .collect();
        for pair in ctx.choices.pairs() {
            let g = ctx.choices.group(pair.kind, pair.group);
            let (j, i) = (g.members[pair.first].surgery, g.members[pair.second].surgery);
            let tag = pair_tag(pair.kind, g.day, g.resource, j, i);
            let before = if first_before(j, i) { 1.0 } else { 0.0 };
            let gap = placement[i].1 - placement[j].1;
            let mut set = |prefix: &str, value: f64| {
                if let Some(&idx) = by_name.get(format!("{prefix}_{tag}").as_str()) {
                    x[idx] = value;
                }
            };
            set("u", before);
            set("b", 1.0);
            set("v1", before);
            set("v2", 1.0 - before);
            set("g1", before * gap);
            set("g2", (1.0 - before) * -gap);
        }
        x
    }

    #[test]
    fn test_shared_constraint_counts() {
        let inst = two_surgeries();
        let cfg = config(FormulationVariant::Strengthened);
        let model = compile(&inst, &cfg).unwrap();
        assert_eq!(model.count_family(ConstraintFamily::Assignment), 2);
        assert_eq!(model.count_family(ConstraintFamily::RoomLoad), 1);
        assert_eq!(model.count_family(ConstraintFamily::RoomCompletion), 2);
        assert_eq!(model.count_family(ConstraintFamily::DoctorLoad), 1);
        assert_eq!(model.count_family(ConstraintFamily::IdleLink), 1);
        assert_eq!(model.count_family(ConstraintFamily::AggregateDay), 1);
        // one room cut and one doctor cut
        assert_eq!(model.count_family(ConstraintFamily::Reliability), 2);
        // 4 choices + 2 starts + otr + idle + otd
        assert_eq!(model.layout().assignment.len(), 4);
        assert_eq!(model.layout().start.len(), 2);
    }

    #[test]
    fn test_day_scope_and_uncapped() {
        let inst = two_surgeries();
        let cfg = config(FormulationVariant::Base)
            .with_reliability_scope(ReliabilityScope::Day)
            .with_overtime_caps(None, None);
        let model = compile(&inst, &cfg).unwrap();
        assert_eq!(model.count_family(ConstraintFamily::Reliability), 1);
        assert_eq!(model.count_family(ConstraintFamily::AggregateDay), 0);
    }

    #[test]
    fn test_variant_sizes_grow() {
        let inst = two_surgeries();
        let sizes: Vec<(usize, usize)> = FormulationVariant::ALL
            .iter()
            .map(|&v| {
                let m = compile(&inst, &config(v)).unwrap();
                assert_eq!(m.variant(), v);
                (m.num_binaries(), m.num_constraints())
            })
            .collect();
        // two pairs (room, doctor): base +1 binary each, strengthened +2, perspective +4
        assert_eq!(sizes[0].0, 4 + 2);
        assert_eq!(sizes[1].0, 4 + 4);
        assert_eq!(sizes[2].0, 4 + 6);
        assert!(sizes[0].1 < sizes[1].1 && sizes[1].1 < sizes[2].1);
    }

    #[test]
    fn test_sequenced_schedule_feasible_in_every_variant() {
        let inst = two_surgeries();
        let d1 = crate::buffer::cantelli_buffer(60.0, 10.0, 0.05).unwrap();
        for variant in FormulationVariant::ALL {
            let cfg = config(variant);
            let ctx = ProblemContext::build(&inst, &cfg).unwrap();
            let model = ModelCompiler::new(&ctx).compile().unwrap();
            let x = point(&model, &ctx, &[(1, 0.0), (1, d1)], |j, i| j < i);
            assert!(
                model.is_feasible_point(&x, 1e-6),
                "{variant:?}: {:?}",
                model.violations(&x, 1e-6)
            );
            let ot = d1 + crate::buffer::cantelli_buffer(90.0, 15.0, 0.05).unwrap() - 120.0;
            let expected = 3.0 * ot + 0.001 * d1;
            assert!((model.objective_value(&x) - expected).abs() < 1e-6);

            // reversed order is also a valid sequence
            let d2 = crate::buffer::cantelli_buffer(90.0, 15.0, 0.05).unwrap();
            let x = point(&model, &ctx, &[(1, d2), (1, 0.0)], |_, _| false);
            assert!(model.is_feasible_point(&x, 1e-6), "{variant:?} reversed");
        }
    }

    #[test]
    fn test_overlap_infeasible_in_every_variant() {
        let inst = two_surgeries();
        for variant in FormulationVariant::ALL {
            let cfg = config(variant);
            let ctx = ProblemContext::build(&inst, &cfg).unwrap();
            let model = ModelCompiler::new(&ctx).compile().unwrap();
            for order in [true, false] {
                let x = point(&model, &ctx, &[(1, 0.0), (1, 50.0)], |_, _| order);
                assert!(!model.is_feasible_point(&x, 1e-6), "{variant:?} order={order}");
            }
        }
    }

    #[test]
    fn test_over_capacity_infeasible() {
        // Both at alpha 0.01: 159.5 + 239.2 > 120 + 200
        let inst = two_surgeries();
        let cfg = config(FormulationVariant::Strengthened);
        let ctx = ProblemContext::build(&inst, &cfg).unwrap();
        let model = ModelCompiler::new(&ctx).compile().unwrap();
        let d1 = crate::buffer::cantelli_buffer(60.0, 10.0, 0.01).unwrap();
        let mut x = point(&model, &ctx, &[(0, 0.0), (0, d1)], |j, i| j < i);
        // needed overtime exceeds the variable's upper bound
        assert!(!model.is_feasible_point(&x, 1e-6));
        x[model.layout().room_overtime[0].index()] = 200.0;
        let violated: Vec<ConstraintFamily> = model
            .violations(&x, 1e-6)
            .iter()
            .map(|c| c.family)
            .collect();
        assert!(violated.contains(&ConstraintFamily::RoomLoad));
    }

    #[test]
    fn test_structural_error() {
        let inst = two_surgeries().with_surgery(Surgery::new("S3", "Cardiac", 30.0, 5.0));
        let err = compile(&inst, &config(FormulationVariant::Base)).unwrap_err();
        assert!(matches!(err, ScheduleError::StructuralInfeasibility(_)));
    }

    #[test]
    fn test_unfit_surgery_kept_and_reported() {
        let inst = two_surgeries();
        let cfg = config(FormulationVariant::Base).with_overtime_caps(Some(0.0), Some(0.0));
        let ctx = ProblemContext::build(&inst, &cfg).unwrap();
        // S2 needs 155 minutes at best, the room offers 120
        assert_eq!(ctx.choices.unfit_surgeries(), &[1]);
        assert_eq!(ctx.choices.for_surgery(1).len(), 2);
        let model = ModelCompiler::new(&ctx).compile().unwrap();
        assert_eq!(model.layout().start.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let inst = two_surgeries();
        let cfg = config(FormulationVariant::Base).with_epsilon(1.5);
        assert!(matches!(
            compile(&inst, &cfg),
            Err(ScheduleError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_clique_cut_emitted() {
        let inst = Instance::new()
            .with_surgery(Surgery::new("S1", "General", 90.0, 0.0))
            .with_surgery(Surgery::new("S2", "General", 100.0, 0.0))
            .with_day(Day::new("Mon", 120.0))
            .with_room(Room::new("OR1").with_specialty("General"))
            .with_room(Room::new("OR2").with_specialty("General"))
            .with_doctor(Doctor::new("D1").with_specialty("General").with_capacity("Mon", 480.0));
        let cfg = config(FormulationVariant::Strengthened).with_overtime_caps(Some(40.0), Some(60.0));
        let model = compile(&inst, &cfg).unwrap();
        assert_eq!(model.count_family(ConstraintFamily::Clique), 2);
        let lp = model.to_lp_format();
        assert!(lp.contains("clique_room_d0_r0"));
        assert!(lp.contains("seq1_doctor_d0_k0_j0_j1"));
        assert!(!lp.contains("seq1_room_d0_r0_j0_j1"));
    }
}
