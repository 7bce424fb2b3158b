//! Scheduler façade and KPI evaluation.
//!
//! [`SurgeryScheduler`] runs the whole pipeline:
//!
//! ```text
//! validate → index → buffers → pre-check → compile → solve → decode
//! ```
//!
//! The pre-check is advisory. Failed necessary conditions stop the run
//! with [`ScheduleError::PrecheckFailed`] unless an override is requested,
//! in which case the model is solved anyway and a warning is logged.
//!
//! # KPI
//!
//! `ScheduleKpi` computes overtime, idle time, utilization, and joint
//! reliability of a decoded schedule.

mod kpi;

pub use kpi::ScheduleKpi;

use tracing::{info, warn};

use crate::compiler::{ModelCompiler, ProblemContext};
use crate::config::{CompilerConfig, SolverConfig};
use crate::error::ScheduleError;
use crate::mip::CompiledModel;
use crate::models::{Instance, SurgerySchedule};
use crate::precheck::{FeasibilityPreChecker, FeasibilityVerdict};
use crate::solver::{GoodLpSolver, MipSolution, MipSolver, SolveOutcome};

/// Result of a scheduling run.
#[derive(Debug, Clone)]
pub enum ScheduleOutcome {
    /// A schedule was found.
    Scheduled {
        /// Decoded schedule.
        schedule: SurgerySchedule,
        /// Objective value of the compiled model.
        objective: f64,
        /// Whether the backend proved optimality.
        optimal: bool,
    },
    /// Every attempt ran out of time.
    TimedOut {
        /// Best schedule found before the deadline, if any.
        incumbent: Option<SurgerySchedule>,
    },
    /// The compiled model has no feasible point.
    Infeasible,
}

impl ScheduleOutcome {
    /// The schedule, when one exists.
    pub fn schedule(&self) -> Option<&SurgerySchedule> {
        match self {
            Self::Scheduled { schedule, .. } => Some(schedule),
            Self::TimedOut { incumbent } => incumbent.as_ref(),
            Self::Infeasible => None,
        }
    }

    /// Whether the outcome is [`ScheduleOutcome::Infeasible`].
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible)
    }
}

/// Stochastic OR scheduler.
///
/// # Example
/// ```no_run
/// use u_or_schedule::config::CompilerConfig;
/// use u_or_schedule::models::Instance;
/// use u_or_schedule::scheduler::SurgeryScheduler;
///
/// let instance = Instance::from_json_str("{ ... }").unwrap();
/// let scheduler = SurgeryScheduler::new(CompilerConfig::default());
/// let outcome = scheduler.solve(&instance).unwrap();
/// if let Some(schedule) = outcome.schedule() {
///     println!("{} surgeries scheduled", schedule.len());
/// }
/// ```
#[derive(Debug)]
pub struct SurgeryScheduler {
    config: CompilerConfig,
    solver_config: SolverConfig,
    solver: Box<dyn MipSolver>,
    precheck_override: bool,
}

impl SurgeryScheduler {
    /// Creates a scheduler with the bundled `good_lp` backend.
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            solver_config: SolverConfig::default(),
            solver: Box::new(GoodLpSolver::new()),
            precheck_override: false,
        }
    }

    /// Sets the solver configuration.
    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    /// Replaces the solver backend.
    pub fn with_solver(mut self, solver: Box<dyn MipSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Solve even when the pre-check reports violations.
    pub fn with_precheck_override(mut self, enabled: bool) -> Self {
        self.precheck_override = enabled;
        self
    }

    /// Compiler configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs the feasibility pre-check only.
    pub fn precheck(&self, instance: &Instance) -> Result<FeasibilityVerdict, ScheduleError> {
        instance.validate()?;
        FeasibilityPreChecker::new(instance, &self.config).check()
    }

    /// Compiles the model without solving it.
    pub fn compile(&self, instance: &Instance) -> Result<CompiledModel, ScheduleError> {
        instance.validate()?;
        let ctx = ProblemContext::build(instance, &self.config)?;
        ModelCompiler::new(&ctx).compile()
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    /// - `Validation` / `InvalidParameter` for malformed input
    /// - `PrecheckFailed` when necessary conditions fail without override
    /// - `StructuralInfeasibility` when overriding a structural failure
    /// - `Solver` for backend failures
    pub fn solve(&self, instance: &Instance) -> Result<ScheduleOutcome, ScheduleError> {
        let verdict = self.precheck(instance)?;
        if !verdict.passed() {
            if !self.precheck_override {
                return Err(ScheduleError::PrecheckFailed(Box::new(verdict)));
            }
            warn!(
                violations = verdict.violation_count(),
                "solving despite failed pre-check"
            );
        }

        let ctx = ProblemContext::build(instance, &self.config)?;
        let model = ModelCompiler::new(&ctx).compile()?;
        let outcome = self.solve_with_retries(&model)?;

        let decode = |sol: &MipSolution| {
            SurgerySchedule::decode(instance, &self.config.alphas, model.layout(), sol)
        };
        let result = match outcome {
            SolveOutcome::Optimal(sol) => ScheduleOutcome::Scheduled {
                schedule: decode(&sol)?,
                objective: sol.objective,
                optimal: true,
            },
            SolveOutcome::Feasible(sol) => ScheduleOutcome::Scheduled {
                schedule: decode(&sol)?,
                objective: sol.objective,
                optimal: false,
            },
            SolveOutcome::TimedOut { incumbent } => ScheduleOutcome::TimedOut {
                incumbent: incumbent.as_ref().map(decode).transpose()?,
            },
            SolveOutcome::Infeasible => ScheduleOutcome::Infeasible,
        };
        Ok(result)
    }

    fn solve_with_retries(&self, model: &CompiledModel) -> Result<SolveOutcome, ScheduleError> {
        let mut config = self.solver_config.clone();
        let mut attempt = 0;
        loop {
            let outcome = self.solver.solve(model, &config)?;
            let retry = matches!(outcome, SolveOutcome::TimedOut { incumbent: None })
                && attempt < self.solver_config.retries;
            if !retry {
                return Ok(outcome);
            }
            attempt += 1;
            config = config.relaxed();
            info!(
                attempt,
                time_limit_secs = config.time_limit_secs,
                mip_gap = config.mip_gap,
                "retrying with relaxed solver budget"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormulationVariant;
    use crate::generator::{generate, GeneratorConfig};
    use crate::models::{AlphaSet, Day, Doctor, Room, Surgery};
    use crate::precheck::ViolationKind;
    use std::sync::Mutex;
    use std::time::Duration;

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
            .with_epsilon(0.25)
            .with_overtime_caps(Some(room_cap), Some(60.0))
    }

    fn solver_config() -> SolverConfig {
        SolverConfig::new().with_time_limit(Duration::from_secs(60))
    }

    fn scheduler(config: CompilerConfig) -> SurgeryScheduler {
        SurgeryScheduler::new(config).with_solver_config(solver_config())
    }

    #[test]
    fn test_zero_overtime_fails_precheck() {
        let err = scheduler(config(0.0)).solve(&two_surgeries()).unwrap_err();
        match err {
            ScheduleError::PrecheckFailed(verdict) => {
                assert!(verdict.has_violation(ViolationKind::CapacityInfeasible));
            }
            other => panic!("expected pre-check failure, got {other}"),
        }
    }

    #[test]
    fn test_zero_overtime_override_is_infeasible() {
        let outcome = scheduler(config(0.0))
            .with_precheck_override(true)
            .solve(&two_surgeries())
            .unwrap();
        assert!(outcome.is_infeasible());
        assert!(outcome.schedule().is_none());
    }

    #[test]
    fn test_sequenced_overtime_minimal_schedule() {
        let outcome = scheduler(config(200.0)).solve(&two_surgeries()).unwrap();
        let (schedule, objective) = match outcome {
            ScheduleOutcome::Scheduled {
                schedule,
                objective,
                optimal,
            } => {
                assert!(optimal);
                (schedule, objective)
            }
            other => panic!("expected a schedule, got {other:?}"),
        };

        let s1 = schedule.for_surgery("S1").unwrap();
        let s2 = schedule.for_surgery("S2").unwrap();
        assert_eq!(s1.alpha, 0.05);
        assert_eq!(s2.alpha, 0.05);
        assert!(!schedule.has_overlaps());
        // shorter surgery first minimizes the start-time term
        assert!(s1.start.abs() < 1e-4);
        assert!((s2.start - s1.end()).abs() < 1e-4);

        let overtime = 103.58898944 + 155.38348416 - 120.0;
        let expected = 3.0 * overtime + 0.001 * 103.58898944;
        assert!((objective - expected).abs() < 1e-3, "objective {objective}");

        let kpi = ScheduleKpi::calculate(&schedule, &two_surgeries());
        assert!((kpi.room_overtime - overtime).abs() < 1e-3);
        assert!(kpi.doctor_overtime.abs() < 1e-9);
    }

    #[test]
    fn test_variants_agree_on_objective() {
        let instance = two_surgeries();
        let objectives: Vec<f64> = FormulationVariant::ALL
            .iter()
            .map(|&v| {
                let outcome = scheduler(config(200.0).with_variant(v)).solve(&instance).unwrap();
                match outcome {
                    ScheduleOutcome::Scheduled { objective, .. } => objective,
                    other => panic!("{} produced {other:?}", v.name()),
                }
            })
            .collect();
        for o in &objectives[1..] {
            assert!((o - objectives[0]).abs() < 1e-3, "{objectives:?}");
        }
    }

    #[test]
    fn test_variants_agree_on_infeasibility() {
        for v in FormulationVariant::ALL {
            let outcome = scheduler(config(0.0).with_variant(v))
                .with_precheck_override(true)
                .solve(&two_surgeries())
                .unwrap();
            assert!(outcome.is_infeasible(), "{}", v.name());
        }
    }

    #[test]
    fn test_precheck_never_rejects_solvable_instance() {
        let instance = two_surgeries();
        for cap in [0.0, 60.0, 140.0, 200.0] {
            let s = scheduler(config(cap)).with_precheck_override(true);
            let verdict = s.precheck(&instance).unwrap();
            let outcome = s.solve(&instance).unwrap();
            if outcome.schedule().is_some() {
                assert!(verdict.passed(), "cap {cap} solved but pre-check failed");
            }
        }
    }

    fn generated(seed: u64, size: (usize, usize, usize, usize), overrides: bool) -> Instance {
        let (surgeries, days, rooms, doctors) = size;
        generate(
            &GeneratorConfig::new()
                .with_size(surgeries, days, rooms, doctors)
                .with_regular_minutes(900.0)
                .with_resource_dependent(overrides)
                .with_jitter(0.1)
                .with_seed(seed),
        )
        .unwrap()
    }

    fn generated_config() -> CompilerConfig {
        CompilerConfig::new()
            .with_alphas(AlphaSet::new([0.05, 0.1, 0.2]).unwrap())
            .with_epsilon(0.45)
    }

    /// Objective per variant, `None` when infeasible.
    fn objectives(instance: &Instance, config: &CompilerConfig) -> Vec<Option<f64>> {
        FormulationVariant::ALL
            .iter()
            .map(|&v| {
                let outcome = scheduler(config.clone().with_variant(v))
                    .with_precheck_override(true)
                    .solve(instance)
                    .unwrap();
                match outcome {
                    ScheduleOutcome::Scheduled {
                        schedule,
                        objective,
                        ..
                    } => {
                        assert_eq!(schedule.len(), instance.surgeries.len());
                        assert!(!schedule.has_overlaps(), "{} overlaps", v.name());
                        Some(objective)
                    }
                    ScheduleOutcome::Infeasible => None,
                    ScheduleOutcome::TimedOut { .. } => panic!("{} timed out", v.name()),
                }
            })
            .collect()
    }

    fn assert_variants_agree(results: &[Option<f64>]) {
        for r in &results[1..] {
            match (results[0], *r) {
                (Some(a), Some(b)) => {
                    assert!((a - b).abs() <= 1e-3 * a.abs().max(1.0), "{results:?}");
                }
                (None, None) => {}
                _ => panic!("variants disagree on feasibility: {results:?}"),
            }
        }
    }

    #[test]
    fn test_generated_instances_variants_agree() {
        let cases = [
            (0, (4, 1, 2, 2), true),
            (1, (4, 1, 2, 2), false),
            (2, (4, 1, 2, 2), true),
            (3, (3, 2, 2, 2), false),
            (4, (3, 2, 2, 2), true),
        ];
        let config = generated_config();
        for (seed, size, overrides) in cases {
            let instance = generated(seed, size, overrides);
            let results = objectives(&instance, &config);
            assert!(results[0].is_some(), "seed {seed} should be schedulable");
            assert_variants_agree(&results);
        }
    }

    #[test]
    fn test_generated_instance_variants_agree_on_infeasibility() {
        let instance = generate(
            &GeneratorConfig::new()
                .with_size(4, 1, 2, 2)
                .with_regular_minutes(300.0)
                .with_seed(5),
        )
        .unwrap();
        let config = generated_config().with_overtime_caps(Some(0.0), Some(0.0));
        let results = objectives(&instance, &config);
        assert_eq!(results, vec![None, None, None]);
    }

    #[test]
    fn test_generated_instances_precheck_sound() {
        let base = generated_config();
        let configs = [
            base.clone(),
            base.clone().with_overtime_caps(Some(30.0), Some(0.0)),
            base.clone().with_overtime_caps(None, None),
            base.with_epsilon(0.15),
        ];
        for (seed, overrides) in [(10, true), (11, false)] {
            let instance = generated(seed, (4, 1, 2, 2), overrides);
            for config in &configs {
                let s = scheduler(config.clone()).with_precheck_override(true);
                let verdict = s.precheck(&instance).unwrap();
                if s.solve(&instance).unwrap().schedule().is_some() {
                    assert!(
                        verdict.passed(),
                        "seed {seed}: solved but pre-check failed: {:?}",
                        verdict.violations().collect::<Vec<_>>()
                    );
                }
            }
        }
    }

    #[test]
    fn test_compile_only() {
        let model = scheduler(config(200.0)).compile(&two_surgeries()).unwrap();
        assert_eq!(model.layout().start.len(), 2);
        assert!(model.num_binaries() >= 4);
    }

    #[test]
    fn test_invalid_instance_rejected_before_precheck() {
        let instance = two_surgeries().with_surgery(Surgery::new("S1", "General", 30.0, 5.0));
        let err = scheduler(config(200.0)).solve(&instance).unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));
    }

    #[derive(Debug, Default)]
    struct AlwaysTimesOut {
        limits: Mutex<Vec<f64>>,
    }

    impl MipSolver for AlwaysTimesOut {
        fn name(&self) -> &'static str {
            "always-times-out"
        }

        fn solve(
            &self,
            _model: &CompiledModel,
            config: &SolverConfig,
        ) -> Result<SolveOutcome, ScheduleError> {
            self.limits.lock().unwrap().push(config.time_limit_secs);
            Ok(SolveOutcome::TimedOut { incumbent: None })
        }
    }

    #[test]
    fn test_timeout_retries_with_relaxed_budget() {
        let solver = std::sync::Arc::new(AlwaysTimesOut::default());

        #[derive(Debug)]
        struct Shared(std::sync::Arc<AlwaysTimesOut>);
        impl MipSolver for Shared {
            fn name(&self) -> &'static str {
                self.0.name()
            }
            fn solve(
                &self,
                model: &CompiledModel,
                config: &SolverConfig,
            ) -> Result<SolveOutcome, ScheduleError> {
                self.0.solve(model, config)
            }
        }

        let outcome = SurgeryScheduler::new(config(200.0))
            .with_solver_config(
                SolverConfig::new()
                    .with_time_limit(Duration::from_secs(10))
                    .with_retries(2),
            )
            .with_solver(Box::new(Shared(solver.clone())))
            .solve(&two_surgeries())
            .unwrap();

        assert!(matches!(outcome, ScheduleOutcome::TimedOut { incumbent: None }));
        assert_eq!(*solver.limits.lock().unwrap(), vec![10.0, 20.0, 40.0]);
    }
}
