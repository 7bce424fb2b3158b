//! `good_lp` backend using the pure-Rust `microlp` solver.
//!
//! `microlp` runs branch-and-bound to proven optimality and cannot be
//! interrupted. The time limit therefore bounds how long [`GoodLpSolver::solve`]
//! waits, not how long the search runs:
//!
//! - a timed-out search keeps running on its worker thread, and the next
//!   `solve` of the same model resumes waiting on it instead of starting a
//!   second search;
//! - a timeout never carries an incumbent;
//! - `mip_gap` is validated but not forwarded, since a proven optimum meets
//!   every gap target.
//!
//! Submitting a different model abandons the running search; its thread
//! exits when `microlp` finishes.

use std::sync::Mutex;

use good_lp::solvers::microlp::microlp;
use good_lp::{variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel};
use tracing::{debug, info, warn};

use super::{MipSolution, MipSolver, SolveOutcome, Worker};
use crate::config::SolverConfig;
use crate::error::ScheduleError;
use crate::mip::{self, CompiledModel, VarKind};

/// Largest constraint violation accepted in a backend solution.
const VERIFY_TOLERANCE: f64 = 1e-5;

type SolveResult = Result<Vec<f64>, ResolutionError>;

/// A search that outlived its time limit.
#[derive(Debug)]
struct InFlight {
    model: CompiledModel,
    worker: Worker<SolveResult>,
}

/// Solves compiled models with `good_lp` + `microlp` on a worker thread.
///
/// At most one search per solver is awaited at a time; concurrent calls
/// queue behind it.
#[derive(Debug, Default)]
pub struct GoodLpSolver {
    in_flight: Mutex<Option<InFlight>>,
}

impl GoodLpSolver {
    /// Creates the solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a timed-out search is still pending.
    pub fn has_pending_search(&self) -> bool {
        self.in_flight.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl MipSolver for GoodLpSolver {
    fn name(&self) -> &'static str {
        "good_lp/microlp"
    }

    fn solve(
        &self,
        model: &CompiledModel,
        config: &SolverConfig,
    ) -> Result<SolveOutcome, ScheduleError> {
        config.validate()?;
        let mut slot = self
            .in_flight
            .lock()
            .map_err(|_| ScheduleError::Solver("solver state poisoned by a panic".into()))?;

        let worker = match slot.take() {
            Some(pending) if pending.model == *model => {
                info!(
                    backend = self.name(),
                    time_limit_secs = config.time_limit_secs,
                    "resuming pending solve"
                );
                pending.worker
            }
            stale => {
                if stale.is_some() {
                    warn!("abandoning pending solve of a different model");
                }
                info!(
                    backend = self.name(),
                    variables = model.num_variables(),
                    constraints = model.num_constraints(),
                    time_limit_secs = config.time_limit_secs,
                    "solve started"
                );
                let owned = model.clone();
                Worker::spawn(move || solve_blocking(&owned))?
            }
        };

        let outcome = match worker.wait(config.time_limit())? {
            None => {
                warn!(
                    time_limit_secs = config.time_limit_secs,
                    "solver timed out without incumbent; search left running"
                );
                *slot = Some(InFlight {
                    model: model.clone(),
                    worker,
                });
                SolveOutcome::TimedOut { incumbent: None }
            }
            Some(Err(ResolutionError::Infeasible)) => SolveOutcome::Infeasible,
            Some(Err(e)) => return Err(ScheduleError::Solver(e.to_string())),
            Some(Ok(values)) => {
                verify(model, &values)?;
                let objective = model.objective_value(&values);
                SolveOutcome::Optimal(MipSolution { values, objective })
            }
        };

        info!(status = outcome.status(), "solve finished");
        Ok(outcome)
    }
}

/// Rejects a backend point that breaks a constraint, a bound, or integrality.
fn verify(model: &CompiledModel, values: &[f64]) -> Result<(), ScheduleError> {
    if let Some(c) = model.violations(values, VERIFY_TOLERANCE).first() {
        return Err(ScheduleError::Solver(format!(
            "backend solution violates `{}` by {:.3e}",
            c.name,
            c.violation(values)
        )));
    }
    if !model.is_feasible_point(values, VERIFY_TOLERANCE) {
        return Err(ScheduleError::Solver(
            "backend solution breaks variable bounds or integrality".into(),
        ));
    }
    Ok(())
}

/// Translates the model and solves it on the current thread.
fn solve_blocking(model: &CompiledModel) -> Result<Vec<f64>, ResolutionError> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<good_lp::Variable> = model
        .variables()
        .iter()
        .map(|v| {
            let mut def = variable().name(v.name.clone());
            def = match v.kind {
                VarKind::Binary => def.binary(),
                VarKind::Continuous => {
                    let def = if v.lower.is_finite() {
                        def.min(v.lower)
                    } else {
                        def
                    };
                    match v.upper {
                        Some(u) => def.max(u),
                        None => def,
                    }
                }
            };
            vars.add(def)
        })
        .collect();

    let to_expr = |e: &mip::LinearExpr| {
        e.terms()
            .fold(Expression::from(e.constant_value()), |acc, (v, c)| {
                acc + c * handles[v.index()]
            })
    };

    let mut problem = vars.minimise(to_expr(model.objective())).using(microlp);
    for c in model.constraints() {
        let lhs = to_expr(&c.expr);
        problem.add_constraint(match c.sense {
            mip::Sense::Le => lhs.leq(c.rhs),
            mip::Sense::Ge => lhs.geq(c.rhs),
            mip::Sense::Eq => lhs.eq(c.rhs),
        });
    }
    debug!(constraints = model.num_constraints(), "model handed to microlp");

    let solution = problem.solve()?;
    Ok(handles.iter().map(|&h| solution.value(h)).collect())
}
