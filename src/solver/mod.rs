//! MIP solver seam.
//!
//! The compiler never solves anything itself. A [`MipSolver`] takes a
//! [`CompiledModel`] and a [`SolverConfig`] and reports a [`SolveOutcome`];
//! infeasibility and running out of time are distinct outcomes, never errors.
//!
//! [`GoodLpSolver`] is the bundled backend (`good_lp` with the pure-Rust
//! `microlp` solver).

mod backend;

pub use backend::GoodLpSolver;

use std::fmt::Debug;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::SolverConfig;
use crate::error::ScheduleError;
use crate::mip::{CompiledModel, VarId};

/// Variable values and objective of a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    /// Value per variable, indexed by [`VarId`].
    pub values: Vec<f64>,
    /// Objective value.
    pub objective: f64,
}

impl MipSolution {
    /// Value of one variable.
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Whether a binary variable is set.
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

/// What a solve attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Proven optimal (within the configured gap).
    Optimal(MipSolution),
    /// Feasible, optimality not proven.
    Feasible(MipSolution),
    /// Time budget exhausted; carries the best incumbent if one exists.
    TimedOut {
        /// Best solution found before the deadline.
        incumbent: Option<MipSolution>,
    },
    /// Proven infeasible.
    Infeasible,
}

impl SolveOutcome {
    /// Best solution available, if any.
    pub fn solution(&self) -> Option<&MipSolution> {
        match self {
            Self::Optimal(s) | Self::Feasible(s) => Some(s),
            Self::TimedOut { incumbent } => incumbent.as_ref(),
            Self::Infeasible => None,
        }
    }

    /// Short status label.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Optimal(_) => "optimal",
            Self::Feasible(_) => "feasible",
            Self::TimedOut { .. } => "timed_out",
            Self::Infeasible => "infeasible",
        }
    }
}

/// A MIP backend.
pub trait MipSolver: Send + Sync + Debug {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Solves a compiled model within the configured budget.
    ///
    /// # Errors
    /// `Solver` for backend failures other than infeasibility.
    fn solve(
        &self,
        model: &CompiledModel,
        config: &SolverConfig,
    ) -> Result<SolveOutcome, ScheduleError>;
}

/// A job running on its own thread.
///
/// Waiting is bounded and repeatable: a [`Worker::wait`] that runs out of
/// time leaves the job running, and a later `wait` picks up its result.
#[derive(Debug)]
pub(crate) struct Worker<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send + 'static> Worker<T> {
    /// Starts `job` on a thread named `mip-solve`.
    pub(crate) fn spawn<F>(job: F) -> Result<Self, ScheduleError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("mip-solve".into())
            .spawn(move || {
                let _ = tx.send(job());
            })
            .map_err(|e| ScheduleError::Solver(format!("failed to spawn solver thread: {e}")))?;
        Ok(Self { rx })
    }

    /// Waits at most `limit`; `Ok(None)` means the job is still running.
    pub(crate) fn wait(&self, limit: Duration) -> Result<Option<T>, ScheduleError> {
        match self.rx.recv_timeout(limit) {
            Ok(result) => Ok(Some(result)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ScheduleError::Solver("solver thread terminated abnormally".into()))
            }
        }
    }
}
