//! Solver-agnostic mixed-integer linear programs.
//!
//! The compiler emits a [`CompiledModel`]: variables with domains and
//! bounds, named linear constraints tagged by [`ConstraintFamily`], and a
//! linear minimization objective. Any backend implementing
//! [`crate::solver::MipSolver`] can consume it, and
//! [`CompiledModel::to_lp_format`] writes it for external solvers.
//!
//! A model can also check candidate points itself (`violations`,
//! `is_feasible_point`), which the solver adapter uses to verify backend
//! output and tests use to check formulations without a solver.

mod linear;
mod lp_format;
mod model;

pub use linear::{ConstraintFamily, LinearConstraint, LinearExpr, Sense, VarId};
pub use model::{CompiledModel, ModelBuilder, ModelLayout, VarKind, Variable};
