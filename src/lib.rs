//! Chance-constrained operating-room scheduling.
//!
//! Compiles a stochastic surgery scheduling instance into a deterministic
//! mixed-integer linear program and checks necessary feasibility
//! conditions before any solver runs. Solving itself is delegated to a
//! pluggable backend.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Surgery`, `Room`, `Doctor`, `Day`,
//!   `AlphaSet`, `Instance`, `SurgerySchedule`
//! - **`validation`**: Input integrity checks (duplicate IDs, moments, references)
//! - **`buffer`**: Cantelli buffered durations and their cache
//! - **`eligibility`**: Legal (surgery, room, doctor) triples, resource-day
//!   groups, clique groups, sequencing pairs
//! - **`reliability`**: Log-product linearization of the joint chance constraint
//! - **`mip`**: Solver-agnostic linear model and LP-format export
//! - **`compiler`**: Constraint generator with base, strengthened, and
//!   perspective sequencing
//! - **`precheck`**: Solver-free necessary conditions and remediation hints
//! - **`solver`**: `MipSolver` seam and the `good_lp`/`microlp` backend
//! - **`scheduler`**: End-to-end façade and schedule KPIs
//! - **`generator`**: Seeded synthetic instances
//!
//! # Pipeline
//!
//! ```text
//! Instance ─▶ BufferTable ─▶ EligibilityIndex/ChoiceIndex ─▶ ModelCompiler ─▶ MipSolver
//!                 └──────────▶ FeasibilityPreChecker (before or instead of solving)
//! ```
//!
//! # References
//!
//! - Cantelli (1928), one-sided Chebyshev inequality
//! - Shylo, Prokopyev & Schaefer (2013), "Stochastic operating room
//!   scheduling for high-volume specialties under block booking"
//! - Günlük & Linderoth (2010), "Perspective reformulations of mixed
//!   integer nonlinear programs with indicator variables"

pub mod buffer;
pub mod compiler;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod generator;
pub mod mip;
pub mod models;
pub mod precheck;
pub mod reliability;
pub mod scheduler;
pub mod solver;
pub mod validation;

pub use config::{CompilerConfig, FormulationVariant, SolverConfig};
pub use error::ScheduleError;
