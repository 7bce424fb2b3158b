//! Operating-room scheduling domain models.
//!
//! Provides the instance data (surgeries, rooms, doctors, days, alpha
//! levels) and the decoded solution (`SurgerySchedule`). Instance data is
//! immutable once loaded; every derived structure (buffers, eligibility,
//! compiled model) is a pure function of it.
//!
//! # Domain Mappings
//!
//! | u-or-schedule | Scheduling theory | Meaning |
//! |---------------|-------------------|---------|
//! | Surgery | Job | Stochastic-duration work unit |
//! | Room | Disjunctive machine | Hosts one surgery at a time |
//! | Doctor | Disjunctive operator | Performs one surgery at a time |
//! | Day | Planning period | Regular hours + overtime |

mod alpha;
mod day;
mod instance;
mod resource;
mod schedule;
mod surgery;

pub use alpha::{AlphaSet, DEFAULT_ALPHAS};
pub use day::Day;
pub use instance::Instance;
pub use resource::{Doctor, Room};
pub use schedule::{ScheduledSurgery, SurgerySchedule};
pub use surgery::{DurationOverride, Surgery};
