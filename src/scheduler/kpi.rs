//! Schedule quality metrics (KPIs).
//!
//! Computes operating-room indicators from a decoded schedule and its
//! instance. All times are in minutes and use buffered durations.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Room overtime | Σ over room-days of max(0, max(load, completion) − H) |
//! | Doctor overtime | Σ over doctor-days of max(0, load − capacity) |
//! | Idle time | Σ over room-days of max(0, H − load) |
//! | Utilization | Room load / regular hours over the horizon |
//! | Joint reliability | Π (1 − α) over scheduled surgeries |

use std::collections::HashMap;

use crate::config::CompilerConfig;
use crate::models::{Instance, SurgerySchedule};

/// Schedule performance indicators.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Total room overtime (minutes).
    pub room_overtime: f64,
    /// Total doctor overtime (minutes).
    pub doctor_overtime: f64,
    /// Total room idle time within regular hours (minutes).
    pub idle_time: f64,
    /// Average room utilization over the horizon (load / regular hours).
    pub avg_utilization: f64,
    /// Per-room utilization.
    pub utilization_by_room: HashMap<String, f64>,
    /// Probability that no surgery exceeds its buffer.
    pub joint_reliability: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its instance.
    pub fn calculate(schedule: &SurgerySchedule, instance: &Instance) -> Self {
        let mut room_overtime = 0.0;
        let mut idle_time = 0.0;
        let mut utilization_by_room = HashMap::new();
        let regular: f64 = instance.days.iter().map(|d| d.regular_minutes).sum();

        for room in &instance.rooms {
            let mut busy = 0.0;
            for day in &instance.days {
                let load = schedule.room_load(&day.id, &room.id);
                let finish = load.max(schedule.room_completion(&day.id, &room.id));
                room_overtime += (finish - day.regular_minutes).max(0.0);
                idle_time += (day.regular_minutes - load).max(0.0);
                busy += load;
            }
            let util = if regular > 0.0 { busy / regular } else { 0.0 };
            utilization_by_room.insert(room.id.clone(), util);
        }

        let mut doctor_overtime = 0.0;
        for (k, doctor) in instance.doctors.iter().enumerate() {
            for (d, day) in instance.days.iter().enumerate() {
                let load = schedule.doctor_load(&day.id, &doctor.id);
                doctor_overtime += (load - instance.doctor_capacity(k, d)).max(0.0);
            }
        }

        let avg_utilization = if utilization_by_room.is_empty() {
            0.0
        } else {
            utilization_by_room.values().sum::<f64>() / utilization_by_room.len() as f64
        };

        Self {
            room_overtime,
            doctor_overtime,
            idle_time,
            avg_utilization,
            utilization_by_room,
            joint_reliability: schedule.joint_reliability(),
        }
    }

    /// Overtime and idle cost under a configuration's weights.
    pub fn weighted_cost(&self, config: &CompilerConfig) -> f64 {
        self.idle_time
            + config.room_overtime_cost * self.room_overtime
            + config.doctor_overtime_cost * self.doctor_overtime
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_room_overtime: f64, min_reliability: f64) -> bool {
        self.room_overtime <= max_room_overtime && self.joint_reliability >= min_reliability
    }
}
