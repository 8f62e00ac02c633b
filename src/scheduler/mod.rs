//! List scheduling and plan metrics.
//!
//! Provides the greedy list scheduler and the plan quality metrics.
//!
//! # Algorithm
//!
//! `ListScheduler` sequences operations once, then places each one on the
//! machine offering the earliest feasible start, honoring per-machine
//! downtime and the minimum lag between steps of a multi-step order.
//! Ties go to the machine listed first. It is not optimal, but it is fast
//! and fully deterministic.
//!
//! # Metrics
//!
//! `PlanMetrics` computes makespan, per-machine load and utilization, and
//! due-date performance.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Graham (1969), "Bounds on multiprocessing timing anomalies"

mod list;
mod metrics;

pub use list::{ListScheduler, ScheduleRequest};
pub use metrics::{LatenessMetrics, MachineMetrics, PlanMetrics};
