//! Advanced planning and scheduling for identical parallel machines.
//!
//! Expands a product mix into work orders, places them on machines with a
//! greedy priority-rule list scheduler that honors machine downtime and
//! inter-step lags, and evaluates the resulting plan.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Operation`, `TimeWindow`, `IntervalSet`,
//!   `DowntimeCalendar`, `ScheduledTask`, `Plan` (with JSON plan I/O)
//! - **`generator`**: Work-order expansion and due-date assignment
//! - **`dispatching`**: Priority rules (LPT, EDD, WSPT) and the sequencer
//! - **`scheduler`**: `ListScheduler` and `PlanMetrics`
//! - **`validation`**: Input integrity checks and plan revalidation
//! - **`config`**: `ProblemConfig`, the JSON run configuration
//! - **`planner`**: The end-to-end pipeline from configuration to metrics
//!
//! # Architecture
//!
//! Every run is a pure batch computation: all mutable state lives inside
//! one `ListScheduler::schedule` call, so independent runs may execute on
//! separate threads. Same configuration and seed give byte-identical plans.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Graham (1969), "Bounds on multiprocessing timing anomalies"

pub mod config;
pub mod dispatching;
pub mod error;
pub mod generator;
pub mod models;
pub mod planner;
pub mod scheduler;
pub mod validation;

pub use error::{MalformedDowntime, ScheduleError, ScheduleResult};
