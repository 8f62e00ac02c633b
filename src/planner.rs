//! End-to-end planning pipeline.
//!
//! [`Planner`] runs one configuration through every stage:
//!
//! 1. validate the configuration
//! 2. normalize downtime, collecting skipped rows
//! 3. generate work orders (seeded)
//! 4. schedule
//! 5. compute metrics
//!
//! Identical configurations produce identical plans.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ProblemConfig;
use crate::error::{MalformedDowntime, ScheduleResult};
use crate::generator::WorkOrderGenerator;
use crate::models::{DowntimeCalendar, Plan};
use crate::scheduler::{ListScheduler, PlanMetrics, ScheduleRequest};

/// Result of a planning run.
#[derive(Debug, Clone)]
pub struct PlanningOutcome {
    /// The schedule.
    pub plan: Plan,
    /// Metrics of `plan`.
    pub metrics: PlanMetrics,
    /// Downtime rows that were skipped.
    pub downtime_issues: Vec<MalformedDowntime>,
}

/// Runs configurations through generation, scheduling and metrics.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    cancel: Option<Arc<AtomicBool>>,
}

impl Planner {
    /// Creates a planner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a cancellation flag forwarded to the scheduler.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Plans a configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use u_aps::config::ProblemConfig;
    /// use u_aps::planner::Planner;
    ///
    /// let outcome = Planner::new().run(&ProblemConfig::default()).unwrap();
    /// assert_eq!(outcome.plan.len(), 100);
    /// assert!(outcome.downtime_issues.is_empty());
    /// ```
    pub fn run(&self, config: &ProblemConfig) -> ScheduleResult<PlanningOutcome> {
        config.validate()?;

        let (downtime, downtime_issues) = DowntimeCalendar::from_raw(&config.downtime);
        for machine in downtime.machines() {
            if !config.machines.iter().any(|m| m == machine) {
                debug!(machine, "downtime declared for a machine that is not scheduled");
            }
        }

        let mut generator = WorkOrderGenerator::new(config.start);
        if let Some(policy) = &config.due_dates {
            generator = generator.with_due_dates(policy.clone());
        }
        let operations = generator.generate_seeded(&config.products, &config.multi_op)?;

        let request = ScheduleRequest::new(operations, config.machines.clone(), config.start)
            .with_rule(config.rule)
            .with_min_lag(config.multi_op.min_lag_hours)
            .with_downtime(downtime);

        let mut scheduler = ListScheduler::new().with_sequencing(config.sequencing);
        if let Some(flag) = &self.cancel {
            scheduler = scheduler.with_cancel_flag(Arc::clone(flag));
        }
        let plan = scheduler.schedule(&request)?;
        let metrics = PlanMetrics::calculate(&plan);

        info!(
            tasks = plan.len(),
            makespan_hours = metrics.makespan_hours,
            skipped_downtime = downtime_issues.len(),
            "planning finished"
        );

        Ok(PlanningOutcome {
            plan,
            metrics,
            downtime_issues,
        })
    }
}
