//! Priority-rule list scheduler for identical parallel machines.
//!
//! # Algorithm
//!
//! 1. Sort operations into a processing order (see [`Sequencer`]).
//! 2. For each operation, compute its release: the schedule start, or
//!    the predecessor's end plus the minimum lag for chained steps.
//! 3. For every machine, take `max(machine free, release)` and push it
//!    past downtime. Pick the machine with the smallest start; ties go
//!    to the machine listed first.
//! 4. Place the operation, advance that machine's cursor to the task end.
//!
//! # Complexity
//! O(n * m) placements for n operations and m machines, plus the
//! downtime scan per candidate.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 5: Parallel Machine Models

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, info_span};

use crate::dispatching::{PriorityRule, SequencingMode, Sequencer};
use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{
    hours, is_valid_hours, DowntimeCalendar, Operation, Plan, ScheduledTask, Timestamp, MAX_HOURS,
};
use crate::validation::validate_input;

/// Input container for one scheduling run.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    /// Operations to place.
    pub operations: Vec<Operation>,
    /// Machine ids, in tie-break order.
    pub machines: Vec<String>,
    /// Global schedule start.
    pub start: Timestamp,
    /// Priority rule.
    pub rule: PriorityRule,
    /// Minimum gap between consecutive steps of a multi-step order (hours).
    pub min_lag_hours: f64,
    /// Normalized machine downtime.
    pub downtime: DowntimeCalendar,
}

impl ScheduleRequest {
    /// Creates a request with LPT, no lag and no downtime.
    pub fn new(operations: Vec<Operation>, machines: Vec<String>, start: Timestamp) -> Self {
        Self {
            operations,
            machines,
            start,
            rule: PriorityRule::default(),
            min_lag_hours: 0.0,
            downtime: DowntimeCalendar::new(),
        }
    }

    /// Sets the priority rule.
    pub fn with_rule(mut self, rule: PriorityRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the minimum inter-step lag.
    pub fn with_min_lag(mut self, min_lag_hours: f64) -> Self {
        self.min_lag_hours = min_lag_hours;
        self
    }

    /// Sets machine downtime.
    pub fn with_downtime(mut self, downtime: DowntimeCalendar) -> Self {
        self.downtime = downtime;
        self
    }
}

/// Greedy list scheduler.
///
/// Holds only run options; all per-run state (machine cursors, step
/// completion times) lives inside [`ListScheduler::schedule`], so one
/// instance can serve concurrent runs.
///
/// # Example
///
/// ```
/// use chrono::DateTime;
/// use u_aps::models::Operation;
/// use u_aps::scheduler::{ListScheduler, ScheduleRequest};
///
/// let start = DateTime::parse_from_rfc3339("2025-08-09T08:00:00+08:00").unwrap();
/// let ops = vec![Operation::simple("WO1", "A", 2.0), Operation::simple("WO2", "A", 2.0)];
/// let request = ScheduleRequest::new(ops, vec!["M1".into(), "M2".into()], start);
///
/// let plan = ListScheduler::new().schedule(&request).unwrap();
/// assert_eq!(plan.len(), 2);
/// assert_eq!(plan.makespan_hours(), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ListScheduler {
    mode: SequencingMode,
    cancel: Option<Arc<AtomicBool>>,
}

impl ListScheduler {
    /// Creates a scheduler with the default sequencing mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sequencing mode.
    pub fn with_sequencing(mut self, mode: SequencingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Installs a cancellation flag, checked between placements.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Schedules a request.
    ///
    /// # Errors
    /// - `Validation` for an empty or duplicated machine list, invalid
    ///   durations or broken operation chains.
    /// - `Configuration` for a lag outside `0..=MAX_HOURS`, or when a task
    ///   would end past the representable calendar.
    /// - `Cancelled` if the cancellation flag is raised mid-run.
    pub fn schedule(&self, request: &ScheduleRequest) -> ScheduleResult<Plan> {
        if !is_valid_hours(request.min_lag_hours) {
            return Err(ScheduleError::config(
                "min_lag_hours",
                format!(
                    "must be a number between 0 and {MAX_HOURS}, got {}",
                    request.min_lag_hours
                ),
            ));
        }
        validate_input(&request.operations, &request.machines).map_err(ScheduleError::Validation)?;

        let span = info_span!(
            "schedule",
            rule = %request.rule,
            operations = request.operations.len(),
            machines = request.machines.len()
        );
        let _guard = span.enter();

        let ops = &request.operations;
        let order = Sequencer::new(request.rule)
            .with_mode(self.mode)
            .sort_indices(ops);

        let lag = hours(request.min_lag_hours);
        let offset = *request.start.offset();
        let mut available: Vec<Timestamp> = vec![request.start; request.machines.len()];
        let mut step_end: HashMap<(&str, u32), Timestamp> = HashMap::new();
        let mut plan = Plan::new();
        plan.tasks.reserve(ops.len());

        for (placed, &idx) in order.iter().enumerate() {
            if self.is_cancelled() {
                info!(placed, total = ops.len(), "scheduling cancelled");
                return Err(ScheduleError::Cancelled {
                    scheduled: placed,
                    total: ops.len(),
                });
            }

            let op = &ops[idx];
            let release = self.release_time(op, request.start, lag, &step_end)?;
            let duration = op.duration();

            let (machine_idx, start) = self.pick_machine(
                &request.machines,
                &available,
                release,
                duration,
                &request.downtime,
            );
            let start = start.with_timezone(&offset);
            let end = start
                .checked_add_signed(duration)
                .ok_or_else(|| out_of_range(op))?;
            available[machine_idx] = end;

            if let Some(k) = op.op_index {
                step_end.insert((op.work_order_id.as_str(), k), end);
            }

            plan.push(ScheduledTask {
                work_order_id: op.work_order_id.clone(),
                product: op.product.clone(),
                operation: op.label(),
                machine: request.machines[machine_idx].clone(),
                start,
                end,
                duration_hours: op.duration_hours,
                due_date: op.due_date,
            });
        }

        info!(
            tasks = plan.len(),
            makespan_hours = plan.makespan_hours(),
            "schedule complete"
        );
        Ok(plan)
    }

    /// Earliest time an operation may start, ignoring machines.
    fn release_time(
        &self,
        op: &Operation,
        start: Timestamp,
        lag: Duration,
        step_end: &HashMap<(&str, u32), Timestamp>,
    ) -> ScheduleResult<Timestamp> {
        let prev = match op.op_index {
            Some(k) if k > 1 => step_end.get(&(op.work_order_id.as_str(), k - 1)),
            _ => None,
        };
        match prev {
            Some(&prev) => prev
                .checked_add_signed(lag)
                .map(|t| t.max(start))
                .ok_or_else(|| out_of_range(op)),
            None => Ok(start),
        }
    }

    /// Machine giving the earliest downtime-free start; first wins ties.
    fn pick_machine(
        &self,
        machines: &[String],
        available: &[Timestamp],
        release: Timestamp,
        duration: Duration,
        downtime: &DowntimeCalendar,
    ) -> (usize, Timestamp) {
        let mut best: Option<(usize, Timestamp)> = None;
        for (i, machine) in machines.iter().enumerate() {
            let candidate = available[i].max(release);
            let start = downtime.earliest_feasible_start(machine, candidate, duration);
            if best.map_or(true, |(_, s)| start < s) {
                best = Some((i, start));
            }
        }
        // validate_input guarantees at least one machine.
        let (i, s) = best.unwrap_or((0, release));
        debug!(machine = %machines.get(i).map(String::as_str).unwrap_or("?"), start = %s, "placed");
        (i, s)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

fn out_of_range(op: &Operation) -> ScheduleError {
    ScheduleError::config(
        "operations",
        format!(
            "{} of work order '{}' would end past the representable calendar",
            op.label(),
            op.work_order_id
        ),
    )
}
