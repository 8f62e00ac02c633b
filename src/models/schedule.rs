//! Plan (solution) model.
//!
//! A plan is the flat list of scheduled tasks produced by one scheduling
//! run, one record per operation. It is the only artifact that is
//! exported and re-imported; metrics are always derived from it.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};

use super::time::{as_hours, Timestamp};

/// An operation placed on a machine.
///
/// Field names follow the exported record layout (`id`, `product`,
/// `operation`, `machine`, `start`, `end`, `duration_hours`, `due_date`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Parent work-order id.
    #[serde(rename = "id")]
    pub work_order_id: String,
    /// Product code.
    pub product: String,
    /// Operation label (`D2`, or the product code for single-op orders).
    pub operation: String,
    /// Assigned machine.
    pub machine: String,
    /// Start time.
    pub start: Timestamp,
    /// End time (`start + duration_hours`).
    pub end: Timestamp,
    /// Processing time in hours.
    pub duration_hours: f64,
    /// Requested completion time, carried through from the operation.
    pub due_date: Option<Timestamp>,
}

impl ScheduledTask {
    /// Elapsed hours between start and end.
    #[inline]
    pub fn elapsed_hours(&self) -> f64 {
        as_hours(self.end - self.start)
    }

    /// Signed lateness in hours (`end - due_date`), if a due date is set.
    pub fn lateness_hours(&self) -> Option<f64> {
        self.due_date.map(|due| as_hours(self.end - due))
    }
}

/// A complete production plan.
///
/// Serializes as a bare array of task records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    /// Scheduled tasks, in assignment order.
    pub tasks: Vec<ScheduledTask>,
}

impl Plan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task.
    pub fn push(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over tasks.
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduledTask> {
        self.tasks.iter()
    }

    /// Earliest start across the plan.
    pub fn first_start(&self) -> Option<Timestamp> {
        self.tasks.iter().map(|t| t.start).min()
    }

    /// Latest end across the plan.
    pub fn last_end(&self) -> Option<Timestamp> {
        self.tasks.iter().map(|t| t.end).max()
    }

    /// Makespan: last end minus first start, in hours.
    pub fn makespan_hours(&self) -> f64 {
        match (self.first_start(), self.last_end()) {
            (Some(s), Some(e)) => as_hours(e - s),
            _ => 0.0,
        }
    }

    /// All tasks on a given machine.
    pub fn tasks_for_machine(&self, machine: &str) -> Vec<&ScheduledTask> {
        self.tasks.iter().filter(|t| t.machine == machine).collect()
    }

    /// All tasks of a work order, in plan order.
    pub fn tasks_for_work_order(&self, work_order_id: &str) -> Vec<&ScheduledTask> {
        self.tasks
            .iter()
            .filter(|t| t.work_order_id == work_order_id)
            .collect()
    }

    /// Completion time of a work order (latest end of its tasks).
    pub fn work_order_completion(&self, work_order_id: &str) -> Option<Timestamp> {
        self.tasks_for_work_order(work_order_id)
            .iter()
            .map(|t| t.end)
            .max()
    }

    /// Distinct machines, sorted.
    pub fn machines(&self) -> Vec<&str> {
        let mut ms: Vec<&str> = self.tasks.iter().map(|t| t.machine.as_str()).collect();
        ms.sort_unstable();
        ms.dedup();
        ms
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a ScheduledTask;
    type IntoIter = std::slice::Iter<'a, ScheduledTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn t0() -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .unwrap()
    }

    fn task(id: &str, machine: &str, start_h: i64, dur_h: i64) -> ScheduledTask {
        let start = t0() + Duration::hours(start_h);
        ScheduledTask {
            work_order_id: id.into(),
            product: "A".into(),
            operation: "A".into(),
            machine: machine.into(),
            start,
            end: start + Duration::hours(dur_h),
            duration_hours: dur_h as f64,
            due_date: None,
        }
    }

    fn sample_plan() -> Plan {
        let mut p = Plan::new();
        p.push(task("WO1", "M1", 0, 5));
        p.push(task("WO1", "M2", 1, 3));
        p.push(task("WO2", "M1", 5, 3));
        p
    }

    #[test]
    fn test_plan_makespan() {
        assert!((sample_plan().makespan_hours() - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_tasks_for_work_order() {
        let p = sample_plan();
        assert_eq!(p.tasks_for_work_order("WO1").len(), 2);
        assert_eq!(p.tasks_for_work_order("WO2").len(), 1);
        assert!(p.tasks_for_work_order("WO9").is_empty());
    }

    #[test]
    fn test_tasks_for_machine() {
        assert_eq!(sample_plan().tasks_for_machine("M1").len(), 2);
    }

    #[test]
    fn test_work_order_completion() {
        let p = sample_plan();
        assert_eq!(p.work_order_completion("WO1"), Some(t0() + Duration::hours(5)));
        assert_eq!(p.work_order_completion("WO9"), None);
    }

    #[test]
    fn test_lateness() {
        let mut t = task("WO1", "M1", 0, 4);
        assert_eq!(t.lateness_hours(), None);
        t.due_date = Some(t0() + Duration::hours(3));
        assert!((t.lateness_hours().unwrap() - 1.0).abs() < 1e-10);
        t.due_date = Some(t0() + Duration::hours(6));
        assert!((t.lateness_hours().unwrap() + 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_machines_sorted_distinct() {
        assert_eq!(sample_plan().machines(), vec!["M1", "M2"]);
    }

    #[test]
    fn test_empty_plan() {
        let p = Plan::new();
        assert!(p.is_empty());
        assert_eq!(p.makespan_hours(), 0.0);
        assert!(p.first_start().is_none());
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(task("WO1", "M1", 0, 2)).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["id", "product", "operation", "machine", "start", "end", "duration_hours", "due_date"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }
}
