//! Plan quality metrics (KPIs).
//!
//! Computes reporting figures from a completed plan. Metrics are never
//! stored on their own; recompute them whenever the plan changes.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Last end − first start (hours) |
//! | Machine span | Last end − first start on that machine |
//! | Utilization | Busy hours / span × 100 (0 if span is 0) |
//! | Avg lateness | Mean of `end − due_date` over dated tasks (signed) |
//! | Total tardiness | Sum of `max(0, end − due_date)` |
//! | Percent late | Share of dated tasks with positive tardiness × 100 |
//!
//! Reported figures are rounded to two decimals; all intermediate sums
//! use unrounded values.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{as_hours, round2, Plan, Timestamp};

/// Per-machine figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineMetrics {
    /// Number of tasks on the machine.
    pub ops: usize,
    /// Sum of task durations (hours).
    pub hours: f64,
    /// Busy share of the machine's span (percent).
    pub utilization_pct: f64,
    /// Last end − first start on the machine (hours).
    pub span_hours: f64,
}

/// Due-date performance over tasks that carry a due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatenessMetrics {
    /// Mean signed lateness (hours); negative = early on average.
    pub avg_lateness_h: f64,
    /// Sum of tardiness (hours).
    pub total_tardiness_h: f64,
    /// Percent of dated tasks finishing after their due date.
    pub percent_late: f64,
}

/// Plan performance indicators.
///
/// Serializes as
/// `{makespan_hours, by_machine: {id: {...}}, lateness: {...} | {}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    /// Makespan (hours).
    pub makespan_hours: f64,
    /// Figures per machine, keyed by machine id.
    pub by_machine: BTreeMap<String, MachineMetrics>,
    /// Lateness block; `None` when no task has a due date.
    #[serde(
        serialize_with = "lateness_or_empty",
        deserialize_with = "lateness_from_map",
        default
    )]
    pub lateness: Option<LatenessMetrics>,
}

impl PlanMetrics {
    /// Computes metrics from a plan.
    ///
    /// # Example
    /// ```
    /// use u_aps::models::Plan;
    /// use u_aps::scheduler::PlanMetrics;
    ///
    /// let m = PlanMetrics::calculate(&Plan::new());
    /// assert_eq!(m.makespan_hours, 0.0);
    /// assert!(m.by_machine.is_empty());
    /// assert!(m.lateness.is_none());
    /// ```
    pub fn calculate(plan: &Plan) -> Self {
        if plan.is_empty() {
            return Self::default();
        }

        struct Acc {
            ops: usize,
            busy: f64,
            first: Timestamp,
            last: Timestamp,
        }

        let mut acc: BTreeMap<&str, Acc> = BTreeMap::new();
        for t in plan {
            acc.entry(t.machine.as_str())
                .and_modify(|a| {
                    a.ops += 1;
                    a.busy += t.duration_hours;
                    a.first = a.first.min(t.start);
                    a.last = a.last.max(t.end);
                })
                .or_insert(Acc {
                    ops: 1,
                    busy: t.duration_hours,
                    first: t.start,
                    last: t.end,
                });
        }

        let by_machine = acc
            .into_iter()
            .map(|(machine, a)| {
                let span = as_hours(a.last - a.first);
                let util = if span > 0.0 { a.busy / span * 100.0 } else { 0.0 };
                (
                    machine.to_string(),
                    MachineMetrics {
                        ops: a.ops,
                        hours: round2(a.busy),
                        utilization_pct: round2(util),
                        span_hours: round2(span),
                    },
                )
            })
            .collect();

        Self {
            makespan_hours: round2(plan.makespan_hours()),
            by_machine,
            lateness: lateness(plan),
        }
    }

    /// Average utilization across machines (percent).
    pub fn avg_utilization_pct(&self) -> f64 {
        if self.by_machine.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.by_machine.values().map(|m| m.utilization_pct).sum();
        round2(sum / self.by_machine.len() as f64)
    }

    /// Whether the plan meets the given quality thresholds.
    ///
    /// A plan without due dates has no tardiness.
    pub fn meets_thresholds(&self, max_tardiness_h: f64, min_utilization_pct: f64) -> bool {
        let tardiness = self.lateness.as_ref().map_or(0.0, |l| l.total_tardiness_h);
        tardiness <= max_tardiness_h && self.avg_utilization_pct() >= min_utilization_pct
    }
}

fn lateness(plan: &Plan) -> Option<LatenessMetrics> {
    let lateness: Vec<f64> = plan.iter().filter_map(|t| t.lateness_hours()).collect();
    if lateness.is_empty() {
        return None;
    }

    let n = lateness.len() as f64;
    let total_lateness: f64 = lateness.iter().sum();
    let total_tardiness: f64 = lateness.iter().map(|l| l.max(0.0)).sum();
    let late = lateness.iter().filter(|&&l| l > 0.0).count() as f64;

    Some(LatenessMetrics {
        avg_lateness_h: round2(total_lateness / n),
        total_tardiness_h: round2(total_tardiness),
        percent_late: round2(late / n * 100.0),
    })
}

fn lateness_or_empty<S: Serializer>(
    value: &Option<LatenessMetrics>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(l) => l.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

fn lateness_from_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<LatenessMetrics>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(obj) if obj.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{hours, ScheduledTask};
    use chrono::{FixedOffset, TimeZone};

    fn t(h: f64) -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .unwrap()
            + hours(h)
    }

    fn task(id: &str, machine: &str, start: f64, dur: f64, due: Option<f64>) -> ScheduledTask {
        ScheduledTask {
            work_order_id: id.into(),
            product: "A".into(),
            operation: "A".into(),
            machine: machine.into(),
            start: t(start),
            end: t(start + dur),
            duration_hours: dur,
            due_date: due.map(t),
        }
    }

    fn plan(tasks: Vec<ScheduledTask>) -> Plan {
        Plan { tasks }
    }

    #[test]
    fn test_basic() {
        let m = PlanMetrics::calculate(&plan(vec![
            task("WO1", "M1", 0.0, 1.0, None),
            task("WO2", "M1", 1.0, 2.0, None),
        ]));
        assert!((m.makespan_hours - 3.0).abs() < 1e-10);
        let m1 = &m.by_machine["M1"];
        assert_eq!(m1.ops, 2);
        assert!((m1.hours - 3.0).abs() < 1e-10);
        assert!((m1.utilization_pct - 100.0).abs() < 1e-10);
        assert!((m1.span_hours - 3.0).abs() < 1e-10);
        assert!(m.lateness.is_none());
    }

    #[test]
    fn test_utilization_with_gap() {
        // 2h busy over a 3h span.
        let m = PlanMetrics::calculate(&plan(vec![
            task("WO1", "M1", 0.0, 1.0, None),
            task("WO2", "M1", 2.0, 1.0, None),
            task("WO3", "M2", 0.0, 3.0, None),
        ]));
        assert!((m.by_machine["M1"].utilization_pct - 66.67).abs() < 1e-10);
        assert!((m.by_machine["M2"].utilization_pct - 100.0).abs() < 1e-10);
        assert!((m.avg_utilization_pct() - 83.34).abs() < 1e-10);
    }

    #[test]
    fn test_zero_span() {
        let m = PlanMetrics::calculate(&plan(vec![task("WO1", "M1", 0.0, 0.0, None)]));
        assert_eq!(m.by_machine["M1"].utilization_pct, 0.0);
        assert_eq!(m.by_machine["M1"].span_hours, 0.0);
    }

    #[test]
    fn test_machine_span_uses_own_first_start() {
        let m = PlanMetrics::calculate(&plan(vec![
            task("WO1", "M1", 0.0, 4.0, None),
            task("WO2", "M2", 2.0, 1.0, None),
        ]));
        assert!((m.by_machine["M2"].span_hours - 1.0).abs() < 1e-10);
        assert!((m.by_machine["M2"].utilization_pct - 100.0).abs() < 1e-10);
        assert!((m.makespan_hours - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_lateness() {
        let m = PlanMetrics::calculate(&plan(vec![
            task("WO1", "M1", 0.0, 2.0, Some(1.0)), // +1
            task("WO2", "M1", 2.0, 2.0, Some(7.0)), // -3
            task("WO3", "M2", 0.0, 1.0, None),      // ignored
        ]));
        let l = m.lateness.unwrap();
        assert!((l.avg_lateness_h - -1.0).abs() < 1e-10);
        assert!((l.total_tardiness_h - 1.0).abs() < 1e-10);
        assert!((l.percent_late - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_on_time_exactly_not_late() {
        let m = PlanMetrics::calculate(&plan(vec![task("WO1", "M1", 0.0, 2.0, Some(2.0))]));
        let l = m.lateness.unwrap();
        assert_eq!(l.percent_late, 0.0);
        assert_eq!(l.total_tardiness_h, 0.0);
    }

    #[test]
    fn test_empty() {
        let m = PlanMetrics::calculate(&Plan::new());
        assert_eq!(m, PlanMetrics::default());
        assert_eq!(m.avg_utilization_pct(), 0.0);
    }

    #[test]
    fn test_serialized_shape() {
        let m = PlanMetrics::calculate(&plan(vec![task("WO1", "M1", 0.0, 2.0, None)]));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["lateness"], serde_json::json!({}));
        assert_eq!(json["by_machine"]["M1"]["ops"], 1);
        assert_eq!(json["makespan_hours"], 2.0);

        let back: PlanMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_serialized_lateness_roundtrip() {
        let m = PlanMetrics::calculate(&plan(vec![task("WO1", "M1", 0.0, 2.0, Some(1.0))]));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["lateness"]["percent_late"], 100.0);
        let back: PlanMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_meets_thresholds() {
        let m = PlanMetrics::calculate(&plan(vec![task("WO1", "M1", 0.0, 2.0, Some(1.5))]));
        assert!(m.meets_thresholds(0.5, 50.0));
        assert!(!m.meets_thresholds(0.4, 50.0));
        assert!(!m.meets_thresholds(1.0, 150.0));
    }
}
