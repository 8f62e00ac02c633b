//! Input and plan validation.
//!
//! [`validate_input`] checks the structural integrity of an operation
//! list and machine list before scheduling. Detects:
//! - Empty or duplicated machine lists
//! - Negative, non-finite or out-of-range durations
//! - Multi-step work orders whose indices are not `1..=n`
//! - Work-order ids shared between single-step and multi-step operations
//!
//! [`validate_plan`] re-checks the task invariants of a plan that was
//! edited outside the engine. It reports violations without rejecting
//! the plan; the required-field check on ingest is the hard gate.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{hours, is_valid_hours, DowntimeCalendar, Operation, Plan};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No machines were supplied.
    EmptyMachineList,
    /// A machine id appears more than once.
    DuplicateMachine,
    /// A duration is negative, NaN, infinite or above `MAX_HOURS`.
    InvalidDuration,
    /// A multi-step work order has missing, repeated or non-1-based indices.
    BrokenOperationChain,
    /// A work-order id is used by both single-step and multi-step operations.
    MixedWorkOrder,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the inputs of a scheduling run.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(operations: &[Operation], machines: &[String]) -> ValidationResult {
    let mut errors = Vec::new();

    if machines.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyMachineList,
            "At least one machine is required",
        ));
    }

    let mut machine_ids = HashSet::new();
    for m in machines {
        if !machine_ids.insert(m.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateMachine,
                format!("Duplicate machine ID: {m}"),
            ));
        }
    }

    for op in operations {
        if !is_valid_hours(op.duration_hours) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!(
                    "Operation '{}' of work order '{}' has invalid duration {}",
                    op.label(),
                    op.work_order_id,
                    op.duration_hours
                ),
            ));
        }
    }

    errors.extend(check_chains(operations));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that every multi-step work order carries indices `1..=n`.
fn check_chains(operations: &[Operation]) -> Vec<ValidationError> {
    let mut chains: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    let mut single: HashSet<&str> = HashSet::new();

    for op in operations {
        match op.op_index {
            Some(k) => chains.entry(op.work_order_id.as_str()).or_default().push(k),
            None => {
                single.insert(op.work_order_id.as_str());
            }
        }
    }

    let mut errors = Vec::new();
    for (wo, mut indices) in chains {
        if single.contains(wo) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MixedWorkOrder,
                format!("Work order '{wo}' mixes single-step and multi-step operations"),
            ));
        }

        indices.sort_unstable();
        let contiguous = indices
            .iter()
            .enumerate()
            .all(|(i, &k)| k as usize == i + 1);
        if !contiguous {
            errors.push(ValidationError::new(
                ValidationErrorKind::BrokenOperationChain,
                format!("Work order '{wo}' has operation indices {indices:?}, expected 1..={}", indices.len()),
            ));
        }
    }
    errors
}

/// A task invariant broken in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Position of the offending task in the plan.
    pub task_index: usize,
    /// Human-readable description.
    pub message: String,
}

/// Classification of plan violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// `end != start + duration_hours`.
    DurationMismatch,
    /// Two tasks on the same machine overlap in time.
    MachineOverlap,
    /// A task overlaps downtime of its machine.
    ResourceUnavailable,
    /// A task starts before the previous task of its work order ends.
    PrecedenceViolation,
}

/// Tolerance for end-vs-duration comparisons of hand-edited plans.
const DURATION_TOLERANCE_US: i64 = 1_000;

/// Re-checks task invariants of a plan.
///
/// Precedence is checked between consecutive tasks of the same work
/// order in plan order, which is how the engine emits chains.
pub fn validate_plan(plan: &Plan, downtime: Option<&DowntimeCalendar>) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (i, t) in plan.iter().enumerate() {
        let tolerance = Duration::microseconds(DURATION_TOLERANCE_US);
        match t.start.checked_add_signed(hours(t.duration_hours)) {
            Some(expected) => {
                let drift = t.end - expected;
                if drift > tolerance || drift < -tolerance {
                    violations.push(Violation {
                        violation_type: ViolationType::DurationMismatch,
                        task_index: i,
                        message: format!(
                            "Task {} of '{}' ends at {} but start + {}h is {}",
                            t.operation, t.work_order_id, t.end, t.duration_hours, expected
                        ),
                    });
                }
            }
            None => violations.push(Violation {
                violation_type: ViolationType::DurationMismatch,
                task_index: i,
                message: format!(
                    "Task {} of '{}' has duration {}h, past the representable calendar",
                    t.operation, t.work_order_id, t.duration_hours
                ),
            }),
        }

        if let Some(set) = downtime.and_then(|d| d.for_machine(&t.machine)) {
            if set.conflicts(t.start, t.end) {
                violations.push(Violation {
                    violation_type: ViolationType::ResourceUnavailable,
                    task_index: i,
                    message: format!(
                        "Task {} of '{}' overlaps downtime on {}",
                        t.operation, t.work_order_id, t.machine
                    ),
                });
            }
        }
    }

    // Machine overlap: sort each machine's tasks by start.
    let mut by_machine: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, t) in plan.iter().enumerate() {
        by_machine.entry(t.machine.as_str()).or_default().push(i);
    }
    let mut machines: Vec<_> = by_machine.into_iter().collect();
    machines.sort_by(|a, b| a.0.cmp(b.0));
    for (machine, mut idx) in machines {
        idx.sort_by_key(|&i| plan.tasks[i].start);
        for pair in idx.windows(2) {
            let (prev, next) = (&plan.tasks[pair[0]], &plan.tasks[pair[1]]);
            if next.start < prev.end {
                violations.push(Violation {
                    violation_type: ViolationType::MachineOverlap,
                    task_index: pair[1],
                    message: format!(
                        "Task {} of '{}' starts on {} before {} of '{}' ends",
                        next.operation, next.work_order_id, machine, prev.operation, prev.work_order_id
                    ),
                });
            }
        }
    }

    // Precedence within work orders.
    let mut last_in_order: HashMap<&str, usize> = HashMap::new();
    for (i, t) in plan.iter().enumerate() {
        if let Some(&p) = last_in_order.get(t.work_order_id.as_str()) {
            let prev = &plan.tasks[p];
            if t.start < prev.end {
                violations.push(Violation {
                    violation_type: ViolationType::PrecedenceViolation,
                    task_index: i,
                    message: format!(
                        "Task {} of '{}' starts before {} ends",
                        t.operation, t.work_order_id, prev.operation
                    ),
                });
            }
        }
        last_in_order.insert(t.work_order_id.as_str(), i);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DowntimeInterval, ScheduledTask, Timestamp};
    use chrono::{FixedOffset, TimeZone};

    fn machines(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn sample_ops() -> Vec<Operation> {
        vec![
            Operation::simple("WO1", "A", 2.0),
            Operation::step("WO2", "D", 1, 1.0),
            Operation::step("WO2", "D", 2, 3.0),
            Operation::step("WO2", "D", 3, 2.0),
        ]
    }

    #[test]
    fn test_valid_input() {
        assert!(validate_input(&sample_ops(), &machines(&["M1", "M2"])).is_ok());
    }

    #[test]
    fn test_empty_machine_list() {
        let errors = validate_input(&sample_ops(), &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::EmptyMachineList));
    }

    #[test]
    fn test_duplicate_machine() {
        let errors = validate_input(&[], &machines(&["M1", "M1"])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateMachine && e.message.contains("M1")));
    }

    #[test]
    fn test_invalid_duration() {
        let ops = vec![
            Operation::simple("WO1", "A", -1.0),
            Operation::simple("WO2", "A", f64::NAN),
            Operation::simple("WO3", "A", 0.0),
            Operation::simple("WO4", "A", 1e9),
            Operation::simple("WO5", "A", crate::models::MAX_HOURS),
        ];
        let errors = validate_input(&ops, &machines(&["M1"])).unwrap_err();
        let invalid: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
            .collect();
        assert_eq!(invalid.len(), 3);
    }

    #[test]
    fn test_broken_chain() {
        let ops = vec![
            Operation::step("WO1", "D", 1, 1.0),
            Operation::step("WO1", "D", 3, 2.0),
        ];
        let errors = validate_input(&ops, &machines(&["M1"])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::BrokenOperationChain));
    }

    #[test]
    fn test_repeated_index() {
        let ops = vec![
            Operation::step("WO1", "D", 1, 1.0),
            Operation::step("WO1", "D", 1, 1.0),
        ];
        let errors = validate_input(&ops, &machines(&["M1"])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::BrokenOperationChain));
    }

    #[test]
    fn test_mixed_work_order() {
        let ops = vec![
            Operation::simple("WO1", "A", 1.0),
            Operation::step("WO1", "D", 1, 1.0),
        ];
        let errors = validate_input(&ops, &machines(&["M1"])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::MixedWorkOrder));
    }

    #[test]
    fn test_multiple_errors() {
        let ops = vec![Operation::simple("WO1", "A", -2.0)];
        let errors = validate_input(&ops, &[]).unwrap_err();
        assert!(errors.len() >= 2);
    }

    fn t(h: i64) -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn task(id: &str, machine: &str, start: i64, end: i64, dur: f64) -> ScheduledTask {
        ScheduledTask {
            work_order_id: id.into(),
            product: "A".into(),
            operation: "A".into(),
            machine: machine.into(),
            start: t(start),
            end: t(end),
            duration_hours: dur,
            due_date: None,
        }
    }

    #[test]
    fn test_validate_plan_clean() {
        let plan = Plan {
            tasks: vec![task("WO1", "M1", 0, 2, 2.0), task("WO2", "M1", 2, 5, 3.0)],
        };
        assert!(validate_plan(&plan, None).is_empty());
    }

    #[test]
    fn test_validate_plan_detects_edits() {
        let plan = Plan {
            tasks: vec![
                task("WO1", "M1", 0, 2, 2.0),
                task("WO2", "M1", 1, 4, 2.0), // overlaps WO1, wrong end
                task("WO1", "M2", 1, 2, 1.0), // precedes end of WO1's first task
            ],
        };
        let v = validate_plan(&plan, None);
        let kinds: Vec<_> = v.iter().map(|x| x.violation_type.clone()).collect();
        assert!(kinds.contains(&ViolationType::DurationMismatch));
        assert!(kinds.contains(&ViolationType::MachineOverlap));
        assert!(kinds.contains(&ViolationType::PrecedenceViolation));
    }

    #[test]
    fn test_validate_plan_duration_past_calendar() {
        let plan = Plan {
            tasks: vec![task("WO1", "M1", 0, 2, 1e300)],
        };
        let v = validate_plan(&plan, None);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::DurationMismatch);
        assert!(v[0].message.contains("representable calendar"));
    }

    #[test]
    fn test_validate_plan_downtime() {
        let plan = Plan {
            tasks: vec![task("WO1", "M1", 0, 2, 2.0)],
        };
        let (cal, _) = DowntimeCalendar::from_intervals(vec![DowntimeInterval::new("M1", t(1), t(3))]);
        let v = validate_plan(&plan, Some(&cal));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::ResourceUnavailable);
    }
}
