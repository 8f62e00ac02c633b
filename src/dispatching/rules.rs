//! Built-in dispatching rules.
//!
//! # Score Convention
//! All rules return lower scores for operations that should be
//! considered first.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use super::{DispatchingRule, RuleScore};
use crate::models::Operation;

/// Longest Processing Time.
///
/// Prioritizes operations with longer processing time.
/// Useful for load balancing on identical parallel machines.
///
/// # Reference
/// Graham (1969), LPT bound of 4/3 - 1/(3m) for P||C_max.
#[derive(Debug, Clone, Copy)]
pub struct Lpt;

impl DispatchingRule for Lpt {
    fn name(&self) -> &'static str {
        "LPT"
    }

    fn evaluate(&self, op: &Operation) -> RuleScore {
        -op.duration_hours
    }

    fn description(&self) -> &'static str {
        "Longest Processing Time"
    }
}

/// Earliest Due Date.
///
/// Prioritizes operations with earlier due dates. Operations without a
/// due date sort after every dated one.
///
/// # Reference
/// Jackson (1955), optimal for minimizing maximum lateness on single machine.
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, op: &Operation) -> RuleScore {
        op.due_date
            .map(|d| d.timestamp_micros() as f64)
            .unwrap_or(f64::INFINITY)
    }

    fn description(&self) -> &'static str {
        "Earliest Due Date"
    }
}

/// Weighted Shortest Processing Time.
///
/// All operations carry unit weight, so this orders by processing time
/// ascending (equivalent to SPT).
///
/// # Reference
/// Smith (1956), optimal for minimizing weighted mean flow time.
#[derive(Debug, Clone, Copy)]
pub struct Wspt;

impl DispatchingRule for Wspt {
    fn name(&self) -> &'static str {
        "WSPT"
    }

    fn evaluate(&self, op: &Operation) -> RuleScore {
        const WEIGHT: f64 = 1.0;
        op.duration_hours / WEIGHT
    }

    fn description(&self) -> &'static str {
        "Weighted Shortest Processing Time (unit weights)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn op(id: &str, hours: f64) -> Operation {
        Operation::simple(id, "A", hours)
    }

    fn due(day: u32) -> crate::models::Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 8, day, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_lpt() {
        assert!(Lpt.evaluate(&op("long", 6.0)) < Lpt.evaluate(&op("short", 2.0)));
    }

    #[test]
    fn test_wspt() {
        assert!(Wspt.evaluate(&op("short", 2.0)) < Wspt.evaluate(&op("long", 6.0)));
    }

    #[test]
    fn test_edd_undated_last() {
        let early = op("early", 1.0).with_due_date(due(10));
        let late = op("late", 1.0).with_due_date(due(20));
        let undated = op("undated", 1.0);
        assert!(Edd.evaluate(&early) < Edd.evaluate(&late));
        assert!(Edd.evaluate(&late) < Edd.evaluate(&undated));
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(Lpt.name(), "LPT");
        assert_eq!(Edd.description(), "Earliest Due Date");
        assert_eq!(Wspt.name(), "WSPT");
    }
}
