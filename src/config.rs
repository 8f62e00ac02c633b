//! Problem configuration.
//!
//! A `ProblemConfig` carries every input of one planning run: the machine
//! list, the schedule start, the product mix, the priority rule, machine
//! downtime and the optional due-date policy. It is loaded from JSON and
//! validated before anything is generated or scheduled.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dispatching::{PriorityRule, SequencingMode};
use crate::error::{ScheduleError, ScheduleResult};
use crate::generator::{DueDatePolicy, MultiOpProduct, SimpleProduct};
use crate::models::{is_valid_hours, parse_timestamp, Timestamp, MAX_HOURS};

const REFERENCE_START: &str = "2025-08-09T08:00:00+08:00";

/// Configuration of one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemConfig {
    /// Machine ids, in tie-break order.
    pub machines: Vec<String>,

    /// Global schedule start (RFC 3339 with offset).
    pub start: Timestamp,

    /// Single-operation products, in numbering order.
    #[serde(default)]
    pub products: Vec<SimpleProduct>,

    /// Multi-step product.
    #[serde(default)]
    pub multi_op: MultiOpProduct,

    /// Priority rule.
    #[serde(default)]
    pub rule: PriorityRule,

    /// Sequencing mode
    #[serde(default)]
    pub sequencing: SequencingMode,

    /// Raw downtime: machine id → list of `[start, end]` strings.
    #[serde(default)]
    pub downtime: BTreeMap<String, Vec<(String, String)>>,

    /// Due-date assignment; `None` leaves operations undated.
    #[serde(default)]
    pub due_dates: Option<DueDatePolicy>,
}

impl Default for ProblemConfig {
    /// Five machines, 33/33/34 orders of A/B/C at 2/5/6 hours, LPT.
    fn default() -> Self {
        Self {
            machines: (1..=5).map(|i| format!("M{i}")).collect(),
            start: parse_timestamp(REFERENCE_START).unwrap_or_default(),
            products: vec![
                SimpleProduct::new("A", 33, 2.0),
                SimpleProduct::new("B", 33, 5.0),
                SimpleProduct::new("C", 34, 6.0),
            ],
            multi_op: MultiOpProduct::default(),
            rule: PriorityRule::Lpt,
            sequencing: SequencingMode::default(),
            downtime: BTreeMap::new(),
            due_dates: None,
        }
    }
}

impl ProblemConfig {
    /// Parses a JSON configuration.
    ///
    /// Counts that are not non-negative integers are reported as
    /// configuration errors naming the field.
    pub fn from_json_str(raw: &str) -> ScheduleResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        check_counts(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ScheduleResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Serializes as pretty-printed JSON.
    pub fn to_json_string(&self) -> ScheduleResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    ///
    /// Counts are unsigned, so only machines and the real-valued fields
    /// need checking. Downtime rows are not checked here; malformed rows
    /// are reported and skipped when the calendar is built.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.machines.is_empty() {
            return Err(ScheduleError::config(
                "machines",
                "at least one machine is required",
            ));
        }
        if let Some(blank) = self.machines.iter().position(|m| m.trim().is_empty()) {
            return Err(ScheduleError::config(
                format!("machines[{blank}]"),
                "machine id must not be blank",
            ));
        }

        for (i, p) in self.products.iter().enumerate() {
            non_negative(&format!("products[{i}].duration_hours"), p.duration_hours)?;
        }
        non_negative("multi_op.min_lag_hours", self.multi_op.min_lag_hours)?;

        if let Some(policy) = &self.due_dates {
            non_negative("due_dates.slack_hours", policy.slack_hours)?;
            non_negative("due_dates.jitter_hours", policy.jitter_hours)?;
        }

        Ok(())
    }

    /// Total number of work orders this configuration generates.
    pub fn work_order_count(&self) -> u64 {
        self.products
            .iter()
            .map(|p| u64::from(p.count))
            .sum::<u64>()
            + u64::from(self.multi_op.count)
    }
}

fn non_negative(field: &str, value: f64) -> ScheduleResult<()> {
    if is_valid_hours(value) {
        Ok(())
    } else {
        Err(ScheduleError::config(
            field,
            format!("must be a number between 0 and {MAX_HOURS}, got {value}"),
        ))
    }
}

fn check_counts(value: &serde_json::Value) -> ScheduleResult<()> {
    let check = |field: String, count: Option<&serde_json::Value>| match count {
        None => Ok(()),
        Some(v) if v.as_u64().is_some_and(|n| u32::try_from(n).is_ok()) => Ok(()),
        Some(v) => Err(ScheduleError::config(
            field,
            format!("must be a non-negative integer count, got {v}"),
        )),
    };

    if let Some(products) = value.get("products").and_then(serde_json::Value::as_array) {
        for (i, p) in products.iter().enumerate() {
            check(format!("products[{i}].count"), p.get("count"))?;
        }
    }
    check("multi_op.count".into(), value.get("multi_op").and_then(|m| m.get("count")))
}
