//! Plan export and re-ingest.
//!
//! Export writes the `{"plan": [...]}` payload, one record per task.
//! Ingest accepts that payload or a bare array of records, checks every
//! row for the required fields before touching any of them, and only
//! then builds the new plan. A single bad row rejects the whole ingest.

use serde_json::{Map, Value};
use tracing::warn;

use super::schedule::{Plan, ScheduledTask};
use super::time::{is_valid_hours, parse_timestamp, Timestamp, MAX_HOURS};
use crate::error::{ScheduleError, ScheduleResult};

/// Fields every ingested row must carry. `duration` may also be spelled
/// `duration_hours`.
pub const REQUIRED_FIELDS: [&str; 6] = ["id", "product", "machine", "start", "end", "duration"];

const DURATION_KEYS: [&str; 2] = ["duration_hours", "duration"];

impl Plan {
    /// Encodes the plan as the `{"plan": [...]}` export payload.
    pub fn to_json_value(&self) -> ScheduleResult<Value> {
        let mut payload = Map::new();
        payload.insert("plan".into(), serde_json::to_value(self)?);
        Ok(Value::Object(payload))
    }

    /// Pretty-printed export payload.
    pub fn to_json_string(&self) -> ScheduleResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value()?)?)
    }

    /// Parses an export payload or a bare record array.
    pub fn from_json_str(raw: &str) -> ScheduleResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json_value(value)
    }

    /// Accepts `{"plan": [...]}` or `[...]`.
    pub fn from_json_value(value: Value) -> ScheduleResult<Self> {
        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut obj) => match obj.remove("plan") {
                Some(Value::Array(rows)) => rows,
                Some(_) => {
                    return Err(ScheduleError::IngestInvalidRow {
                        row: 0,
                        reason: "`plan` must be an array of records".into(),
                    })
                }
                None => {
                    return Err(ScheduleError::IngestInvalidRow {
                        row: 0,
                        reason: "payload has no `plan` field".into(),
                    })
                }
            },
            _ => {
                return Err(ScheduleError::IngestInvalidRow {
                    row: 0,
                    reason: "expected an object or an array".into(),
                })
            }
        };
        Self::from_records(&rows)
    }

    /// Builds a plan from loosely-typed records.
    ///
    /// All rows are checked for required fields first; no plan is built
    /// unless every row passes.
    pub fn from_records(rows: &[Value]) -> ScheduleResult<Self> {
        let mut records = Vec::with_capacity(rows.len());
        for (row, value) in rows.iter().enumerate() {
            let obj = value.as_object().ok_or_else(|| ScheduleError::IngestInvalidRow {
                row,
                reason: "record is not an object".into(),
            })?;
            let missing = missing_fields(obj);
            if !missing.is_empty() {
                warn!(row, ?missing, "rejecting plan ingest");
                return Err(ScheduleError::IngestMissingFields { row, missing });
            }
            records.push(obj);
        }

        let tasks = records
            .into_iter()
            .enumerate()
            .map(|(row, obj)| parse_row(row, obj))
            .collect::<ScheduleResult<Vec<_>>>()?;

        Ok(Plan { tasks })
    }
}

fn is_present(obj: &Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), Some(v) if !v.is_null())
}

fn missing_fields(obj: &Map<String, Value>) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|&&field| {
            if field == "duration" {
                !DURATION_KEYS.iter().any(|k| is_present(obj, k))
            } else {
                !is_present(obj, field)
            }
        })
        .map(|f| f.to_string())
        .collect()
}

fn parse_row(row: usize, obj: &Map<String, Value>) -> ScheduleResult<ScheduledTask> {
    let invalid = |reason: String| ScheduleError::IngestInvalidRow { row, reason };

    let text = |key: &str| -> ScheduleResult<String> {
        match obj.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(invalid(format!("`{key}` must be a string"))),
        }
    };
    let timestamp = |key: &str| -> ScheduleResult<Timestamp> {
        let raw = obj
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("`{key}` must be a timestamp string")))?;
        parse_timestamp(raw).map_err(|e| invalid(format!("`{key}` = `{raw}`: {e}")))
    };

    let duration_hours = DURATION_KEYS
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("duration must be a number of hours".into()))?;
    if !is_valid_hours(duration_hours) {
        return Err(invalid(format!(
            "duration {duration_hours} is outside 0..={MAX_HOURS} hours"
        )));
    }

    let product = text("product")?;
    let operation = match obj.get("operation") {
        Some(Value::String(s)) => s.clone(),
        _ => product.clone(),
    };
    let due_date = match obj.get("due_date") {
        None | Some(Value::Null) => None,
        Some(_) => Some(timestamp("due_date")?),
    };

    Ok(ScheduledTask {
        work_order_id: text("id")?,
        product,
        operation,
        machine: text("machine")?,
        start: timestamp("start")?,
        end: timestamp("end")?,
        duration_hours,
        due_date,
    })
}
