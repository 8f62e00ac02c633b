//! Machine downtime windows.
//!
//! Downtime is declared per machine as raw `[start, end)` pairs that may
//! overlap. Before scheduling they are normalized into an [`IntervalSet`]:
//! sorted by start, merged when overlapping or touching.
//!
//! # Time Model
//! Half-open intervals: a task ending exactly when downtime starts, or
//! starting exactly when it ends, does not conflict.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::time::{parse_timestamp, Timestamp};
use crate::error::MalformedDowntime;

/// A time interval [start, end).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: Timestamp,
    /// Interval end (exclusive).
    pub end: Timestamp,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Length of this window.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t < self.end
    }

    /// Whether `[start, end)` intersects this window.
    #[inline]
    pub fn intersects(&self, start: Timestamp, end: Timestamp) -> bool {
        start < self.end && end > self.start
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.intersects(other.start, other.end)
    }
}

/// A raw downtime declaration for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeInterval {
    /// Machine identifier.
    pub machine: String,
    /// Downtime start.
    pub start: Timestamp,
    /// Downtime end (must be after start).
    pub end: Timestamp,
}

impl DowntimeInterval {
    /// Creates a downtime declaration.
    pub fn new(machine: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            machine: machine.into(),
            start,
            end,
        }
    }
}

/// Merges overlapping or adjacent windows, sorted by start.
pub fn normalize(raw: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut sorted = raw.to_vec();
    sorted.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(sorted.len());
    for w in sorted {
        match merged.last_mut() {
            Some(last) if w.start <= last.end => {
                if w.end > last.end {
                    last.end = w.end;
                }
            }
            _ => merged.push(w),
        }
    }
    merged
}

/// Smallest `t >= candidate` such that `[t, t + duration)` avoids every
/// window in `merged`.
///
/// On the first conflicting window the candidate jumps to that window's
/// end and the scan restarts. Each restart strictly increases the
/// candidate, so the loop ends after at most `merged.len()` restarts.
/// A `t + duration` past the calendar's range is treated as open-ended.
pub fn earliest_feasible_start(
    candidate: Timestamp,
    duration: Duration,
    merged: &[TimeWindow],
) -> Timestamp {
    let mut t = candidate;
    'scan: loop {
        for w in merged {
            let blocked = match t.checked_add_signed(duration) {
                Some(end) => w.intersects(t, end),
                None => t < w.end,
            };
            if blocked {
                t = w.end;
                continue 'scan;
            }
        }
        return t;
    }
}

/// Normalized downtime of a single machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSet {
    windows: Vec<TimeWindow>,
}

impl IntervalSet {
    /// Creates an empty set (machine always available).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized set from raw windows.
    pub fn from_windows(raw: &[TimeWindow]) -> Self {
        Self {
            windows: normalize(raw),
        }
    }

    /// The merged windows, sorted by start.
    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Whether the set has no windows.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// See [`earliest_feasible_start`].
    pub fn earliest_feasible_start(&self, candidate: Timestamp, duration: Duration) -> Timestamp {
        earliest_feasible_start(candidate, duration, &self.windows)
    }

    /// Whether `[start, end)` intersects any window.
    pub fn conflicts(&self, start: Timestamp, end: Timestamp) -> bool {
        self.windows.iter().any(|w| w.intersects(start, end))
    }

    /// Total downtime overlapping `[start, end)`.
    pub fn blocked_within(&self, start: Timestamp, end: Timestamp) -> Duration {
        if end <= start {
            return Duration::zero();
        }
        self.windows
            .iter()
            .filter_map(|w| {
                let s = w.start.max(start);
                let e = w.end.min(end);
                (e > s).then(|| e - s)
            })
            .fold(Duration::zero(), |acc, d| acc + d)
    }
}

/// Normalized downtime for every machine that declares any.
///
/// Machines without an entry are always available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DowntimeCalendar {
    machines: BTreeMap<String, IntervalSet>,
}

impl DowntimeCalendar {
    /// Creates an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a calendar from typed declarations.
    ///
    /// Declarations with `end <= start` are dropped and reported.
    pub fn from_intervals(
        intervals: impl IntoIterator<Item = DowntimeInterval>,
    ) -> (Self, Vec<MalformedDowntime>) {
        let mut raw: BTreeMap<String, Vec<TimeWindow>> = BTreeMap::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut issues = Vec::new();

        for iv in intervals {
            let counter = seen.entry(iv.machine.clone()).or_insert(0);
            let index = *counter;
            *counter += 1;

            if iv.end <= iv.start {
                issues.push(report(&iv.machine, index, "end is not after start".into()));
                continue;
            }
            raw.entry(iv.machine)
                .or_default()
                .push(TimeWindow::new(iv.start, iv.end));
        }

        (Self::from_raw_windows(raw), issues)
    }

    /// Builds a calendar from textual `(start, end)` pairs keyed by machine.
    ///
    /// Unparseable timestamps and empty or inverted windows are dropped
    /// and reported; the remaining rows are normalized.
    pub fn from_raw(raw: &BTreeMap<String, Vec<(String, String)>>) -> (Self, Vec<MalformedDowntime>) {
        let mut windows: BTreeMap<String, Vec<TimeWindow>> = BTreeMap::new();
        let mut issues = Vec::new();

        for (machine, rows) in raw {
            for (index, (start, end)) in rows.iter().enumerate() {
                let parsed = parse_timestamp(start)
                    .map_err(|e| format!("unparseable start `{start}`: {e}"))
                    .and_then(|s| {
                        parse_timestamp(end)
                            .map(|e| (s, e))
                            .map_err(|e| format!("unparseable end `{end}`: {e}"))
                    });
                match parsed {
                    Ok((s, e)) if e > s => windows
                        .entry(machine.clone())
                        .or_default()
                        .push(TimeWindow::new(s, e)),
                    Ok(_) => issues.push(report(machine, index, "end is not after start".into())),
                    Err(reason) => issues.push(report(machine, index, reason)),
                }
            }
        }

        (Self::from_raw_windows(windows), issues)
    }

    fn from_raw_windows(raw: BTreeMap<String, Vec<TimeWindow>>) -> Self {
        let machines = raw
            .into_iter()
            .map(|(m, ws)| (m, IntervalSet::from_windows(&ws)))
            .filter(|(_, set)| !set.is_empty())
            .collect();
        Self { machines }
    }

    /// Normalized downtime of a machine, if any.
    pub fn for_machine(&self, machine: &str) -> Option<&IntervalSet> {
        self.machines.get(machine)
    }

    /// Earliest start on `machine` at or after `candidate` that avoids downtime.
    pub fn earliest_feasible_start(
        &self,
        machine: &str,
        candidate: Timestamp,
        duration: Duration,
    ) -> Timestamp {
        match self.machines.get(machine) {
            Some(set) => set.earliest_feasible_start(candidate, duration),
            None => candidate,
        }
    }

    /// Machines with declared downtime.
    pub fn machines(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }

    /// Whether no machine has downtime.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

fn report(machine: &str, index: usize, reason: String) -> MalformedDowntime {
    let issue = MalformedDowntime {
        machine: machine.to_string(),
        index,
        reason,
    };
    warn!(machine = %issue.machine, row = issue.index, reason = %issue.reason, "dropping downtime row");
    issue
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> Timestamp {
        chrono::FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 8, 9, h, m, 0)
            .unwrap()
    }

    fn w(a: u32, b: u32) -> TimeWindow {
        TimeWindow::new(at(a, 0), at(b, 0))
    }

    #[test]
    fn test_time_window() {
        let win = w(8, 10);
        assert_eq!(win.duration(), Duration::hours(2));
        assert!(win.contains(at(8, 0)));
        assert!(win.contains(at(9, 59)));
        assert!(!win.contains(at(10, 0))); // exclusive end
    }

    #[test]
    fn test_time_window_overlap() {
        assert!(w(8, 10).overlaps(&w(9, 11)));
        assert!(!w(8, 10).overlaps(&w(10, 12))); // touching
    }

    #[test]
    fn test_normalize_overlapping() {
        let merged = normalize(&[w(8, 10), w(9, 11)]);
        assert_eq!(merged, vec![w(8, 11)]);
    }

    #[test]
    fn test_normalize_adjacent_and_unsorted() {
        let merged = normalize(&[w(14, 15), w(10, 12), w(8, 10), w(11, 12)]);
        assert_eq!(merged, vec![w(8, 12), w(14, 15)]);
    }

    #[test]
    fn test_normalize_contained() {
        let merged = normalize(&[w(8, 16), w(9, 10)]);
        assert_eq!(merged, vec![w(8, 16)]);
    }

    #[test]
    fn test_earliest_start_no_conflict() {
        let set = IntervalSet::from_windows(&[w(12, 13)]);
        assert_eq!(set.earliest_feasible_start(at(8, 0), Duration::hours(2)), at(8, 0));
        // Ends exactly when downtime starts.
        assert_eq!(set.earliest_feasible_start(at(10, 0), Duration::hours(2)), at(10, 0));
    }

    #[test]
    fn test_earliest_start_pushed_past_window() {
        let set = IntervalSet::from_windows(&[w(8, 11)]);
        assert_eq!(set.earliest_feasible_start(at(8, 0), Duration::hours(2)), at(11, 0));
        // Window would straddle the downtime start.
        assert_eq!(set.earliest_feasible_start(at(7, 0), Duration::hours(2)), at(11, 0));
    }

    #[test]
    fn test_earliest_start_cascades() {
        // Gap 10-11 too small for a 2h task.
        let set = IntervalSet::from_windows(&[w(8, 10), w(11, 12), w(15, 16)]);
        assert_eq!(set.earliest_feasible_start(at(8, 0), Duration::hours(2)), at(12, 0));
        assert_eq!(set.earliest_feasible_start(at(8, 0), Duration::hours(4)), at(16, 0));
    }

    #[test]
    fn test_earliest_start_duration_past_calendar_range() {
        // hours(1e300) saturates here; t + duration has no representation.
        let huge = Duration::microseconds(i64::MAX);
        let set = IntervalSet::from_windows(&[w(8, 10), w(12, 13)]);
        assert_eq!(set.earliest_feasible_start(at(7, 0), huge), at(13, 0));
        assert_eq!(set.earliest_feasible_start(at(14, 0), huge), at(14, 0));
    }

    #[test]
    fn test_blocked_within() {
        let set = IntervalSet::from_windows(&[w(8, 10), w(12, 13)]);
        assert_eq!(set.blocked_within(at(9, 0), at(12, 30)), Duration::minutes(90));
        assert_eq!(set.blocked_within(at(13, 0), at(12, 0)), Duration::zero());
    }

    #[test]
    fn test_calendar_from_raw_skips_malformed() {
        let mut raw = BTreeMap::new();
        raw.insert(
            "M1".to_string(),
            vec![
                ("2025-08-09T08:00:00+08:00".into(), "2025-08-09T10:00:00+08:00".into()),
                ("2025-08-09T12:00:00+08:00".into(), "2025-08-09T11:00:00+08:00".into()),
                ("garbage".into(), "2025-08-09T11:00:00+08:00".into()),
                ("2025-08-09 09:00:00+08:00".into(), "2025-08-09 11:00:00+08:00".into()),
            ],
        );

        let (cal, issues) = DowntimeCalendar::from_raw(&raw);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[1].index, 2);
        assert!(issues[1].reason.contains("garbage"));

        let m1 = cal.for_machine("M1").unwrap();
        assert_eq!(m1.windows(), &[w(8, 11)]);
        assert!(cal.for_machine("M2").is_none());
    }

    #[test]
    fn test_calendar_from_intervals() {
        let (cal, issues) = DowntimeCalendar::from_intervals(vec![
            DowntimeInterval::new("M1", at(8, 0), at(9, 0)),
            DowntimeInterval::new("M2", at(9, 0), at(9, 0)), // empty
            DowntimeInterval::new("M1", at(9, 0), at(10, 0)),
        ]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].machine, "M2");
        assert_eq!(cal.for_machine("M1").unwrap().windows(), &[w(8, 10)]);
        assert_eq!(cal.machines().collect::<Vec<_>>(), vec!["M1"]);
    }

    #[test]
    fn test_calendar_unknown_machine_is_free() {
        let cal = DowntimeCalendar::new();
        assert!(cal.is_empty());
        assert_eq!(
            cal.earliest_feasible_start("M9", at(8, 0), Duration::hours(1)),
            at(8, 0)
        );
    }
}
