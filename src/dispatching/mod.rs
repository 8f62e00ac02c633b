//! Dispatching rules and operation sequencing.
//!
//! Provides the priority rules (LPT, EDD, WSPT) and the [`Sequencer`]
//! that turns an operation list into the total processing order used by
//! the list scheduler.
//!
//! # Usage
//!
//! ```
//! use u_aps::dispatching::{PriorityRule, Sequencer};
//! use u_aps::models::Operation;
//!
//! let ops = vec![
//!     Operation::simple("WO1", "A", 2.0),
//!     Operation::step("WO2", "D", 1, 1.0),
//! ];
//! let order = Sequencer::new(PriorityRule::Lpt).sort_indices(&ops);
//! assert_eq!(order, vec![1, 0]); // multi-step orders go first
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

mod engine;
pub mod rules;

pub use engine::{SequencingMode, Sequencer};

use std::fmt::{self, Debug};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::Operation;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (considered first).
pub type RuleScore = f64;

/// A dispatching rule that scores a single operation.
///
/// # Score Convention
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "LPT", "EDD").
    fn name(&self) -> &'static str;

    /// Scores an operation; lower = considered first.
    fn evaluate(&self, op: &Operation) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// The selectable priority rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriorityRule {
    /// Longest processing time first.
    #[default]
    Lpt,
    /// Earliest due date first, undated last.
    Edd,
    /// Shortest processing time first (unit weights).
    Wspt,
}

impl PriorityRule {
    /// All rules, in declaration order.
    pub const ALL: [PriorityRule; 3] = [Self::Lpt, Self::Edd, Self::Wspt];

    /// The rule implementation.
    pub fn as_rule(self) -> &'static dyn DispatchingRule {
        match self {
            Self::Lpt => &rules::Lpt,
            Self::Edd => &rules::Edd,
            Self::Wspt => &rules::Wspt,
        }
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_rule().name())
    }
}

impl FromStr for PriorityRule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_rule().name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ScheduleError::config("rule", format!("unknown priority rule `{s}` (expected LPT, EDD or WSPT)"))
            })
    }
}
