//! Work-order generation.
//!
//! Expands product counts into concrete operations. Simple products
//! yield one operation per work order. The multi-step product yields a
//! chain of three operations (1h, 3h, 2h) sharing one work-order id.
//!
//! Work-order ids are `WO1, WO2, ...` numbered across simple products in
//! configuration order, then across multi-step orders.
//!
//! # Due dates
//! When a [`DueDatePolicy`] is set:
//! - simple operation: `start + duration + slack + U(-jitter, +jitter)`
//! - multi-step order: `start + sum(profile) + 2 * min_lag + slack`,
//!   shared by all steps, without jitter.
//!
//! The jitter asymmetry between the two product kinds is intentional
//! and kept as is.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScheduleError, ScheduleResult};
use crate::models::{
    hours, is_valid_hours, Operation, Timestamp, MAX_HOURS, MULTI_OP_PRODUCT, MULTI_OP_PROFILE,
};

/// Count and duration of a single-operation product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleProduct {
    /// Product code.
    pub code: String,
    /// Number of work orders to generate.
    pub count: u32,
    /// Processing time per work order (hours).
    pub duration_hours: f64,
}

impl SimpleProduct {
    /// Creates a product definition.
    pub fn new(code: impl Into<String>, count: u32, duration_hours: f64) -> Self {
        Self {
            code: code.into(),
            count,
            duration_hours,
        }
    }
}

/// Count and inter-step lag of the multi-step product.
///
/// The step profile is fixed (see [`MULTI_OP_PROFILE`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiOpProduct {
    /// Number of work orders to generate.
    pub count: u32,
    /// Minimum gap between consecutive steps (hours).
    pub min_lag_hours: f64,
}

impl MultiOpProduct {
    /// Creates a multi-step product definition.
    pub fn new(count: u32, min_lag_hours: f64) -> Self {
        Self {
            count,
            min_lag_hours,
        }
    }
}

/// Due-date assignment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueDatePolicy {
    /// Whether due dates are assigned at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Slack added on top of the nominal completion time (hours).
    #[serde(default)]
    pub slack_hours: f64,
    /// Half-width of the uniform jitter for simple products (hours).
    #[serde(default)]
    pub jitter_hours: f64,
    /// Seed of the jitter random source.
    #[serde(default)]
    pub seed: u64,
}

fn default_enabled() -> bool {
    true
}

impl DueDatePolicy {
    /// Creates an enabled policy.
    pub fn new(slack_hours: f64, jitter_hours: f64, seed: u64) -> Self {
        Self {
            enabled: true,
            slack_hours,
            jitter_hours,
            seed,
        }
    }

    /// A random source seeded from this policy.
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

/// Expands product definitions into operations.
///
/// # Example
///
/// ```
/// use chrono::DateTime;
/// use u_aps::generator::{MultiOpProduct, SimpleProduct, WorkOrderGenerator};
///
/// let start = DateTime::parse_from_rfc3339("2025-08-09T08:00:00+08:00").unwrap();
/// let ops = WorkOrderGenerator::new(start).generate_seeded(
///     &[SimpleProduct::new("A", 2, 2.0)],
///     &MultiOpProduct::new(1, 1.0),
/// ).unwrap();
/// assert_eq!(ops.len(), 5);
/// assert_eq!(ops[2].label(), "D1");
/// assert_eq!(ops[2].work_order_id, "WO3");
/// ```
#[derive(Debug, Clone)]
pub struct WorkOrderGenerator {
    start: Timestamp,
    due_dates: Option<DueDatePolicy>,
}

impl WorkOrderGenerator {
    /// Creates a generator anchored at the schedule start.
    pub fn new(start: Timestamp) -> Self {
        Self {
            start,
            due_dates: None,
        }
    }

    /// Enables due-date assignment.
    pub fn with_due_dates(mut self, policy: DueDatePolicy) -> Self {
        self.due_dates = policy.enabled.then_some(policy);
        self
    }

    /// Generates operations using the policy's own seed for jitter.
    pub fn generate_seeded(
        &self,
        products: &[SimpleProduct],
        multi: &MultiOpProduct,
    ) -> ScheduleResult<Vec<Operation>> {
        let mut rng = self
            .due_dates
            .as_ref()
            .map(DueDatePolicy::rng)
            .unwrap_or_else(|| StdRng::seed_from_u64(0));
        self.generate(products, multi, &mut rng)
    }

    /// Generates operations, drawing jitter from `rng`.
    ///
    /// # Errors
    /// `Configuration` if a due date falls past the representable calendar.
    pub fn generate<R: Rng>(
        &self,
        products: &[SimpleProduct],
        multi: &MultiOpProduct,
        rng: &mut R,
    ) -> ScheduleResult<Vec<Operation>> {
        let total = products
            .iter()
            .map(|p| u64::from(p.count))
            .sum::<u64>()
            + u64::from(multi.count) * MULTI_OP_PROFILE.len() as u64;
        let mut ops = Vec::with_capacity(usize::try_from(total.min(1 << 16)).unwrap_or(0));
        let mut next_id = 1u64;

        for product in products {
            for _ in 0..product.count {
                let mut op =
                    Operation::simple(format!("WO{next_id}"), &product.code, product.duration_hours);
                next_id += 1;
                if let Some(policy) = &self.due_dates {
                    op.due_date = Some(self.simple_due_date(product.duration_hours, policy, rng)?);
                }
                ops.push(op);
            }
        }

        for _ in 0..multi.count {
            let wo = format!("WO{next_id}");
            next_id += 1;
            let due = self
                .due_dates
                .as_ref()
                .map(|policy| self.multi_op_due_date(multi.min_lag_hours, policy))
                .transpose()?;

            for (i, &h) in MULTI_OP_PROFILE.iter().enumerate() {
                let mut op = Operation::step(wo.clone(), MULTI_OP_PRODUCT, i as u32 + 1, h);
                op.due_date = due;
                ops.push(op);
            }
        }

        debug!(
            operations = ops.len(),
            work_orders = next_id - 1,
            due_dates = self.due_dates.is_some(),
            "generated work orders"
        );
        Ok(ops)
    }

    fn simple_due_date<R: Rng>(
        &self,
        duration_hours: f64,
        policy: &DueDatePolicy,
        rng: &mut R,
    ) -> ScheduleResult<Timestamp> {
        if !is_valid_hours(policy.jitter_hours) {
            return Err(ScheduleError::config(
                "due_dates.jitter_hours",
                format!("must be a number between 0 and {MAX_HOURS}, got {}", policy.jitter_hours),
            ));
        }
        let jitter = if policy.jitter_hours > 0.0 {
            rng.random_range(-policy.jitter_hours..=policy.jitter_hours)
        } else {
            0.0
        };
        self.offset_by(duration_hours + policy.slack_hours + jitter)
    }

    fn multi_op_due_date(
        &self,
        min_lag_hours: f64,
        policy: &DueDatePolicy,
    ) -> ScheduleResult<Timestamp> {
        let baseline: f64 = MULTI_OP_PROFILE.iter().sum::<f64>() + 2.0 * min_lag_hours;
        self.offset_by(baseline + policy.slack_hours)
    }

    fn offset_by(&self, h: f64) -> ScheduleResult<Timestamp> {
        self.start.checked_add_signed(hours(h)).ok_or_else(|| {
            ScheduleError::config(
                "due_dates",
                format!("start + {h}h is past the representable calendar"),
            )
        })
    }
}
