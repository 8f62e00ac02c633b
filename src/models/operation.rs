//! Operation (schedulable step) model.
//!
//! An operation is the smallest unit the scheduler places on a machine.
//! Simple products produce one operation per work order; the multi-step
//! product produces a chain of operations that share a work-order id and
//! carry 1-based, contiguous indices.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};

use super::time::{hours, Timestamp};

/// Product code of the built-in multi-operation product.
pub const MULTI_OP_PRODUCT: &str = "D";

/// Fixed processing profile (hours) of the multi-operation product.
pub const MULTI_OP_PROFILE: [f64; 3] = [1.0, 3.0, 2.0];

/// A single schedulable operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Parent work-order identifier.
    pub work_order_id: String,
    /// Product code.
    pub product: String,
    /// Position within a multi-operation order (1-based). `None` for
    /// single-operation products.
    pub op_index: Option<u32>,
    /// Processing time in hours.
    pub duration_hours: f64,
    /// Requested completion time. `None` = no due date.
    pub due_date: Option<Timestamp>,
}

impl Operation {
    /// Creates a single-operation work order.
    pub fn simple(
        work_order_id: impl Into<String>,
        product: impl Into<String>,
        duration_hours: f64,
    ) -> Self {
        Self {
            work_order_id: work_order_id.into(),
            product: product.into(),
            op_index: None,
            duration_hours,
            due_date: None,
        }
    }

    /// Creates one step of a multi-operation work order.
    pub fn step(
        work_order_id: impl Into<String>,
        product: impl Into<String>,
        op_index: u32,
        duration_hours: f64,
    ) -> Self {
        Self {
            work_order_id: work_order_id.into(),
            product: product.into(),
            op_index: Some(op_index),
            duration_hours,
            due_date: None,
        }
    }

    /// Sets the due date.
    pub fn with_due_date(mut self, due: Timestamp) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Whether this operation is part of a precedence chain.
    #[inline]
    pub fn is_multi_step(&self) -> bool {
        self.op_index.is_some()
    }

    /// Sort position within the parent order (0 for single-op products).
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.op_index.unwrap_or(0)
    }

    /// Display label: `D2` for chained steps, the product code otherwise.
    pub fn label(&self) -> String {
        match self.op_index {
            Some(k) => format!("{}{}", self.product, k),
            None => self.product.clone(),
        }
    }

    /// Processing time as a duration.
    pub fn duration(&self) -> chrono::Duration {
        hours(self.duration_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_operation() {
        let op = Operation::simple("WO1", "A", 2.0);
        assert!(!op.is_multi_step());
        assert_eq!(op.sequence(), 0);
        assert_eq!(op.label(), "A");
        assert_eq!(op.duration(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_step_label() {
        let op = Operation::step("WO7", MULTI_OP_PRODUCT, 2, 3.0);
        assert!(op.is_multi_step());
        assert_eq!(op.sequence(), 2);
        assert_eq!(op.label(), "D2");
    }

    #[test]
    fn test_profile_total() {
        let total: f64 = MULTI_OP_PROFILE.iter().sum();
        assert!((total - 6.0).abs() < 1e-10);
    }
}
