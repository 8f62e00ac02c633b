//! Planning domain models.
//!
//! Provides the data types shared by the generator, the scheduler and the
//! metrics: operations, downtime windows, scheduled tasks and plans.
//!
//! # Domain Mappings
//!
//! | u-aps | Manufacturing |
//! |-------|--------------|
//! | Operation | Routing step of a work order |
//! | DowntimeCalendar | Maintenance / breakdown windows |
//! | ScheduledTask | Dispatch list entry |
//! | Plan | Production plan |

mod downtime;
mod operation;
mod plan_io;
mod schedule;
mod time;

pub use downtime::{
    earliest_feasible_start, normalize, DowntimeCalendar, DowntimeInterval, IntervalSet,
    TimeWindow,
};
pub use operation::{Operation, MULTI_OP_PRODUCT, MULTI_OP_PROFILE};
pub use plan_io::REQUIRED_FIELDS;
pub use schedule::{Plan, ScheduledTask};
pub use time::{as_hours, hours, is_valid_hours, parse_timestamp, round2, Timestamp, MAX_HOURS};
