//! Client-side task state for the dashboard and calendar views.
//!
//! - `TaskCollection`: cached list, active filter, and the operations that
//!   reconcile it with the server
//! - `calendar`: due-date grouping and month grids

pub mod calendar;
pub mod collection;

pub use calendar::{group_by_day, tasks_on, upcoming, MonthView, UPCOMING_LIMIT};
pub use collection::{visible_tasks, LoadTicket, TaskCollection, TaskCounts};
