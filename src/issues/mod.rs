//! Maintenance tickets: SLA deadlines, the status state machine and
//! role-filtered views.

pub mod sla;
pub mod view;
mod workflow;

pub use sla::{is_overdue, time_remaining, SlaConfig};
pub use view::IssueView;
