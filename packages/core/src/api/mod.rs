//! HTTP surface of the interactive dashboard.

pub mod dashboard;
pub mod headers;
pub mod health;

pub use dashboard::{create_dashboard_router, DashboardState};
