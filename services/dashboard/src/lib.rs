//! Dashboard data layer
//!
//! Polls the backend for health, the application catalogue and system
//! statistics, using the signed-in session for the privileged figures.

pub mod client;
pub mod models;
pub mod poller;

pub use client::{DashboardApi, DashboardClient, DashboardError, DashboardResult};
pub use models::{DashboardSnapshot, DashboardSummary, StatsSource};
pub use poller::PollingDataController;
