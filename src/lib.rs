//! Usage-session tracking and statistics aggregation for catalog services.
//!
//! Sessions are opened with [`services::UsageSessionService::start_session`],
//! grown by relative heartbeats, and summarized on demand by
//! [`services::UsageStatisticsService::compute_statistics`].

pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod services;
