//! Per-link click analytics, scoped to the link's owner.

pub mod service;

pub use service::{AnalyticsConfig, AnalyticsService};
