//! In-process enforcement metrics.
//!
//! Counters live on the policy store so they accumulate across sessions, and
//! render in Prometheus text format for whoever embeds the guard.

pub mod metrics;

pub use metrics::{CounterVec, EnforcementMetrics, GaugeVec};
