//! Internal telemetry for Streamlens.
//!
//! Counters and histograms live in process and are exposed through the
//! health endpoints rather than an external metrics system.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
