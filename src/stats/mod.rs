//! Health reporting and server metrics

pub mod metrics;
pub mod status;

pub use metrics::{ConnectionStats, HubMetrics, ServerStats};
pub use status::HubStatus;
