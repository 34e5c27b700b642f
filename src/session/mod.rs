//! Per-connection session state
//!
//! - `context`: identity and upgrade-request details, read-only
//! - `state`: lifecycle phase and counters, owned by the connection task

pub mod context;
pub mod state;

pub use context::ConnectionContext;
pub use state::{ConnectionPhase, ConnectionState};
