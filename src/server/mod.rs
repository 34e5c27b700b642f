//! WebSocket relay server
//!
//! - `config`: server options
//! - `listener`: router and accept loop
//! - `connection`: per-socket reader/writer tasks
//! - `hub`: shared relay state and outbound delivery
//! - `health`: `GET /health`

pub mod config;
pub(crate) mod connection;
pub(crate) mod health;
pub mod hub;
pub mod listener;

pub use config::ServerConfig;
pub use hub::RelayHub;
pub use listener::RelayServer;
