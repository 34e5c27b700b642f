//! Wire protocol
//!
//! Named events carried as JSON text frames over a WebSocket:
//! - `message`: envelope parsing and serialization
//! - `quirks`: legacy client naming and role detection

pub mod message;
pub mod quirks;

pub use message::{ClientEvent, ProtocolError, ServerEvent};
pub use quirks::{ClientRole, QuirksConfig};
