//! Error types
//!
//! Relay handlers themselves never fail; errors only come from the socket
//! layer (binding, serving) and from unreadable client messages.

use std::fmt;
use std::io;

use crate::protocol::ProtocolError;

/// Crate-level error
#[derive(Debug)]
pub enum Error {
    /// Binding or serving failed
    Io(io::Error),
    /// A client message could not be understood
    Protocol(ProtocolError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::from(ProtocolError::UnknownEvent("bogus".into()));
        assert_eq!(err.to_string(), "Protocol error: Unknown event: bogus");

        let err = Error::from(io::Error::new(io::ErrorKind::AddrInUse, "port taken"));
        assert_eq!(err.to_string(), "I/O error: port taken");
    }

    #[test]
    fn test_source() {
        use std::error::Error as _;

        let err = Error::from(ProtocolError::MissingDeviceId("get-stream"));
        assert!(err.source().is_some());
    }
}
