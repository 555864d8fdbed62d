//! Serial Distance Error Types

use thiserror::Error;

/// Why the serial read loop ended
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Serial port could not be opened
    #[error("Failed to open serial port: {0}")]
    Open(String),

    /// Read failed mid-stream
    #[error("Serial read error: {0}")]
    Io(String),

    /// Peer closed the stream
    #[error("Serial stream closed")]
    Closed,
}

impl TransportError {
    /// Whether the stream ended normally
    pub fn is_graceful(&self) -> bool {
        matches!(self, TransportError::Closed)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Reasons a line is dropped by the parser
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    /// Line is not a distance announcement
    #[error("line does not match the distance pattern")]
    NoMatch,

    /// Announcement with unparseable number
    #[error("malformed distance value {0:?}")]
    MalformedNumber(String),
}
