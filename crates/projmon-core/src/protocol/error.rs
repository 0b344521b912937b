//! Protocol errors

use thiserror::Error;

use super::Command;

/// Errors that can occur while talking to a projector
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// No device at the given path
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Reply did not have the expected shape
    #[error("Malformed response to '{command}': {reason} (got {response:?})")]
    MalformedResponse {
        /// Query that produced the reply
        command: Command,
        /// What did not match
        reason: String,
        /// The reply as received
        response: String,
    },

    /// Reply longer than the response cap
    #[error("Buffer overflow: response exceeds {limit} bytes")]
    BufferOverflow {
        /// Cap in bytes
        limit: usize,
    },

    /// Read or write on the port failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn malformed(
        command: Command,
        reason: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        ProtocolError::MalformedResponse {
            command,
            reason: reason.into(),
            response: response.into(),
        }
    }

    /// Whether this error came from the wire shape rather than the transport
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProtocolError::MalformedResponse { .. })
    }
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(e.description),
            _ => ProtocolError::SerialError(e.to_string()),
        }
    }
}
