//! Telemetry errors

use thiserror::Error;

/// Errors raised while handing points to the time-series store
#[derive(Error, Debug)]
pub enum SinkError {
    /// Request could not be sent or timed out
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("InfluxDB rejected write ({status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, usually InfluxDB's error message
        body: String,
    },

    /// `INFLUXDB_URL` does not form a valid write URL
    #[error("Invalid sink URL '{url}': {reason}")]
    InvalidUrl {
        /// Configured base URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Queue at capacity; the point was dropped
    #[error("Send queue is full, point dropped")]
    QueueFull,

    /// Workers have stopped
    #[error("Sink is shut down")]
    Closed,
}
