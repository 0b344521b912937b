//! Serial Protocol Communication
//!
//! Implements the projectors' ASCII status console: CR-framed commands,
//! a settle-then-drain reply cycle, and typed parsing of the replies.

pub mod commands;
mod device;
mod error;
pub mod parser;
pub mod serial;

use std::time::Duration;

pub use commands::{Command, RawCommand};
pub use device::{Device, RawResponse, Transport};
pub use error::ProtocolError;
pub use serial::{open_port, LineSettings};

#[cfg(test)]
pub(crate) use device::mock;

/// Baud rate of the projector console
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Wait between writing a command and reading the reply
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Largest reply accepted before the exchange is abandoned
pub const MAX_RESPONSE_SIZE: usize = 4096;
