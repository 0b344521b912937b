//! Protocol commands
//!
//! Defines the status queries understood by the projectors' ASCII console.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carriage return used on both sides of a command
pub const FRAME_DELIMITER: u8 = b'\r';

/// Status queries sent during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Query the current error code (`get=err`)
    GetError,

    /// Query the lamp/power state (`get=power`)
    GetPower,

    /// Query the eight internal temperature sensors (`get=temp`)
    GetTemperature,
}

impl Command {
    /// All queries, in the order a sweep issues them
    pub const SWEEP_ORDER: [Command; 3] =
        [Command::GetError, Command::GetPower, Command::GetTemperature];

    /// The ASCII command text
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::GetError => "get=err",
            Command::GetPower => "get=power",
            Command::GetTemperature => "get=temp",
        }
    }

    /// Frame the command for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free-form command typed by an operator in the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommand {
    /// The text command to send (e.g. "get=lamp")
    pub command: String,
}

impl RawCommand {
    /// Create a new raw command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Frame the command for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(&self.command)
    }
}

/// Wrap `text` as `\r<text>\r`
fn frame(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 2);
    bytes.push(FRAME_DELIMITER);
    bytes.extend_from_slice(text.as_bytes());
    bytes.push(FRAME_DELIMITER);
    bytes
}
