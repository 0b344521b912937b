//! Projector readings
//!
//! Typed results of a single status query, tagged with the projector that
//! produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of temperature sensors reported by `get=temp`
pub const TEMPERATURE_COUNT: usize = 8;

/// Identifier of a polled projector (its index in the sweep order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u8);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of `get=err`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// The projector reported `NO_ERROR`
    NoError,
    /// Any other error code, verbatim
    Fault(String),
}

impl ErrorStatus {
    /// The reported code, or `None` when the projector is healthy
    pub fn code(&self) -> Option<&str> {
        match self {
            ErrorStatus::NoError => None,
            ErrorStatus::Fault(code) => Some(code),
        }
    }
}

/// Result of `get=power`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Lamp on
    On,
    /// Standby
    Off,
}

impl PowerState {
    /// Whether the projector reported `ON`
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }
}

/// One reading from one projector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    /// Reply to `get=err`
    Error {
        /// Reporting projector
        device: DeviceId,
        /// Reported error status
        status: ErrorStatus,
    },
    /// Reply to `get=power`
    Power {
        /// Reporting projector
        device: DeviceId,
        /// Reported power state
        state: PowerState,
    },
    /// Reply to `get=temp`, sensors in reported order
    Temperatures {
        /// Reporting projector
        device: DeviceId,
        /// Sensor values
        values: [f64; TEMPERATURE_COUNT],
    },
}

impl Reading {
    /// The projector this reading came from
    pub fn device(&self) -> DeviceId {
        match self {
            Reading::Error { device, .. }
            | Reading::Power { device, .. }
            | Reading::Temperatures { device, .. } => *device,
        }
    }

    /// Whether this reading carries anything worth forwarding.
    ///
    /// A healthy error status is not forwarded.
    pub fn is_reportable(&self) -> bool {
        !matches!(
            self,
            Reading::Error {
                status: ErrorStatus::NoError,
                ..
            }
        )
    }

    /// Temperatures prefixed with the device id, e.g. `[0, 64.1, ...]`
    pub fn prefixed_temperatures(&self) -> Option<Vec<f64>> {
        match self {
            Reading::Temperatures { device, values } => {
                let mut out = Vec::with_capacity(TEMPERATURE_COUNT + 1);
                out.push(f64::from(device.0));
                out.extend_from_slice(values);
                Some(out)
            }
            _ => None,
        }
    }
}
