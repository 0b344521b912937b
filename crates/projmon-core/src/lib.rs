//! # Projmon Core Library
//!
//! Core functionality for monitoring projectors over their serial consoles.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The CR-framed ASCII status protocol (`get=err`, `get=power`, `get=temp`)
//! - Typed parsing of projector replies
//! - A sweep scheduler with per-query fault isolation
//! - Background delivery of readings to InfluxDB
//!
//! ## Example
//!
//! ```rust,ignore
//! use projmon_core::prelude::*;
//!
//! let stream = open_port("/dev/ttyUSB0", &LineSettings::default())?;
//! let mut device = Device::new(DeviceId(0), "/dev/ttyUSB0", stream);
//!
//! if let Some(reading) = device.read_temperatures().await? {
//!     println!("{:?}", reading.prefixed_temperatures());
//! }
//! ```

pub mod config;
pub mod protocol;
pub mod reading;
pub mod scheduler;
pub mod telemetry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, PollConfig, SinkConfig};
    pub use crate::protocol::{
        open_port, Command, Device, LineSettings, ProtocolError, RawCommand, Transport,
    };
    pub use crate::reading::{DeviceId, ErrorStatus, PowerState, Reading};
    pub use crate::scheduler::{FaultPolicy, ScheduleOptions, Scheduler, SweepError, SweepReport};
    pub use crate::telemetry::{InfluxWriter, Point, PointWriter, SinkClient, SinkError, SinkOptions};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
