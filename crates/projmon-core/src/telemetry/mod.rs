//! Telemetry
//!
//! Converts readings into InfluxDB points and delivers them in the
//! background. Delivery problems are logged and counted here; they never
//! reach the polling loop.

mod error;
mod point;
mod sink;
mod writer;

pub use error::SinkError;
pub use point::{boot_point, reading_point, FieldValue, Point, BOOT_MEASUREMENT, STATUS_MEASUREMENT};
pub use sink::{DrainReport, SinkClient, SinkOptions, StatsSnapshot, MAX_BATCH};
pub use writer::{InfluxWriter, PointWriter};
