//! Polling scheduler
//!
//! Sweeps every projector in order, issuing the error, power and temperature
//! queries with a fixed pause after each, then idles until the next sweep.
//! Runs until the shutdown token is cancelled.

use std::time::Duration;
use thiserror::Error;
use tokio_serial::SerialStream;
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::protocol::{Command, Device, ProtocolError, Transport};
use crate::reading::{DeviceId, Reading};
use crate::telemetry::{reading_point, SinkClient};

/// What to do when a query fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log the fault, skip the query, continue the sweep
    #[default]
    Isolate,
    /// Abort the sweep on the first fault. Meant for development and tests.
    Strict,
}

/// Scheduler timing and fault handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Pause after each query
    pub query_delay: Duration,
    /// Pause after each sweep
    pub idle_delay: Duration,
    /// Reaction to a failed query
    pub policy: FaultPolicy,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for ScheduleOptions {
    fn from(config: &PollConfig) -> Self {
        Self {
            query_delay: config.query_delay,
            idle_delay: config.idle_delay,
            policy: FaultPolicy::Isolate,
        }
    }
}

/// A query that failed under [`FaultPolicy::Strict`]
#[derive(Error, Debug)]
#[error("projector {device}: '{command}' failed: {source}")]
pub struct SweepError {
    /// Projector whose query failed
    pub device: DeviceId,
    /// The failed query
    pub command: Command,
    /// Underlying protocol error
    #[source]
    pub source: ProtocolError,
}

/// Tally of one sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Every reading parsed during the sweep, in query order
    pub readings: Vec<Reading>,
    /// Readings accepted by the sink
    pub forwarded: usize,
    /// Queries that got no reply
    pub empty: usize,
    /// Queries that failed with an I/O or parse error
    pub faults: usize,
}

/// Drives the polling loop over a fixed set of projectors
pub struct Scheduler<T: Transport = SerialStream> {
    devices: Vec<Device<T>>,
    options: ScheduleOptions,
    sink: Option<(SinkClient, String)>,
    sweeps: u64,
}

impl<T: Transport> Scheduler<T> {
    /// Poll `devices` in the given order. Readings are only reported until a
    /// sink is attached with [`Scheduler::with_sink`].
    pub fn new(devices: Vec<Device<T>>, options: ScheduleOptions) -> Self {
        Self {
            devices,
            options,
            sink: None,
            sweeps: 0,
        }
    }

    /// Forward readings to `sink`, tagging them with `location`
    pub fn with_sink(mut self, sink: SinkClient, location: impl Into<String>) -> Self {
        self.sink = Some((sink, location.into()));
        self
    }

    /// Polled projectors, in sweep order
    pub fn devices(&self) -> &[Device<T>] {
        &self.devices
    }

    /// Number of completed sweeps
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Attached sink, if any
    pub fn sink(&self) -> Option<&SinkClient> {
        self.sink.as_ref().map(|(sink, _)| sink)
    }

    /// Give up the sink so it can be drained
    pub fn into_sink(self) -> Option<SinkClient> {
        self.sink.map(|(sink, _)| sink)
    }

    /// Query every projector once
    pub async fn sweep(&mut self) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();

        for device in self.devices.iter_mut() {
            for command in Command::SWEEP_ORDER {
                match device.read(command).await {
                    Ok(Some(reading)) => {
                        tracing::debug!(?reading, "parsed reading");
                        if forward(self.sink.as_ref(), &reading) {
                            report.forwarded += 1;
                        }
                        report.readings.push(reading);
                    }
                    Ok(None) => {
                        tracing::debug!(device = %device.id(), %command, "no reply");
                        report.empty += 1;
                    }
                    Err(source) => {
                        report.faults += 1;
                        match self.options.policy {
                            FaultPolicy::Strict => {
                                return Err(SweepError {
                                    device: device.id(),
                                    command,
                                    source,
                                })
                            }
                            FaultPolicy::Isolate => {
                                tracing::warn!(
                                    device = %device.id(),
                                    port = device.name(),
                                    %command,
                                    "query failed: {source}"
                                );
                            }
                        }
                    }
                }

                tokio::time::sleep(self.options.query_delay).await;
            }
        }

        self.sweeps += 1;
        Ok(report)
    }

    /// Sweep forever, idling between sweeps, until `shutdown` is cancelled.
    ///
    /// Only returns an error under [`FaultPolicy::Strict`].
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SweepError> {
        tracing::info!(
            devices = self.devices.len(),
            idle_secs = self.options.idle_delay.as_secs(),
            policy = ?self.options.policy,
            "polling started"
        );

        loop {
            let report = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.sweep() => result?,
            };
            tracing::info!(
                sweep = self.sweeps,
                readings = report.readings.len(),
                forwarded = report.forwarded,
                empty = report.empty,
                faults = report.faults,
                "sweep complete"
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.options.idle_delay) => {}
            }
        }

        tracing::info!(sweeps = self.sweeps, "polling stopped");
        Ok(())
    }
}

/// Hand a reading to the sink; true if it was queued
fn forward(sink: Option<&(SinkClient, String)>, reading: &Reading) -> bool {
    let Some((sink, location)) = sink else {
        return false;
    };
    let Some(point) = reading_point(reading, location) else {
        return false;
    };

    match sink.send(point) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(device = %reading.device(), "reading not forwarded: {e}");
            false
        }
    }
}
