//! `run` and `once`

use anyhow::{Context, Result};
use projmon_core::prelude::*;
use projmon_core::telemetry::boot_point;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::PollArgs;

/// Open every port in order; projector ids follow the port order
fn open_devices(ports: &[String], poll: &PollConfig) -> Result<Vec<Device>> {
    let settings = LineSettings::default();

    ports
        .iter()
        .enumerate()
        .map(|(index, path)| -> Result<Device> {
            let id = u8::try_from(index).context("too many ports")?;
            let stream = open_port(path, &settings).with_context(|| format!("opening {path}"))?;
            tracing::info!(projector = id, port = %path, "port open");
            Ok(Device::new(DeviceId(id), path.clone(), stream).with_settle_delay(poll.settle_delay))
        })
        .collect()
}

fn schedule_options(args: &PollArgs, poll: &PollConfig) -> ScheduleOptions {
    let mut options = ScheduleOptions::from(poll);
    if args.strict {
        options.policy = FaultPolicy::Strict;
    }
    options
}

/// Poll until Ctrl-C, then drain the telemetry queue
pub async fn run(args: PollArgs) -> Result<()> {
    let sink_config = SinkConfig::from_env().context("failed to read InfluxDB environment variables")?;
    let poll = PollConfig::from_env()?;
    tracing::debug!(?sink_config, ?poll, "configuration loaded");

    let devices = open_devices(&args.ports, &poll)?;

    let writer = InfluxWriter::new(&sink_config).context("creating InfluxDB client")?;
    tracing::info!(url = %writer.write_url(), "forwarding to InfluxDB");
    let sink = SinkClient::start(Arc::new(writer), SinkOptions::from(&sink_config));

    if let Err(e) = sink.send(boot_point(&sink_config.location, &sink_config.exhibit_name)) {
        tracing::warn!("error queueing boot point: {e}");
    }

    let mut scheduler = Scheduler::new(devices, schedule_options(&args, &poll))
        .with_sink(sink, sink_config.location.clone());

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        on_signal.cancel();
    });

    let result = scheduler.run(shutdown).await;

    if let Some(sink) = scheduler.into_sink() {
        let report = sink.shutdown(sink_config.drain_timeout).await;
        if report.timed_out {
            tracing::warn!(abandoned = report.abandoned, "not all readings were delivered");
        }
    }

    result.context("polling aborted")
}

/// One sweep, readings printed to stdout as JSON
pub async fn once(args: PollArgs) -> Result<()> {
    let poll = PollConfig::from_env()?;
    let devices = open_devices(&args.ports, &poll)?;

    let mut scheduler = Scheduler::new(devices, schedule_options(&args, &poll));
    let report = scheduler.sweep().await?;

    println!("{}", serde_json::to_string_pretty(&report.readings)?);
    if report.faults > 0 {
        tracing::warn!(faults = report.faults, "some queries failed");
    }
    Ok(())
}
