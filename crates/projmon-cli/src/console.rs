//! Manual command console
//!
//! Sends each line typed on stdin to one projector and prints the reply.
//! Uses the same settle-then-drain exchange as the poller.

use anyhow::{Context, Result};
use projmon_core::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub async fn run(port: &str) -> Result<()> {
    let stream =
        open_port(port, &LineSettings::default()).with_context(|| format!("opening {port}"))?;
    let mut device = Device::new(DeviceId(0), port, stream);

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!("{port}\nEnter your commands below.\nInsert \"exit\" to leave the application.\n")
                .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b">> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input == "exit" {
            break;
        }

        match device.send_raw(&RawCommand::new(input)).await {
            Ok(reply) if !reply.is_empty() => {
                stdout.write_all(format!(">>{reply}\n").as_bytes()).await?;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("command failed: {e}"),
        }
    }

    Ok(())
}
