//! Device exchange
//!
//! Drives the request/reply cycle with one projector: write a framed command,
//! wait the settle delay, then drain whatever the projector has sent so far.
//! There is no terminator to wait for, so a reply that arrives after the
//! settle delay is read as part of the next exchange's stale input and
//! discarded.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialStream;

use super::parser::{parse_error, parse_power, parse_temperatures};
use super::{Command, ProtocolError, RawCommand, DEFAULT_SETTLE_DELAY, MAX_RESPONSE_SIZE};
use crate::reading::{DeviceId, Reading};

/// Text accumulated from the port after a command, possibly empty
pub type RawResponse = String;

/// A byte stream to a projector
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {
    /// Number of bytes that can be read without waiting
    fn bytes_to_read(&self) -> io::Result<u32>;
}

impl Transport for SerialStream {
    fn bytes_to_read(&self) -> io::Result<u32> {
        tokio_serial::SerialPort::bytes_to_read(self).map_err(io::Error::from)
    }
}

/// One projector and its exclusively-owned serial stream
pub struct Device<T: Transport = SerialStream> {
    id: DeviceId,
    /// Port path, for logs
    name: String,
    transport: T,
    settle_delay: Duration,
}

impl<T: Transport> Device<T> {
    /// Wrap an open transport
    pub fn new(id: DeviceId, name: impl Into<String>, transport: T) -> Self {
        Self {
            id,
            name: name.into(),
            transport,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Override how long to wait between writing a command and reading the reply
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Projector id used to tag readings
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Port path
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send a status query and return the raw reply
    pub async fn query(&mut self, command: Command) -> Result<RawResponse, ProtocolError> {
        self.exchange(&command.to_bytes()).await
    }

    /// Send an operator-typed command and return the raw reply
    pub async fn send_raw(&mut self, command: &RawCommand) -> Result<RawResponse, ProtocolError> {
        self.exchange(&command.to_bytes()).await
    }

    /// Query and parse the error status
    pub async fn read_error(&mut self) -> Result<Option<Reading>, ProtocolError> {
        let raw = self.query(Command::GetError).await?;
        Ok(parse_error(&raw)?.map(|status| Reading::Error {
            device: self.id,
            status,
        }))
    }

    /// Query and parse the power state
    pub async fn read_power(&mut self) -> Result<Option<Reading>, ProtocolError> {
        let raw = self.query(Command::GetPower).await?;
        Ok(parse_power(&raw)?.map(|state| Reading::Power {
            device: self.id,
            state,
        }))
    }

    /// Query and parse the eight temperature sensors
    pub async fn read_temperatures(&mut self) -> Result<Option<Reading>, ProtocolError> {
        let raw = self.query(Command::GetTemperature).await?;
        Ok(parse_temperatures(&raw)?.map(|values| Reading::Temperatures {
            device: self.id,
            values,
        }))
    }

    /// Run `command` and parse its reply into a reading.
    ///
    /// `Ok(None)` means the projector sent nothing before the settle delay ran out.
    pub async fn read(&mut self, command: Command) -> Result<Option<Reading>, ProtocolError> {
        match command {
            Command::GetError => self.read_error().await,
            Command::GetPower => self.read_power().await,
            Command::GetTemperature => self.read_temperatures().await,
        }
    }

    async fn exchange(&mut self, frame: &[u8]) -> Result<RawResponse, ProtocolError> {
        let stale = self.drain().await?;
        if !stale.is_empty() {
            tracing::debug!(
                device = %self.id,
                bytes = stale.len(),
                "discarding late reply: {:?}",
                String::from_utf8_lossy(&stale)
            );
        }

        tracing::debug!(device = %self.id, port = %self.name, "tx {:?}", String::from_utf8_lossy(frame));
        self.transport.write_all(frame).await?;
        self.transport.flush().await?;

        tokio::time::sleep(self.settle_delay).await;

        let response = self.drain().await?;
        let text = String::from_utf8_lossy(&response).into_owned();
        tracing::debug!(device = %self.id, bytes = response.len(), "rx {:?}", text);
        Ok(text)
    }

    /// Read every byte currently buffered on the port
    async fn drain(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut response = Vec::new();
        let mut buffer = [0u8; 256];

        loop {
            let available = self.transport.bytes_to_read()? as usize;
            if available == 0 {
                break;
            }

            let to_read = available.min(buffer.len());
            let n = self.transport.read(&mut buffer[..to_read]).await?;
            if n == 0 {
                break;
            }

            response.extend_from_slice(&buffer[..n]);
            if response.len() > MAX_RESPONSE_SIZE {
                return Err(ProtocolError::BufferOverflow {
                    limit: MAX_RESPONSE_SIZE,
                });
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory projector used by unit tests

    use super::Transport;
    use std::collections::{HashMap, VecDeque};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    /// Replies to each framed command with the next scripted answer
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: HashMap<String, VecDeque<String>>,
        pending: VecDeque<u8>,
        pub(crate) written: Vec<u8>,
        pub(crate) fail_writes: bool,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Queue `reply` for the next time `command` is sent
        pub(crate) fn reply(mut self, command: &str, reply: &str) -> Self {
            self.replies
                .entry(command.to_string())
                .or_default()
                .push_back(reply.to_string());
            self
        }

        /// Bytes already sitting in the receive buffer
        pub(crate) fn with_pending(mut self, bytes: &[u8]) -> Self {
            self.pending.extend(bytes);
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn bytes_to_read(&self) -> io::Result<u32> {
            Ok(self.pending.len() as u32)
        }
    }

    impl AsyncWrite for ScriptedTransport {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            if this.fail_writes {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "port unplugged",
                )));
            }
            this.written.extend_from_slice(buf);

            let command = String::from_utf8_lossy(buf).trim_matches('\r').to_string();
            if let Some(reply) = this.replies.get_mut(&command).and_then(VecDeque::pop_front) {
                this.pending.extend(reply.into_bytes());
            }
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncRead for ScriptedTransport {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let n = buf.remaining().min(this.pending.len());
            let chunk: Vec<u8> = this.pending.drain(..n).collect();
            buf.put_slice(&chunk);
            Poll::Ready(Ok(()))
        }
    }
}
