//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use projmon_core::protocol::Transport;
use projmon_core::telemetry::{Point, PointWriter, SinkError};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing_subscriber::EnvFilter;

/// Send library logs to the test harness output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Mock projector console: each framed command pops its next scripted reply
#[derive(Default)]
pub struct MockProjector {
    replies: HashMap<String, VecDeque<String>>,
    pending: VecDeque<u8>,
    pub sent: Vec<String>,
}

impl MockProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, reply: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_string());
        self
    }
}

impl Transport for MockProjector {
    fn bytes_to_read(&self) -> io::Result<u32> {
        Ok(self.pending.len() as u32)
    }
}

impl AsyncWrite for MockProjector {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let command = String::from_utf8_lossy(buf).trim_matches('\r').to_string();
        if let Some(reply) = this.replies.get_mut(&command).and_then(VecDeque::pop_front) {
            this.pending.extend(reply.into_bytes());
        }
        this.sent.push(command);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for MockProjector {
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

/// Keeps every point it is asked to write
#[derive(Default)]
pub struct RecordingWriter {
    pub points: Mutex<Vec<Point>>,
}

impl RecordingWriter {
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().unwrap().clone()
    }
}

#[async_trait]
impl PointWriter for RecordingWriter {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
        self.points.lock().unwrap().extend_from_slice(points);
        Ok(())
    }
}
