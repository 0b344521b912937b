//! Point writers
//!
//! The sink hands batches of points to a [`PointWriter`]. [`InfluxWriter`]
//! posts them to the InfluxDB v2 write API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;

use super::{Point, SinkError};
use crate::config::SinkConfig;

/// Destination for telemetry points
#[async_trait]
pub trait PointWriter: Send + Sync {
    /// Deliver `points`. A failure applies to the whole batch.
    async fn write(&self, points: &[Point]) -> Result<(), SinkError>;
}

/// Writes points to InfluxDB over HTTP
pub struct InfluxWriter {
    client: reqwest::Client,
    write_url: Url,
    token: String,
}

impl InfluxWriter {
    /// Build the HTTP client and write URL from `config`
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        Self::with_builder(config, reqwest::Client::builder())
    }

    fn with_builder(
        config: &SinkConfig,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, SinkError> {
        let client = builder
            .user_agent(concat!("projmon/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            write_url: write_url(config)?,
            token: config.token.clone(),
        })
    }

    /// Full write endpoint, including query parameters
    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

/// `{url}/api/v2/write?org=..&bucket=..&precision=ns`
fn write_url(config: &SinkConfig) -> Result<Url, SinkError> {
    let base = format!("{}/api/v2/write", config.url.trim_end_matches('/'));
    Url::parse_with_params(
        &base,
        &[
            ("org", config.org.as_str()),
            ("bucket", config.bucket.as_str()),
            ("precision", "ns"),
        ],
    )
    .map_err(|e| SinkError::InvalidUrl {
        url: config.url.clone(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PointWriter for InfluxWriter {
    async fn write(&self, points: &[Point]) -> Result<(), SinkError> {
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .client
            .post(self.write_url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(points = points.len(), "wrote points to InfluxDB");
        Ok(())
    }
}
