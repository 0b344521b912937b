//! Points and InfluxDB line protocol

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::reading::Reading;

/// Measurement every projector reading is written to
pub const STATUS_MEASUREMENT: &str = "projector_status";

/// Measurement written once at startup
pub const BOOT_MEASUREMENT: &str = "exhibit_boot";

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Written as-is
    Float(f64),
    /// Written with an `i` suffix
    Integer(i64),
    /// Written as `true`/`false`
    Bool(bool),
    /// Written quoted and escaped
    String(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

/// One time-series point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: Option<DateTime<Utc>>,
}

impl Point {
    /// Empty point in `measurement`
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    /// Add or replace a tag
    pub fn tag(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.tags.insert(key.into(), value.to_string());
        self
    }

    /// Add or replace a field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set an explicit timestamp
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Stamp with the current time unless a timestamp is already set
    pub fn stamp_now(&mut self) {
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
    }

    /// Measurement name
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tag value for `key`
    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Field value for `key`
    pub fn get_field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Fields in key order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Timestamp, if one has been set
    pub fn get_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Render as one line of InfluxDB line protocol (nanosecond precision)
    pub fn to_line_protocol(&self) -> String {
        let mut line = String::new();
        line.push_str(&escape(&self.measurement, &[',', ' ']));

        for (key, value) in &self.tags {
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let mut sep = ' ';
        for (key, value) in &self.fields {
            line.push(sep);
            sep = ',';
            line.push_str(&escape(key, &[',', '=', ' ']));
            line.push('=');
            match value {
                FieldValue::Float(v) => {
                    let _ = write!(line, "{v}");
                }
                FieldValue::Integer(v) => {
                    let _ = write!(line, "{v}i");
                }
                FieldValue::Bool(v) => {
                    let _ = write!(line, "{v}");
                }
                FieldValue::String(v) => {
                    let _ = write!(line, "\"{}\"", escape(v, &['"', '\\']));
                }
            }
        }

        if let Some(ts) = self.timestamp.and_then(|t| t.timestamp_nanos_opt()) {
            let _ = write!(line, " {ts}");
        }

        line
    }
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a reading into the point written for it.
///
/// Returns `None` for readings that are not forwarded (a healthy error status).
pub fn reading_point(reading: &Reading, location: &str) -> Option<Point> {
    if !reading.is_reportable() {
        return None;
    }

    let point = Point::new(STATUS_MEASUREMENT)
        .tag("location", location)
        .tag("projector", reading.device());

    let point = match reading {
        Reading::Error { status, .. } => point.field("error", status.code()?),
        Reading::Power { state, .. } => point.field("power_status", state.is_on()),
        Reading::Temperatures { values, .. } => values
            .iter()
            .enumerate()
            .fold(point, |p, (i, v)| p.field(format!("temp_{}", i + 1), *v)),
    };

    Some(point)
}

/// The point announcing that the monitor has started
pub fn boot_point(location: &str, exhibit_name: &str) -> Point {
    Point::new(BOOT_MEASUREMENT)
        .tag("location", location)
        .field("exhibit_name", exhibit_name)
}
