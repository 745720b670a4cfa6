//! Core types for Logduck
//!
//! Initialization sources, connection state, and the JSON shape of query rows.

use std::{fs::File, path::{Path, PathBuf}};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Largest integer a JSON consumer can hold in a double without losing precision (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Days between 0001-01-01 and 1970-01-01 in the proleptic Gregorian calendar.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A query result row: column name to value, in column order
pub type Row = serde_json::Map<String, Value>;

/// Where an initialization script came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Supplied by the operator (config, environment, or a tool call)
    Explicit,
    /// Discovered by running the external resolver command
    Resolved,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Explicit => write!(f, "explicit"),
            SourceKind::Resolved => write!(f, "resolved"),
        }
    }
}

/// The initialization script backing a connection
///
/// Captured once and never mutated; a reconfiguration captures a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitializationSource {
    kind: SourceKind,
    path: PathBuf,
}

impl InitializationSource {
    /// Capture a source, checking that `path` is a readable regular file.
    pub fn capture(kind: SourceKind, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let metadata = std::fs::metadata(&path).map_err(|e| {
            Error::Source(format!("cannot access '{}': {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(Error::Source(format!(
                "'{}' is not a regular file",
                path.display()
            )));
        }
        File::open(&path).map_err(|e| {
            Error::Source(format!("cannot read '{}': {}", path.display(), e))
        })?;

        Ok(Self { kind, path })
    }

    pub fn explicit(path: impl Into<PathBuf>) -> Result<Self> {
        Self::capture(SourceKind::Explicit, path)
    }

    pub fn resolved(path: impl Into<PathBuf>) -> Result<Self> {
        Self::capture(SourceKind::Resolved, path)
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the script text. The file is re-read on every (re)connect.
    pub fn read_script(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Source(format!("cannot read '{}': {}", self.path.display(), e))
        })
    }

    /// Quoted path, used as the origin in error messages
    pub fn origin(&self) -> String {
        format!("'{}'", self.path.display())
    }
}

impl std::fmt::Display for InitializationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.kind)
    }
}

/// Whether a connection handle currently holds a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Closed,
    Open,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Open => write!(f, "open"),
        }
    }
}

/// The active configuration of a database service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfiguration {
    pub source: InitializationSource,
}

/// Snapshot of a database service for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Active initialization source
    pub source: InitializationSource,

    /// Connection state at the time of the snapshot
    pub state: ConnectionState,

    /// When the current connection was opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,

    /// Statements executed by the last initialization
    pub statement_count: usize,
}

/// A table or view in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub table_type: String,
}

/// A column of a table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Convert an integer to JSON, falling back to decimal text outside the safe range.
pub fn integer_to_json(value: i128) -> Value {
    let safe = i128::from(MAX_SAFE_INTEGER);
    match i64::try_from(value) {
        Ok(small) if (-safe..=safe).contains(&value) => Value::from(small),
        _ => Value::String(value.to_string()),
    }
}

/// Convert a DuckDB value to its JSON representation
pub fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(v) => Value::from(v),
        DuckValue::SmallInt(v) => Value::from(v),
        DuckValue::Int(v) => Value::from(v),
        DuckValue::UTinyInt(v) => Value::from(v),
        DuckValue::USmallInt(v) => Value::from(v),
        DuckValue::UInt(v) => Value::from(v),
        DuckValue::BigInt(v) => integer_to_json(i128::from(v)),
        DuckValue::UBigInt(v) => integer_to_json(i128::from(v)),
        DuckValue::HugeInt(v) => integer_to_json(v),
        DuckValue::Float(v) => float_to_json(f64::from(v)),
        DuckValue::Double(v) => float_to_json(v),
        // whole decimals (SUM and integer casts) follow the integer rule
        DuckValue::Decimal(d) if d.scale() == 0 => integer_to_json(d.mantissa()),
        DuckValue::Decimal(d) => {
            let text = d.normalize().to_string();
            match text.parse::<f64>() {
                Ok(v) if v.is_finite() && v.to_string() == text => float_to_json(v),
                _ => Value::String(text),
            }
        }
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Blob(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
        DuckValue::Timestamp(unit, v) => {
            let micros = to_micros(unit, v);
            DateTime::from_timestamp_micros(micros).map_or_else(
                || Value::from(micros),
                |ts| Value::String(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            )
        }
        DuckValue::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map_or_else(
                || Value::from(days),
                |date| Value::String(date.format("%Y-%m-%d").to_string()),
            ),
        DuckValue::Time64(unit, v) => {
            let micros = to_micros(unit, v);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();
            secs.zip(nanos)
                .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
                .map_or_else(
                    || Value::from(micros),
                    |time| Value::String(time.format("%H:%M:%S%.f").to_string()),
                )
        }
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => serde_json::json!({
            "months": months,
            "days": days,
            "micros": nanos / 1_000,
        }),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(to_json_value).collect())
        }
        DuckValue::Union(inner) => to_json_value(*inner),
        other => Value::String(format!("{other:?}")),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v).map_or_else(|| Value::String(v.to_string()), Value::Number)
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}
