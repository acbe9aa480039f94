//! # Record Ingestion
//!
//! The contract between tabular inputs and the topology builder. Rows are
//! untyped field maps ([`Record`]); typing happens in
//! [`topology::records`](crate::topology::records).
//!
//! | Source | Module | Description |
//! |--------|--------|-------------|
//! | `MemorySource` | here | In-memory rows for tests/embedding |
//! | `DelimitedFile` | `delimited` | Header-first delimited text file, streamed |

pub mod delimited;

use std::collections::HashMap;
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::Result;

pub use delimited::DelimitedFile;

// ============================================================================
// Record
// ============================================================================

/// One raw row: column name → trimmed cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into().trim().to_string());
    }

    /// Cell text, `None` if the column is absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Cell text or empty string.
    pub fn text(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// True when every cell is empty, as for a blank line.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(String::is_empty)
    }

    pub fn require(&self, field: &str) -> std::result::Result<&str, RecordError> {
        self.get(field)
            .ok_or_else(|| RecordError::MissingField(field.to_string()))
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Why a single row could not be typed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not a number: '{value}'")]
    BadNumber { field: String, value: String },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("status '{0}' is not accepted")]
    RejectedStatus(String),

    #[error("malformed code '{0}'")]
    BadCode(String),
}

// ============================================================================
// Parse context
// ============================================================================

/// Where a row came from. Threaded through every validator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub source: String,
    /// 1-based line in the source; the header is line 1.
    pub line: usize,
}

impl ParseContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), line: 1 }
    }

    /// Context for the next data row.
    pub fn advance(&mut self) -> &Self {
        self.line += 1;
        self
    }
}

// ============================================================================
// RecordSource trait
// ============================================================================

/// A stream of raw rows.
///
/// Sources are drained to completion by the builder: all node rows first,
/// then all link rows.
#[async_trait]
pub trait RecordSource: Send {
    /// Name used in diagnostics (usually a file path).
    fn name(&self) -> &str;

    /// Next row, or `None` once the source is exhausted.
    async fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    rows: VecDeque<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, rows: impl IntoIterator<Item = Record>) -> Self {
        Self { name: name.into(), rows: rows.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.rows.pop_front())
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Parse a decimal that may use a comma separator (`"123,45"`).
pub fn coord_num(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replacen(',', ".", 1).parse().ok()
}

/// Parse an unsigned integer; an empty cell reads as 0.
pub fn int_or_zero<T>(record: &Record, field: &str) -> std::result::Result<T, RecordError>
where
    T: std::str::FromStr + Default,
{
    let raw = record.text(field);
    if raw.is_empty() {
        return Ok(T::default());
    }
    raw.parse().map_err(|_| RecordError::BadNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Parse a required coordinate.
pub fn coord(record: &Record, field: &str) -> std::result::Result<f64, RecordError> {
    let raw = record.require(field)?;
    coord_num(raw).ok_or_else(|| RecordError::BadNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
