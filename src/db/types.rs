//! Query result types for inventory-chat.
//!
//! Result schemas are only known per query at runtime, so rows are ordered
//! column-name to [`Value`] mappings rather than typed structs.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// A single result row: column names mapped to values, in result column order.
///
/// Duplicate column names (e.g. `SELECT a.Id, b.Id`) are kept as separate
/// entries; lookups by name return the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a column to the end of the row.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((column.into(), value.into()));
    }

    /// Builder-style variant of [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Returns the value of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in result order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Result of executing a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The statement produced a row set.
    Rows(Vec<Row>),

    /// The statement produced no row set; carries the affected-row count.
    Affected { rows_affected: u64 },
}

impl QueryResult {
    /// Number of entries in the presented sequence.
    ///
    /// A mutation summary presents as a single entry.
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Affected { .. } => 1,
        }
    }

    /// Returns true if there is nothing to present (an empty row set).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the result as a sequence of rows.
    ///
    /// A mutation summary becomes `[{"rows_affected": n}]`.
    pub fn to_rows(&self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows.clone(),
            Self::Affected { rows_affected } => {
                vec![Row::new().with("rows_affected", *rows_affected as i64)]
            }
        }
    }

    /// Returns at most `limit` presented rows and the number left out.
    pub fn sample(&self, limit: usize) -> (Vec<Row>, usize) {
        match self {
            Self::Rows(rows) => {
                let omitted = rows.len().saturating_sub(limit);
                (rows.iter().take(limit).cloned().collect(), omitted)
            }
            Self::Affected { .. } => {
                let rows = self.to_rows();
                let omitted = rows.len().saturating_sub(limit);
                (rows.into_iter().take(limit).collect(), omitted)
            }
        }
    }
}

impl Serialize for QueryResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rows = self.to_rows();
        let mut seq = serializer.serialize_seq(Some(rows.len()))?;
        for row in &rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
