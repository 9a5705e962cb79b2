//! Columnar result frames.
//! The backend answers each query with one frame: named fields, each field a
//! typed array of values, all arrays the same length. The bridge never
//! reshapes frames for panel use; the variable path reads the first column
//! and needs a canonical text form for every scalar.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int64,
    Uint64,
    Float64,
    String,
    Time,
}

/// One column: a name, a declared type, and the value array. Values stay as
/// raw JSON scalars; a `time` column may carry epoch milliseconds or an
/// RFC3339 string depending on how the backend encoded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub values: Vec<Value>,
}

impl Field {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Canonical text for the value at `ix`, or None past the end.
    pub fn text_at(&self, ix: usize) -> Option<String> {
        self.values.get(ix).map(|v| value_text(self.field_type, v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Frame {
    /// Row count is the first field's length; fields are parallel arrays.
    pub fn row_count(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }
}

/// Canonical text representation of one scalar: strings verbatim, numbers
/// and bools via their JSON literal, time columns as UTC RFC3339 (epoch
/// milliseconds are converted; strings are assumed already formatted).
/// Anything non-scalar falls back to compact JSON.
pub fn value_text(ty: FieldType, v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if ty == FieldType::Time {
                if let Some(ms) = n.as_i64() {
                    if let Some(ts) = DateTime::from_timestamp_millis(ms) {
                        return ts.to_rfc3339_opts(SecondsFormat::Millis, true);
                    }
                }
            }
            n.to_string()
        }
        other => other.to_string(),
    }
}
