use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use tracing::trace;

use crate::domain::GateViewError;

/// Pseudo field under which every record exposes its status class.
pub const STATUS_FIELD: &str = "statusClass";

/// A single cell value.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Number(f64),
    Null,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn number(n: f64) -> Self {
        // -0.0 and 0.0 must land in the same filter bucket
        if n == 0.0 { Value::Number(0.0) } else { Value::Number(n) }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
        }
    }

    /// Numeric reading of the value. Text counts when it parses as a float.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Text(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Null => Ok(()),
        }
    }
}

// Total order used for value sets: nulls, then numbers, then text
// (case-insensitive first, raw bytes as tie-break).
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Number(n) => n.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Null => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

// Largest magnitude an f64 holds without skipping integers.
const MAX_EXACT_INT: u64 = 1 << 53;

impl From<i64> for Value {
    /// Integers past 2^53 become text so long card numbers keep every digit.
    fn from(n: i64) -> Self {
        if n.unsigned_abs() <= MAX_EXACT_INT {
            Value::number(n as f64)
        } else {
            Value::Text(n.to_string())
        }
    }
}

/// Row classification used for styling and the status-type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum StatusClass {
    #[default]
    Normal,
    Warning,
    Error,
    Offline,
    Info,
}

impl StatusClass {
    pub const ALL: [StatusClass; 5] = [
        StatusClass::Normal,
        StatusClass::Warning,
        StatusClass::Error,
        StatusClass::Offline,
        StatusClass::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Normal => "normal",
            StatusClass::Warning => "warning",
            StatusClass::Error => "error",
            StatusClass::Offline => "offline",
            StatusClass::Info => "info",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "ok" => Ok(StatusClass::Normal),
            "warning" | "warn" => Ok(StatusClass::Warning),
            "error" | "alarm" => Ok(StatusClass::Error),
            "offline" => Ok(StatusClass::Offline),
            "info" => Ok(StatusClass::Info),
            other => Err(format!("unknown status class {other:?}")),
        }
    }
}

/// Names of the fields that every record must (or may) carry.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub id_field: String,
    pub status_field: Option<String>,
    pub timestamp_field: Option<String>,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            status_field: None,
            timestamp_field: None,
        }
    }
}

/// One row of domain data: an access event, a person, a report line.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    status: StatusClass,
    timestamp: Option<i64>,
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, status: StatusClass) -> Self {
        let mut fields = HashMap::new();
        fields.insert(STATUS_FIELD.to_string(), Value::text(status.as_str()));
        Self {
            id: id.into(),
            status,
            timestamp: None,
            fields,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds a record from raw fields, checking the required ones once here
    /// so later accesses never have to.
    pub fn from_fields(
        row: usize,
        mut fields: HashMap<String, Value>,
        schema: &RecordSchema,
    ) -> Result<Self, GateViewError> {
        let id = match fields.get(&schema.id_field) {
            Some(v) if !v.is_blank() => v.to_string(),
            _ => {
                return Err(GateViewError::MissingField {
                    row,
                    field: schema.id_field.clone(),
                });
            }
        };

        let status = match schema.status_field.as_ref().and_then(|f| fields.get(f)) {
            Some(v) if !v.is_blank() => v.to_string().parse().unwrap_or_else(|e| {
                trace!("Row {row}: {e}, falling back to info");
                StatusClass::Info
            }),
            _ => StatusClass::default(),
        };

        let timestamp = schema
            .timestamp_field
            .as_ref()
            .and_then(|f| fields.get(f))
            .and_then(|v| v.as_number())
            .map(|n| n as i64);

        fields.insert(STATUS_FIELD.to_string(), Value::text(status.as_str()));
        Ok(Self {
            id,
            status,
            timestamp,
            fields,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> StatusClass {
        self.status
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Value of a field, treating a missing one as null.
    pub fn value(&self, key: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.fields.get(key).unwrap_or(&NULL)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if key == STATUS_FIELD {
            if let Ok(status) = value.to_string().parse() {
                self.status = status;
            }
            self.fields
                .insert(key, Value::text(self.status.as_str()));
        } else {
            self.fields.insert(key, value);
        }
    }

    pub fn set_status(&mut self, status: StatusClass) {
        self.status = status;
        self.fields
            .insert(STATUS_FIELD.to_string(), Value::text(status.as_str()));
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(|k| k.as_str())
    }
}
