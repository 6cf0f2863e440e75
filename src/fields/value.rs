//! Internal value representation used by forms and tables

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A relational record reference as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: i64,
    pub display_name: String,
}

impl RelationRef {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// Value of a single field after coerce-in
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Decimal kept in its exact textual form
    Numeric(String),
    /// Dates and datetimes; pure dates sit at midnight
    Instant(NaiveDateTime),
    Time(NaiveTime),
    /// Normalized many2one
    Reference(RelationRef),
    /// Many2one whose display name is still being looked up
    Pending(i64),
    /// Many2many id list
    Ids(Vec<i64>),
    /// Unsupported kinds (one2many, binary) carried through untouched
    Inert(Value),
}

/// Field name to value mapping for one record
pub type RecordValue = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Identity mapping for JSON scalars
    pub fn from_scalar(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Inert(other.clone()),
        }
    }

    /// Inverse of [`FieldValue::from_scalar`]; relational and temporal
    /// variants are handled by their strategies instead
    pub fn to_scalar(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Text(s) | Self::Numeric(s) => Value::String(s.clone()),
            Self::Instant(dt) => Value::String(iso_instant(dt)),
            Self::Time(t) => Value::String(t.format("%H:%M:%S").to_string()),
            Self::Reference(r) => Value::from(r.id),
            Self::Pending(id) => Value::from(*id),
            Self::Ids(ids) => Value::from(ids.clone()),
            Self::Inert(v) => v.clone(),
        }
    }

    /// Relation id carried by a many2one value, resolved or not
    pub fn relation_id(&self) -> Option<i64> {
        match self {
            Self::Reference(r) => Some(r.id),
            Self::Pending(id) => Some(*id),
            _ => None,
        }
    }
}

/// ISO-8601 rendering used for every instant shown to the user
pub fn iso_instant(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(true) => write!(f, "yes"),
            Self::Boolean(false) => write!(f, "no"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) | Self::Numeric(s) => write!(f, "{}", s),
            Self::Instant(dt) => write!(f, "{}", iso_instant(dt)),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Self::Reference(r) => write!(f, "{}", r.display_name),
            Self::Pending(id) => write!(f, "#{} (loading)", id),
            Self::Ids(ids) => write!(f, "{} record(s)", ids.len()),
            Self::Inert(_) => write!(f, "(not supported)"),
        }
    }
}
