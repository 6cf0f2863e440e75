//! Field-type registry
//!
//! Maps every [`FieldKind`] to a [`FieldStrategy`] that knows how the field
//! renders, how its wire value is coerced into a [`FieldValue`] and back, and
//! how user input is parsed.

use super::temporal;
use super::value::{FieldValue, RelationRef};
use crate::error::{ConsoleError, Result};
use crate::view::{FieldDefinition, FieldKind, SelectionSource};
use log::warn;
use serde_json::{Map, Value};

/// How a field should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHint {
    TextInput,
    TextArea,
    NumberInput,
    /// Yes/no affordance
    Toggle,
    DatePicker,
    DateTimePicker,
    TimePicker,
    Select,
    RelationPicker,
    MultiRelationPicker,
    /// Inert placeholder for unsupported kinds
    Placeholder,
}

/// Follow-up fetch needed to complete a many2one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLookup {
    pub field: String,
    pub model: String,
    pub id: i64,
}

/// Outcome of coerce-in for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: FieldValue,
    pub lookup: Option<PendingLookup>,
}

impl Coerced {
    fn ready(value: FieldValue) -> Self {
        Self { value, lookup: None }
    }
}

pub trait FieldStrategy: Send + Sync {
    fn render_hint(&self, field: &FieldDefinition) -> RenderHint;

    /// Convert the field's wire value, reading sibling expansion keys from
    /// the same record when needed. `None` when the record lacks the field.
    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced>;

    fn coerce_out(&self, field: &FieldDefinition, value: &FieldValue) -> Value;

    /// Parse text typed by the user. Empty input clears the field.
    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue>;

    /// Whether values of this kind are ever sent back to the server
    fn submittable(&self) -> bool {
        true
    }
}

struct ScalarStrategy;
struct NumericStrategy;
struct TemporalStrategy;
struct SelectionStrategy;
struct Many2OneStrategy;
struct Many2ManyStrategy;
struct InertStrategy;

static SCALAR: ScalarStrategy = ScalarStrategy;
static NUMERIC: NumericStrategy = NumericStrategy;
static TEMPORAL: TemporalStrategy = TemporalStrategy;
static SELECTION: SelectionStrategy = SelectionStrategy;
static MANY2ONE: Many2OneStrategy = Many2OneStrategy;
static MANY2MANY: Many2ManyStrategy = Many2ManyStrategy;
static INERT: InertStrategy = InertStrategy;

/// Look up the strategy for a field kind
pub fn resolve(kind: &FieldKind) -> &'static dyn FieldStrategy {
    match kind {
        FieldKind::Char
        | FieldKind::Text
        | FieldKind::Integer
        | FieldKind::Float
        | FieldKind::Boolean => &SCALAR,
        FieldKind::Numeric => &NUMERIC,
        FieldKind::Date | FieldKind::DateTime | FieldKind::Time => &TEMPORAL,
        FieldKind::Selection { .. } => &SELECTION,
        FieldKind::Many2One { .. } => &MANY2ONE,
        FieldKind::Many2Many { .. } => &MANY2MANY,
        FieldKind::One2Many { .. } | FieldKind::Binary => &INERT,
    }
}

fn invalid(field: &FieldDefinition, text: &str, expected: &str) -> ConsoleError {
    ConsoleError::field_validation(
        field.name.clone(),
        format!("'{}' is not a valid {}", text, expected),
    )
}

impl FieldStrategy for ScalarStrategy {
    fn render_hint(&self, field: &FieldDefinition) -> RenderHint {
        match field.kind {
            FieldKind::Text => RenderHint::TextArea,
            FieldKind::Integer | FieldKind::Float => RenderHint::NumberInput,
            FieldKind::Boolean => RenderHint::Toggle,
            _ => RenderHint::TextInput,
        }
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        record
            .get(&field.name)
            .map(|v| Coerced::ready(FieldValue::from_scalar(v)))
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        value.to_scalar()
    }

    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(match field.kind {
                FieldKind::Boolean => FieldValue::Boolean(false),
                _ => FieldValue::Null,
            });
        }
        match field.kind {
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid(field, text, "integer")),
            FieldKind::Float => trimmed
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| invalid(field, text, "number")),
            FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "1" => Ok(FieldValue::Boolean(true)),
                "no" | "n" | "false" | "0" => Ok(FieldValue::Boolean(false)),
                _ => Err(invalid(field, text, "yes/no value")),
            },
            _ => Ok(FieldValue::Text(text.to_string())),
        }
    }
}

impl FieldStrategy for NumericStrategy {
    fn render_hint(&self, _field: &FieldDefinition) -> RenderHint {
        RenderHint::NumberInput
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        let raw = record.get(&field.name)?;
        let value = match temporal::decode_decimal(raw) {
            Some(text) => FieldValue::Numeric(text),
            None => FieldValue::from_scalar(raw),
        };
        Some(Coerced::ready(value))
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        match value {
            FieldValue::Numeric(text) => temporal::encode_decimal(text),
            other => other.to_scalar(),
        }
    }

    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Null);
        }
        trimmed
            .parse::<f64>()
            .map(|_| FieldValue::Numeric(trimmed.to_string()))
            .map_err(|_| invalid(field, text, "decimal"))
    }
}

impl FieldStrategy for TemporalStrategy {
    fn render_hint(&self, field: &FieldDefinition) -> RenderHint {
        match field.kind {
            FieldKind::Date => RenderHint::DatePicker,
            FieldKind::Time => RenderHint::TimePicker,
            _ => RenderHint::DateTimePicker,
        }
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        let raw = record.get(&field.name)?;
        if raw.is_null() {
            return Some(Coerced::ready(FieldValue::Null));
        }
        let value = match field.kind {
            FieldKind::Time => temporal::decode_time(raw).map(FieldValue::Time),
            _ => temporal::decode_instant(raw).map(FieldValue::Instant),
        };
        Some(Coerced::ready(value.unwrap_or_else(|| {
            warn!("Field '{}' holds an unreadable {} value: {}", field.name, field.kind.tag(), raw);
            FieldValue::Inert(raw.clone())
        })))
    }

    fn coerce_out(&self, field: &FieldDefinition, value: &FieldValue) -> Value {
        match (&field.kind, value) {
            (FieldKind::Date, FieldValue::Instant(dt)) => temporal::encode_date(dt),
            (_, FieldValue::Instant(dt)) => temporal::encode_datetime(dt),
            (_, FieldValue::Time(t)) => temporal::encode_time(t),
            (_, other) => other.to_scalar(),
        }
    }

    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Null);
        }
        match field.kind {
            FieldKind::Time => temporal::decode_time(&Value::String(trimmed.to_string()))
                .map(FieldValue::Time)
                .ok_or_else(|| invalid(field, text, "time (HH:MM[:SS])")),
            FieldKind::Date => temporal::parse_iso_instant(trimmed)
                .and_then(|dt| dt.date().and_hms_opt(0, 0, 0))
                .map(FieldValue::Instant)
                .ok_or_else(|| invalid(field, text, "date (YYYY-MM-DD)")),
            _ => temporal::parse_iso_instant(trimmed)
                .map(FieldValue::Instant)
                .ok_or_else(|| invalid(field, text, "datetime (YYYY-MM-DD HH:MM[:SS])")),
        }
    }
}

impl FieldStrategy for SelectionStrategy {
    fn render_hint(&self, _field: &FieldDefinition) -> RenderHint {
        RenderHint::Select
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        SCALAR.coerce_in(field, record)
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        value.to_scalar()
    }

    /// Static options are checked here; method-sourced options are checked
    /// by the form session once they are resolved
    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Null);
        }
        if let FieldKind::Selection { source: SelectionSource::Static(options) } = &field.kind {
            return options
                .iter()
                .find(|o| o.value.as_str() == Some(trimmed) || o.label == trimmed)
                .map(|o| FieldValue::from_scalar(&o.value))
                .ok_or_else(|| invalid(field, text, "option"));
        }
        Ok(FieldValue::Text(trimmed.to_string()))
    }
}

fn display_name_of(obj: &Map<String, Value>) -> Option<String> {
    ["rec_name", "display_name", "name"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

impl FieldStrategy for Many2OneStrategy {
    fn render_hint(&self, _field: &FieldDefinition) -> RenderHint {
        RenderHint::RelationPicker
    }

    /// Resolution order: inline `{id, rec_name}` object, then the sibling
    /// `"<field>."` object, then a flat `"<field>.rec_name"` key, and finally
    /// a bare id whose name has to be fetched.
    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        let raw = record.get(&field.name)?;

        if let Value::Object(inline) = raw {
            let Some(id) = inline.get("id").and_then(|v| v.as_i64()) else {
                return Some(Coerced::ready(FieldValue::Null));
            };
            if let Some(name) = display_name_of(inline) {
                return Some(Coerced::ready(FieldValue::Reference(RelationRef::new(id, name))));
            }
            return Some(self.with_siblings(field, id, record));
        }

        match raw.as_i64() {
            Some(id) => Some(self.with_siblings(field, id, record)),
            None => Some(Coerced::ready(FieldValue::Null)),
        }
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        value.relation_id().map(Value::from).unwrap_or(Value::Null)
    }

    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        let trimmed = text.trim().trim_start_matches('#');
        if trimmed.is_empty() {
            return Ok(FieldValue::Null);
        }
        trimmed
            .parse::<i64>()
            .map(FieldValue::Pending)
            .map_err(|_| invalid(field, text, "record id"))
    }
}

impl Many2OneStrategy {
    fn with_siblings(&self, field: &FieldDefinition, id: i64, record: &Map<String, Value>) -> Coerced {
        let expanded = record
            .get(&format!("{}.", field.name))
            .and_then(|v| v.as_object())
            .and_then(display_name_of);
        let flat = || {
            record
                .get(&format!("{}.rec_name", field.name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        match expanded.or_else(flat) {
            Some(name) => Coerced::ready(FieldValue::Reference(RelationRef::new(id, name))),
            None => Coerced {
                value: FieldValue::Pending(id),
                lookup: field.kind.relation().map(|model| PendingLookup {
                    field: field.name.clone(),
                    model: model.to_string(),
                    id,
                }),
            },
        }
    }
}

impl FieldStrategy for Many2ManyStrategy {
    fn render_hint(&self, _field: &FieldDefinition) -> RenderHint {
        RenderHint::MultiRelationPicker
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        let raw = record.get(&field.name)?;
        let value = match raw {
            Value::Array(items) => FieldValue::Ids(
                items
                    .iter()
                    .filter_map(|item| item.as_i64().or_else(|| item.get("id")?.as_i64()))
                    .collect(),
            ),
            _ => FieldValue::Null,
        };
        Some(Coerced::ready(value))
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        match value {
            FieldValue::Ids(ids) => Value::from(ids.clone()),
            _ => Value::Null,
        }
    }

    fn parse_input(&self, field: &FieldDefinition, text: &str) -> Result<FieldValue> {
        text.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<i64>().map_err(|_| invalid(field, part, "record id")))
            .collect::<Result<Vec<_>>>()
            .map(FieldValue::Ids)
    }
}

impl FieldStrategy for InertStrategy {
    fn render_hint(&self, _field: &FieldDefinition) -> RenderHint {
        RenderHint::Placeholder
    }

    fn coerce_in(&self, field: &FieldDefinition, record: &Map<String, Value>) -> Option<Coerced> {
        record
            .get(&field.name)
            .map(|raw| Coerced::ready(FieldValue::Inert(raw.clone())))
    }

    fn coerce_out(&self, _field: &FieldDefinition, value: &FieldValue) -> Value {
        value.to_scalar()
    }

    fn parse_input(&self, field: &FieldDefinition, _text: &str) -> Result<FieldValue> {
        Err(ConsoleError::field_validation(
            field.name.clone(),
            format!("{} fields cannot be edited here", field.kind.tag()),
        ))
    }

    fn submittable(&self) -> bool {
        false
    }
}
