//! View architecture and field metadata as delivered by `fields_view_get`

use crate::error::{ConsoleError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolved view type. The server's answer is authoritative, never the
/// type that was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Form,
    Tree,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::Form => "form",
            ViewType::Tree => "tree",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "form" => Some(ViewType::Form),
            "tree" | "list" => Some(ViewType::Tree),
            _ => None,
        }
    }
}

/// A `[value, label]` selection pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub value: Value,
    pub label: String,
}

impl SelectionOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Parse `[["a", "Alpha"], ["b", "Beta"]]`; malformed pairs are skipped
    pub fn parse_list(value: &Value) -> Vec<SelectionOption> {
        value
            .as_array()
            .map(|pairs| {
                pairs
                    .iter()
                    .filter_map(|pair| {
                        let pair = pair.as_array()?;
                        let label = match pair.get(1)? {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        Some(SelectionOption::new(pair.first()?.clone(), label))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Where a selection field gets its options from
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionSource {
    Static(Vec<SelectionOption>),
    /// Server method that must be called before options are known
    Method(String),
}

/// Field type tag with the attributes only that type carries
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Char,
    Text,
    Integer,
    Float,
    Numeric,
    Boolean,
    Date,
    DateTime,
    Time,
    Selection { source: SelectionSource },
    Many2One { relation: String },
    Many2Many { relation: String },
    One2Many { relation: String },
    Binary,
}

impl FieldKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Char => "char",
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Numeric => "numeric",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Time => "time",
            FieldKind::Selection { .. } => "selection",
            FieldKind::Many2One { .. } => "many2one",
            FieldKind::Many2Many { .. } => "many2many",
            FieldKind::One2Many { .. } => "one2many",
            FieldKind::Binary => "binary",
        }
    }

    /// Related model for relational kinds
    pub fn relation(&self) -> Option<&str> {
        match self {
            FieldKind::Many2One { relation }
            | FieldKind::Many2Many { relation }
            | FieldKind::One2Many { relation } => Some(relation),
            _ => None,
        }
    }

    /// Build a kind from the wire description. Unknown tags, and relational
    /// tags missing their relation, fall back to `Char`.
    pub fn from_wire(field_name: &str, tag: &str, raw: &Value) -> FieldKind {
        let relation = raw.get("relation").and_then(|r| r.as_str()).map(str::to_string);

        match (tag, relation) {
            ("char", _) => FieldKind::Char,
            ("text", _) => FieldKind::Text,
            ("integer", _) | ("biginteger", _) => FieldKind::Integer,
            ("float", _) => FieldKind::Float,
            ("numeric", _) => FieldKind::Numeric,
            ("boolean", _) => FieldKind::Boolean,
            ("date", _) => FieldKind::Date,
            ("datetime", _) | ("timestamp", _) => FieldKind::DateTime,
            ("time", _) => FieldKind::Time,
            ("selection", _) => {
                let source = match raw.get("selection") {
                    Some(Value::String(method)) => SelectionSource::Method(method.clone()),
                    Some(list) => SelectionSource::Static(SelectionOption::parse_list(list)),
                    None => SelectionSource::Static(Vec::new()),
                };
                FieldKind::Selection { source }
            }
            ("many2one", Some(relation)) => FieldKind::Many2One { relation },
            ("many2many", Some(relation)) => FieldKind::Many2Many { relation },
            ("one2many", Some(relation)) => FieldKind::One2Many { relation },
            ("binary", _) => FieldKind::Binary,
            (other, _) => {
                warn!("Field '{}' has unsupported type '{}', rendering as char", field_name, other);
                FieldKind::Char
            }
        }
    }
}

/// Metadata for one field of a view
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub readonly: bool,
    pub help: Option<String>,
    /// Default value in wire format
    pub default: Option<Value>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            required: false,
            readonly: false,
            help: None,
            default: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn from_wire(name: &str, raw: &Value) -> FieldDefinition {
        let tag = raw.get("type").and_then(|t| t.as_str()).unwrap_or("char");
        let flag = |key: &str| raw.get(key).and_then(|v| v.as_bool()).unwrap_or(false);

        FieldDefinition {
            name: name.to_string(),
            label: raw
                .get("string")
                .and_then(|s| s.as_str())
                .unwrap_or(name)
                .to_string(),
            kind: FieldKind::from_wire(name, tag, raw),
            required: flag("required"),
            readonly: flag("readonly"),
            help: raw.get("help").and_then(|h| h.as_str()).map(str::to_string),
            default: raw.get("default").filter(|d| !d.is_null()).cloned(),
        }
    }
}

/// Field metadata plus layout document for one model view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewArchitecture {
    pub model: String,
    pub view_id: Option<i64>,
    pub view_type: ViewType,
    /// In server order
    pub fields: Vec<FieldDefinition>,
    pub layout_xml: String,
}

impl ViewArchitecture {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Names to request when reading a record for this view, including the
    /// `<field>.rec_name` expansion for every many2one
    pub fn read_field_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            names.push(field.name.clone());
            if matches!(field.kind, FieldKind::Many2One { .. }) {
                names.push(format!("{}.rec_name", field.name));
            }
        }
        names
    }

    /// Parse a `fields_view_get` answer
    pub fn from_wire(model: &str, raw: &Value) -> Result<Self> {
        let type_tag = raw
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ConsoleError::Protocol(format!("view for '{}' has no type", model)))?;
        let view_type = ViewType::parse(type_tag).ok_or_else(|| {
            ConsoleError::Protocol(format!("unsupported view type '{}' for '{}'", type_tag, model))
        })?;

        let fields = raw
            .get("fields")
            .and_then(|f| f.as_object())
            .map(|map| {
                map.iter()
                    .map(|(name, def)| FieldDefinition::from_wire(name, def))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        debug!("Parsed {} view for '{}' with {} fields", type_tag, model, fields.len());

        Ok(Self {
            model: raw
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or(model)
                .to_string(),
            view_id: raw.get("view_id").and_then(|v| v.as_i64()),
            view_type,
            fields,
            layout_xml: raw
                .get("arch")
                .and_then(|a| a.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fields_view_get() {
        let raw = json!({
            "model": "party.party",
            "type": "form",
            "view_id": 41,
            "arch": "<form><field name=\"name\"/></form>",
            "fields": {
                "name": {"type": "char", "string": "Name", "required": true},
                "lang": {"type": "many2one", "relation": "ir.lang", "string": "Language"},
                "gender": {"type": "selection", "selection": "get_gender"},
                "state": {"type": "selection", "selection": [["draft", "Draft"], ["done", "Done"]]},
                "photo": {"type": "binary"}
            }
        });

        let arch = ViewArchitecture::from_wire("party.party", &raw).unwrap();
        assert_eq!(arch.view_type, ViewType::Form);
        assert_eq!(arch.view_id, Some(41));
        assert_eq!(
            arch.field_names().collect::<Vec<_>>(),
            vec!["name", "lang", "gender", "state", "photo"]
        );
        assert!(arch.field("name").unwrap().required);
        assert_eq!(arch.field("lang").unwrap().kind.relation(), Some("ir.lang"));
        assert_eq!(
            arch.field("gender").unwrap().kind,
            FieldKind::Selection { source: SelectionSource::Method("get_gender".into()) }
        );
        match &arch.field("state").unwrap().kind {
            FieldKind::Selection { source: SelectionSource::Static(options) } => {
                assert_eq!(options.len(), 2);
                assert_eq!(options[1].label, "Done");
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(
            arch.read_field_names(),
            vec!["name", "lang", "lang.rec_name", "gender", "state", "photo"]
        );
    }

    #[test]
    fn test_unknown_type_falls_back_to_char() {
        let def = FieldDefinition::from_wire("blob", &json!({"type": "dict"}));
        assert_eq!(def.kind, FieldKind::Char);
        assert_eq!(def.label, "blob");

        let def = FieldDefinition::from_wire("owner", &json!({"type": "many2one"}));
        assert_eq!(def.kind, FieldKind::Char);
    }

    #[test]
    fn test_view_type_is_taken_from_server() {
        let raw = json!({"type": "tree", "arch": "<tree/>", "fields": {}});
        let arch = ViewArchitecture::from_wire("sale.sale", &raw).unwrap();
        assert_eq!(arch.view_type, ViewType::Tree);
        assert_eq!(arch.model, "sale.sale");

        let raw = json!({"type": "graph", "arch": "<graph/>", "fields": {}});
        assert!(matches!(
            ViewArchitecture::from_wire("sale.sale", &raw),
            Err(ConsoleError::Protocol(_))
        ));
    }
}
