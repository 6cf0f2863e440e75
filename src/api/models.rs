//! Wire shapes exchanged with the server outside of plain record data

use crate::error::{ConsoleError, Result};
use crate::view::{ViewArchitecture, ViewType};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of `ir.ui.menu` as returned by `search_read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub sequence: Option<i64>,
    /// Action reference such as `ir.action.act_window,12`
    #[serde(default)]
    pub action: Option<String>,
}

impl MenuRow {
    /// Id of the window action this entry opens, if it opens one
    pub fn window_action_id(&self) -> Option<i64> {
        let (model, id) = self.action.as_deref()?.split_once(',')?;
        if model != crate::api::constants::WINDOW_ACTION_MODEL {
            return None;
        }
        id.trim().parse().ok()
    }
}

/// Something a menu entry can open
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTarget {
    Window {
        name: String,
        model: String,
        view_id: Option<i64>,
        /// Requested type only; the loaded view decides
        view_type: ViewType,
        domain: Value,
    },
    Wizard {
        name: String,
        wizard: String,
    },
}

impl ActionTarget {
    pub fn name(&self) -> &str {
        match self {
            ActionTarget::Window { name, .. } | ActionTarget::Wizard { name, .. } => name,
        }
    }

    pub fn window(model: impl Into<String>, view_type: ViewType) -> Self {
        let model = model.into();
        ActionTarget::Window {
            name: model.clone(),
            model,
            view_id: None,
            view_type,
            domain: Value::Array(Vec::new()),
        }
    }

    /// Parse one action dictionary from `get_keyword`. Action types this
    /// console cannot open yield `None`.
    pub fn from_wire(raw: &Value) -> Option<ActionTarget> {
        let name = raw.get("name").and_then(|n| n.as_str()).unwrap_or_default().to_string();
        match raw.get("type").and_then(|t| t.as_str()) {
            Some("ir.action.act_window") => {
                let model = raw.get("res_model")?.as_str()?.to_string();
                let first_view = raw
                    .get("views")
                    .and_then(|v| v.as_array())
                    .and_then(|views| views.first())
                    .and_then(|v| v.as_array());
                let view_id = first_view.and_then(|v| v.first()).and_then(|id| id.as_i64());
                let view_type = first_view
                    .and_then(|v| v.get(1))
                    .and_then(|t| t.as_str())
                    .and_then(ViewType::parse)
                    .unwrap_or(ViewType::Tree);
                let domain = match raw.get("pyson_domain").or_else(|| raw.get("domain")) {
                    Some(Value::String(text)) => serde_json::from_str(text).unwrap_or(Value::Array(Vec::new())),
                    Some(Value::Array(items)) => Value::Array(items.clone()),
                    _ => Value::Array(Vec::new()),
                };
                Some(ActionTarget::Window {
                    name,
                    model,
                    view_id,
                    view_type,
                    domain,
                })
            }
            Some("ir.action.wizard") => Some(ActionTarget::Wizard {
                name,
                wizard: raw.get("wiz_name")?.as_str()?.to_string(),
            }),
            other => {
                debug!("Skipping unsupported action type {:?}", other);
                None
            }
        }
    }
}

/// Identifiers handed out by `wizard.<name>.create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardInstance {
    pub id: i64,
    pub start_state: String,
    pub end_state: String,
}

impl WizardInstance {
    /// Parse `[session_id, start_state, end_state]`
    pub fn from_wire(raw: &Value) -> Option<WizardInstance> {
        let parts = raw.as_array()?;
        Some(WizardInstance {
            id: parts.first()?.as_i64()?,
            start_state: parts.get(1)?.as_str()?.to_string(),
            end_state: parts.get(2)?.as_str()?.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardButton {
    pub label: String,
    /// State the wizard moves to when this button is pressed
    pub state: String,
    #[serde(default)]
    pub default: bool,
    /// Whether the form must be valid before moving on
    #[serde(default)]
    pub validate: bool,
}

/// A wizard state that shows a form
#[derive(Debug, Clone, PartialEq)]
pub struct WizardView {
    pub state: String,
    pub architecture: ViewArchitecture,
    /// Wire-format defaults for the form
    pub defaults: Map<String, Value>,
    pub buttons: Vec<WizardButton>,
}

impl WizardView {
    /// Parse the `view` member of a wizard execute result
    pub fn from_wire(raw: &Value) -> Result<WizardView> {
        let state = raw
            .get("state")
            .and_then(|s| s.as_str())
            .ok_or_else(|| ConsoleError::Protocol(format!("wizard view without a state: {}", raw)))?
            .to_string();
        let fields_view = raw
            .get("fields_view")
            .ok_or_else(|| ConsoleError::Protocol(format!("wizard state '{}' has no fields_view", state)))?;
        let model = fields_view.get("model").and_then(|m| m.as_str()).unwrap_or_default();
        let architecture = ViewArchitecture::from_wire(model, fields_view)?;
        let buttons = raw
            .get("buttons")
            .and_then(|b| b.as_array())
            .map(|buttons| {
                buttons
                    .iter()
                    .filter_map(|b| {
                        Some(WizardButton {
                            label: b.get("string").and_then(|s| s.as_str()).unwrap_or_default().to_string(),
                            state: b.get("state")?.as_str()?.to_string(),
                            default: b.get("default").and_then(|d| d.as_bool()).unwrap_or(false),
                            validate: b.get("validate").and_then(|d| d.as_bool()).unwrap_or(false),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(WizardView {
            state,
            architecture,
            defaults: raw
                .get("defaults")
                .and_then(|d| d.as_object())
                .cloned()
                .unwrap_or_default(),
            buttons,
        })
    }
}

/// Outcome of one wizard transition
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStepResult {
    /// The wizard shows another form
    Continue(WizardView),
    /// The wizard finished; the actions it asks the client to run
    Success { actions: Vec<Value> },
}

impl WizardStepResult {
    /// A `view` member means another form. It must parse; a broken view is
    /// never mistaken for the end of the wizard.
    pub fn from_wire(raw: &Value) -> Result<WizardStepResult> {
        if let Some(view) = raw.get("view").filter(|v| !v.is_null()) {
            return WizardView::from_wire(view).map(WizardStepResult::Continue);
        }
        Ok(WizardStepResult::Success {
            actions: raw
                .get("actions")
                .and_then(|a| a.as_array())
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_menu_row_window_action() {
        let row: MenuRow = serde_json::from_value(json!({
            "id": 4, "name": "Parties", "icon": "tryton-party",
            "parent": 1, "action": "ir.action.act_window,12"
        }))
        .unwrap();
        assert_eq!(row.window_action_id(), Some(12));

        let row = MenuRow { action: Some("ir.action.wizard,3".into()), ..row };
        assert_eq!(row.window_action_id(), None);
    }

    #[test]
    fn test_action_target_parsing() {
        let window = ActionTarget::from_wire(&json!({
            "type": "ir.action.act_window",
            "name": "Patients",
            "res_model": "gnuhealth.patient",
            "views": [[77, "tree"], [78, "form"]],
            "pyson_domain": "[[\"active\", \"=\", true]]"
        }))
        .unwrap();
        assert_eq!(
            window,
            ActionTarget::Window {
                name: "Patients".into(),
                model: "gnuhealth.patient".into(),
                view_id: Some(77),
                view_type: ViewType::Tree,
                domain: json!([["active", "=", true]]),
            }
        );

        let wizard = ActionTarget::from_wire(&json!({
            "type": "ir.action.wizard", "name": "Merge", "wiz_name": "party.merge"
        }))
        .unwrap();
        assert_eq!(wizard.name(), "Merge");

        assert!(ActionTarget::from_wire(&json!({"type": "ir.action.report"})).is_none());
    }

    #[test]
    fn test_wizard_parsing() {
        let instance = WizardInstance::from_wire(&json!([9, "start", "end"])).unwrap();
        assert_eq!(instance.start_state, "start");

        let result = WizardStepResult::from_wire(&json!({
            "view": {
                "state": "start",
                "fields_view": {
                    "model": "party.merge.start", "type": "form",
                    "arch": "<form><field name=\"source\"/></form>",
                    "fields": {"source": {"type": "many2one", "relation": "party.party"}}
                },
                "defaults": {"source": 3},
                "buttons": [
                    {"string": "Cancel", "state": "end"},
                    {"string": "Merge", "state": "merge", "default": true, "validate": true}
                ]
            }
        }))
        .unwrap();
        match result {
            WizardStepResult::Continue(view) => {
                assert_eq!(view.state, "start");
                assert_eq!(view.buttons.len(), 2);
                assert!(view.buttons[1].default);
                assert_eq!(view.defaults.get("source"), Some(&json!(3)));
            }
            other => panic!("expected a form, got {:?}", other),
        }

        assert_eq!(
            WizardStepResult::from_wire(&json!({"actions": []})).unwrap(),
            WizardStepResult::Success { actions: vec![] }
        );
    }

    #[test]
    fn test_broken_wizard_view_is_an_error() {
        let untyped = json!({"view": {"state": "ask", "fields_view": {"arch": "<form/>", "fields": {}}}});
        assert!(matches!(
            WizardStepResult::from_wire(&untyped),
            Err(ConsoleError::Protocol(_))
        ));

        let stateless = json!({"view": {"fields_view": {"type": "form", "arch": "<form/>", "fields": {}}}});
        assert!(matches!(
            WizardStepResult::from_wire(&stateless),
            Err(ConsoleError::Protocol(_))
        ));
    }
}
