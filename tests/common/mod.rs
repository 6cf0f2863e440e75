//! In-memory server used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tryton_console::api::{ActionTarget, MenuRow, TrytonApi, WizardInstance, WizardStepResult};
use tryton_console::error::{ConsoleError, Result};
use tryton_console::fields::RelationRef;
use tryton_console::view::{SelectionOption, ViewArchitecture, ViewType};

/// Canned answers keyed by model, plus a log of every call made
#[derive(Default)]
pub struct MockApi {
    pub views: HashMap<String, ViewArchitecture>,
    pub records: HashMap<(String, i64), Map<String, Value>>,
    pub lists: HashMap<String, Vec<Map<String, Value>>>,
    pub selections: HashMap<(String, String), Vec<SelectionOption>>,
    pub names: HashMap<(String, i64), String>,
    pub defaults: HashMap<String, Map<String, Value>>,
    pub menu: Vec<MenuRow>,
    pub action_models: HashMap<i64, String>,
    pub targets: HashMap<i64, Vec<ActionTarget>>,
    pub wizard_steps: Mutex<VecDeque<WizardStepResult>>,
    /// Methods that answer with the paired error
    pub failures: HashMap<String, ConsoleError>,
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<(String, Map<String, Value>)>>,
    pub updated: Mutex<Vec<(String, i64, Map<String, Value>)>>,
    pub executed: Mutex<Vec<(String, String, Map<String, Value>)>>,
    pub deleted_wizards: Mutex<HashSet<i64>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, view: ViewArchitecture) -> Self {
        self.views.insert(view.model.clone(), view);
        self
    }

    pub fn with_record(mut self, model: &str, record: Value) -> Self {
        let record = object(record);
        let id = record.get("id").and_then(|id| id.as_i64()).unwrap_or_default();
        self.records.insert((model.to_string(), id), record);
        self
    }

    pub fn with_rows(mut self, model: &str, rows: Vec<Value>) -> Self {
        self.lists.insert(model.to_string(), rows.into_iter().map(object).collect());
        self
    }

    pub fn with_selection(mut self, model: &str, method: &str, options: Value) -> Self {
        self.selections
            .insert((model.to_string(), method.to_string()), SelectionOption::parse_list(&options));
        self
    }

    pub fn with_name(mut self, model: &str, id: i64, name: &str) -> Self {
        self.names.insert((model.to_string(), id), name.to_string());
        self
    }

    pub fn with_defaults(mut self, model: &str, defaults: Value) -> Self {
        self.defaults.insert(model.to_string(), object(defaults));
        self
    }

    pub fn with_menu(mut self, rows: Vec<MenuRow>, action_models: &[(i64, &str)]) -> Self {
        self.menu = rows;
        self.action_models = action_models.iter().map(|(id, m)| (*id, m.to_string())).collect();
        self
    }

    pub fn with_targets(mut self, menu_id: i64, targets: Vec<ActionTarget>) -> Self {
        self.targets.insert(menu_id, targets);
        self
    }

    pub fn with_wizard_steps(self, steps: Vec<WizardStepResult>) -> Self {
        *self.wizard_steps.lock().unwrap() = steps.into();
        self
    }

    pub fn failing(mut self, method: &str, error: ConsoleError) -> Self {
        self.failures.insert(method.to_string(), error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(method)).count()
    }

    fn record_call(&self, method: &str, detail: impl std::fmt::Display) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", method, detail));
        match self.failures.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_step(&self) -> WizardStepResult {
        self.wizard_steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WizardStepResult::Success { actions: Vec::new() })
    }
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

/// MenuRow shorthand
pub fn menu_row(id: i64, name: &str, parent: Option<i64>, action: Option<&str>) -> MenuRow {
    MenuRow {
        id,
        name: name.to_string(),
        icon: None,
        parent,
        sequence: Some(10),
        action: action.map(str::to_string),
    }
}

/// Architecture built from the wire shape `fields_view_get` returns
pub fn view(model: &str, view_type: &str, arch: &str, fields: Value) -> ViewArchitecture {
    ViewArchitecture::from_wire(
        model,
        &json!({ "model": model, "type": view_type, "arch": arch, "fields": fields }),
    )
    .unwrap()
}

#[async_trait]
impl TrytonApi for MockApi {
    async fn get_view_architecture(
        &self,
        model: &str,
        _view_id: Option<i64>,
        view_type: ViewType,
    ) -> Result<ViewArchitecture> {
        self.record_call("get_view_architecture", format!("{} {}", model, view_type.as_str()))?;
        self.views
            .get(model)
            .cloned()
            .ok_or_else(|| ConsoleError::not_found(format!("view for '{}'", model)))
    }

    async fn get_record(&self, model: &str, id: i64, _fields: &[String]) -> Result<Map<String, Value>> {
        self.record_call("get_record", format!("{} {}", model, id))?;
        self.records
            .get(&(model.to_string(), id))
            .cloned()
            .ok_or_else(|| ConsoleError::not_found(format!("{} #{}", model, id)))
    }

    async fn list_records(
        &self,
        model: &str,
        _domain: &Value,
        _fields: &[String],
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>> {
        self.record_call("list_records", model)?;
        Ok(self
            .lists
            .get(model)
            .map(|rows| rows.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_record(&self, model: &str, payload: &Map<String, Value>) -> Result<i64> {
        self.record_call("create_record", model)?;
        let mut created = self.created.lock().unwrap();
        created.push((model.to_string(), payload.clone()));
        Ok(100 + created.len() as i64)
    }

    async fn update_record(&self, model: &str, id: i64, payload: &Map<String, Value>) -> Result<()> {
        self.record_call("update_record", format!("{} {}", model, id))?;
        self.updated.lock().unwrap().push((model.to_string(), id, payload.clone()));
        Ok(())
    }

    async fn resolve_selection_options(&self, model: &str, method: &str) -> Result<Vec<SelectionOption>> {
        self.record_call("resolve_selection_options", format!("{} {}", model, method))?;
        self.selections
            .get(&(model.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| ConsoleError::not_found(format!("{}.{}", model, method)))
    }

    async fn autocomplete(&self, model: &str, text: &str, _domain: &Value, limit: usize) -> Result<Vec<RelationRef>> {
        self.record_call("autocomplete", format!("{} {}", model, text))?;
        let needle = text.to_lowercase();
        let mut matches: Vec<RelationRef> = self
            .names
            .iter()
            .filter(|((m, _), name)| m == model && name.to_lowercase().contains(&needle))
            .map(|((_, id), name)| RelationRef::new(*id, name.clone()))
            .collect();
        matches.sort_by_key(|r| r.id);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn read_display_names(&self, model: &str, ids: &[i64]) -> Result<Vec<RelationRef>> {
        self.record_call("read_display_names", format!("{} {:?}", model, ids))?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.names
                    .get(&(model.to_string(), *id))
                    .map(|name| RelationRef::new(*id, name.clone()))
            })
            .collect())
    }

    async fn default_values(&self, model: &str, _fields: &[String]) -> Result<Map<String, Value>> {
        self.record_call("default_values", model)?;
        Ok(self.defaults.get(model).cloned().unwrap_or_default())
    }

    async fn menu_rows(&self) -> Result<Vec<MenuRow>> {
        self.record_call("menu_rows", "")?;
        Ok(self.menu.clone())
    }

    async fn window_action_models(&self, action_ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.record_call("window_action_models", format!("{:?}", action_ids))?;
        Ok(self
            .action_models
            .iter()
            .filter(|(id, _)| action_ids.contains(id))
            .map(|(id, model)| (*id, model.clone()))
            .collect())
    }

    async fn action_targets(&self, menu_id: i64) -> Result<Vec<ActionTarget>> {
        self.record_call("action_targets", menu_id)?;
        Ok(self.targets.get(&menu_id).cloned().unwrap_or_default())
    }

    async fn create_wizard_instance(&self, wizard: &str) -> Result<WizardInstance> {
        self.record_call("create_wizard_instance", wizard)?;
        Ok(WizardInstance {
            id: 7,
            start_state: "start".to_string(),
            end_state: "end".to_string(),
        })
    }

    async fn get_wizard_form(&self, wizard: &str, _instance: &WizardInstance) -> Result<WizardStepResult> {
        self.record_call("get_wizard_form", wizard)?;
        Ok(self.next_step())
    }

    async fn execute_wizard_step(
        &self,
        wizard: &str,
        _instance: &WizardInstance,
        form_state: &str,
        button_state: &str,
        payload: &Map<String, Value>,
    ) -> Result<WizardStepResult> {
        self.record_call("execute_wizard_step", format!("{} {}", wizard, button_state))?;
        self.executed
            .lock()
            .unwrap()
            .push((form_state.to_string(), button_state.to_string(), payload.clone()));
        Ok(self.next_step())
    }

    async fn delete_wizard_instance(&self, wizard: &str, instance: &WizardInstance) -> Result<()> {
        self.record_call("delete_wizard_instance", wizard)?;
        self.deleted_wizards.lock().unwrap().insert(instance.id);
        Ok(())
    }
}
