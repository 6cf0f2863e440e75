use super::models::{ActionTarget, MenuRow, WizardInstance, WizardStepResult};
use crate::error::Result;
use crate::fields::RelationRef;
use crate::view::{SelectionOption, ViewArchitecture, ViewType};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Everything the console asks of the server.
///
/// `RpcClient` talks to a real server; tests substitute an in-memory
/// implementation.
#[async_trait]
pub trait TrytonApi: Send + Sync {
    /// The requested type is only a hint. Callers branch on the returned
    /// architecture's `view_type`.
    async fn get_view_architecture(
        &self,
        model: &str,
        view_id: Option<i64>,
        view_type: ViewType,
    ) -> Result<ViewArchitecture>;

    /// Read one record in wire format. An empty result is `NotFound`.
    async fn get_record(&self, model: &str, id: i64, fields: &[String]) -> Result<Map<String, Value>>;

    async fn list_records(
        &self,
        model: &str,
        domain: &Value,
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>>;

    async fn create_record(&self, model: &str, payload: &Map<String, Value>) -> Result<i64>;

    async fn update_record(&self, model: &str, id: i64, payload: &Map<String, Value>) -> Result<()>;

    /// Call a selection method such as `get_states`
    async fn resolve_selection_options(&self, model: &str, method: &str) -> Result<Vec<SelectionOption>>;

    async fn autocomplete(
        &self,
        model: &str,
        text: &str,
        domain: &Value,
        limit: usize,
    ) -> Result<Vec<RelationRef>>;

    /// Display names for a batch of ids, in the order the server returns them
    async fn read_display_names(&self, model: &str, ids: &[i64]) -> Result<Vec<RelationRef>>;

    /// `default_get` for a new record
    async fn default_values(&self, model: &str, fields: &[String]) -> Result<Map<String, Value>>;

    async fn menu_rows(&self) -> Result<Vec<MenuRow>>;

    /// Map window action ids to the model each one opens
    async fn window_action_models(&self, action_ids: &[i64]) -> Result<HashMap<i64, String>>;

    /// Everything a menu entry may open. More than one entry means the
    /// user has to choose.
    async fn action_targets(&self, menu_id: i64) -> Result<Vec<ActionTarget>>;

    async fn create_wizard_instance(&self, wizard: &str) -> Result<WizardInstance>;

    /// Run the start state and return the first form it shows
    async fn get_wizard_form(&self, wizard: &str, instance: &WizardInstance) -> Result<WizardStepResult>;

    /// Submit `payload` as the data of `form_state` and move to `button_state`
    async fn execute_wizard_step(
        &self,
        wizard: &str,
        instance: &WizardInstance,
        form_state: &str,
        button_state: &str,
        payload: &Map<String, Value>,
    ) -> Result<WizardStepResult>;

    async fn delete_wizard_instance(&self, wizard: &str, instance: &WizardInstance) -> Result<()>;
}

