use super::auth::{SessionContext, SessionToken};
use super::constants::{self, headers};
use super::logging::{ApiLogger, MonitoringConfig, redact};
use super::models::{ActionTarget, MenuRow, WizardInstance, WizardStepResult};
use super::rpc::{RpcRequest, RpcResponse};
use super::traits::TrytonApi;
use crate::error::{ConsoleError, Result};
use crate::fields::RelationRef;
use crate::view::{SelectionOption, ViewArchitecture, ViewType};
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client bound to one server, database and session
pub struct RpcClient {
    context: SessionContext,
    http_client: reqwest::Client,
    next_id: AtomicU64,
    logger: ApiLogger,
}

impl RpcClient {
    pub fn new(context: SessionContext, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(headers::USER_AGENT)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_custom_client(context, http_client))
    }

    /// Create a client around an existing HTTP client
    pub fn with_custom_client(context: SessionContext, http_client: reqwest::Client) -> Self {
        Self {
            context,
            http_client,
            next_id: AtomicU64::new(1),
            logger: ApiLogger::new(MonitoringConfig::default()),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Log in and return a client carrying the new session
    pub async fn login(
        mut context: SessionContext,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self> {
        context.clear();
        Self::new(context, timeout)?.authenticate(username, password).await
    }

    /// Log in as `username`, consuming the unauthenticated client
    pub async fn authenticate(mut self, username: &str, password: &str) -> Result<Self> {
        let params = json!([username, {"password": password}, self.context.language]);
        let result = match self.call(constants::LOGIN, params).await {
            Err(ConsoleError::AuthExpired) => {
                return Err(ConsoleError::validation("Wrong user name or password"));
            }
            other => other?,
        };

        let parts = result
            .as_array()
            .filter(|parts| parts.len() >= 2)
            .ok_or_else(|| ConsoleError::validation("Wrong user name or password"))?;
        let user_id = parts[0]
            .as_i64()
            .ok_or_else(|| ConsoleError::Protocol(format!("login returned user id {}", parts[0])))?;
        let session = parts[1]
            .as_str()
            .ok_or_else(|| ConsoleError::Protocol(format!("login returned session {}", parts[1])))?;

        self.context.token = Some(SessionToken::new(username, user_id, session));
        Ok(self)
    }

    /// End the session on the server. The local token is dropped either way.
    pub async fn logout(mut self) -> Result<SessionContext> {
        let outcome = self.call(constants::LOGOUT, json!([])).await;
        self.context.clear();
        outcome.map(|_| self.context)
    }

    /// Send one JSON-RPC call and decode its result
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let operation = self.logger.start_operation(method);
        let outcome = self.send(method, params).await;
        self.logger
            .complete_operation(&operation, outcome.as_ref().map(|_| ()));
        outcome
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let url = constants::database_endpoint(&self.context.url, &self.context.database);
        let request = RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let mut builder = self
            .http_client
            .post(&url)
            .header("Content-Type", headers::CONTENT_TYPE_JSON)
            .header("Accept", headers::CONTENT_TYPE_JSON)
            .json(&request);
        match &self.context.token {
            Some(token) => {
                let header = token.header_value();
                debug!("POST {} ({}) Authorization: {}", url, method, redact(&header));
                builder = builder.header("Authorization", header);
            }
            None => debug!("POST {} ({})", url, method),
        }

        let response = builder.send().await.map_err(|e| ConsoleError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::from_status(status.as_u16(), &body));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| ConsoleError::Protocol(format!("invalid JSON-RPC response: {}", e)))?;
        envelope.into_result()
    }

    fn rpc_context(&self) -> Value {
        json!({"language": self.context.language})
    }

    async fn model_call(&self, model: &str, method: &str, mut params: Vec<Value>) -> Result<Value> {
        params.push(self.rpc_context());
        self.call(&constants::model_method(model, method), Value::Array(params))
            .await
    }

    async fn wizard_call(&self, wizard: &str, method: &str, mut params: Vec<Value>) -> Result<Value> {
        params.push(self.rpc_context());
        self.call(&constants::wizard_method(wizard, method), Value::Array(params))
            .await
    }
}

fn into_rows(value: Value, what: &str) -> Result<Vec<Map<String, Value>>> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        other => Err(ConsoleError::Protocol(format!("{} returned {}", what, other))),
    }
}

fn into_relation_refs(rows: Vec<Map<String, Value>>) -> Vec<RelationRef> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_i64()?;
            let name = row
                .get(constants::REC_NAME)
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", id));
            Some(RelationRef::new(id, name))
        })
        .collect()
}

#[async_trait]
impl TrytonApi for RpcClient {
    async fn get_view_architecture(
        &self,
        model: &str,
        view_id: Option<i64>,
        view_type: ViewType,
    ) -> Result<ViewArchitecture> {
        let raw = self
            .model_call(model, "fields_view_get", vec![json!(view_id), json!(view_type.as_str())])
            .await
            .map_err(|e| match e {
                ConsoleError::Protocol(message) if message.contains("KeyError") => {
                    ConsoleError::not_found(format!("view for '{}'", model))
                }
                other => other,
            })?;
        ViewArchitecture::from_wire(model, &raw)
    }

    async fn get_record(&self, model: &str, id: i64, fields: &[String]) -> Result<Map<String, Value>> {
        let value = self
            .model_call(model, "read", vec![json!([id]), json!(fields)])
            .await?;
        into_rows(value, "read")?
            .into_iter()
            .next()
            .ok_or_else(|| ConsoleError::not_found(format!("{} #{}", model, id)))
    }

    async fn list_records(
        &self,
        model: &str,
        domain: &Value,
        fields: &[String],
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>> {
        let value = self
            .model_call(
                model,
                "search_read",
                vec![domain.clone(), json!(0), json!(limit), Value::Null, json!(fields)],
            )
            .await?;
        into_rows(value, "search_read")
    }

    async fn create_record(&self, model: &str, payload: &Map<String, Value>) -> Result<i64> {
        let value = self
            .model_call(model, "create", vec![json!([payload])])
            .await?;
        value
            .as_array()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_i64())
            .ok_or_else(|| ConsoleError::Protocol(format!("create returned {}", value)))
    }

    async fn update_record(&self, model: &str, id: i64, payload: &Map<String, Value>) -> Result<()> {
        self.model_call(model, "write", vec![json!([id]), Value::Object(payload.clone())])
            .await?;
        Ok(())
    }

    async fn resolve_selection_options(&self, model: &str, method: &str) -> Result<Vec<SelectionOption>> {
        let value = self.model_call(model, method, Vec::new()).await?;
        if !value.is_array() {
            return Err(ConsoleError::Protocol(format!(
                "selection method {}.{} returned {}",
                model, method, value
            )));
        }
        Ok(SelectionOption::parse_list(&value))
    }

    async fn autocomplete(
        &self,
        model: &str,
        text: &str,
        domain: &Value,
        limit: usize,
    ) -> Result<Vec<RelationRef>> {
        let mut clauses = vec![json!([constants::REC_NAME, "ilike", format!("%{}%", text)])];
        if domain.as_array().is_some_and(|d| !d.is_empty()) {
            clauses.push(domain.clone());
        }
        let rows = self
            .list_records(model, &Value::Array(clauses), &[constants::REC_NAME.to_string()], limit)
            .await?;
        Ok(into_relation_refs(rows))
    }

    async fn read_display_names(&self, model: &str, ids: &[i64]) -> Result<Vec<RelationRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let value = self
            .model_call(model, "read", vec![json!(ids), json!([constants::REC_NAME])])
            .await?;
        Ok(into_relation_refs(into_rows(value, "read")?))
    }

    async fn default_values(&self, model: &str, fields: &[String]) -> Result<Map<String, Value>> {
        match self.model_call(model, "default_get", vec![json!(fields)]).await? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(ConsoleError::Protocol(format!("default_get returned {}", other))),
        }
    }

    async fn menu_rows(&self) -> Result<Vec<MenuRow>> {
        let value = self
            .model_call(
                constants::MENU_MODEL,
                "search_read",
                vec![
                    json!([]),
                    json!(0),
                    Value::Null,
                    json!([["sequence", "ASC"], ["id", "ASC"]]),
                    json!(["name", "icon", "parent", "sequence", "action"]),
                ],
            )
            .await?;
        serde_json::from_value(value).map_err(|e| ConsoleError::Protocol(format!("menu rows: {}", e)))
    }

    async fn window_action_models(&self, action_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if action_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let value = self
            .model_call(
                constants::WINDOW_ACTION_MODEL,
                "read",
                vec![json!(action_ids), json!(["res_model"])],
            )
            .await?;
        Ok(into_rows(value, "read")?
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id")?.as_i64()?;
                let model = row.get("res_model")?.as_str()?.to_string();
                Some((id, model))
            })
            .collect())
    }

    async fn action_targets(&self, menu_id: i64) -> Result<Vec<ActionTarget>> {
        let params = json!([
            constants::MENU_KEYWORD,
            [constants::MENU_MODEL, menu_id],
            self.rpc_context()
        ]);
        let value = self.call(constants::GET_KEYWORD, params).await?;
        Ok(value
            .as_array()
            .map(|actions| actions.iter().filter_map(ActionTarget::from_wire).collect())
            .unwrap_or_default())
    }

    async fn create_wizard_instance(&self, wizard: &str) -> Result<WizardInstance> {
        let value = self.wizard_call(wizard, "create", Vec::new()).await?;
        WizardInstance::from_wire(&value)
            .ok_or_else(|| ConsoleError::Protocol(format!("wizard create returned {}", value)))
    }

    async fn get_wizard_form(&self, wizard: &str, instance: &WizardInstance) -> Result<WizardStepResult> {
        let value = self
            .wizard_call(
                wizard,
                "execute",
                vec![json!(instance.id), json!({}), json!(instance.start_state)],
            )
            .await?;
        WizardStepResult::from_wire(&value)
    }

    async fn execute_wizard_step(
        &self,
        wizard: &str,
        instance: &WizardInstance,
        form_state: &str,
        button_state: &str,
        payload: &Map<String, Value>,
    ) -> Result<WizardStepResult> {
        let mut data = Map::new();
        data.insert(form_state.to_string(), Value::Object(payload.clone()));
        let value = self
            .wizard_call(
                wizard,
                "execute",
                vec![json!(instance.id), Value::Object(data), json!(button_state)],
            )
            .await?;
        WizardStepResult::from_wire(&value)
    }

    async fn delete_wizard_instance(&self, wizard: &str, instance: &WizardInstance) -> Result<()> {
        self.wizard_call(wizard, "delete", vec![json!(instance.id)])
            .await?;
        Ok(())
    }
}
