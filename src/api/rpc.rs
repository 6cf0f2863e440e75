//! JSON-RPC envelope encoding and error mapping

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcResponse {
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) if !error.is_null() => Err(map_rpc_error(&error)),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Exception kinds that mean the session is gone
const AUTH_KINDS: &[&str] = &["NotLogged", "LoginException"];

/// Exception kinds raised when the server refuses submitted data
const VALIDATION_KINDS: &[&str] = &[
    "UserError",
    "UserWarning",
    "AccessError",
    "ConcurrencyException",
    "ValidationError",
    "RequiredValidationError",
    "DomainValidationError",
    "SizeValidationError",
    "DigitsValidationError",
    "SelectionValidationError",
    "TimeFormatValidationError",
    "ForbiddenCharValidationError",
    "SQLConstraintError",
];

/// Turn an RPC `error` member into a [`ConsoleError`].
///
/// Errors arrive as `[kind, args]` where args is usually
/// `[message, description]`, or as a plain string.
pub fn map_rpc_error(error: &Value) -> ConsoleError {
    let (kind, args) = match error {
        Value::Array(parts) => (
            parts.first().and_then(|k| k.as_str()).unwrap_or_default(),
            parts.get(1).cloned().unwrap_or(Value::Null),
        ),
        Value::String(message) => return ConsoleError::Protocol(message.clone()),
        other => return ConsoleError::Protocol(other.to_string()),
    };

    if AUTH_KINDS.contains(&kind) {
        return ConsoleError::AuthExpired;
    }

    let message = match &args {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" - "),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let message = if message.is_empty() { kind.to_string() } else { message };

    if VALIDATION_KINDS.contains(&kind) {
        ConsoleError::validation(message)
    } else {
        ConsoleError::Protocol(format!("{}: {}", kind, message))
    }
}
