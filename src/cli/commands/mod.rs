pub mod auth;
pub mod browse;
pub mod record;
pub mod wizard;

use crate::api::RpcClient;
use crate::config::Config;
use crate::error::ConsoleError;
use crate::navigation::LoadOptions;
use crate::session_store::SessionStore;
use anyhow::{Context, Result};
use log::info;

/// Client for the saved session
pub fn connect(config: &Config, store: &SessionStore) -> Result<RpcClient> {
    let stored = store
        .load()?
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `tryton-console login` first"))?;
    info!("Using saved session for {}@{}", stored.username, stored.database);
    let context = stored.into_context(&config.settings.language);
    RpcClient::new(context, config.settings.request_timeout()).context("Failed to create RPC client")
}

pub fn load_options(config: &Config) -> LoadOptions {
    LoadOptions {
        list_limit: config.settings.list_limit,
        relation_page_size: config.settings.relation_page_size,
    }
}

/// Split `field=value` assignments
pub fn parse_assignments(assignments: &[String]) -> Result<Vec<(String, String)>> {
    assignments
        .iter()
        .map(|item| {
            let (field, value) = item
                .split_once('=')
                .with_context(|| format!("Expected FIELD=VALUE, got '{}'", item))?;
            let field = field.trim();
            if field.is_empty() {
                anyhow::bail!("Missing field name in '{}'", item);
            }
            Ok((field.to_string(), value.to_string()))
        })
        .collect()
}

/// Whether a command failed because the server rejected the session
pub fn is_auth_expired(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<ConsoleError>(), Some(ConsoleError::AuthExpired)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignments() {
        let parsed = parse_assignments(&["name=Acme = Co".into(), " code =".into()]).unwrap();
        assert_eq!(
            parsed,
            vec![("name".to_string(), "Acme = Co".to_string()), ("code".to_string(), String::new())]
        );
        assert!(parse_assignments(&["novalue".into()]).is_err());
        assert!(parse_assignments(&["=x".into()]).is_err());
    }

    #[test]
    fn test_auth_expired_detection() {
        let error = anyhow::Error::new(ConsoleError::AuthExpired).context("Failed to load menu");
        assert!(is_auth_expired(&error));
        assert!(!is_auth_expired(&anyhow::anyhow!("other")));
    }
}
