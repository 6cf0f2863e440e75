//! Saved login session
//!
//! One JSON object kept under a fixed key in the config directory. Written
//! on login, read at startup and removed on logout or when the server
//! rejects the session.

use crate::api::{SessionContext, SessionToken};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_KEY: &str = "tryton_console_session";
pub const SESSION_FILE: &str = "tryton_console_session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub url: String,
    pub database: String,
    pub username: String,
    pub user_id: i64,
    pub session: String,
}

impl StoredSession {
    /// `None` when the context carries no token
    pub fn from_context(context: &SessionContext) -> Option<Self> {
        let token = context.token.as_ref()?;
        Some(Self {
            url: context.url.clone(),
            database: context.database.clone(),
            username: token.username.clone(),
            user_id: token.user_id,
            session: token.session.clone(),
        })
    }

    pub fn into_context(self, language: &str) -> SessionContext {
        let mut context = SessionContext::new(self.url, self.database)
            .with_token(SessionToken::new(self.username, self.user_id, self.session));
        context.language = language.to_string();
        context
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Store inside the default config directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(&crate::config::config_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        let mut root = Map::new();
        root.insert(
            SESSION_KEY.to_string(),
            serde_json::to_value(session).context("Failed to serialize session")?,
        );
        let content = serde_json::to_string_pretty(&Value::Object(root)).context("Failed to serialize session")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {:?}", self.path))?;
        info!("Saved session for {}@{}", session.username, session.database);
        Ok(())
    }

    /// Read the saved session. A missing, unreadable or malformed entry is
    /// treated as no session.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            debug!("No saved session at {:?}", self.path);
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {:?}", self.path))?;

        let parsed = serde_json::from_str::<Value>(&content)
            .ok()
            .and_then(|mut root| root.get_mut(SESSION_KEY).map(Value::take))
            .map(serde_json::from_value::<StoredSession>);
        match parsed {
            Some(Ok(session)) => Ok(Some(session)),
            Some(Err(e)) => {
                warn!("Ignoring malformed saved session: {}", e);
                Ok(None)
            }
            None => {
                warn!("Ignoring unreadable session file {:?}", self.path);
                Ok(None)
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {:?}", self.path))?;
            info!("Cleared saved session");
        }
        Ok(())
    }
}
