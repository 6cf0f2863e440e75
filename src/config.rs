use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_URL: &str = "TRYTON_URL";
pub const ENV_DATABASE: &str = "TRYTON_DATABASE";
pub const ENV_USERNAME: &str = "TRYTON_USERNAME";
pub const ENV_PASSWORD: &str = "TRYTON_PASSWORD";

/// Where to connect. Every field may also come from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    #[serde(default = "default_autocomplete_limit")]
    pub autocomplete_limit: usize,
    /// Ids per request when loading many2many display names
    #[serde(default = "default_relation_page_size")]
    pub relation_page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_list_limit() -> usize {
    80
}

fn default_autocomplete_limit() -> usize {
    10
}

fn default_relation_page_size() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
            autocomplete_limit: default_autocomplete_limit(),
            relation_page_size: default_relation_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            language: default_language(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub settings: Settings,
}

/// Directory holding the config file and the saved session
pub fn config_dir() -> Result<PathBuf> {
    let dir = if cfg!(target_os = "linux") {
        dirs::config_dir()
            .context("Failed to get XDG config directory")?
            .join("tryton-console")
    } else {
        dirs::home_dir()
            .context("Failed to get home directory")?
            .join(".tryton-console")
    };

    if !dir.exists() {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        info!("Created config directory: {:?}", dir);
    }
    Ok(dir)
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Read a config file; a missing file is created with the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        if !path.exists() {
            info!("Config file doesn't exist, creating default config");
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", path);
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))?;
        info!("Config saved successfully");
        Ok(())
    }

    /// Let `TRYTON_*` variables override the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_URL) {
            self.server.url = Some(url);
        }
        if let Some(database) = non_empty(ENV_DATABASE) {
            self.server.database = Some(database);
        }
        if let Some(username) = non_empty(ENV_USERNAME) {
            self.server.username = Some(username);
        }
    }

    /// Remember the server last logged into
    pub fn remember_server(&mut self, url: &str, database: &str, username: &str) {
        self.server.url = Some(url.to_string());
        self.server.database = Some(database.to_string());
        self.server.username = Some(username.to_string());
    }
}

/// Password from the environment, if one is set
pub fn env_password() -> Option<String> {
    std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.settings.list_limit, 80);
        assert_eq!(config.settings.language, "en");

        assert!(path.exists());
        let written: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
    }

    #[test]
    fn test_partial_settings_use_defaults() {
        let config: Config = toml::from_str(
            "[server]\nurl = \"https://erp.example.org\"\n\n[settings]\nlist_limit = 20\n",
        )
        .unwrap();
        assert_eq!(config.server.url.as_deref(), Some("https://erp.example.org"));
        assert_eq!(config.settings.list_limit, 20);
        assert_eq!(config.settings.relation_page_size, 100);
        assert_eq!(config.settings.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.remember_server("http://localhost:8000", "health", "admin");
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([(ENV_URL, "http://other:8000"), (ENV_DATABASE, "")]);
        let mut config = Config::default();
        config.remember_server("http://localhost:8000", "health", "admin");
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.url.as_deref(), Some("http://other:8000"));
        assert_eq!(config.server.database.as_deref(), Some("health"));
    }
}
