//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;

/// Chatroom configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub name: String,
    pub listen: String,
    pub welcome: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliveryConfig {
    /// Upper bound on one write to one session, in milliseconds
    pub sink_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuditConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

/// Username/password pairs accepted at login
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CredentialsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "chatroom".to_string(),
            listen: "127.0.0.1:22222".to_string(),
            welcome: crate::application::services::lifecycle::DEFAULT_WELCOME.to_string(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { sink_timeout_ms: 2000 }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("logfile.log"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            delivery: DeliveryConfig::default(),
            audit: AuditConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Overlay `CHATROOM_LISTEN` and `CHATROOM_AUDIT_PATH`
    pub fn apply_env(&mut self) {
        if let Ok(listen) = std::env::var("CHATROOM_LISTEN") {
            self.server.listen = listen;
        }

        if let Ok(path) = std::env::var("CHATROOM_AUDIT_PATH") {
            self.audit.path = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delivery.sink_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "delivery.sink-timeout-ms must be greater than zero".to_string(),
            ));
        }
        if self.credentials.enabled && self.credentials.users.is_empty() {
            return Err(ConfigError::InvalidValue(
                "credentials enabled but no users configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery.sink_timeout_ms)
    }

    /// Whether a login should be accepted
    pub fn verify(&self, username: &str, password: Option<&str>) -> bool {
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return false;
        }
        if !self.credentials.enabled {
            return true; // No credential check, any name goes
        }
        match (self.credentials.users.get(username), password) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }
}
