//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Robot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub scripts: ScriptsConfig,
    pub logging: LoggingConfig,
    pub brain: BrainConfig,
    pub adapters: AdaptersConfig,
    /// Free-form values read through `Robot::get_config_variable`
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScriptsConfig {
    pub auto_load: bool,
    pub watch: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Minimum level mirrored into adapter logging rooms
    pub room_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrainKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BrainConfig {
    pub kind: BrainKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Rooms that receive mirrored log lines
    pub log_rooms: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "mmbot".to_string(),
            alias: None,
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            auto_load: true,
            watch: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            room_level: "warn".to_string(),
        }
    }
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            kind: BrainKind::Memory,
            path: PathBuf::from("mmbot-brain.db"),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_rooms: Vec::new(),
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
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();

        if let Ok(name) = std::env::var("MMBOT_NAME") {
            config.bot.name = name;
        }

        if let Ok(alias) = std::env::var("MMBOT_ALIAS") {
            config.bot.alias = Some(alias);
        }

        if let Ok(level) = std::env::var("MMBOT_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(path) = std::env::var("MMBOT_BRAIN_PATH") {
            config.brain.kind = BrainKind::Sqlite;
            config.brain.path = PathBuf::from(path);
        }

        config
    }

    /// Default configuration rendered as YAML
    pub fn default_yaml() -> Result<String, ConfigError> {
        serde_yaml::to_string(&Config::default())
            .map_err(|e| ConfigError::Parse(format!("Failed to render config: {}", e)))
    }
}
