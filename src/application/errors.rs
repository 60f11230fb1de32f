//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Robot is not configured")]
    NotConfigured,

    #[error("Adapter not configured: {0}")]
    AdapterNotConfigured(String),

    #[error("Adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("Listener error: {0}")]
    Listener(String),

    #[error("Could not send to adapter {adapter} on room {room}: {reason}")]
    Send {
        adapter: String,
        room: String,
        reason: String,
    },

    #[error("Router error: {0}")]
    Router(String),

    #[error("Brain unavailable: {0}")]
    BrainUnavailable(String),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Shorthand for failing a listener callback with a message
    pub fn listener(msg: impl Into<String>) -> Self {
        BotError::Listener(msg.into())
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Brain is closed")]
    Closed,
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
