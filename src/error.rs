use std::io;

/// Custom error type for slack_status_push operations
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Responsible user lookup failed for build {build_id}: {message}")]
    Lookup { build_id: i64, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Helper type for Results that use NotifyError
pub type Result<T> = std::result::Result<T, NotifyError>;
