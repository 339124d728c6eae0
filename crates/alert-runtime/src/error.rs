//! Runtime Error Types

use alert_core::AlertError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No webhook configured for channel '{0}'")]
    UnknownChannel(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Invalid webhook URL for channel '{channel}': {reason}")]
    InvalidUrl { channel: String, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Ollama error: {0}")]
    Ollama(String),

    #[error("Invalid Ollama endpoint '{0}'")]
    OllamaEndpoint(String),
}

impl From<RuntimeError> for AlertError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::MissingEnv(_)
            | RuntimeError::InvalidUrl { .. }
            | RuntimeError::OllamaEndpoint(_) => {
                AlertError::Config(err.to_string())
            }
            RuntimeError::Ollama(msg) => AlertError::Narrative(msg),
            other => AlertError::Other(other.to_string()),
        }
    }
}
