//! Error Types for the Alert Pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlertError>;

#[derive(Error, Debug)]
pub enum AlertError {
    /// Not enough price samples to compute an indicator. Means "no signal", never zero.
    #[error("Insufficient data: need {needed} samples, have {got}")]
    InsufficientData { needed: usize, got: usize },

    /// One position or news source could not be reached this cycle
    #[error("Source unavailable: {source_id}: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// Every configured position source failed
    #[error("All {0} position sources unavailable")]
    AllSourcesUnavailable(usize),

    /// A single channel delivery failed
    #[error("Delivery to {channel} failed: {reason}")]
    Delivery { channel: String, reason: String },

    /// Invalid thresholds, bindings or schedule. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cycle exceeded {0}s and was abandoned")]
    CycleTimeout(u64),

    #[error("Narrative error: {0}")]
    Narrative(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AlertError {
    /// Per-item failures that the pipeline isolates and moves past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AlertError::InsufficientData { .. }
                | AlertError::SourceUnavailable { .. }
                | AlertError::Delivery { .. }
                | AlertError::Narrative(_)
        )
    }

    pub fn source_unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        AlertError::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn delivery(channel: impl Into<String>, reason: impl ToString) -> Self {
        AlertError::Delivery {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(AlertError::InsufficientData { needed: 15, got: 3 }.is_recoverable());
        assert!(AlertError::source_unavailable("kraken", "timeout").is_recoverable());
        assert!(AlertError::delivery("alpha", "HTTP 500").is_recoverable());
        assert!(!AlertError::Config("bad binding".into()).is_recoverable());
        assert!(!AlertError::AllSourcesUnavailable(3).is_recoverable());
    }
}
