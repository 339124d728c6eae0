//! Ollama Narrator
//!
//! Implementation of `Narrator` backed by local Ollama inference.

use std::time::Duration;

use alert_core::narrative::{self, Narrator};
use alert_core::{AlertError, AlertEvent};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};
use reqwest::{Client, Url};

use crate::error::{Result, RuntimeError};

pub const DEFAULT_MODEL: &str = "llama3.2";

const SYSTEM_PROMPT: &str = "You summarize trading alerts for the account owner. \
Write at most four short sentences. Do not invent numbers.";

/// Ollama connection settings
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: DEFAULT_MODEL.into(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self {
            host,
            port,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// `host` plus `port`, checked up front so client construction cannot panic
    pub fn endpoint(&self) -> Result<Url> {
        let invalid = || RuntimeError::OllamaEndpoint(format!("{}:{}", self.host, self.port));
        let mut url = Url::parse(&self.host).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid());
        }
        url.set_port(Some(self.port)).map_err(|()| invalid())?;
        Ok(url)
    }
}

pub struct OllamaNarrator {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaNarrator {
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let client = Ollama::builder()
            .url(config.endpoint()?)
            .reqwest_client(http)
            .build();
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_messages(alerts: &[AlertEvent]) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT.to_string()),
            ChatMessage::user(format!(
                "Alerts from this cycle:\n{}",
                narrative::digest(alerts)
            )),
        ]
    }
}

#[async_trait]
impl Narrator for OllamaNarrator {
    async fn summarize(&self, alerts: &[AlertEvent]) -> alert_core::Result<String> {
        let request = ChatMessageRequest::new(self.config.model.clone(), Self::build_messages(alerts));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| RuntimeError::Ollama(e.to_string()))?;

        let summary = response.message.content.trim().to_string();
        if summary.is_empty() {
            return Err(AlertError::Narrative("empty summary".into()));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::AlertCategory;
    use chrono::Utc;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default().with_model("mistral");
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.model, "mistral");
    }

    #[test]
    fn test_endpoint_validation() {
        let url = OllamaConfig::default().endpoint().unwrap();
        assert_eq!(url.as_str(), "http://localhost:11434/");

        let bad = OllamaConfig {
            host: "localhost".into(),
            ..OllamaConfig::default()
        };
        assert!(matches!(bad.endpoint(), Err(RuntimeError::OllamaEndpoint(_))));
        assert!(OllamaNarrator::from_config(bad).is_err());
    }

    #[test]
    fn test_narrator_uses_configured_model() {
        let config = OllamaConfig::default()
            .with_model("qwen2.5")
            .with_timeout(Duration::from_secs(30));
        let narrator = OllamaNarrator::from_config(config).unwrap();
        assert_eq!(narrator.model(), "qwen2.5");
        assert_eq!(narrator.config.timeout_secs, 30);
    }

    #[test]
    fn test_messages_carry_digest() {
        let alerts = vec![AlertEvent::new(AlertCategory::LosingTrade, "BTC", "down 15%", Utc::now())];
        let messages = OllamaNarrator::build_messages(&alerts);
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Losing Trade BTC: down 15%"));
    }
}
