//! Server Settings
//!
//! The alert configuration plus the server-only sections that say where
//! inputs come from.

use std::path::{Path, PathBuf};

use alert_core::config::check_sections;
use alert_core::{AlertConfig, AlertError, Exchange};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionFile {
    pub exchange: Exchange,
    pub path: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub positions: Vec<PositionFile>,
    pub news_path: Option<PathBuf>,
    pub price_history_path: Option<PathBuf>,
    /// Serve the built-in demo book for every exchange instead of files
    pub demo: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NarrativeConfig {
    pub enabled: bool,
    pub model: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,
}

/// Top-level tables owned by the server rather than the alert config
const SERVER_SECTIONS: &[&str] = &["sources", "narrative"];

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, AlertError> {
        let table: toml::Table = toml::from_str(s)?;
        check_sections(&table, SERVER_SECTIONS)?;
        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AlertError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        self.alerts.validate()?;

        if self.narrative.enabled && self.alerts.pipeline.narrative_channel.is_none() {
            return Err(AlertError::Config(
                "narrative is enabled but pipeline.narrative_channel is not set".into(),
            ));
        }
        if self.sources.demo && !self.sources.positions.is_empty() {
            return Err(AlertError::Config(
                "sources.demo cannot be combined with sources.positions".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::AlertCategory;

    const SERVER_TOML: &str = r#"
[[channels]]
id = "portfolio"

[[channels]]
id = "alpha"
format = "compact"
webhook_env = "ALPHA_WEBHOOK"

[bindings]
oversold = ["portfolio"]
overbought = ["portfolio"]
losing_trade = ["portfolio", "alpha"]
missing_stop_loss = ["portfolio"]
high_profit = ["portfolio"]
portfolio_news = ["portfolio"]
risk_warning = ["portfolio", "alpha"]
bullish_signal = ["portfolio"]
opportunity = ["alpha"]
breaking_news = ["alpha"]
pump_dump = ["alpha"]

[pipeline]
narrative_channel = "alpha"

[sources]
news_path = "data/news.json"

[[sources.positions]]
exchange = "bingx"
path = "data/bingx.json"

[[sources.positions]]
exchange = "kraken"
path = "data/kraken.json"

[narrative]
enabled = true
model = "llama3.2"
"#;

    #[test]
    fn test_parses_server_sections() {
        let config = ServerConfig::from_toml_str(SERVER_TOML).unwrap();
        assert_eq!(config.sources.positions.len(), 2);
        assert_eq!(config.sources.positions[1].exchange, Exchange::Kraken);
        assert_eq!(config.sources.news_path, Some(PathBuf::from("data/news.json")));
        assert!(config.narrative.enabled);
        assert_eq!(config.alerts.schedule.len(), 3);
        assert_eq!(
            config.alerts.typed_bindings().unwrap()[&AlertCategory::PumpDump].len(),
            1
        );
    }

    #[test]
    fn test_narrative_requires_channel() {
        let toml = SERVER_TOML.replace("narrative_channel = \"alpha\"", "");
        assert!(matches!(
            ServerConfig::from_toml_str(&toml),
            Err(AlertError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_root_section_rejected() {
        let toml = format!("{SERVER_TOML}\n[narative]\nenabled = false\n");
        let err = ServerConfig::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, AlertError::Config(_)));
        assert!(err.to_string().contains("narative"));
    }

    #[test]
    fn test_misspelled_source_key_rejected() {
        let toml = SERVER_TOML.replace("news_path = ", "news_paht = ");
        let err = ServerConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("news_paht"));
    }

    #[test]
    fn test_invalid_alert_config_is_fatal() {
        let toml = SERVER_TOML.replace("pump_dump = [\"alpha\"]", "");
        assert!(matches!(
            ServerConfig::from_toml_str(&toml),
            Err(AlertError::Config(_))
        ));
    }
}
