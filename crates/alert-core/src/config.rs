//! Alert Configuration
//!
//! Rule thresholds, cool-down windows, channels, bindings and cadences.
//! Loaded once at startup and validated; an invalid configuration is fatal.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};
use crate::model::{AlertCategory, ChannelId};

/// Classifier thresholds. Comparisons are inclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub rsi_period: usize,
    pub rsi_oversold: Decimal,
    pub rsi_overbought: Decimal,
    pub losing_trade_pnl_pct: Decimal,
    pub high_profit_pnl_pct: Decimal,
    /// A position larger than this with no stop loss raises `missing_stop_loss`
    pub missing_stop_loss_min_size: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: dec!(30),
            rsi_overbought: dec!(70),
            losing_trade_pnl_pct: dec!(-10),
            high_profit_pnl_pct: dec!(20),
            missing_stop_loss_min_size: Decimal::ZERO,
        }
    }
}

/// Cool-down windows, per category with a shared default
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CooldownConfig {
    pub default_minutes: i64,
    pub per_category: BTreeMap<String, i64>,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            default_minutes: 60,
            per_category: BTreeMap::new(),
        }
    }
}

/// How messages are rendered for a channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Detailed,
    Compact,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub id: ChannelId,

    #[serde(default)]
    pub format: MessageFormat,

    /// Environment variable holding the webhook URL
    #[serde(default)]
    pub webhook_env: Option<String>,
}

/// One independent timer instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    pub name: String,
    pub every_minutes: u64,
    #[serde(default = "default_true")]
    pub positions: bool,
    #[serde(default)]
    pub news: bool,
}

impl ScheduleConfig {
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.every_minutes.saturating_mul(60))
    }
}

/// Upper bound for cool-down windows and cadence intervals (one year)
pub const MAX_MINUTES: i64 = 366 * 24 * 60;

/// Upper bound for the per-cycle time limit (one day)
pub const MAX_CYCLE_SECONDS: u64 = 24 * 60 * 60;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub max_cycle_seconds: u64,
    pub concurrent_dispatch: bool,
    /// Channel that receives the optional narrative summary
    pub narrative_channel: Option<ChannelId>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_cycle_seconds: 120,
            concurrent_dispatch: true,
            narrative_channel: None,
        }
    }
}

/// Complete alerting configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub cooldown: CooldownConfig,

    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    /// Category name -> ordered destination channel ids
    #[serde(default)]
    pub bindings: BTreeMap<String, Vec<ChannelId>>,

    #[serde(default = "default_schedule")]
    pub schedule: Vec<ScheduleConfig>,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_schedule() -> Vec<ScheduleConfig> {
    vec![
        ScheduleConfig { name: "portfolio".into(), every_minutes: 60, positions: true, news: false },
        ScheduleConfig { name: "alerts".into(), every_minutes: 240, positions: true, news: true },
        ScheduleConfig { name: "opportunity_scan".into(), every_minutes: 720, positions: false, news: true },
    ]
}

impl AlertConfig {
    /// Top-level tables this configuration owns
    pub const SECTIONS: &'static [&'static str] =
        &["thresholds", "cooldown", "channels", "bindings", "schedule", "pipeline"];

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(s)?;
        check_sections(&table, &[])?;
        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AlertError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject any configuration that could silently misroute an alert
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.rsi_period == 0 {
            return Err(config_err("thresholds.rsi_period must be at least 1"));
        }
        for (name, value) in [("rsi_oversold", t.rsi_oversold), ("rsi_overbought", t.rsi_overbought)] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(config_err(format!("thresholds.{name} must be within 0..=100")));
            }
        }
        if t.rsi_oversold >= t.rsi_overbought {
            return Err(config_err("thresholds.rsi_oversold must be below rsi_overbought"));
        }
        if t.losing_trade_pnl_pct >= t.high_profit_pnl_pct {
            return Err(config_err("thresholds.losing_trade_pnl_pct must be below high_profit_pnl_pct"));
        }
        if t.missing_stop_loss_min_size < Decimal::ZERO {
            return Err(config_err("thresholds.missing_stop_loss_min_size must not be negative"));
        }

        check_minutes("cooldown.default_minutes", self.cooldown.default_minutes)?;
        for (name, minutes) in &self.cooldown.per_category {
            name.parse::<AlertCategory>()?;
            check_minutes(&format!("cooldown.per_category.{name}"), *minutes)?;
        }

        let mut declared = HashSet::new();
        for channel in &self.channels {
            if channel.id.as_str().trim().is_empty() {
                return Err(config_err("channel id must not be empty"));
            }
            if !declared.insert(channel.id.clone()) {
                return Err(config_err(format!("duplicate channel '{}'", channel.id)));
            }
        }

        for name in self.bindings.keys() {
            name.parse::<AlertCategory>()?;
        }
        for category in AlertCategory::ALL {
            let Some(targets) = self.bindings.get(category.as_str()) else {
                return Err(config_err(format!(
                    "no binding for category '{category}' (use [] to mute it)"
                )));
            };
            let mut seen = HashSet::new();
            for target in targets {
                if !declared.contains(target) {
                    return Err(config_err(format!(
                        "category '{category}' bound to undeclared channel '{target}'"
                    )));
                }
                if !seen.insert(target) {
                    return Err(config_err(format!(
                        "category '{category}' binds channel '{target}' twice"
                    )));
                }
            }
        }

        if self.schedule.is_empty() {
            return Err(config_err("at least one [[schedule]] entry is required"));
        }
        let mut names = HashSet::new();
        for entry in &self.schedule {
            let every = i64::try_from(entry.every_minutes).unwrap_or(i64::MAX);
            check_minutes(&format!("schedule '{}' every_minutes", entry.name), every)?;
            if !entry.positions && !entry.news {
                return Err(config_err(format!("schedule '{}' reads neither positions nor news", entry.name)));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(config_err(format!("duplicate schedule '{}'", entry.name)));
            }
        }

        if !(1..=MAX_CYCLE_SECONDS).contains(&self.pipeline.max_cycle_seconds) {
            return Err(config_err(format!(
                "pipeline.max_cycle_seconds must be within 1..={MAX_CYCLE_SECONDS}"
            )));
        }
        if let Some(channel) = &self.pipeline.narrative_channel {
            if !declared.contains(channel) {
                return Err(config_err(format!("narrative channel '{channel}' is not declared")));
            }
        }

        Ok(())
    }

    /// Cool-down window for a category
    pub fn cooldown_for(&self, category: AlertCategory) -> Duration {
        let minutes = self
            .cooldown
            .per_category
            .get(category.as_str())
            .copied()
            .unwrap_or(self.cooldown.default_minutes);
        minutes_to_duration(minutes)
    }

    pub fn default_cooldown(&self) -> Duration {
        minutes_to_duration(self.cooldown.default_minutes)
    }

    /// Typed bindings. Call after `validate`.
    pub fn typed_bindings(&self) -> Result<BTreeMap<AlertCategory, Vec<ChannelId>>> {
        self.bindings
            .iter()
            .map(|(name, targets)| Ok((name.parse::<AlertCategory>()?, targets.clone())))
            .collect()
    }
}

/// Reject top-level tables that neither this configuration nor `extra` owns
pub fn check_sections(table: &toml::Table, extra: &[&str]) -> Result<()> {
    for key in table.keys() {
        if !AlertConfig::SECTIONS.contains(&key.as_str()) && !extra.contains(&key.as_str()) {
            return Err(config_err(format!("unknown section '{key}'")));
        }
    }
    Ok(())
}

fn check_minutes(name: &str, minutes: i64) -> Result<()> {
    if !(1..=MAX_MINUTES).contains(&minutes) || Duration::try_minutes(minutes).is_none() {
        return Err(config_err(format!("{name} must be within 1..={MAX_MINUTES} minutes")));
    }
    Ok(())
}

/// Saturates instead of panicking on values `validate` would reject
fn minutes_to_duration(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(Duration::MAX)
}

fn config_err(msg: impl Into<String>) -> AlertError {
    AlertError::Config(msg.into())
}
