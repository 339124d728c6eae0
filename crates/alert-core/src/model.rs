//! Domain Models
//!
//! Core data types shared by every pipeline stage.
//! Uses `rust_decimal` for all prices and percentages - never use f64 for money!

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AlertError;

/// Subject used for alerts that are not tied to one symbol
pub const PORTFOLIO_SUBJECT: &str = "portfolio";

/// Exchange account a position was read from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    BingX,
    Blofin,
    Kraken,
}

impl Exchange {
    pub const ALL: [Exchange; 3] = [Exchange::BingX, Exchange::Blofin, Exchange::Kraken];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::BingX => "bingx",
            Exchange::Blofin => "blofin",
            Exchange::Kraken => "kraken",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Exchange::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AlertError::Config(format!("unknown exchange '{s}'")))
    }
}

/// Position direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

/// One open position, normalized from whatever shape the exchange returned.
///
/// Immutable once read; lives for a single polling cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub exchange: Exchange,

    /// Base asset symbol (e.g., "BTC")
    pub symbol: String,

    pub side: Side,

    pub entry_price: Decimal,

    pub mark_price: Decimal,

    /// Absolute position size in contracts/units
    pub size: Decimal,

    pub leverage: Decimal,

    /// Unrealized P&L as a percentage of margin
    pub unrealized_pnl_pct: Decimal,

    /// `None` means no stop loss is set
    pub stop_loss_price: Option<Decimal>,
}

impl PositionSnapshot {
    /// Side-aware P&L percentage from entry to mark, scaled by leverage.
    pub fn computed_pnl_pct(side: Side, entry: Decimal, mark: Decimal, leverage: Decimal) -> Decimal {
        if entry <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let moved = match side {
            Side::Long => mark - entry,
            Side::Short => entry - mark,
        };
        (moved / entry) * Decimal::ONE_HUNDRED * leverage
    }
}

/// Derived technical signals for one symbol, recomputed every cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub symbol: String,

    /// Wilder RSI over `rsi_period` samples
    pub rsi: Decimal,

    pub rsi_period: usize,

    pub timestamp: DateTime<Utc>,
}

/// Alert categories, in the order rules are evaluated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Oversold,
    Overbought,
    LosingTrade,
    MissingStopLoss,
    HighProfit,
    PortfolioNews,
    RiskWarning,
    BullishSignal,
    Opportunity,
    BreakingNews,
    PumpDump,
}

impl AlertCategory {
    pub const ALL: [AlertCategory; 11] = [
        AlertCategory::Oversold,
        AlertCategory::Overbought,
        AlertCategory::LosingTrade,
        AlertCategory::MissingStopLoss,
        AlertCategory::HighProfit,
        AlertCategory::PortfolioNews,
        AlertCategory::RiskWarning,
        AlertCategory::BullishSignal,
        AlertCategory::Opportunity,
        AlertCategory::BreakingNews,
        AlertCategory::PumpDump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Oversold => "oversold",
            AlertCategory::Overbought => "overbought",
            AlertCategory::LosingTrade => "losing_trade",
            AlertCategory::MissingStopLoss => "missing_stop_loss",
            AlertCategory::HighProfit => "high_profit",
            AlertCategory::PortfolioNews => "portfolio_news",
            AlertCategory::RiskWarning => "risk_warning",
            AlertCategory::BullishSignal => "bullish_signal",
            AlertCategory::Opportunity => "opportunity",
            AlertCategory::BreakingNews => "breaking_news",
            AlertCategory::PumpDump => "pump_dump",
        }
    }

    /// Fixed severity table. Severity is never computed from the data.
    pub fn severity(&self) -> Severity {
        match self {
            AlertCategory::LosingTrade
            | AlertCategory::MissingStopLoss
            | AlertCategory::RiskWarning
            | AlertCategory::PumpDump => Severity::High,
            AlertCategory::Oversold
            | AlertCategory::Overbought
            | AlertCategory::BullishSignal
            | AlertCategory::BreakingNews => Severity::Medium,
            AlertCategory::HighProfit
            | AlertCategory::PortfolioNews
            | AlertCategory::Opportunity => Severity::Low,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertCategory::Oversold => "🟩",
            AlertCategory::Overbought => "🟥",
            AlertCategory::LosingTrade => "🚨",
            AlertCategory::MissingStopLoss => "🛡️",
            AlertCategory::HighProfit => "💰",
            AlertCategory::PortfolioNews => "📰",
            AlertCategory::RiskWarning => "⚠️",
            AlertCategory::BullishSignal => "🚀",
            AlertCategory::Opportunity => "🔍",
            AlertCategory::BreakingNews => "🔥",
            AlertCategory::PumpDump => "🎢",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertCategory::Oversold => "Oversold",
            AlertCategory::Overbought => "Overbought",
            AlertCategory::LosingTrade => "Losing Trade",
            AlertCategory::MissingStopLoss => "Missing Stop Loss",
            AlertCategory::HighProfit => "High Profit",
            AlertCategory::PortfolioNews => "Portfolio News",
            AlertCategory::RiskWarning => "Risk Warning",
            AlertCategory::BullishSignal => "Bullish Signal",
            AlertCategory::Opportunity => "Opportunity",
            AlertCategory::BreakingNews => "Breaking News",
            AlertCategory::PumpDump => "Pump/Dump Watch",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCategory {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| AlertError::Config(format!("unknown alert category '{s}'")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified alert. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Content-derived identity, used in delivery logs. Identical inputs give identical ids.
    pub id: Uuid,

    pub category: AlertCategory,

    /// Symbol, or [`PORTFOLIO_SUBJECT`]
    pub subject: String,

    pub severity: Severity,

    pub message: String,

    /// Account the triggering position came from (price rules only)
    pub exchange: Option<Exchange>,

    pub created_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        category: AlertCategory,
        subject: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut event = Self {
            id: Uuid::nil(),
            category,
            subject: subject.into(),
            severity: category.severity(),
            message: message.into(),
            exchange: None,
            created_at,
        };
        event.id = event.derive_id();
        event
    }

    pub fn with_exchange(mut self, exchange: Exchange) -> Self {
        self.exchange = Some(exchange);
        self.id = self.derive_id();
        self
    }

    fn derive_id(&self) -> Uuid {
        let exchange = self.exchange.map_or("", |e| e.as_str());
        let key = format!(
            "{}|{}|{}|{}|{}",
            self.category,
            self.subject,
            exchange,
            self.created_at.timestamp_micros(),
            self.message
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }

    /// (category, subject) pair the deduplicator keys on
    pub fn dedup_key(&self) -> (AlertCategory, String) {
        (self.category, self.subject.clone())
    }
}

/// News sentiment as scored by an external analysis step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Case-insensitive, so `"Positive"` and `"bullish"` are accepted too
impl<'de> Deserialize<'de> for Sentiment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Self>().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Sentiment {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "bullish" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" | "bearish" => Ok(Sentiment::Negative),
            other => Err(AlertError::Other(format!("unknown sentiment '{other}'"))),
        }
    }
}

/// A pre-fetched news item, optionally pre-scored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub text: String,

    /// Ticker symbols the item mentions
    #[serde(default)]
    pub symbols: Vec<String>,

    #[serde(default)]
    pub sentiment: Option<Sentiment>,

    /// Breaking-news flag from the news collaborator
    #[serde(default)]
    pub breaking: bool,

    /// Sudden volume or price spike flag
    #[serde(default)]
    pub spike: bool,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: String::new(),
            symbols: Vec::new(),
            sentiment: None,
            breaking: false,
            spike: false,
            source: None,
            url: None,
            published_at: None,
        }
    }

    pub fn with_symbols(mut self, symbols: &[&str]) -> Self {
        self.symbols = symbols.iter().map(|s| s.to_uppercase()).collect();
        self
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }
}

/// Destination channel identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
