//! File-backed and static collaborators
//!
//! The exchange and news layers export pre-fetched JSON; these sources read
//! those exports fresh on every cycle. [`StaticPositionSource`] serves fixed
//! records for demos and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use alert_core::{AlertError, Exchange, NewsItem, NewsSource, PositionSource, PriceHistorySource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Result, RuntimeError};

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path).await.map_err(|source| RuntimeError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| RuntimeError::Json {
        path: display,
        source,
    })
}

/// Accept either a bare array or an exchange envelope (`{"data": [...]}`)
fn unwrap_records(document: Value) -> Vec<Value> {
    match document {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("positions")) {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Raw position export for one exchange account
pub struct JsonFilePositionSource {
    exchange: Exchange,
    path: PathBuf,
}

impl JsonFilePositionSource {
    pub fn new(exchange: Exchange, path: impl Into<PathBuf>) -> Self {
        Self {
            exchange,
            path: path.into(),
        }
    }
}

#[async_trait]
impl PositionSource for JsonFilePositionSource {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_raw(&self) -> alert_core::Result<Vec<Value>> {
        read_json::<Value>(&self.path)
            .await
            .map(unwrap_records)
            .map_err(|e| AlertError::source_unavailable(self.exchange.as_str(), e))
    }
}

/// Closing prices per symbol: `{"BTC": [60000, 59500, ...], ...}`, oldest first
pub struct JsonFilePriceHistory {
    path: PathBuf,
}

impl JsonFilePriceHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PriceHistorySource for JsonFilePriceHistory {
    async fn closes(&self, symbols: &[String]) -> alert_core::Result<HashMap<String, Vec<Decimal>>> {
        let document: HashMap<String, Value> = read_json(&self.path)
            .await
            .map_err(|e| AlertError::source_unavailable("price_history", e))?;
        let document: HashMap<String, Value> = document
            .into_iter()
            .map(|(symbol, series)| (symbol.to_uppercase(), series))
            .collect();

        let mut history = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let Some(series) = document.get(&symbol.to_uppercase()) else {
                continue;
            };
            match serde_json::from_value::<Vec<Decimal>>(series.clone()) {
                Ok(closes) => {
                    history.insert(symbol.clone(), closes);
                }
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Skipping malformed price history"),
            }
        }
        Ok(history)
    }
}

/// Pre-fetched news items: a bare array or `{"items": [...]}`
pub struct JsonFileNewsSource {
    path: PathBuf,
}

impl JsonFileNewsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NewsSource for JsonFileNewsSource {
    fn name(&self) -> String {
        format!("news:{}", self.path.display())
    }

    /// Malformed items are logged and skipped; the rest of the batch is kept.
    async fn fetch(&self) -> alert_core::Result<Vec<NewsItem>> {
        let document: Value = read_json(&self.path)
            .await
            .map_err(|e| AlertError::source_unavailable(self.name(), e))?;
        let records = match document {
            Value::Array(records) => records,
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(records)) => records,
                None => Vec::new(),
                Some(_) => {
                    return Err(AlertError::source_unavailable(self.name(), "\"items\" is not an array"));
                }
            },
            _ => return Err(AlertError::source_unavailable(self.name(), "expected an array of news items")),
        };

        let mut items = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<NewsItem>(record) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(source = %self.name(), index, error = %e, "Skipping malformed news item"),
            }
        }
        Ok(items)
    }
}

/// Static position records for demos and tests
pub struct StaticPositionSource {
    exchange: Exchange,
    records: Vec<Value>,
}

impl StaticPositionSource {
    pub fn new(exchange: Exchange, records: Vec<Value>) -> Self {
        Self { exchange, records }
    }

    /// A small realistic book in the exchange's native shape
    pub fn demo(exchange: Exchange) -> Self {
        let records = match exchange {
            Exchange::BingX => vec![
                json!({"symbol": "BTC-USDT", "positionSide": "LONG", "positionAmt": "0.05",
                       "avgPrice": "97500", "markPrice": "95200", "leverage": 5}),
                json!({"symbol": "SOL-USDT", "positionSide": "SHORT", "positionAmt": "-12",
                       "avgPrice": "195", "markPrice": "221", "leverage": 3,
                       "stopLossPrice": "230"}),
            ],
            Exchange::Blofin => vec![json!({"symbol": "ETH/USDT:USDT", "side": "long",
                "contracts": 1.5, "entryPrice": 3450, "markPrice": 4200,
                "leverage": 2, "stopLossPrice": 3300})],
            Exchange::Kraken => vec![json!({"symbol": "XRP/USD", "side": "long",
                "contracts": 800, "entryPrice": 2.35, "markPrice": 2.41})],
        };
        Self::new(exchange, records)
    }
}

#[async_trait]
impl PositionSource for StaticPositionSource {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn name(&self) -> String {
        format!("{}:static", self.exchange)
    }

    async fn fetch_raw(&self) -> alert_core::Result<Vec<Value>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::SnapshotReader;
    use alert_core::{Sentiment, Side};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("alert-runtime-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_bingx_envelope_is_unwrapped() {
        let path = temp_file(
            r#"{"code": 0, "data": [{"symbol": "BTC-USDT", "positionSide": "LONG",
                "positionAmt": "1", "avgPrice": "60000", "markPrice": "58000"}]}"#,
        );
        let source = JsonFilePositionSource::new(Exchange::BingX, &path);
        let records = source.fetch_raw().await.unwrap();
        assert_eq!(records.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let source = JsonFilePositionSource::new(Exchange::Kraken, "/definitely/not/here.json");
        let err = source.fetch_raw().await.unwrap_err();
        assert!(matches!(err, AlertError::SourceUnavailable { ref source_id, .. } if source_id == "kraken"));
    }

    #[tokio::test]
    async fn test_price_history_by_symbol() {
        let path = temp_file(r#"{"btc": [1, 2, "3.5"], "ETH": []}"#);
        let history = JsonFilePriceHistory::new(&path);
        let series = history.closes(&["BTC".to_string(), "ETH".to_string(), "DOGE".to_string()]).await.unwrap();
        assert_eq!(series["BTC"], vec![dec!(1), dec!(2), dec!(3.5)]);
        assert!(series["ETH"].is_empty());
        assert!(!series.contains_key("DOGE"));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_malformed_series_does_not_hide_others() {
        let path = temp_file(r#"{"BTC": [1, 2], "ETH": ["x"]}"#);
        let history = JsonFilePriceHistory::new(&path);
        let series = history.closes(&["BTC".to_string(), "ETH".to_string()]).await.unwrap();
        assert_eq!(series["BTC"], vec![dec!(1), dec!(2)]);
        assert!(!series.contains_key("ETH"));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_news_file_shapes() {
        let bare = temp_file(r#"[{"id": "1", "title": "BTC ETF approved", "symbols": ["BTC"], "sentiment": "positive"}]"#);
        let wrapped = temp_file(r#"{"items": [{"id": "2", "title": "Market wrap", "breaking": true}]}"#);

        let items = JsonFileNewsSource::new(&bare).fetch().await.unwrap();
        assert_eq!(items[0].symbols, vec!["BTC".to_string()]);

        let items = JsonFileNewsSource::new(&wrapped).fetch().await.unwrap();
        assert!(items[0].breaking);
        assert!(items[0].symbols.is_empty());

        std::fs::remove_file(bare).ok();
        std::fs::remove_file(wrapped).ok();
    }

    #[tokio::test]
    async fn test_malformed_news_item_is_skipped() {
        let path = temp_file(
            r#"[{"id": "1", "title": "SOL upgrade", "sentiment": "Positive"},
                {"id": "2"},
                {"id": "3", "title": "Exchange hack", "sentiment": "NEGATIVE"}]"#,
        );
        let items = JsonFileNewsSource::new(&path).fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sentiment, Some(Sentiment::Positive));
        assert_eq!(items[1].id, "3");
        assert_eq!(items[1].sentiment, Some(Sentiment::Negative));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_demo_book_normalizes() {
        let reader = SnapshotReader::new(
            Exchange::ALL
                .into_iter()
                .map(|e| Arc::new(StaticPositionSource::demo(e)) as Arc<dyn PositionSource>)
                .collect(),
        );
        let outcome = reader.read().await.unwrap();
        assert_eq!(outcome.snapshots.len(), 4);
        assert!(outcome.failures.is_empty());
        let sol = outcome.snapshots.iter().find(|s| s.symbol == "SOL").unwrap();
        assert_eq!(sol.side, Side::Short);
        assert_eq!(sol.stop_loss_price, Some(dec!(230)));
    }
}
