//! Position Snapshot Reader
//!
//! The normalization boundary: raw per-account position records (untyped
//! JSON in whatever shape the exchange returns) go in, [`PositionSnapshot`]s
//! come out. Nothing past this module sees a raw record.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{AlertError, Result};
use crate::model::{Exchange, PositionSnapshot, Side};

/// Source of raw position records for one exchange account.
///
/// Implement this for each account: file exports, exchange SDK wrappers, etc.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Exchange this account belongs to (selects the normalizer)
    fn exchange(&self) -> Exchange;

    /// Identity used in failure reports
    fn name(&self) -> String {
        self.exchange().to_string()
    }

    /// Fetch the current raw records. An error means the whole source is unreachable.
    async fn fetch_raw(&self) -> Result<Vec<Value>>;
}

/// A source that could not be read this cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFailure {
    pub source_id: String,
    pub reason: String,
}

/// Result of reading every source once
#[derive(Clone, Debug, Default)]
pub struct ReadOutcome {
    pub snapshots: Vec<PositionSnapshot>,
    pub failures: Vec<SourceFailure>,
    /// Records that could not be normalized (no symbol, zero size, ...)
    pub skipped: usize,
}

impl ReadOutcome {
    pub fn held_symbols(&self) -> std::collections::HashSet<String> {
        self.snapshots.iter().map(|s| s.symbol.clone()).collect()
    }
}

/// Reads every configured source in order, tolerating individual failures
pub struct SnapshotReader {
    sources: Vec<Arc<dyn PositionSource>>,
}

impl SnapshotReader {
    pub fn new(sources: Vec<Arc<dyn PositionSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Poll each source once. Fails only when every configured source failed.
    pub async fn read(&self) -> Result<ReadOutcome> {
        let mut outcome = ReadOutcome::default();

        for source in &self.sources {
            let exchange = source.exchange();
            match source.fetch_raw().await {
                Ok(records) => {
                    let total = records.len();
                    let before = outcome.snapshots.len();
                    outcome
                        .snapshots
                        .extend(records.iter().filter_map(|r| normalize(exchange, r)));
                    let kept = outcome.snapshots.len() - before;
                    outcome.skipped += total - kept;
                    tracing::debug!(source = %source.name(), kept, total, "Read positions");
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Position source unavailable");
                    outcome.failures.push(SourceFailure {
                        source_id: source.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !self.sources.is_empty() && outcome.failures.len() == self.sources.len() {
            return Err(AlertError::AllSourcesUnavailable(self.sources.len()));
        }

        Ok(outcome)
    }
}

/// Normalize one raw record. Returns `None` for records that are not open positions.
pub fn normalize(exchange: Exchange, raw: &Value) -> Option<PositionSnapshot> {
    match exchange {
        Exchange::BingX => normalize_bingx(raw),
        Exchange::Blofin | Exchange::Kraken => normalize_unified(exchange, raw),
    }
}

/// BingX native swap positions (`/openApi/swap/v2/user/positions`)
fn normalize_bingx(raw: &Value) -> Option<PositionSnapshot> {
    let symbol = clean_symbol(raw.get("symbol")?.as_str()?)?;
    let amount = decimal_field(raw, &["positionAmt", "availableAmt"]).unwrap_or(Decimal::ZERO);
    if amount.is_zero() {
        return None;
    }

    let side = raw
        .get("positionSide")
        .and_then(Value::as_str)
        .and_then(parse_side)
        .unwrap_or(if amount.is_sign_negative() { Side::Short } else { Side::Long });

    build(
        Exchange::BingX,
        symbol,
        side,
        amount.abs(),
        decimal_field(raw, &["avgPrice", "entryPrice"]),
        decimal_field(raw, &["markPrice"]),
        decimal_field(raw, &["leverage"]),
        decimal_field(raw, &["pnlRatio"]).map(|r| r * Decimal::ONE_HUNDRED),
        decimal_field(raw, &["stopLossPrice", "stopLoss"]),
    )
}

/// CCXT unified position structure (Blofin, Kraken)
fn normalize_unified(exchange: Exchange, raw: &Value) -> Option<PositionSnapshot> {
    let symbol = clean_symbol(raw.get("symbol")?.as_str()?)?;
    let contracts = decimal_field(raw, &["contracts", "contractSize", "amount"]).unwrap_or(Decimal::ZERO);
    if contracts.is_zero() {
        return None;
    }

    let side = raw
        .get("side")
        .and_then(Value::as_str)
        .and_then(parse_side)
        .unwrap_or(if contracts.is_sign_negative() { Side::Short } else { Side::Long });

    build(
        exchange,
        symbol,
        side,
        contracts.abs(),
        decimal_field(raw, &["entryPrice"]),
        decimal_field(raw, &["markPrice"]),
        decimal_field(raw, &["leverage"]),
        decimal_field(raw, &["percentage"]),
        decimal_field(raw, &["stopLossPrice"]),
    )
}

#[allow(clippy::too_many_arguments)]
fn build(
    exchange: Exchange,
    symbol: String,
    side: Side,
    size: Decimal,
    entry: Option<Decimal>,
    mark: Option<Decimal>,
    leverage: Option<Decimal>,
    pnl_pct: Option<Decimal>,
    stop_loss: Option<Decimal>,
) -> Option<PositionSnapshot> {
    let entry_price = entry.unwrap_or(Decimal::ZERO);
    let mark_price = mark.unwrap_or(entry_price);
    let leverage = leverage.filter(|l| *l > Decimal::ZERO).unwrap_or(Decimal::ONE);
    let unrealized_pnl_pct = pnl_pct.unwrap_or_else(|| {
        PositionSnapshot::computed_pnl_pct(side, entry_price, mark_price, leverage)
    });

    Some(PositionSnapshot {
        exchange,
        symbol,
        side,
        entry_price,
        mark_price,
        size,
        leverage,
        unrealized_pnl_pct,
        stop_loss_price: stop_loss.filter(|p| *p > Decimal::ZERO),
    })
}

/// First present field among `keys`, accepting JSON numbers or numeric strings
fn decimal_field(raw: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| match raw.get(*key)? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) if !s.trim().is_empty() => Decimal::from_str(s.trim()).ok(),
        _ => None,
    })
}

fn parse_side(side: &str) -> Option<Side> {
    match side.trim().to_ascii_lowercase().as_str() {
        "long" | "buy" => Some(Side::Long),
        "short" | "sell" => Some(Side::Short),
        _ => None,
    }
}

/// Reduce an exchange symbol to its base asset: `BTC-USDT`, `BTC/USDT:USDT`, `BTCUSDT` -> `BTC`
pub fn clean_symbol(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let base = upper
        .split(['/', '-', ':'])
        .next()
        .unwrap_or_default();
    let base = base
        .strip_suffix("USDT")
        .filter(|b| !b.is_empty())
        .unwrap_or(base);

    if base.is_empty() || base.len() > 10 {
        None
    } else {
        Some(base.to_string())
    }
}
