//! Indicator Calculator
//!
//! Wilder-smoothed RSI over a closing-price history (oldest first).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{AlertError, Result};
use crate::model::IndicatorSet;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Compute RSI from `closes` using Wilder's smoothing.
///
/// The first average gain/loss is the simple mean of the first `period`
/// changes; each later change is folded in as `(prev * (period - 1) + x) / period`.
/// Returns `InsufficientData` when fewer than `period + 1` closes are given.
pub fn rsi(closes: &[Decimal], period: usize) -> Result<Decimal> {
    let needed = period + 1;
    if period == 0 || closes.len() < needed {
        return Err(AlertError::InsufficientData {
            needed,
            got: closes.len(),
        });
    }

    let n = Decimal::from(period);
    let changes: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let mut avg_gain = seed.iter().map(|c| gain(*c)).sum::<Decimal>() / n;
    let mut avg_loss = seed.iter().map(|c| loss(*c)).sum::<Decimal>() / n;

    for change in rest {
        avg_gain = (avg_gain * (n - Decimal::ONE) + gain(*change)) / n;
        avg_loss = (avg_loss * (n - Decimal::ONE) + loss(*change)) / n;
    }

    if avg_loss.is_zero() {
        return Ok(Decimal::ONE_HUNDRED);
    }

    let rs = avg_gain / avg_loss;
    Ok(Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs))
}

fn gain(change: Decimal) -> Decimal {
    change.max(Decimal::ZERO)
}

fn loss(change: Decimal) -> Decimal {
    (-change).max(Decimal::ZERO)
}

/// Stateless calculator producing an [`IndicatorSet`] per symbol
#[derive(Clone, Copy, Debug)]
pub struct IndicatorCalculator {
    period: usize,
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_RSI_PERIOD)
    }
}

impl IndicatorCalculator {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn compute(
        &self,
        symbol: &str,
        closes: &[Decimal],
        timestamp: DateTime<Utc>,
    ) -> Result<IndicatorSet> {
        Ok(IndicatorSet {
            symbol: symbol.to_uppercase(),
            rsi: rsi(closes, self.period)?,
            rsi_period: self.period,
            timestamp,
        })
    }
}
