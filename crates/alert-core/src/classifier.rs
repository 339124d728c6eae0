//! Alert Classifier
//!
//! Rules are data: ordered tables of (category, predicate, renderer) evaluated
//! uniformly. Every matching rule fires, in table order. The classifier is a
//! pure function of its inputs; `now` is passed in.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::Thresholds;
use crate::model::{
    AlertCategory, AlertEvent, IndicatorSet, NewsItem, PORTFOLIO_SUBJECT, PositionSnapshot,
    Sentiment,
};

/// Inputs a position rule sees
pub struct PositionContext<'a> {
    pub position: &'a PositionSnapshot,
    /// `None` when the indicator had insufficient data; RSI rules do not fire
    pub indicators: Option<&'a IndicatorSet>,
    pub thresholds: &'a Thresholds,
}

/// Inputs a news rule sees, evaluated once per mentioned symbol
pub struct NewsContext<'a> {
    pub item: &'a NewsItem,
    /// Mentioned symbol, or `None` for items that name no symbol
    pub symbol: Option<&'a str>,
    pub held: bool,
}

pub struct PositionRule {
    pub category: AlertCategory,
    pub predicate: fn(&PositionContext<'_>) -> bool,
    pub render: fn(&PositionContext<'_>) -> String,
}

pub struct NewsRule {
    pub category: AlertCategory,
    pub predicate: fn(&NewsContext<'_>) -> bool,
}

fn rsi_of(ctx: &PositionContext<'_>) -> Option<rust_decimal::Decimal> {
    ctx.indicators.map(|i| i.rsi)
}

/// Price/position rules in evaluation order
pub const POSITION_RULES: &[PositionRule] = &[
    PositionRule {
        category: AlertCategory::Oversold,
        predicate: |ctx| rsi_of(ctx).is_some_and(|rsi| rsi <= ctx.thresholds.rsi_oversold),
        render: |ctx| {
            format!(
                "${} is oversold at RSI {:.1}. Possible reversal setup.",
                ctx.position.symbol,
                rsi_of(ctx).unwrap_or_default()
            )
        },
    },
    PositionRule {
        category: AlertCategory::Overbought,
        predicate: |ctx| rsi_of(ctx).is_some_and(|rsi| rsi >= ctx.thresholds.rsi_overbought),
        render: |ctx| {
            format!(
                "${} RSI is {:.1}. Consider exiting or trailing stop.",
                ctx.position.symbol,
                rsi_of(ctx).unwrap_or_default()
            )
        },
    },
    PositionRule {
        category: AlertCategory::LosingTrade,
        predicate: |ctx| ctx.position.unrealized_pnl_pct <= ctx.thresholds.losing_trade_pnl_pct,
        render: |ctx| {
            format!(
                "${} {} is down {:.1}%. Capital preservation - review position.",
                ctx.position.symbol,
                ctx.position.side.as_str(),
                ctx.position.unrealized_pnl_pct
            )
        },
    },
    PositionRule {
        category: AlertCategory::MissingStopLoss,
        predicate: |ctx| {
            ctx.position.stop_loss_price.is_none()
                && ctx.position.size > ctx.thresholds.missing_stop_loss_min_size
        },
        render: |ctx| {
            format!(
                "${} {} position ({} @ {}x) has no stop loss set.",
                ctx.position.symbol,
                ctx.position.side.as_str(),
                ctx.position.size.normalize(),
                ctx.position.leverage.normalize()
            )
        },
    },
    PositionRule {
        category: AlertCategory::HighProfit,
        predicate: |ctx| ctx.position.unrealized_pnl_pct >= ctx.thresholds.high_profit_pnl_pct,
        render: |ctx| {
            format!(
                "${} up {:.1}%! Consider taking profit or trailing stops.",
                ctx.position.symbol, ctx.position.unrealized_pnl_pct
            )
        },
    },
];

fn positive(ctx: &NewsContext<'_>) -> bool {
    ctx.item.sentiment == Some(Sentiment::Positive)
}

fn negative(ctx: &NewsContext<'_>) -> bool {
    ctx.item.sentiment == Some(Sentiment::Negative)
}

/// News rules in evaluation order
pub const NEWS_RULES: &[NewsRule] = &[
    NewsRule {
        category: AlertCategory::PumpDump,
        predicate: |ctx| ctx.item.spike,
    },
    NewsRule {
        category: AlertCategory::BreakingNews,
        predicate: |ctx| ctx.item.breaking,
    },
    NewsRule {
        category: AlertCategory::RiskWarning,
        predicate: |ctx| ctx.symbol.is_some() && ctx.held && negative(ctx),
    },
    NewsRule {
        category: AlertCategory::BullishSignal,
        predicate: |ctx| ctx.symbol.is_some() && ctx.held && positive(ctx),
    },
    NewsRule {
        category: AlertCategory::Opportunity,
        predicate: |ctx| ctx.symbol.is_some() && !ctx.held && positive(ctx),
    },
    NewsRule {
        category: AlertCategory::PortfolioNews,
        predicate: |ctx| ctx.symbol.is_some() && ctx.held && !positive(ctx) && !negative(ctx),
    },
];

fn render_news(category: AlertCategory, ctx: &NewsContext<'_>) -> String {
    let subject = ctx.symbol.map_or_else(|| "Market".to_string(), |s| format!("${s}"));
    let mut message = format!("{subject}: {}", ctx.item.title);
    if let Some(sentiment) = ctx.item.sentiment {
        message.push_str(&format!(" [{}]", format!("{sentiment:?}").to_lowercase()));
    }
    if category == AlertCategory::PumpDump {
        message.push_str(" Unusual volume or price spike - beware of manipulation.");
    }
    if let Some(url) = &ctx.item.url {
        message.push_str(&format!("\n{url}"));
    }
    message
}

/// Pure rule engine over one cycle's inputs
#[derive(Clone, Debug, Default)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify_position(
        &self,
        position: &PositionSnapshot,
        indicators: Option<&IndicatorSet>,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let ctx = PositionContext {
            position,
            indicators,
            thresholds: &self.thresholds,
        };

        POSITION_RULES
            .iter()
            .filter(|rule| (rule.predicate)(&ctx))
            .map(|rule| {
                AlertEvent::new(rule.category, &position.symbol, (rule.render)(&ctx), now)
                    .with_exchange(position.exchange)
            })
            .collect()
    }

    pub fn classify_news(
        &self,
        item: &NewsItem,
        held: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut symbols: Vec<String> = Vec::new();
        for symbol in &item.symbols {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        let subjects: Vec<Option<&str>> = if symbols.is_empty() {
            vec![None]
        } else {
            symbols.iter().map(|s| Some(s.as_str())).collect()
        };

        let mut events = Vec::new();
        for symbol in subjects {
            let ctx = NewsContext {
                item,
                symbol,
                held: symbol.is_some_and(|s| held.contains(s)),
            };
            for rule in NEWS_RULES.iter().filter(|rule| (rule.predicate)(&ctx)) {
                events.push(AlertEvent::new(
                    rule.category,
                    symbol.unwrap_or(PORTFOLIO_SUBJECT),
                    render_news(rule.category, &ctx),
                    now,
                ));
            }
        }
        events
    }

    /// Classify a whole cycle: positions first (input order), then news (input order)
    pub fn classify_cycle(
        &self,
        positions: &[PositionSnapshot],
        indicators: &HashMap<String, IndicatorSet>,
        news: &[NewsItem],
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let held: HashSet<String> = positions.iter().map(|p| p.symbol.clone()).collect();

        let mut events: Vec<AlertEvent> = positions
            .iter()
            .flat_map(|p| self.classify_position(p, indicators.get(&p.symbol), now))
            .collect();

        events.extend(news.iter().flat_map(|item| self.classify_news(item, &held, now)));
        events
    }
}
