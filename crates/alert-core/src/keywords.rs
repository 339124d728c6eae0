//! Keyword pre-scoring for unscored news items.
//!
//! Used only when the news collaborator supplied no sentiment. Explicit
//! scores always win.

use crate::model::{NewsItem, Sentiment};

const RISK_WORDS: &[&str] = &[
    "HACK", "EXPLOIT", "VULNERABILITY", "BREACH", "SCAM", "RUG", "FRAUD",
    "INVESTIGATION", "LAWSUIT", "SEC ", "BAN", "DELIST", "SUSPEND", "HALT",
    "CRASH", "ILLEGAL",
];

const BULLISH_WORDS: &[&str] = &[
    "PARTNERSHIP", "COLLABORATION", "INTEGRATION", "ALLIANCE", "LISTING",
    "LISTED ON", "INSTITUTIONAL", "INVESTMENT", "FUNDING", "LAUNCH", "UPGRADE",
    "MAINNET", "ADOPTION", "APPROVAL", "BULLISH", "SURGE", "RALLY", "BREAKOUT",
    "ACQUISITION", "MILESTONE",
];

const PUMP_DUMP_WORDS: &[&str] = &[
    "PUMP", "DUMP", "MANIPULATION", "WHALE", "UNUSUAL VOLUME", "MASSIVE BUY",
    "COORDINATED",
];

fn content(item: &NewsItem) -> String {
    format!("{} {} ", item.title, item.text).to_uppercase()
}

fn count(haystack: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| haystack.contains(*w)).count()
}

/// Sentiment implied by keyword hits, when one side strictly dominates
pub fn infer_sentiment(item: &NewsItem) -> Option<Sentiment> {
    let text = content(item);
    let risk = count(&text, RISK_WORDS);
    let bullish = count(&text, BULLISH_WORDS);

    match risk.cmp(&bullish) {
        std::cmp::Ordering::Greater => Some(Sentiment::Negative),
        std::cmp::Ordering::Less => Some(Sentiment::Positive),
        std::cmp::Ordering::Equal if risk > 0 => Some(Sentiment::Neutral),
        std::cmp::Ordering::Equal => None,
    }
}

pub fn mentions_pump_dump(item: &NewsItem) -> bool {
    count(&content(item), PUMP_DUMP_WORDS) > 0
}

/// Fill in missing sentiment and the spike flag from keywords
pub fn prescore(mut item: NewsItem) -> NewsItem {
    if item.sentiment.is_none() {
        item.sentiment = infer_sentiment(&item);
    }
    if !item.spike {
        item.spike = mentions_pump_dump(&item);
    }
    item
}
