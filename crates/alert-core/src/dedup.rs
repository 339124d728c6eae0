//! Alert Deduplicator / Rate Limiter
//!
//! Owns the only cross-cycle state in the pipeline: when each
//! (category, subject) pair was last emitted. Process-local and best-effort;
//! nothing survives a restart.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::AlertConfig;
use crate::model::{AlertCategory, AlertEvent};

/// Cool-down windows per category
#[derive(Clone, Debug)]
pub struct CooldownPolicy {
    default: Duration,
    per_category: HashMap<AlertCategory, Duration>,
}

impl CooldownPolicy {
    pub fn uniform(window: Duration) -> Self {
        Self {
            default: window,
            per_category: HashMap::new(),
        }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        let per_category = AlertCategory::ALL
            .into_iter()
            .map(|c| (c, config.cooldown_for(c)))
            .collect();
        Self {
            default: config.default_cooldown(),
            per_category,
        }
    }

    pub fn with_override(mut self, category: AlertCategory, window: Duration) -> Self {
        self.per_category.insert(category, window);
        self
    }

    pub fn window(&self, category: AlertCategory) -> Duration {
        self.per_category.get(&category).copied().unwrap_or(self.default)
    }
}

/// Emit/suppress split of one batch
#[derive(Clone, Debug, Default)]
pub struct DedupOutcome {
    pub emitted: Vec<AlertEvent>,
    pub suppressed: Vec<AlertEvent>,
}

#[derive(Debug)]
pub struct Deduplicator {
    policy: CooldownPolicy,
    last_emitted: HashMap<(AlertCategory, String), DateTime<Utc>>,
}

impl Deduplicator {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            last_emitted: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }

    /// Whether `event` would be emitted at `now`. Does not record anything.
    pub fn should_emit(&self, event: &AlertEvent, now: DateTime<Utc>) -> bool {
        match self.last_emitted.get(&event.dedup_key()) {
            Some(last) => now - *last >= self.policy.window(event.category),
            None => true,
        }
    }

    /// Decide and, on emit, record `now` for the event's key.
    pub fn admit(&mut self, event: &AlertEvent, now: DateTime<Utc>) -> bool {
        if !self.should_emit(event, now) {
            return false;
        }
        self.last_emitted.insert(event.dedup_key(), now);
        true
    }

    /// Admit a batch in order. A repeated key inside the batch is suppressed
    /// like any other repeat.
    pub fn filter(&mut self, events: Vec<AlertEvent>, now: DateTime<Utc>) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();
        for event in events {
            if self.admit(&event, now) {
                outcome.emitted.push(event);
            } else {
                tracing::debug!(
                    category = %event.category,
                    subject = %event.subject,
                    "Suppressed repeat alert"
                );
                outcome.suppressed.push(event);
            }
        }
        outcome
    }

    /// Drop entries whose window has elapsed. Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.last_emitted.len();
        let policy = &self.policy;
        self.last_emitted
            .retain(|(category, _), last| now - *last < policy.window(*category));
        before - self.last_emitted.len()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(CooldownPolicy::uniform(Duration::hours(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(category: AlertCategory, subject: &str, at: DateTime<Utc>) -> AlertEvent {
        AlertEvent::new(category, subject, "test", at)
    }

    #[test]
    fn test_repeat_suppressed_within_window_then_emitted() {
        let mut dedup = Deduplicator::default();
        let t0 = Utc::now();

        assert!(dedup.admit(&event(AlertCategory::Oversold, "BTC", t0), t0));

        let t1 = t0 + Duration::minutes(59);
        assert!(!dedup.admit(&event(AlertCategory::Oversold, "BTC", t1), t1));

        let t2 = t0 + Duration::minutes(60);
        assert!(dedup.admit(&event(AlertCategory::Oversold, "BTC", t2), t2));
    }

    #[test]
    fn test_suppression_does_not_extend_window() {
        let mut dedup = Deduplicator::default();
        let t0 = Utc::now();
        dedup.admit(&event(AlertCategory::Overbought, "ETH", t0), t0);

        let t1 = t0 + Duration::minutes(30);
        assert!(!dedup.admit(&event(AlertCategory::Overbought, "ETH", t1), t1));

        let t2 = t0 + Duration::minutes(61);
        assert!(dedup.admit(&event(AlertCategory::Overbought, "ETH", t2), t2));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut dedup = Deduplicator::default();
        let now = Utc::now();
        assert!(dedup.admit(&event(AlertCategory::Oversold, "BTC", now), now));
        assert!(dedup.admit(&event(AlertCategory::Oversold, "ETH", now), now));
        assert!(dedup.admit(&event(AlertCategory::MissingStopLoss, "BTC", now), now));
        assert_eq!(dedup.len(), 3);
    }

    #[test]
    fn test_per_category_windows() {
        let policy = CooldownPolicy::uniform(Duration::hours(1))
            .with_override(AlertCategory::BreakingNews, Duration::minutes(15));
        let mut dedup = Deduplicator::new(policy);
        let t0 = Utc::now();
        dedup.admit(&event(AlertCategory::BreakingNews, "portfolio", t0), t0);
        dedup.admit(&event(AlertCategory::HighProfit, "SOL", t0), t0);

        let t1 = t0 + Duration::minutes(20);
        assert!(dedup.should_emit(&event(AlertCategory::BreakingNews, "portfolio", t1), t1));
        assert!(!dedup.should_emit(&event(AlertCategory::HighProfit, "SOL", t1), t1));
    }

    #[test]
    fn test_policy_from_config() {
        let config = crate::config::tests::sample();
        let policy = CooldownPolicy::from_config(&config);
        assert_eq!(policy.window(AlertCategory::BreakingNews), Duration::minutes(15));
        assert_eq!(policy.window(AlertCategory::HighProfit), Duration::minutes(240));
        assert_eq!(policy.window(AlertCategory::Oversold), Duration::minutes(60));
    }

    #[test]
    fn test_filter_suppresses_repeat_within_batch() {
        let mut dedup = Deduplicator::default();
        let now = Utc::now();
        let batch = vec![
            event(AlertCategory::Opportunity, "SOL", now),
            event(AlertCategory::Opportunity, "SOL", now),
            event(AlertCategory::Opportunity, "ADA", now),
        ];
        let outcome = dedup.filter(batch, now);
        assert_eq!(outcome.emitted.len(), 2);
        assert_eq!(outcome.suppressed.len(), 1);
        assert_eq!(outcome.emitted[1].subject, "ADA");
    }

    #[test]
    fn test_prune_drops_expired_entries() {
        let policy = CooldownPolicy::uniform(Duration::hours(1))
            .with_override(AlertCategory::BreakingNews, Duration::minutes(15));
        let mut dedup = Deduplicator::new(policy);
        let t0 = Utc::now();
        dedup.admit(&event(AlertCategory::BreakingNews, "portfolio", t0), t0);
        dedup.admit(&event(AlertCategory::LosingTrade, "BTC", t0), t0);

        assert_eq!(dedup.prune(t0 + Duration::minutes(30)), 1);
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.prune(t0 + Duration::hours(2)), 1);
        assert!(dedup.is_empty());
    }
}
