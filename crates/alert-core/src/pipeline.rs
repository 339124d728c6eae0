//! Alert Pipeline
//!
//! One polling cycle: read snapshots, compute indicators, classify,
//! deduplicate, route, dispatch.
//!
//! ```text
//!  ┌──────────── gather (before the cycle deadline) ───────────┐
//!  │ SnapshotReader ─► IndicatorCalculator ─► NewsSource        │
//!  └───────────────────────────────────────────────────────────┘
//!        │ abandoned on timeout: nothing marked, nothing sent
//!        ▼
//!  Classifier ─► Deduplicator (mark) ─► Router ─► Dispatcher ─► Narrator
//!                                                 └─ also bounded by the deadline
//! ```
//!
//! Marking happens before any delivery is issued, so a crash mid-dispatch
//! never leaves an alert dispatched-but-unmarked. One deadline of
//! `max_cycle` covers the whole cycle: a stalled dispatch abandons the cycle
//! with its alerts still marked, a stalled narration is dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::classifier::Classifier;
use crate::config::{AlertConfig, ScheduleConfig};
use crate::dedup::Deduplicator;
use crate::dispatch::{DispatchReport, Dispatcher, NotificationTransport};
use crate::error::{AlertError, Result};
use crate::indicator::IndicatorCalculator;
use crate::keywords;
use crate::model::{AlertEvent, ChannelId, IndicatorSet, NewsItem, PositionSnapshot};
use crate::narrative::Narrator;
use crate::router::Router;
use crate::snapshot::{SnapshotReader, SourceFailure};

/// Closing-price history per symbol, oldest first
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Called once per cycle. A symbol absent from the result has no RSI
    /// signal this cycle.
    async fn closes(&self, symbols: &[String]) -> Result<HashMap<String, Vec<Decimal>>>;
}

/// Pre-fetched news items, optionally pre-scored
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> String {
        "news".into()
    }

    async fn fetch(&self) -> Result<Vec<NewsItem>>;
}

/// Which rule families a cadence evaluates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleScope {
    pub name: String,
    pub positions: bool,
    pub news: bool,
}

impl CycleScope {
    pub fn all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: true,
            news: true,
        }
    }
}

impl From<&ScheduleConfig> for CycleScope {
    fn from(entry: &ScheduleConfig) -> Self {
        Self {
            name: entry.name.clone(),
            positions: entry.positions,
            news: entry.news,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub cadence: String,
    pub snapshots: usize,
    pub failed_sources: Vec<SourceFailure>,
    pub candidates: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub dispatch: DispatchReport,
    pub narrated: bool,
}

/// Inputs collected for one cycle
struct Gathered {
    snapshots: Vec<PositionSnapshot>,
    held: HashSet<String>,
    indicators: HashMap<String, IndicatorSet>,
    news: Vec<NewsItem>,
    failures: Vec<SourceFailure>,
}

pub struct Pipeline {
    reader: SnapshotReader,
    prices: Option<Arc<dyn PriceHistorySource>>,
    news: Option<Arc<dyn NewsSource>>,
    calculator: IndicatorCalculator,
    classifier: Classifier,
    router: Router,
    dispatcher: Dispatcher,
    transport: Arc<dyn NotificationTransport>,
    narrator: Option<Arc<dyn Narrator>>,
    narrative_channel: Option<ChannelId>,
    max_cycle: std::time::Duration,
}

impl Pipeline {
    /// Build from a validated configuration.
    pub fn from_config(
        config: &AlertConfig,
        reader: SnapshotReader,
        transport: Arc<dyn NotificationTransport>,
    ) -> Result<Self> {
        Ok(Self {
            reader,
            prices: None,
            news: None,
            calculator: IndicatorCalculator::new(config.thresholds.rsi_period),
            classifier: Classifier::new(config.thresholds.clone()),
            router: Router::from_config(config)?,
            dispatcher: Dispatcher::new(transport.clone())
                .concurrent(config.pipeline.concurrent_dispatch),
            transport,
            narrator: None,
            narrative_channel: config.pipeline.narrative_channel.clone(),
            max_cycle: std::time::Duration::from_secs(config.pipeline.max_cycle_seconds),
        })
    }

    pub fn with_price_history(mut self, prices: Arc<dyn PriceHistorySource>) -> Self {
        self.prices = Some(prices);
        self
    }

    pub fn with_news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn with_max_cycle(mut self, max_cycle: std::time::Duration) -> Self {
        self.max_cycle = max_cycle;
        self
    }

    pub async fn run_cycle(&self, dedup: &mut Deduplicator, scope: &CycleScope) -> Result<CycleReport> {
        self.run_cycle_at(dedup, scope, Utc::now()).await
    }

    /// Run one cycle as of `now`.
    ///
    /// Fails with `CycleTimeout` if gathering exceeds the cycle limit, or with
    /// `AllSourcesUnavailable` when no position source answered. In both
    /// cases the deduplicator is untouched and nothing is dispatched.
    ///
    /// A dispatch still running at the deadline also fails with
    /// `CycleTimeout`; its alerts stay marked. A narration still running at
    /// the deadline is dropped and the cycle succeeds.
    pub async fn run_cycle_at(
        &self,
        dedup: &mut Deduplicator,
        scope: &CycleScope,
        now: DateTime<Utc>,
    ) -> Result<CycleReport> {
        tracing::info!(cadence = %scope.name, "Cycle started");

        let deadline = tokio::time::Instant::now() + self.max_cycle;

        let Ok(gathered) = tokio::time::timeout_at(deadline, self.gather(scope, now)).await else {
            return Err(self.abandon(scope, "gather"));
        };
        let gathered = gathered?;

        let positions: &[PositionSnapshot] = if scope.positions { &gathered.snapshots } else { &[] };

        let mut candidates =
            self.classifier
                .classify_cycle(positions, &gathered.indicators, &[], now);
        for item in &gathered.news {
            candidates.extend(self.classifier.classify_news(item, &gathered.held, now));
        }
        let candidate_count = candidates.len();

        dedup.prune(now);
        let outcome = dedup.filter(candidates, now);

        let messages = self.router.route(&outcome.emitted);
        let Ok(dispatch) = tokio::time::timeout_at(deadline, self.dispatcher.dispatch(&messages)).await
        else {
            return Err(self.abandon(scope, "dispatch"));
        };

        let narrated = match tokio::time::timeout_at(deadline, self.narrate(&outcome.emitted)).await {
            Ok(narrated) => narrated,
            Err(_) => {
                tracing::warn!(cadence = %scope.name, "Narrative dropped at cycle deadline");
                false
            }
        };

        let report = CycleReport {
            cadence: scope.name.clone(),
            snapshots: gathered.snapshots.len(),
            failed_sources: gathered.failures,
            candidates: candidate_count,
            emitted: outcome.emitted.len(),
            suppressed: outcome.suppressed.len(),
            dispatch,
            narrated,
        };

        tracing::info!(
            cadence = %report.cadence,
            snapshots = report.snapshots,
            candidates = report.candidates,
            emitted = report.emitted,
            suppressed = report.suppressed,
            delivered = report.dispatch.delivered.len(),
            failed = report.dispatch.failed.len(),
            "Cycle finished"
        );

        Ok(report)
    }

    fn abandon(&self, scope: &CycleScope, stage: &str) -> AlertError {
        tracing::warn!(
            cadence = %scope.name,
            stage,
            limit_secs = self.max_cycle.as_secs(),
            "Cycle abandoned"
        );
        AlertError::CycleTimeout(self.max_cycle.as_secs())
    }

    async fn gather(&self, scope: &CycleScope, now: DateTime<Utc>) -> Result<Gathered> {
        let outcome = self.reader.read().await?;
        let held = outcome.held_symbols();
        let mut failures = outcome.failures;

        let mut indicators = HashMap::new();
        if scope.positions {
            if let Some(prices) = &self.prices {
                indicators = self.indicators_for(prices.as_ref(), &held, now).await;
            }
        }

        let mut news = Vec::new();
        if scope.news {
            if let Some(source) = &self.news {
                match source.fetch().await {
                    Ok(items) => news = items.into_iter().map(keywords::prescore).collect(),
                    Err(e) => {
                        tracing::warn!(source = %source.name(), error = %e, "News source unavailable");
                        failures.push(SourceFailure {
                            source_id: source.name(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(Gathered {
            snapshots: outcome.snapshots,
            held,
            indicators,
            news,
            failures,
        })
    }

    /// Symbols missing from the result have no RSI signal this cycle
    async fn indicators_for(
        &self,
        prices: &dyn PriceHistorySource,
        held: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> HashMap<String, IndicatorSet> {
        let mut symbols: Vec<String> = held.iter().cloned().collect();
        symbols.sort();

        let history = match prices.closes(&symbols).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "Price history unavailable");
                return HashMap::new();
            }
        };

        let mut indicators = HashMap::with_capacity(history.len());
        for (symbol, closes) in history {
            match self.calculator.compute(&symbol, &closes, now) {
                Ok(set) => {
                    indicators.insert(symbol, set);
                }
                Err(e) => tracing::debug!(symbol = %symbol, error = %e, "No RSI signal"),
            }
        }
        indicators
    }

    async fn narrate(&self, emitted: &[AlertEvent]) -> bool {
        let (Some(narrator), Some(channel)) = (&self.narrator, &self.narrative_channel) else {
            return false;
        };
        if emitted.is_empty() {
            return false;
        }

        let summary = match narrator.summarize(emitted).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Narrative failed");
                return false;
            }
        };

        match self.transport.deliver(channel, &summary).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Narrative delivery failed");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dispatch::tests::RecordingTransport;
    use crate::model::{AlertCategory, Exchange, Sentiment};
    use crate::snapshot::PositionSource;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Position source that counts calls and optionally fails or stalls
    pub(crate) struct FakePositions {
        pub(crate) exchange: Exchange,
        pub(crate) records: Option<Vec<Value>>,
        pub(crate) delay: Option<std::time::Duration>,
        pub(crate) calls: AtomicUsize,
    }

    impl FakePositions {
        pub(crate) fn up(exchange: Exchange, records: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                exchange,
                records: Some(records),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn down(exchange: Exchange) -> Arc<Self> {
            Arc::new(Self {
                exchange,
                records: None,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PositionSource for FakePositions {
        fn exchange(&self) -> Exchange {
            self.exchange
        }

        async fn fetch_raw(&self) -> Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.records
                .clone()
                .ok_or_else(|| AlertError::source_unavailable(self.exchange.as_str(), "timed out"))
        }
    }

    struct FakePrices(HashMap<String, Vec<Decimal>>);

    #[async_trait]
    impl PriceHistorySource for FakePrices {
        async fn closes(&self, symbols: &[String]) -> Result<HashMap<String, Vec<Decimal>>> {
            Ok(symbols
                .iter()
                .filter_map(|s| self.0.get(s).map(|closes| (s.clone(), closes.clone())))
                .collect())
        }
    }

    struct FakeNews(Vec<NewsItem>);

    #[async_trait]
    impl NewsSource for FakeNews {
        async fn fetch(&self) -> Result<Vec<NewsItem>> {
            Ok(self.0.clone())
        }
    }

    struct FailingNarrator;

    #[async_trait]
    impl Narrator for FailingNarrator {
        async fn summarize(&self, _alerts: &[AlertEvent]) -> Result<String> {
            Err(AlertError::Narrative("model offline".into()))
        }
    }

    pub(crate) struct StalledNarrator;

    #[async_trait]
    impl Narrator for StalledNarrator {
        async fn summarize(&self, _alerts: &[AlertEvent]) -> Result<String> {
            std::future::pending().await
        }
    }

    /// Transport whose deliveries never complete
    struct StalledTransport;

    #[async_trait]
    impl NotificationTransport for StalledTransport {
        async fn deliver(&self, _channel: &ChannelId, _body: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    struct EchoNarrator;

    #[async_trait]
    impl Narrator for EchoNarrator {
        async fn summarize(&self, alerts: &[AlertEvent]) -> Result<String> {
            Ok(format!("{} alerts this cycle", alerts.len()))
        }
    }

    pub(crate) fn btc_long() -> Value {
        json!({"symbol": "BTC-USDT", "positionSide": "LONG", "positionAmt": "1",
               "avgPrice": "60000", "markPrice": "58000", "leverage": "1"})
    }

    fn eth_short_losing() -> Value {
        json!({"symbol": "ETH/USDT:USDT", "side": "short", "contracts": 2,
               "entryPrice": 3000, "markPrice": 3600, "stopLossPrice": 3700})
    }

    fn falling_closes() -> Vec<Decimal> {
        (0..20).map(|i| Decimal::from(70000 - i * 500)).collect()
    }

    pub(crate) fn pipeline(
        sources: Vec<Arc<dyn PositionSource>>,
        transport: Arc<RecordingTransport>,
    ) -> Pipeline {
        let config = crate::config::tests::sample();
        Pipeline::from_config(&config, SnapshotReader::new(sources), transport).unwrap()
    }

    fn categories(transport: &RecordingTransport) -> Vec<String> {
        transport.sent().into_iter().map(|(c, _)| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_btc_scenario_end_to_end() {
        let transport = Arc::new(RecordingTransport::default());
        let prices = FakePrices(HashMap::from([("BTC".to_string(), falling_closes())]));
        let pipeline = pipeline(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])], transport.clone())
            .with_price_history(Arc::new(prices));
        let mut dedup = Deduplicator::new(crate::dedup::CooldownPolicy::from_config(&crate::config::tests::sample()));

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("alerts")).await.unwrap();

        assert_eq!(report.snapshots, 1);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.emitted, 2);
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1.contains("**Oversold**"));
        assert!(sent[1].1.contains("**Missing Stop Loss**"));
        assert!(sent.iter().all(|(_, body)| !body.contains("Losing Trade")));
    }

    #[tokio::test]
    async fn test_one_source_down_cycle_completes() {
        let transport = Arc::new(RecordingTransport::default());
        let down = FakePositions::down(Exchange::Blofin);
        let sources: Vec<Arc<dyn PositionSource>> = vec![
            FakePositions::up(Exchange::BingX, vec![btc_long()]),
            down.clone(),
            FakePositions::up(Exchange::Kraken, vec![eth_short_losing()]),
        ];
        let pipeline = pipeline(sources, transport.clone());
        let mut dedup = Deduplicator::default();

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await.unwrap();

        assert_eq!(report.snapshots, 2);
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].source_id, "blofin");
        assert_eq!(down.calls(), 1);
        // BTC missing stop loss + ETH losing trade (portfolio and alpha)
        assert_eq!(report.emitted, 2);
        assert_eq!(categories(&transport), vec!["portfolio", "portfolio", "alpha"]);
        assert!(report.dispatch.is_clean());
    }

    #[tokio::test]
    async fn test_second_cycle_suppressed_within_window() {
        let transport = Arc::new(RecordingTransport::default());
        let pipeline = pipeline(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])], transport.clone());
        let mut dedup = Deduplicator::default();
        let scope = CycleScope::all("portfolio");
        let t0 = Utc::now();

        pipeline.run_cycle_at(&mut dedup, &scope, t0).await.unwrap();
        let again = pipeline
            .run_cycle_at(&mut dedup, &scope, t0 + chrono::Duration::minutes(10))
            .await
            .unwrap();
        assert_eq!(again.emitted, 0);
        assert_eq!(again.suppressed, 1);

        let later = pipeline
            .run_cycle_at(&mut dedup, &scope, t0 + chrono::Duration::minutes(61))
            .await
            .unwrap();
        assert_eq!(later.emitted, 1);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_down_marks_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let sources: Vec<Arc<dyn PositionSource>> = vec![
            FakePositions::down(Exchange::BingX),
            FakePositions::down(Exchange::Kraken),
        ];
        let pipeline = pipeline(sources, transport.clone());
        let mut dedup = Deduplicator::default();

        let result = pipeline.run_cycle(&mut dedup, &CycleScope::all("alerts")).await;
        assert!(matches!(result, Err(AlertError::AllSourcesUnavailable(2))));
        assert!(dedup.is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_cycle_is_abandoned() {
        let transport = Arc::new(RecordingTransport::default());
        let slow = Arc::new(FakePositions {
            exchange: Exchange::BingX,
            records: Some(vec![btc_long()]),
            delay: Some(std::time::Duration::from_secs(300)),
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(vec![slow], transport.clone());
        let mut dedup = Deduplicator::default();

        let result = pipeline.run_cycle(&mut dedup, &CycleScope::all("alerts")).await;
        assert!(matches!(result, Err(AlertError::CycleTimeout(120))));
        assert!(dedup.is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_alert_marked() {
        let transport = Arc::new(RecordingTransport::failing(&["portfolio"]));
        let pipeline = pipeline(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])], transport.clone());
        let mut dedup = Deduplicator::default();

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await.unwrap();
        assert_eq!(report.dispatch.failed.len(), 1);
        assert_eq!(dedup.len(), 1);
    }

    #[tokio::test]
    async fn test_news_only_scope_uses_holdings() {
        let transport = Arc::new(RecordingTransport::default());
        let news = FakeNews(vec![
            NewsItem::new("1", "BTC exchange hack").with_symbols(&["BTC"]).with_sentiment(Sentiment::Negative),
            NewsItem::new("2", "SOL mainnet upgrade and new listing").with_symbols(&["SOL"]),
        ]);
        let pipeline = pipeline(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])], transport.clone())
            .with_news(Arc::new(news));
        let mut dedup = Deduplicator::default();
        let scope = CycleScope { name: "opportunity_scan".into(), positions: false, news: true };

        let report = pipeline.run_cycle(&mut dedup, &scope).await.unwrap();

        // risk_warning -> portfolio, alpha; opportunity (keyword-scored) -> alpha
        assert_eq!(report.emitted, 2);
        assert_eq!(categories(&transport), vec!["portfolio", "alpha", "alpha"]);
        let keys: Vec<AlertCategory> = AlertCategory::ALL
            .into_iter()
            .filter(|c| dedup.should_emit(&AlertEvent::new(*c, "BTC", "", Utc::now()), Utc::now()))
            .collect();
        assert!(!keys.contains(&AlertCategory::RiskWarning));
        assert!(keys.contains(&AlertCategory::MissingStopLoss));
    }

    #[tokio::test]
    async fn test_narrative_failure_does_not_affect_alerts() {
        let mut config = crate::config::tests::sample();
        config.pipeline.narrative_channel = Some(ChannelId::new("alpha"));
        let transport = Arc::new(RecordingTransport::default());
        let reader = SnapshotReader::new(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])]);
        let pipeline = Pipeline::from_config(&config, reader, transport.clone())
            .unwrap()
            .with_narrator(Arc::new(FailingNarrator));
        let mut dedup = Deduplicator::default();

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await.unwrap();
        assert!(!report.narrated);
        assert_eq!(report.dispatch.delivered.len(), 1);
        assert_eq!(dedup.len(), 1);
    }

    #[tokio::test]
    async fn test_narrative_sent_after_alerts() {
        let mut config = crate::config::tests::sample();
        config.pipeline.narrative_channel = Some(ChannelId::new("alpha"));
        let transport = Arc::new(RecordingTransport::default());
        let reader = SnapshotReader::new(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])]);
        let pipeline = Pipeline::from_config(&config, reader, transport.clone())
            .unwrap()
            .with_narrator(Arc::new(EchoNarrator));
        let mut dedup = Deduplicator::default();

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await.unwrap();
        assert!(report.narrated);
        let sent = transport.sent();
        assert_eq!(sent.last().unwrap(), &(ChannelId::new("alpha"), "1 alerts this cycle".to_string()));
    }

    #[tokio::test]
    async fn test_insufficient_history_skips_rsi_rules() {
        let transport = Arc::new(RecordingTransport::default());
        let prices = FakePrices(HashMap::from([("BTC".to_string(), vec![dec!(1), dec!(2)])]));
        let pipeline = pipeline(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])], transport)
            .with_price_history(Arc::new(prices));
        let mut dedup = Deduplicator::default();

        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("alerts")).await.unwrap();
        // only missing_stop_loss
        assert_eq!(report.candidates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_narration_dropped_at_deadline() {
        let mut config = crate::config::tests::sample();
        config.pipeline.narrative_channel = Some(ChannelId::new("alpha"));
        let transport = Arc::new(RecordingTransport::default());
        let reader = SnapshotReader::new(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])]);
        let pipeline = Pipeline::from_config(&config, reader, transport.clone())
            .unwrap()
            .with_narrator(Arc::new(StalledNarrator))
            .with_max_cycle(std::time::Duration::from_secs(30));
        let mut dedup = Deduplicator::default();

        let started = tokio::time::Instant::now();
        let report = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await.unwrap();

        assert!(started.elapsed() <= std::time::Duration::from_secs(31));
        assert!(!report.narrated);
        assert_eq!(report.dispatch.delivered.len(), 1);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_dispatch_abandons_cycle_with_alerts_marked() {
        let reader = SnapshotReader::new(vec![FakePositions::up(Exchange::BingX, vec![btc_long()])]);
        let pipeline = Pipeline::from_config(&crate::config::tests::sample(), reader, Arc::new(StalledTransport))
            .unwrap()
            .with_max_cycle(std::time::Duration::from_secs(30));
        let mut dedup = Deduplicator::default();

        let result = pipeline.run_cycle(&mut dedup, &CycleScope::all("portfolio")).await;

        assert!(matches!(result, Err(AlertError::CycleTimeout(30))));
        assert_eq!(dedup.len(), 1);
    }
}
