//! # alert-core
//!
//! Rule-based alert engine for a personal crypto trading book: open
//! positions and pre-scored news go in, deduplicated and formatted channel
//! messages come out.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────┐
//! │ Snapshot     │──►│ Indicator │──►│ Classifier │──►│ Deduplicator │
//! │ Reader (N×)  │   │ (RSI)     │   │ (rules)    │   │ (cool-down)  │
//! └──────────────┘   └───────────┘   └────────────┘   └──────┬───────┘
//!        ▲                                 ▲                  │
//!   PositionSource                    NewsSource              ▼
//!                                                     ┌──────────────┐
//!                     NotificationTransport ◄─────────│ Router +     │
//!                                                     │ Dispatcher   │
//!                                                     └──────────────┘
//! ```
//!
//! ## Principles
//!
//! - **Rules are data** - ordered `(category, predicate)` tables, evaluated uniformly
//! - **Severity is fixed per category** - never computed from the numbers
//! - **Mark before send** - dedup state is updated before any delivery starts
//! - **Isolate failures** - one source, one news item or one channel never sinks a cycle

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod indicator;
pub mod keywords;
pub mod model;
pub mod narrative;
pub mod pipeline;
pub mod router;
pub mod scheduler;
pub mod snapshot;

pub use classifier::Classifier;
pub use config::{AlertConfig, ChannelConfig, MessageFormat, ScheduleConfig, Thresholds};
pub use dedup::{CooldownPolicy, Deduplicator};
pub use dispatch::{DispatchReport, Dispatcher, NotificationTransport};
pub use error::{AlertError, Result};
pub use indicator::IndicatorCalculator;
pub use model::{
    AlertCategory, AlertEvent, ChannelId, Exchange, IndicatorSet, NewsItem, PositionSnapshot,
    Sentiment, Severity, Side,
};
pub use narrative::Narrator;
pub use pipeline::{CycleReport, CycleScope, NewsSource, Pipeline, PriceHistorySource};
pub use router::{OutboundMessage, Router};
pub use scheduler::Scheduler;
pub use snapshot::{PositionSource, SnapshotReader};
