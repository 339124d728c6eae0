//! # alert-runtime
//!
//! Concrete collaborators for the alert-core pipeline.
//!
//! ## Collaborators
//!
//! - **Discord** - webhook delivery per channel (`NotificationTransport`)
//! - **JSON files** - pre-fetched position, price-history and news exports
//! - **Static** - fixed demo positions for each exchange
//! - **Ollama** (default feature) - local LLM narrative summaries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use alert_runtime::{DiscordWebhookTransport, JsonFilePositionSource};
//!
//! let transport = DiscordWebhookTransport::from_env(&config.channels)?;
//! let reader = SnapshotReader::new(vec![
//!     Arc::new(JsonFilePositionSource::new(Exchange::BingX, "data/bingx.json")),
//! ]);
//! let pipeline = Pipeline::from_config(&config, reader, Arc::new(transport))?;
//! ```

pub mod discord;
pub mod error;
pub mod sources;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use discord::DiscordWebhookTransport;
pub use error::{Result, RuntimeError};
pub use sources::{
    JsonFileNewsSource, JsonFilePositionSource, JsonFilePriceHistory, StaticPositionSource,
};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaNarrator};
