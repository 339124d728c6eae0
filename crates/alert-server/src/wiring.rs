//! Collaborator wiring

use std::sync::Arc;

use alert_core::{
    CooldownPolicy, Deduplicator, Exchange, Pipeline, PositionSource, Scheduler, SnapshotReader,
};
use alert_runtime::{
    DiscordWebhookTransport, JsonFileNewsSource, JsonFilePositionSource, JsonFilePriceHistory,
    StaticPositionSource,
};
use anyhow::{Context, Result};

use crate::settings::ServerConfig;

fn position_sources(settings: &ServerConfig) -> Vec<Arc<dyn PositionSource>> {
    if settings.sources.demo {
        return Exchange::ALL
            .into_iter()
            .map(|e| Arc::new(StaticPositionSource::demo(e)) as Arc<dyn PositionSource>)
            .collect();
    }

    settings
        .sources
        .positions
        .iter()
        .map(|p| Arc::new(JsonFilePositionSource::new(p.exchange, &p.path)) as Arc<dyn PositionSource>)
        .collect()
}

pub fn build_scheduler(settings: &ServerConfig) -> Result<Scheduler> {
    let config = &settings.alerts;

    let transport = DiscordWebhookTransport::from_env(&config.channels)
        .context("Every channel needs a valid webhook URL")?;
    for channel in transport.channels() {
        tracing::info!(channel = %channel, "✓ Discord webhook configured");
    }

    let sources = position_sources(settings);
    if sources.is_empty() {
        tracing::warn!("⚠ No position sources configured - only news rules can fire");
    }
    for source in &sources {
        tracing::info!(source = %source.name(), "Position source");
    }

    let mut pipeline = Pipeline::from_config(config, SnapshotReader::new(sources), Arc::new(transport))?;

    if let Some(path) = &settings.sources.price_history_path {
        pipeline = pipeline.with_price_history(Arc::new(JsonFilePriceHistory::new(path)));
    } else {
        tracing::warn!("⚠ No price history configured - RSI rules disabled");
    }

    if let Some(path) = &settings.sources.news_path {
        pipeline = pipeline.with_news(Arc::new(JsonFileNewsSource::new(path)));
    }

    if settings.narrative.enabled {
        pipeline = with_narrator(pipeline, settings)?;
    }

    let dedup = Deduplicator::new(CooldownPolicy::from_config(config));
    Ok(Scheduler::new(pipeline, dedup, config.schedule.clone()))
}

#[cfg(feature = "ollama")]
fn with_narrator(pipeline: Pipeline, settings: &ServerConfig) -> Result<Pipeline> {
    use alert_runtime::{OllamaConfig, OllamaNarrator};

    let mut ollama = OllamaConfig::from_env();
    if let Some(model) = &settings.narrative.model {
        ollama = ollama.with_model(model.clone());
    }
    let (host, port) = (ollama.host.clone(), ollama.port);
    let narrator = OllamaNarrator::from_config(ollama).context("Ollama narrator is misconfigured")?;
    tracing::info!(host = %host, port, model = %narrator.model(), "✓ Ollama narrator enabled");
    Ok(pipeline.with_narrator(Arc::new(narrator)))
}

#[cfg(not(feature = "ollama"))]
fn with_narrator(pipeline: Pipeline, _settings: &ServerConfig) -> Result<Pipeline> {
    tracing::warn!("⚠ Narrative enabled but built without the `ollama` feature");
    Ok(pipeline)
}
