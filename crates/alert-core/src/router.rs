//! Channel Router
//!
//! Maps each alert to its bound channels and renders one message per
//! channel. Formatting only; no I/O.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::config::{AlertConfig, MessageFormat};
use crate::error::Result;
use crate::model::{AlertCategory, AlertEvent, ChannelId};

/// One rendered message bound for one channel
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundMessage {
    pub channel: ChannelId,
    pub alert_id: Uuid,
    pub category: AlertCategory,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Debug)]
pub struct Router {
    bindings: BTreeMap<AlertCategory, Vec<ChannelId>>,
    formats: HashMap<ChannelId, MessageFormat>,
}

impl Router {
    pub fn new(
        bindings: BTreeMap<AlertCategory, Vec<ChannelId>>,
        formats: HashMap<ChannelId, MessageFormat>,
    ) -> Self {
        Self { bindings, formats }
    }

    pub fn from_config(config: &AlertConfig) -> Result<Self> {
        let formats = config
            .channels
            .iter()
            .map(|c| (c.id.clone(), c.format))
            .collect();
        Ok(Self::new(config.typed_bindings()?, formats))
    }

    /// Destinations for a category, in binding order
    pub fn channels_for(&self, category: AlertCategory) -> &[ChannelId] {
        self.bindings
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn format_for(&self, channel: &ChannelId) -> MessageFormat {
        self.formats.get(channel).copied().unwrap_or_default()
    }

    /// Alerts in input order, each fanned out over its channels in binding order
    pub fn route(&self, events: &[AlertEvent]) -> Vec<OutboundMessage> {
        events
            .iter()
            .flat_map(|event| {
                self.channels_for(event.category)
                    .iter()
                    .map(move |channel| OutboundMessage {
                        channel: channel.clone(),
                        alert_id: event.id,
                        category: event.category,
                        subject: event.subject.clone(),
                        body: render(event, self.format_for(channel)),
                    })
            })
            .collect()
    }
}

pub fn render(event: &AlertEvent, format: MessageFormat) -> String {
    match format {
        MessageFormat::Detailed => render_detailed(event),
        MessageFormat::Compact => render_compact(event),
    }
}

fn render_detailed(event: &AlertEvent) -> String {
    let mut lines = vec![
        format!(
            "{} **{}** | {}",
            event.category.emoji(),
            event.category.title(),
            event.subject
        ),
        event.message.clone(),
    ];

    let mut footer = format!("Severity: {}", event.severity.as_str().to_uppercase());
    if let Some(exchange) = event.exchange {
        footer.push_str(&format!(" | Exchange: {exchange}"));
    }
    footer.push_str(&format!(
        " | {}",
        event.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(footer);

    lines.join("\n")
}

fn render_compact(event: &AlertEvent) -> String {
    let message = event.message.lines().next().unwrap_or_default();
    format!(
        "{} [{}] {}: {}",
        event.category.emoji(),
        event.severity.as_str().to_uppercase(),
        event.subject,
        message
    )
}
