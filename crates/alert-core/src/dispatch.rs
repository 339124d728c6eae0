//! Dispatcher
//!
//! Delivers routed messages through a [`NotificationTransport`]. Every
//! delivery is independent and returns its own outcome; a failed channel
//! never stops the rest.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use uuid::Uuid;

use crate::error::Result;
use crate::model::ChannelId;
use crate::router::OutboundMessage;

/// Outbound notification endpoint (Discord webhook, chat bot, ...)
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, channel: &ChannelId, message: &str) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivered {
    pub channel: ChannelId,
    pub alert_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub channel: ChannelId,
    pub alert_id: Uuid,
    pub reason: String,
}

/// Aggregated outcome of one dispatch, in input order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<Delivered>,
    pub failed: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Dispatcher {
    transport: Arc<dyn NotificationTransport>,
    concurrent: bool,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            concurrent: false,
        }
    }

    /// Issue deliveries concurrently. Results are still reported in input order.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub async fn dispatch(&self, messages: &[OutboundMessage]) -> DispatchReport {
        let outcomes = if self.concurrent {
            join_all(messages.iter().map(|m| self.deliver_one(m))).await
        } else {
            let mut outcomes = Vec::with_capacity(messages.len());
            for message in messages {
                outcomes.push(self.deliver_one(message).await);
            }
            outcomes
        };

        let mut report = DispatchReport::default();
        for (message, outcome) in messages.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered.push(Delivered {
                    channel: message.channel.clone(),
                    alert_id: message.alert_id,
                }),
                Err(reason) => report.failed.push(DeliveryFailure {
                    channel: message.channel.clone(),
                    alert_id: message.alert_id,
                    reason,
                }),
            }
        }
        report
    }

    async fn deliver_one(&self, message: &OutboundMessage) -> std::result::Result<(), String> {
        match self.transport.deliver(&message.channel, &message.body).await {
            Ok(()) => {
                tracing::debug!(channel = %message.channel, alert_id = %message.alert_id, "Delivered");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    channel = %message.channel,
                    alert_id = %message.alert_id,
                    category = %message.category,
                    error = %e,
                    "Delivery failed"
                );
                Err(e.to_string())
            }
        }
    }
}
