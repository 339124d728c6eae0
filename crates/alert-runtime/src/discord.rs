//! Discord Webhook Transport
//!
//! Delivers channel messages by POSTing to per-channel Discord webhook URLs.

use std::collections::HashMap;
use std::time::Duration;

use alert_core::{AlertError, ChannelConfig, ChannelId, NotificationTransport};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::{Result, RuntimeError};

/// Discord's per-message content limit, in characters
pub const DISCORD_CONTENT_LIMIT: usize = 2000;

pub const DEFAULT_USERNAME: &str = "Trade Alerts";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    username: &'a str,
}

pub struct DiscordWebhookTransport {
    client: Client,
    webhooks: HashMap<ChannelId, Url>,
    username: String,
}

impl DiscordWebhookTransport {
    pub fn new(webhooks: HashMap<ChannelId, Url>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, webhooks))
    }

    pub fn with_client(client: Client, webhooks: HashMap<ChannelId, Url>) -> Self {
        Self {
            client,
            webhooks,
            username: DEFAULT_USERNAME.into(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Resolve each channel's webhook from the environment.
    ///
    /// Every channel must resolve to an http(s) URL; the variable defaults to
    /// `DISCORD_WEBHOOK_<ID>` when `webhook_env` is not given.
    pub fn from_env(channels: &[ChannelConfig]) -> Result<Self> {
        Self::new(resolve_webhooks(channels, |name| std::env::var(name).ok())?)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.webhooks.keys()
    }

    async fn post(&self, url: &Url, content: &str) -> Result<()> {
        let content = truncate_content(content, DISCORD_CONTENT_LIMIT);
        let payload = WebhookPayload {
            content: &content,
            username: &self.username,
        };

        let response = self.client.post(url.clone()).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationTransport for DiscordWebhookTransport {
    async fn deliver(&self, channel: &ChannelId, message: &str) -> alert_core::Result<()> {
        let url = self
            .webhooks
            .get(channel)
            .ok_or_else(|| AlertError::delivery(channel.as_str(), RuntimeError::UnknownChannel(channel.to_string())))?;

        self.post(url, message)
            .await
            .map_err(|e| AlertError::delivery(channel.as_str(), e))
    }
}

/// Environment variable a channel's webhook is read from
pub fn webhook_env_name(channel: &ChannelConfig) -> String {
    channel.webhook_env.clone().unwrap_or_else(|| {
        format!(
            "DISCORD_WEBHOOK_{}",
            channel.id.as_str().to_uppercase().replace(['-', ' ', '.'], "_")
        )
    })
}

pub fn resolve_webhooks<F>(channels: &[ChannelConfig], lookup: F) -> Result<HashMap<ChannelId, Url>>
where
    F: Fn(&str) -> Option<String>,
{
    channels
        .iter()
        .map(|channel| -> Result<(ChannelId, Url)> {
            let var = webhook_env_name(channel);
            let raw = lookup(&var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(RuntimeError::MissingEnv(var))?;
            Ok((channel.id.clone(), parse_webhook(channel.id.as_str(), raw.trim())?))
        })
        .collect()
}

fn parse_webhook(channel: &str, raw: &str) -> Result<Url> {
    let invalid = |reason: String| RuntimeError::InvalidUrl {
        channel: channel.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let scheme = url.scheme().to_string();
    if !matches!(scheme.as_str(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{scheme}'")));
    }
    if url.host().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(url)
}

/// Cut `content` to at most `limit` characters, ending in an ellipsis when cut
pub fn truncate_content(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
