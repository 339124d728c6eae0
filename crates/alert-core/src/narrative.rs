//! Optional narrative summary of a cycle's emitted alerts.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::AlertEvent;

/// Turns a batch of emitted alerts into a short human summary (LLM or otherwise)
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn summarize(&self, alerts: &[AlertEvent]) -> Result<String>;
}

/// Plain listing of the alert lines, for use without an LLM
pub fn digest(alerts: &[AlertEvent]) -> String {
    alerts
        .iter()
        .map(|a| {
            format!(
                "- [{}] {} {}: {}",
                a.severity.as_str().to_uppercase(),
                a.category.title(),
                a.subject,
                a.message.lines().next().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
