use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::config::AirtableConfig;
use crate::models::PermitRecord;

/// Pushes the final record set to the configured record-store webhook as
/// `{"records": [...]}`.
///
/// A missing webhook URL is a no-op with a warning, not an error. A failed
/// send is reported as an error by the caller but never affects the file
/// outputs, which are written before any push is attempted.
pub async fn push_records(
    client: &Client,
    config: &AirtableConfig,
    records: &[PermitRecord],
) -> Result<()> {
    let Some(webhook_url) = config.webhook_url.as_deref().filter(|u| !u.is_empty()) else {
        warn!("Airtable webhook_url not set, skipping push");
        return Ok(());
    };

    let payload = json!({ "records": records });
    let response = client
        .post(webhook_url)
        .json(&payload)
        .send()
        .await
        .context("Failed to send webhook request")?;

    let status = response.status();
    if status.is_success() {
        info!("Pushed {} records to webhook", records.len());
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(anyhow::anyhow!("Webhook push failed: {} - {}", status, body))
    }
}
