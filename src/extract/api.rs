use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ApiRules, SourceConfig};
use crate::extract::Extractor;
use crate::filter::DateCutoff;
use crate::models::PermitRecord;
use crate::normalize::normalize;
use crate::resolve::resolve;
use crate::utils::http::{fetch_with_retry, FetchRequest, RetryPolicy};

/// Extracts records from a JSON API source: fetches one payload, walks to
/// the list node via `list_path`, and maps each item through the source's
/// field dictionary.
pub struct ApiExtractor<'a> {
    source: &'a SourceConfig,
    rules: &'a ApiRules,
    policy: RetryPolicy,
}

impl<'a> ApiExtractor<'a> {
    pub fn new(source: &'a SourceConfig, rules: &'a ApiRules) -> Self {
        Self {
            source,
            rules,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl Extractor for ApiExtractor<'_> {
    async fn extract(&self, client: &Client, cutoff: &DateCutoff) -> Result<Vec<PermitRecord>> {
        let Some(url) = self.source.url.as_deref() else {
            warn!("[{}] api source has no url, skipping", self.source.name);
            return Ok(Vec::new());
        };

        let request = FetchRequest {
            url,
            method: self.rules.method,
            headers: &self.source.headers,
            params: &self.source.params,
            json: self.rules.json.as_ref(),
        };
        let response = fetch_with_retry(client, &request, &self.policy)
            .await
            .with_context(|| format!("[{}] fetch failed", self.source.name))?;
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("[{}] response is not valid JSON", self.source.name))?;

        let records = map_items(&body, self.rules, &self.source.name, cutoff);
        info!("[{}] extracted {} records", self.source.name, records.len());
        Ok(records)
    }
}

/// Resolves `list_path`, coercing a lone object into a one-element list,
/// then normalizes every object item. Non-object items are skipped.
fn map_items(body: &Value, rules: &ApiRules, source_name: &str, cutoff: &DateCutoff) -> Vec<PermitRecord> {
    let items: Vec<&Value> = match resolve(body, &rules.list_path) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    let mut records = Vec::new();
    for item in items {
        if !item.is_object() {
            debug!("[{}] skipping non-object item", source_name);
            continue;
        }
        let fields = map_item(item, &rules.mapping);
        let record = normalize(&fields, source_name);
        if cutoff.keeps(&record) {
            records.push(record);
        }
    }
    records
}

/// Resolves every mapping entry's dotted path against one item.
fn map_item(item: &Value, mapping: &HashMap<String, String>) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    for (canonical, path) in mapping {
        if let Some(value) = resolve(item, path) {
            fields.insert(canonical.clone(), value.clone());
        }
    }
    fields
}
