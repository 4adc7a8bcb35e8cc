use reqwest::Client;
use tracing::{error, info};

use crate::config::{Config, SourceRules};
use crate::extract::{ApiExtractor, Extractor, HtmlExtractor};
use crate::filter::{dedupe, DateCutoff};
use crate::models::PermitRecord;
use crate::utils::http::RetryPolicy;

/// Per-source outcome, reported after the run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub count: usize,
    pub failed: bool,
}

/// Processes every configured source in order, one at a time, aggregating
/// all surviving records. A source failure is logged and contributes zero
/// records; the run continues. The returned set is already deduplicated by
/// hash identity (first-seen representative wins).
pub async fn run_sources(
    client: &Client,
    config: &Config,
    policy: RetryPolicy,
) -> (Vec<PermitRecord>, Vec<SourceReport>) {
    let cutoff = DateCutoff::days_back(config.days_back);
    let mut all_records = Vec::new();
    let mut reports = Vec::new();

    for source in &config.sources {
        let mode = match &source.rules {
            SourceRules::Api(_) => "api",
            SourceRules::Html(_) => "html",
        };
        info!("[{}] mode={}", source.name, mode);

        let result = match &source.rules {
            SourceRules::Api(rules) => {
                ApiExtractor::new(source, rules)
                    .with_policy(policy)
                    .extract(client, &cutoff)
                    .await
            }
            SourceRules::Html(rules) => {
                HtmlExtractor::new(source, rules)
                    .with_policy(policy)
                    .extract(client, &cutoff)
                    .await
            }
        };

        match result {
            Ok(records) => {
                reports.push(SourceReport {
                    name: source.name.clone(),
                    count: records.len(),
                    failed: false,
                });
                all_records.extend(records);
            }
            Err(e) => {
                error!("[{}] source failed: {:#}", source.name, e);
                reports.push(SourceReport {
                    name: source.name.clone(),
                    count: 0,
                    failed: true,
                });
            }
        }
    }

    let total = all_records.len();
    let deduped = dedupe(all_records);
    if deduped.len() < total {
        info!("Dropped {} duplicate records", total - deduped.len());
    }
    (deduped, reports)
}
