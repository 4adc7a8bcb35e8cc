use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{HtmlRules, SourceConfig};
use crate::extract::Extractor;
use crate::filter::DateCutoff;
use crate::models::PermitRecord;
use crate::normalize::{normalize, normalize_whitespace};
use crate::utils::http::{fetch_with_retry, FetchRequest, RetryPolicy};

/// Extracts records from an HTML table/listing source: selects repeating row
/// elements via `row_selector`, then pulls each field out of the row with a
/// sub-selector.
pub struct HtmlExtractor<'a> {
    source: &'a SourceConfig,
    rules: &'a HtmlRules,
    policy: RetryPolicy,
}

impl<'a> HtmlExtractor<'a> {
    pub fn new(source: &'a SourceConfig, rules: &'a HtmlRules) -> Self {
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
impl Extractor for HtmlExtractor<'_> {
    async fn extract(&self, client: &Client, cutoff: &DateCutoff) -> Result<Vec<PermitRecord>> {
        let Some(url) = self.source.url.as_deref() else {
            warn!("[{}] html source has no url, skipping", self.source.name);
            return Ok(Vec::new());
        };
        let Some(row_selector) = self.rules.row_selector.as_deref() else {
            warn!("[{}] html source has no row_selector, skipping", self.source.name);
            return Ok(Vec::new());
        };

        let request = FetchRequest::get(url, &self.source.headers, &self.source.params);
        let response = fetch_with_retry(client, &request, &self.policy)
            .await
            .with_context(|| format!("[{}] fetch failed", self.source.name))?;
        let html = response
            .text()
            .await
            .with_context(|| format!("[{}] failed to read response body", self.source.name))?;

        let records = parse_rows(&html, row_selector, &self.rules.fields, &self.source.name, cutoff);
        info!("[{}] extracted {} records", self.source.name, records.len());
        Ok(records)
    }
}

/// The target a field selector extracts from its matched elements.
enum FieldTarget {
    Text,
    Attr(String),
}

/// Splits a parsel-style field selector into its CSS part and target:
/// `td.num::text` selects text (the default), `a::attr(href)` an attribute.
fn split_field_selector(selector: &str) -> (&str, FieldTarget) {
    if let Some(css) = selector.strip_suffix("::text") {
        return (css, FieldTarget::Text);
    }
    if let Some(idx) = selector.find("::attr(") {
        let rest = &selector[idx + "::attr(".len()..];
        if let Some(name) = rest.strip_suffix(')') {
            return (&selector[..idx], FieldTarget::Attr(name.to_string()));
        }
    }
    (selector, FieldTarget::Text)
}

/// Evaluates one field selector scoped to a row, concatenating all matched
/// fragments with single spaces. No matches (or an invalid selector) yield
/// an empty string, never an error.
fn extract_field(row: ElementRef<'_>, selector: &str) -> String {
    let (css, target) = split_field_selector(selector);
    let Ok(parsed) = Selector::parse(css) else {
        warn!("Invalid field selector '{}'", css);
        return String::new();
    };
    let mut fragments = Vec::new();
    for element in row.select(&parsed) {
        match &target {
            FieldTarget::Text => fragments.extend(element.text().map(str::to_string)),
            FieldTarget::Attr(name) => {
                if let Some(value) = element.value().attr(name) {
                    fragments.push(value.to_string());
                }
            }
        }
    }
    normalize_whitespace(&fragments.join(" "))
}

fn parse_rows(
    html: &str,
    row_selector: &str,
    fields: &HashMap<String, String>,
    source_name: &str,
    cutoff: &DateCutoff,
) -> Vec<PermitRecord> {
    let Ok(rows) = Selector::parse(row_selector) else {
        warn!("[{}] invalid row_selector '{}'", source_name, row_selector);
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    for row in document.select(&rows) {
        let mut values = HashMap::new();
        for (canonical, selector) in fields {
            values.insert(canonical.clone(), Value::String(extract_field(row, selector)));
        }
        let record = normalize(&values, source_name);
        if cutoff.keeps(&record) {
            records.push(record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fields() -> HashMap<String, String> {
        [
            ("permit_number".to_string(), "td:nth-child(1)::text".to_string()),
            ("issue_date".to_string(), "td:nth-child(2)::text".to_string()),
            ("address".to_string(), "td:nth-child(3)::text".to_string()),
        ]
        .into()
    }

    fn today() -> String {
        Utc::now().date_naive().format("%Y-%m-%d").to_string()
    }

    #[test]
    fn parses_matching_rows() {
        let html = format!(
            r#"<table id="permits">
                <tr class="data"><td>P001</td><td>{}</td><td>123 Main St</td></tr>
            </table>"#,
            today()
        );
        let records = parse_rows(
            &html,
            "table#permits tr.data",
            &fields(),
            "html",
            &DateCutoff::days_back(30),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].permit_number, "P001");
        assert_eq!(records[0].address, "123 Main St");
        assert_eq!(records[0].issue_date.as_deref(), Some(today().as_str()));
    }

    #[test]
    fn zero_matching_rows_is_empty_not_error() {
        let records = parse_rows(
            "<html><body><p>nothing here</p></body></html>",
            "table#permits tr.data",
            &fields(),
            "html",
            &DateCutoff::days_back(30),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn unmatched_field_selector_yields_empty_string() {
        let html = r#"<ul><li class="row"><span class="num">P9</span></li></ul>"#;
        let fields: HashMap<String, String> = [
            ("permit_number".to_string(), ".num::text".to_string()),
            ("address".to_string(), ".missing::text".to_string()),
        ]
        .into();
        let records = parse_rows(html, "li.row", &fields, "html", &DateCutoff::days_back(30));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].permit_number, "P9");
        assert_eq!(records[0].address, "");
    }

    #[test]
    fn attribute_selector_extracts_attribute() {
        let html = r#"<div class="row"><a href="/permits/42">details</a></div>"#;
        let fields: HashMap<String, String> =
            [("permit_number".to_string(), "a::attr(href)".to_string())].into();
        let records = parse_rows(html, "div.row", &fields, "html", &DateCutoff::days_back(30));
        assert_eq!(records[0].permit_number, "/permits/42");
    }

    #[test]
    fn fragments_join_with_single_spaces() {
        let html = r#"<div class="row"><span class="addr"> 123 <b>Main</b>
            St </span></div>"#;
        let fields: HashMap<String, String> =
            [("address".to_string(), ".addr".to_string())].into();
        let records = parse_rows(html, "div.row", &fields, "html", &DateCutoff::days_back(30));
        assert_eq!(records[0].address, "123 Main St");
    }

    #[test]
    fn invalid_row_selector_is_empty_not_error() {
        let records = parse_rows(
            "<table></table>",
            ":::not-a-selector",
            &fields(),
            "html",
            &DateCutoff::days_back(30),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn split_selector_variants() {
        assert!(matches!(split_field_selector("td.x"), ("td.x", FieldTarget::Text)));
        assert!(matches!(split_field_selector("td.x::text"), ("td.x", FieldTarget::Text)));
        match split_field_selector("a::attr(href)") {
            ("a", FieldTarget::Attr(name)) => assert_eq!(name, "href"),
            other => panic!("unexpected split: {:?}", other.0),
        }
    }
}
