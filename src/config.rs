use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Run configuration, loaded once from a YAML file and read-only thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_days_back")]
    pub days_back: i64,
    #[serde(default = "default_output_csv")]
    pub output_csv: String,
    #[serde(default)]
    pub geocode: GeocodeConfig,
    #[serde(default)]
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// The outbound payload is also written here for inspection, whether or
    /// not the push itself is enabled.
    #[serde(default = "default_payload_path")]
    pub payload_path: String,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            payload_path: default_payload_path(),
        }
    }
}

/// One upstream data origin and the rules for extracting records from it.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(flatten)]
    pub rules: SourceRules,
}

/// Mode-specific extraction rules, tagged by the `mode` key so each source
/// only carries the fields valid for its mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SourceRules {
    Api(ApiRules),
    Html(HtmlRules),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRules {
    /// Dotted path to the record list within the response body.
    /// Empty means the body itself is the list.
    #[serde(default)]
    pub list_path: String,
    /// Canonical field name -> dotted path within each item.
    #[serde(default)]
    pub mapping: HashMap<String, String>,
    #[serde(default)]
    pub method: HttpMethod,
    /// Optional JSON request body, sent for POST sources.
    #[serde(default)]
    pub json: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlRules {
    /// CSS selector matching one element per record row.
    #[serde(default)]
    pub row_selector: Option<String>,
    /// Canonical field name -> selector scoped to the row, optionally
    /// suffixed with `::text` or `::attr(name)`.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

fn default_days_back() -> i64 {
    30
}

fn default_output_csv() -> String {
    "permits.csv".to_string()
}

fn default_payload_path() -> String {
    "airtable_payload.json".to_string()
}

/// Raw document shape: sources are deserialized per-entry so one malformed
/// source (for example an unrecognized `mode`) is skipped with a warning
/// instead of failing the whole load.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_days_back")]
    days_back: i64,
    #[serde(default = "default_output_csv")]
    output_csv: String,
    #[serde(default)]
    geocode: GeocodeConfig,
    #[serde(default)]
    airtable: AirtableConfig,
    #[serde(default)]
    sources: Vec<serde_yaml::Value>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawConfig =
            serde_yaml::from_str(content).context("Failed to parse config file")?;

        let mut sources = Vec::with_capacity(raw.sources.len());
        for value in raw.sources {
            let name = value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            match serde_yaml::from_value::<SourceConfig>(value) {
                Ok(source) => sources.push(source),
                Err(e) => warn!("Skipping source '{}': {}", name, e),
            }
        }

        Ok(Config {
            days_back: raw.days_back.max(0),
            output_csv: raw.output_csv,
            geocode: raw.geocode,
            airtable: raw.airtable,
            sources,
        })
    }
}
