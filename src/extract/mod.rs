use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::filter::DateCutoff;
use crate::models::PermitRecord;

mod api;
mod html;

pub use api::ApiExtractor;
pub use html::HtmlExtractor;

/// One extraction strategy bound to a configured source.
///
/// Implementations return an `Err` only for source-level failures (transport
/// error, bad status, malformed body); in that case none of the source's
/// records survive. Misconfiguration (missing URL or selector) is a warning
/// and an empty result, so one bad source never aborts the run.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, client: &Client, cutoff: &DateCutoff) -> Result<Vec<PermitRecord>>;
}
