use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::HttpMethod;

const USER_AGENT: &str = "PermitScraper/1.0";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Retry behavior for a single fetch: bounded attempts, exponential backoff
/// with jitter. Applies only to the network call, never to parsing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No retries, no sleeping. Used by tests and one-shot pushes.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1 << attempt.min(10));
        let jitter = self.max_jitter.mul_f64(rand::random::<f64>());
        backoff + jitter
    }
}

pub fn create_client() -> Result<Client, FetchError> {
    let client = ClientBuilder::new()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Describes one upstream request; rebuilt fresh for every attempt.
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub method: HttpMethod,
    pub headers: &'a HashMap<String, String>,
    pub params: &'a HashMap<String, String>,
    pub json: Option<&'a serde_json::Value>,
}

impl<'a> FetchRequest<'a> {
    pub fn get(url: &'a str, headers: &'a HashMap<String, String>, params: &'a HashMap<String, String>) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            headers,
            params,
            json: None,
        }
    }

    fn build(&self, client: &Client) -> reqwest::RequestBuilder {
        let mut builder = match self.method {
            HttpMethod::Get => client.get(self.url),
            HttpMethod::Post => client.post(self.url),
        };
        for (key, value) in self.headers {
            builder = builder.header(key, value);
        }
        if !self.params.is_empty() {
            builder = builder.query(self.params);
        }
        if let Some(body) = self.json {
            builder = builder.json(body);
        }
        builder
    }
}

/// Sends the request, retrying transport failures and non-2xx responses per
/// `policy`. Returns the first successful response, or the last error once
/// the attempt budget is exhausted.
pub async fn fetch_with_retry(
    client: &Client,
    request: &FetchRequest<'_>,
    policy: &RetryPolicy,
) -> Result<Response, FetchError> {
    let mut attempt = 0;
    loop {
        let err = match request.build(client).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                FetchError::Status {
                    status,
                    url: request.url.to_string(),
                }
            }
            Err(e) => FetchError::Transport(e),
        };

        attempt += 1;
        if attempt >= policy.max_attempts {
            return Err(err);
        }
        let delay = policy.delay_for(attempt - 1);
        warn!(
            "Fetch failed for {} ({}), retrying in {:?} (attempt {}/{})",
            request.url, err, delay, attempt + 1, policy.max_attempts
        );
        sleep(delay).await;
    }
}
