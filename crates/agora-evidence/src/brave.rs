use async_trait::async_trait;
use serde::Deserialize;

use crate::source::{SearchBackend, SearchHit};
use crate::EvidenceError;

pub const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave caps `count` at 20.
const MAX_COUNT: usize = 20;

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

/// Paid web search through the Brave Search API.
pub struct BraveBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for BraveBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraveBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl BraveBackend {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

/// Brave wraps matched terms in `<strong>`; keep only the text.
fn strip_markup(fragment: &str) -> String {
    let html = scraper::Html::parse_fragment(fragment);
    html.root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl SearchBackend for BraveBackend {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EvidenceError> {
        let count = limit.clamp(1, MAX_COUNT).to_string();
        let url = url::Url::parse_with_params(
            &self.endpoint,
            &[("q", query), ("count", count.as_str())],
        )?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::PAYMENT_REQUIRED
        {
            return Err(EvidenceError::Quota(self.name()));
        }
        if !status.is_success() {
            return Err(EvidenceError::Status {
                backend: self.name(),
                status: status.as_u16(),
            });
        }

        let body: BraveResponse = response.json().await.map_err(|e| EvidenceError::Parse {
            backend: self.name(),
            reason: e.to_string(),
        })?;

        Ok(body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|r| SearchHit {
                title: strip_markup(&r.title),
                url: r.url,
                snippet: strip_markup(&r.description),
            })
            .collect())
    }
}
