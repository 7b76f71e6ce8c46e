use std::sync::Arc;
use std::time::Duration;

use agora_types::EvidenceItem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::brave::{BraveBackend, BRAVE_ENDPOINT};
use crate::credibility::credibility_for_url;
use crate::duckduckgo::{DuckDuckGoBackend, DUCKDUCKGO_ENDPOINT};
use crate::EvidenceError;

/// An unscored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One web search provider in the fallback chain.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EvidenceError>;
}

/// Search settings, normally taken from the `[search]` config section.
#[derive(Clone)]
pub struct SearchConfig {
    /// Enables the paid backend when set.
    pub brave_api_key: Option<String>,
    pub brave_endpoint: String,
    pub duckduckgo_endpoint: String,
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            brave_endpoint: BRAVE_ENDPOINT.to_string(),
            duckduckgo_endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field(
                "brave_api_key",
                &self.brave_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("brave_endpoint", &self.brave_endpoint)
            .field("duckduckgo_endpoint", &self.duckduckgo_endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Web evidence lookup over an ordered chain of search backends.
///
/// Backends are tried in order; the first one that answers wins, even
/// with zero results. Failures fall through to the next backend and are
/// never surfaced: when every backend fails the result is simply empty.
#[derive(Clone)]
pub struct EvidenceSource {
    backends: Vec<Arc<dyn SearchBackend>>,
}

impl std::fmt::Debug for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.backends.iter().map(|b| b.name()).collect();
        f.debug_struct("EvidenceSource")
            .field("backends", &names)
            .finish()
    }
}

impl EvidenceSource {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        Self { backends }
    }

    /// Builds the standard chain: Brave (only with an API key), then DuckDuckGo.
    pub fn from_config(config: &SearchConfig) -> Result<Self, EvidenceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent("Mozilla/5.0 (compatible; AgoraFacilitator/0.1; +fact-check)")
            .build()?;

        let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();
        if let Some(key) = config.brave_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            backends.push(Arc::new(BraveBackend::new(
                client.clone(),
                config.brave_endpoint.clone(),
                key,
            )));
        }
        backends.push(Arc::new(DuckDuckGoBackend::new(
            client,
            config.duckduckgo_endpoint.clone(),
        )));
        Ok(Self::new(backends))
    }

    /// Names of the configured backends, in fallback order.
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Searches for `query` and returns up to `limit` scored items, highest
    /// credibility first.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<EvidenceItem> {
        if limit == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        for backend in &self.backends {
            match backend.search(query, limit).await {
                Ok(hits) => {
                    tracing::debug!(
                        backend = backend.name(),
                        results = hits.len(),
                        "evidence search succeeded"
                    );
                    return score_hits(hits, limit);
                }
                Err(e) => {
                    tracing::debug!(
                        backend = backend.name(),
                        error = %e,
                        "evidence backend failed, trying next"
                    );
                }
            }
        }

        tracing::warn!(query, "all evidence backends failed");
        Vec::new()
    }
}

/// Scores hits by domain, stable-sorts by credibility, and caps to `limit`.
fn score_hits(hits: Vec<SearchHit>, limit: usize) -> Vec<EvidenceItem> {
    let mut items: Vec<EvidenceItem> = hits
        .into_iter()
        .map(|hit| {
            let credibility = credibility_for_url(&hit.url);
            EvidenceItem::new(hit.title, hit.url, hit.snippet, credibility)
        })
        .collect();
    items.sort_by(|a, b| b.credibility.total_cmp(&a.credibility));
    items.truncate(limit);
    items
}
