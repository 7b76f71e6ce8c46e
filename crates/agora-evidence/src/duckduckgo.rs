use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::source::{SearchBackend, SearchHit};
use crate::EvidenceError;

pub const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Free web search by scraping the DuckDuckGo HTML endpoint.
#[derive(Debug, Clone)]
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoBackend {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

/// Result links point at a `/l/?uddg=<target>` redirector; recover the
/// target. Protocol-relative links are resolved against https.
fn resolve_result_url(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = url::Url::parse(&absolute).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    match parsed.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts organic results from a DuckDuckGo HTML results page, skipping ads.
pub(crate) fn parse_results(html: &str, limit: usize) -> Result<Vec<SearchHit>, EvidenceError> {
    let parse_err = |reason: String| EvidenceError::Parse {
        backend: "duckduckgo",
        reason,
    };
    let result_sel = Selector::parse("div.result").map_err(|e| parse_err(e.to_string()))?;
    let link_sel = Selector::parse("a.result__a").map_err(|e| parse_err(e.to_string()))?;
    let snippet_sel = Selector::parse(".result__snippet").map_err(|e| parse_err(e.to_string()))?;

    let document = Html::parse_document(html);
    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        if hits.len() >= limit {
            break;
        }
        if result.value().classes().any(|c| c == "result--ad") {
            continue;
        }
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_result_url) else {
            continue;
        };
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        hits.push(SearchHit {
            title: element_text(link),
            url,
            snippet,
        });
    }
    Ok(hits)
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, EvidenceError> {
        let url = url::Url::parse_with_params(&self.endpoint, &[("q", query)])?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvidenceError::Status {
                backend: self.name(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_results(&body, limit)
    }
}
