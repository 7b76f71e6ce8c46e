//! Static, domain-based source credibility.
//!
//! Scores are looked up on the URL host: lowercased, with a leading `www.`
//! removed. A listed domain also covers its subdomains, so `who.int`
//! matches `apps.who.int`.

/// Health agencies, wire services, fact-checkers and major journals.
const AUTHORITATIVE: &[&str] = &[
    "who.int",
    "cdc.gov",
    "nih.gov",
    "ncbi.nlm.nih.gov",
    "fda.gov",
    "nhs.uk",
    "ecdc.europa.eu",
    "reuters.com",
    "apnews.com",
    "afp.com",
    "snopes.com",
    "factcheck.org",
    "politifact.com",
    "fullfact.org",
    "nature.com",
    "science.org",
    "thelancet.com",
    "nejm.org",
    "bmj.com",
    "jamanetwork.com",
    "cochrane.org",
];

/// Encyclopedias and large general-news outlets.
const REPUTABLE: &[&str] = &[
    "wikipedia.org",
    "britannica.com",
    "bbc.com",
    "bbc.co.uk",
    "nytimes.com",
    "theguardian.com",
    "washingtonpost.com",
    "npr.org",
    "economist.com",
];

pub const AUTHORITATIVE_SCORE: f64 = 0.9;
pub const INSTITUTIONAL_SCORE: f64 = 0.85;
pub const REPUTABLE_SCORE: f64 = 0.7;
pub const DEFAULT_SCORE: f64 = 0.5;

fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Credibility for an already-normalized host.
pub fn credibility_for_host(host: &str) -> f64 {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if AUTHORITATIVE.iter().any(|d| matches_domain(host, d)) {
        AUTHORITATIVE_SCORE
    } else if host.ends_with(".gov") || host.ends_with(".edu") {
        INSTITUTIONAL_SCORE
    } else if REPUTABLE.iter().any(|d| matches_domain(host, d)) {
        REPUTABLE_SCORE
    } else {
        DEFAULT_SCORE
    }
}

/// Credibility for a URL. Unparseable URLs and URLs without a host score
/// [`DEFAULT_SCORE`].
pub fn credibility_for_url(url: &str) -> f64 {
    match url::Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(credibility_for_host)
            .unwrap_or(DEFAULT_SCORE),
        Err(_) => DEFAULT_SCORE,
    }
}
