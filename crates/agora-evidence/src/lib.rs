//! Web evidence lookup for fact-checking.
//!
//! [`EvidenceSource`] runs a query through an ordered chain of search
//! backends (Brave when an API key is configured, then DuckDuckGo's HTML
//! endpoint), scores each result by the credibility of its domain, and
//! returns the best few as [`EvidenceItem`](agora_types::EvidenceItem)s.
//! Search failures are logged and absorbed; callers only ever see a
//! possibly-empty list.

mod brave;
mod credibility;
mod duckduckgo;
mod error;
mod source;

pub use brave::{BraveBackend, BRAVE_ENDPOINT};
pub use credibility::{
    credibility_for_host, credibility_for_url, AUTHORITATIVE_SCORE, DEFAULT_SCORE,
    INSTITUTIONAL_SCORE, REPUTABLE_SCORE,
};
pub use duckduckgo::{DuckDuckGoBackend, DUCKDUCKGO_ENDPOINT};
pub use error::EvidenceError;
pub use source::{EvidenceSource, SearchBackend, SearchConfig, SearchHit};
