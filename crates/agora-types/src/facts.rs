//! Claims, evidence, and fact-check verdicts.

use serde::{Deserialize, Serialize};

use crate::ParseLabelError;

/// Clamps a score into `[0, 1]`. `NaN` maps to `0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Subject-matter category of a detected claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Statistical,
    Health,
    Legal,
    Financial,
    Scientific,
    Factual,
    Other,
}

impl ClaimType {
    /// Returns the canonical label for this claim type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::Health => "health",
            Self::Legal => "legal",
            Self::Financial => "financial",
            Self::Scientific => "scientific",
            Self::Factual => "factual",
            Self::Other => "other",
        }
    }
}

/// A span of text flagged as a verifiable factual assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The matched text, trimmed.
    pub text: String,
    pub claim_type: ClaimType,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether the claim is worth sending through the fact-check pipeline.
    pub should_verify: bool,
    /// Byte offsets `[start, end)` of `text` within the source message.
    pub span: (usize, usize),
}

/// A single search result, scored by source credibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Human-readable source name (usually the result title).
    pub source_label: String,
    pub url: String,
    pub snippet: String,
    /// Domain-based trust weight in `[0, 1]`.
    pub credibility: f64,
    /// Whether the source supports the claim it was gathered for.
    pub supports: bool,
}

impl EvidenceItem {
    /// Builds an evidence item, clamping `credibility` into `[0, 1]`.
    ///
    /// `supports` starts as `true`; the fact-check pipeline overrides it
    /// when the model reports a polarity for the source.
    pub fn new(
        source_label: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        credibility: f64,
    ) -> Self {
        Self {
            source_label: source_label.into(),
            url: url.into(),
            snippet: snippet.into(),
            credibility: clamp_unit(credibility),
            supports: true,
        }
    }
}

/// Outcome category of a fact-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// Credible sources confirm the claim.
    Verified,
    /// No credible confirmation was found.
    Unverified,
    /// Credible sources contradict the claim.
    Disputed,
    /// Evidence is mixed or insufficient.
    Uncertain,
}

impl VerdictStatus {
    /// Returns the canonical label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Unverified => "unverified",
            Self::Disputed => "disputed",
            Self::Uncertain => "uncertain",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VerdictStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(Self::Verified),
            "unverified" => Ok(Self::Unverified),
            "disputed" => Ok(Self::Disputed),
            "uncertain" => Ok(Self::Uncertain),
            _ => Err(ParseLabelError {
                kind: "verdict status",
                value: s.to_string(),
            }),
        }
    }
}

/// The fact-check pipeline's conclusion about one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub explanation: String,
    /// At most five items, highest credibility first.
    pub evidence: Vec<EvidenceItem>,
}

impl Verdict {
    /// Builds a verdict, clamping `confidence` into `[0, 1]`.
    pub fn new(
        status: VerdictStatus,
        confidence: f64,
        explanation: impl Into<String>,
        evidence: Vec<EvidenceItem>,
    ) -> Self {
        Self {
            status,
            confidence: clamp_unit(confidence),
            explanation: explanation.into(),
            evidence,
        }
    }
}
