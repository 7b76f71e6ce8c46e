//! Heuristic detection of checkable factual claims.
//!
//! Detection is a pure function of the input text: an ordered table of
//! regular expressions, each tagged with a claim type and a fixed
//! confidence. No model is involved.

use std::collections::HashSet;
use std::sync::LazyLock;

use agora_types::{clamp_unit, Claim, ClaimType};
use regex::Regex;
use serde::Serialize;

/// Matches this short (after trimming) are too vague to check.
const MIN_CLAIM_CHARS: usize = 21;

/// Claims at or above this confidence are sent to the fact-check pipeline.
pub const VERIFY_THRESHOLD: f64 = 0.75;

/// One row of a detection table.
#[derive(Debug, Clone, Copy)]
pub struct ClaimRule {
    pub family: &'static str,
    pub pattern: &'static str,
    pub claim_type: ClaimType,
    pub confidence: f64,
}

/// Ordered detection table. Output order follows this order.
pub const CLAIM_RULES: &[ClaimRule] = &[
    ClaimRule {
        family: "statistical",
        pattern: r"(?i)\b\d{1,3}(?:\.\d+)?\s*(?:%|percent)\s+of\s+[^.!?\n]+",
        claim_type: ClaimType::Statistical,
        confidence: 0.80,
    },
    ClaimRule {
        family: "statistical",
        pattern: r"(?i)\b(?:\d+|one|two|three|four|five|six|seven|eight|nine)\s+(?:in|out of)\s+(?:\d+|two|three|four|five|six|seven|eight|nine|ten|a hundred|a thousand)\b[^.!?\n]+",
        claim_type: ClaimType::Statistical,
        confidence: 0.80,
    },
    ClaimRule {
        family: "statistical",
        pattern: r"(?i)\b(?:studies|research|scientists|surveys?|statistics|data)\s+(?:show|shows|showed|prove|proves|proved|found|finds|suggest|suggests|confirm|confirms|demonstrate|demonstrates)\b[^.!?\n]+",
        claim_type: ClaimType::Scientific,
        confidence: 0.80,
    },
    ClaimRule {
        family: "statistical",
        pattern: r"(?i)[^.!?\n]*\b(?:increased|decreased|rose|fell|dropped|grew|declined)\s+(?:by\s+)?\d+(?:\.\d+)?\s*(?:%|percent)[^.!?\n]*",
        claim_type: ClaimType::Statistical,
        confidence: 0.80,
    },
    ClaimRule {
        family: "health",
        pattern: r"(?i)[^.!?\n]*\b(?:cures?|cured|treats?|prevents?|reverses?|heals?)\s+(?:[\w'-]+\s+){0,3}?(?:cancer|diabetes|covid(?:-19)?|autism|alzheimer'?s|dementia|hiv|aids|heart disease|depression|arthritis|obesity|asthma|flu|influenza|the common cold|disease)\b[^.!?\n]*",
        claim_type: ClaimType::Health,
        confidence: 0.85,
    },
    ClaimRule {
        family: "health",
        pattern: r"(?i)[^.!?\n]*\bvaccines?\s+(?:cause|causes|caused|gives?|gave)\b[^.!?\n]*",
        claim_type: ClaimType::Health,
        confidence: 0.85,
    },
    ClaimRule {
        family: "legal",
        pattern: r"(?i)[^.!?\n]*\b(?:is|are|was|were)\s+(?:now\s+)?(?:illegal|unlawful|against the law|a (?:federal )?crime)\b[^.!?\n]*",
        claim_type: ClaimType::Legal,
        confidence: 0.75,
    },
    ClaimRule {
        family: "legal",
        pattern: r"(?i)[^.!?\n]*\b(?:the law|federal law|the constitution|the courts?)\s+(?:says?|requires?|prohibits?|bans?|allows?|guarantees?)\b[^.!?\n]*",
        claim_type: ClaimType::Legal,
        confidence: 0.75,
    },
    ClaimRule {
        family: "financial",
        pattern: r"(?i)[^.!?\n]*\bguaranteed\s+(?:returns?|profits?|income|gains?|payouts?)\b[^.!?\n]*",
        claim_type: ClaimType::Financial,
        confidence: 0.80,
    },
    ClaimRule {
        family: "financial",
        pattern: r"(?i)[^.!?\n]*\b(?:risk[- ]free|can't lose|cannot lose)\s+(?:investments?|returns?|profits?|money|bets?)\b[^.!?\n]*",
        claim_type: ClaimType::Financial,
        confidence: 0.80,
    },
    ClaimRule {
        family: "absolute",
        pattern: r"(?i)[^.!?\n]*\b(?:always|never|all|every|no)\b[^.!?\n]*?\b(?:causes?|caused|leads? to|results? in)\b[^.!?\n]*",
        claim_type: ClaimType::Factual,
        confidence: 0.70,
    },
];

/// Stricter table consulted before unprompted fact-checks.
pub const HIGH_IMPACT_RULES: &[ClaimRule] = &[
    ClaimRule {
        family: "health",
        pattern: r"(?i)[^.!?\n]*\b(?:cures?|cured|reverses?|eliminates?)\s+(?:[\w'-]+\s+){0,3}?(?:cancer|diabetes|hiv|aids|alzheimer'?s|dementia|autism|covid(?:-19)?|heart disease|parkinson'?s|multiple sclerosis)\b[^.!?\n]*",
        claim_type: ClaimType::Health,
        confidence: 0.85,
    },
    ClaimRule {
        family: "statistical",
        pattern: r"(?i)(?:\b(?:studies|research|data|surveys?)\s+(?:show|shows|prove|proves|found|suggest|suggests)\s+(?:that\s+)?)?\b\d{1,3}(?:\.\d+)?\s*(?:%|percent)\s+of\s+(?:all\s+)?(?:people|americans|adults|children|kids|the population|users|patients|women|men|voters|doctors)\b[^.!?\n]*",
        claim_type: ClaimType::Statistical,
        confidence: 0.80,
    },
    ClaimRule {
        family: "financial",
        pattern: r"(?i)[^.!?\n]*\b(?:guaranteed|proven)\s+(?:to\s+)?(?:returns?|profits?|income|gains?|cure|work|double)\b[^.!?\n]*",
        claim_type: ClaimType::Financial,
        confidence: 0.80,
    },
    ClaimRule {
        family: "legal",
        pattern: r"(?i)[^.!?\n]*\b(?:is|are)\s+(?:now\s+)?(?:illegal|a (?:federal )?crime)\b[^.!?\n]*",
        claim_type: ClaimType::Legal,
        confidence: 0.75,
    },
];

fn compile(table: &'static [ClaimRule]) -> Vec<(Regex, &'static ClaimRule)> {
    table
        .iter()
        .filter_map(|rule| match Regex::new(rule.pattern) {
            Ok(re) => Some((re, rule)),
            Err(e) => {
                tracing::error!(family = rule.family, error = %e, "claim rule failed to compile");
                None
            }
        })
        .collect()
}

static COMPILED_RULES: LazyLock<Vec<(Regex, &'static ClaimRule)>> =
    LazyLock::new(|| compile(CLAIM_RULES));

static COMPILED_HIGH_IMPACT: LazyLock<Vec<(Regex, &'static ClaimRule)>> =
    LazyLock::new(|| compile(HIGH_IMPACT_RULES));

/// A match from the high-impact table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighImpactMatch {
    pub text: String,
    pub category: ClaimType,
    /// Byte offsets `[start, end)` into the source text.
    pub span: (usize, usize),
}

/// Trims a regex match and returns the trimmed text with adjusted offsets.
fn trimmed_span(source: &str, start: usize, end: usize) -> Option<(&str, usize, usize)> {
    let raw = &source[start..end];
    let lead = raw.len() - raw.trim_start().len();
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let start = start + lead;
    Some((text, start, start + text.len()))
}

/// Finds claims in `text`.
///
/// Results follow rule-table order, then position within the text. Matches
/// of 20 characters or fewer are dropped, and repeated text (ignoring case)
/// is reported once.
pub fn detect(text: &str) -> Vec<Claim> {
    let mut seen = HashSet::new();
    let mut claims = Vec::new();

    for (re, rule) in COMPILED_RULES.iter() {
        for m in re.find_iter(text) {
            let Some((claim_text, start, end)) = trimmed_span(text, m.start(), m.end()) else {
                continue;
            };
            if claim_text.chars().count() < MIN_CLAIM_CHARS {
                continue;
            }
            if !seen.insert(claim_text.to_lowercase()) {
                continue;
            }
            let confidence = clamp_unit(rule.confidence);
            claims.push(Claim {
                text: claim_text.to_string(),
                claim_type: rule.claim_type,
                confidence,
                should_verify: confidence >= VERIFY_THRESHOLD,
                span: (start, end),
            });
        }
    }
    claims
}

/// Returns the first high-impact claim in `text`, if any.
pub fn has_high_impact_claim(text: &str) -> Option<HighImpactMatch> {
    COMPILED_HIGH_IMPACT.iter().find_map(|(re, rule)| {
        let m = re.find(text)?;
        let (claim_text, start, end) = trimmed_span(text, m.start(), m.end())?;
        Some(HighImpactMatch {
            text: claim_text.to_string(),
            category: rule.claim_type,
            span: (start, end),
        })
    })
}

fn type_weight(claim_type: ClaimType) -> f64 {
    match claim_type {
        ClaimType::Health => 1.5,
        ClaimType::Legal => 1.4,
        ClaimType::Financial => 1.3,
        ClaimType::Statistical | ClaimType::Scientific => 1.2,
        ClaimType::Factual => 1.0,
        ClaimType::Other => 0.8,
    }
}

/// How urgently a claim deserves checking, in `[0, 1]`.
pub fn importance(claim: &Claim) -> f64 {
    let mut score = claim.confidence * type_weight(claim.claim_type);
    if claim.text.chars().count() > 100 {
        score *= 1.1;
    }
    score.min(1.0)
}

/// Sorts claims by descending importance. Ties keep their input order.
pub fn rank_claims(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by(|a, b| importance(b).total_cmp(&importance(a)));
    claims
}
