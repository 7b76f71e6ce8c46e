//! Claim verification against web evidence.

use agora_evidence::EvidenceSource;
use agora_gateway::{CompletionOptions, GatewayError, ModelGateway};
use agora_types::{EvidenceItem, Verdict, VerdictStatus};
use serde::Deserialize;

use crate::PipelineError;

/// Maximum number of evidence items searched for and attached to a verdict.
pub const MAX_EVIDENCE: usize = 5;

const FACT_CHECK_TEMPERATURE: f32 = 0.3;

const NO_RESULTS: &str = "No search results were found.";

const FACT_CHECK_SYSTEM_PROMPT: &str = "You are a careful, neutral fact-checker. \
Judge the claim only against the numbered search results you are given and cite them by number. \
If the results do not settle the question, say so rather than guessing. \
Reply with a single JSON object and nothing else.";

/// Result of one fact-check run.
#[derive(Debug, Clone, PartialEq)]
pub struct FactCheckOutcome {
    pub verdict: Verdict,
    pub model_id: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Deserialize)]
struct VerdictReply {
    status: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    sources: Vec<SourcePolarity>,
}

/// The model's reading of one numbered search result.
#[derive(Debug, Deserialize)]
struct SourcePolarity {
    /// 1-based, matching the numbering in the prompt.
    index: usize,
    supports: bool,
}

/// Searches for evidence about a claim and asks the model for a verdict.
#[derive(Clone)]
pub struct FactChecker {
    evidence: EvidenceSource,
    gateway: ModelGateway,
}

impl FactChecker {
    pub fn new(evidence: EvidenceSource, gateway: ModelGateway) -> Self {
        Self { evidence, gateway }
    }

    /// Fact-checks `claim`. `context` is the surrounding message, when known.
    pub async fn check(
        &self,
        claim: &str,
        context: Option<&str>,
    ) -> Result<FactCheckOutcome, PipelineError> {
        let mut evidence = self.evidence.search(claim, MAX_EVIDENCE).await;
        evidence.truncate(MAX_EVIDENCE);

        let prompt = build_prompt(claim, context, &evidence);
        let options = CompletionOptions::json(FACT_CHECK_TEMPERATURE, FACT_CHECK_SYSTEM_PROMPT);
        let completion = self
            .gateway
            .complete_json::<VerdictReply>(&prompt, &options)
            .await?;

        let verdict = into_verdict(completion.value, evidence)?;
        tracing::debug!(
            status = %verdict.status,
            confidence = verdict.confidence,
            evidence = verdict.evidence.len(),
            "fact-check finished"
        );

        Ok(FactCheckOutcome {
            verdict,
            model_id: completion.model_id,
            elapsed_ms: completion.elapsed_ms,
        })
    }
}

fn format_evidence(evidence: &[EvidenceItem]) -> String {
    if evidence.is_empty() {
        return NO_RESULTS.to_string();
    }
    evidence
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "[{}] {} ({})\n    {}",
                i + 1,
                item.source_label,
                item.url,
                item.snippet
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(claim: &str, context: Option<&str>, evidence: &[EvidenceItem]) -> String {
    let mut prompt = format!("Claim: {claim}\n");
    if let Some(context) = context.filter(|c| c.trim() != claim.trim()) {
        prompt.push_str(&format!("Said in this message: {context}\n"));
    }
    prompt.push_str(&format!(
        "\nSearch results:\n{}\n\n\
         Respond with JSON of the form:\n\
         {{\"status\": \"verified\" | \"unverified\" | \"disputed\" | \"uncertain\", \
         \"confidence\": 0.0-1.0, \
         \"explanation\": \"two or three sentences citing results by number\", \
         \"sources\": [{{\"index\": 1, \"supports\": true}}]}}",
        format_evidence(evidence)
    ));
    prompt
}

/// Maps the model reply onto a [`Verdict`] over `evidence`.
fn into_verdict(
    reply: VerdictReply,
    mut evidence: Vec<EvidenceItem>,
) -> Result<Verdict, GatewayError> {
    let mut status: VerdictStatus = reply
        .status
        .trim()
        .to_lowercase()
        .parse()
        .map_err(|e| GatewayError::InvalidStructuredOutput(format!("{e}")))?;

    if status == VerdictStatus::Verified && evidence.is_empty() {
        tracing::debug!("downgrading verified verdict with no evidence");
        status = VerdictStatus::Unverified;
    }

    for polarity in reply.sources {
        if let Some(item) = polarity
            .index
            .checked_sub(1)
            .and_then(|i| evidence.get_mut(i))
        {
            item.supports = polarity.supports;
        }
    }

    Ok(Verdict::new(
        status,
        reply.confidence.unwrap_or(0.5),
        reply.explanation,
        evidence,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> EvidenceItem {
        EvidenceItem::new(label, format!("https://{label}.org/a"), "snippet", 0.7)
    }

    fn reply(status: &str, sources: Vec<SourcePolarity>) -> VerdictReply {
        VerdictReply {
            status: status.to_string(),
            confidence: Some(0.8),
            explanation: "because".to_string(),
            sources,
        }
    }

    #[test]
    fn empty_evidence_uses_placeholder() {
        assert_eq!(format_evidence(&[]), NO_RESULTS);
        let prompt = build_prompt("coffee cures cancer", None, &[]);
        assert!(prompt.contains(NO_RESULTS));
        assert!(!prompt.contains("Said in this message"));
    }

    #[test]
    fn evidence_is_numbered_from_one() {
        let formatted = format_evidence(&[item("who"), item("cdc")]);
        assert_eq!(
            formatted,
            "[1] who (https://who.org/a)\n    snippet\n[2] cdc (https://cdc.org/a)\n    snippet"
        );
    }

    #[test]
    fn context_is_included_when_it_adds_something() {
        let prompt = build_prompt("vaccines cause autism", Some("I read that vaccines cause autism"), &[]);
        assert!(prompt.contains("Said in this message: I read that vaccines cause autism"));

        let same = build_prompt("vaccines cause autism", Some("vaccines cause autism"), &[]);
        assert!(!same.contains("Said in this message"));
    }

    #[test]
    fn verified_without_evidence_is_downgraded() {
        let verdict = into_verdict(reply("verified", vec![]), vec![]).expect("verdict");
        assert_eq!(verdict.status, VerdictStatus::Unverified);
    }

    #[test]
    fn verified_with_evidence_is_kept() {
        let verdict = into_verdict(reply("Verified", vec![]), vec![item("who")]).expect("verdict");
        assert_eq!(verdict.status, VerdictStatus::Verified);
        assert_eq!(verdict.confidence, 0.8);
    }

    #[test]
    fn unknown_status_is_invalid_output() {
        let err = into_verdict(reply("probably", vec![]), vec![]).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidStructuredOutput(_)));
    }

    #[test]
    fn source_polarity_overrides_default() {
        let sources = vec![
            SourcePolarity {
                index: 2,
                supports: false,
            },
            SourcePolarity {
                index: 0,
                supports: false,
            },
            SourcePolarity {
                index: 9,
                supports: false,
            },
        ];
        let verdict =
            into_verdict(reply("disputed", sources), vec![item("a"), item("b")]).expect("verdict");
        assert!(verdict.evidence[0].supports);
        assert!(!verdict.evidence[1].supports);
    }

    #[test]
    fn confidence_is_clamped_and_defaulted() {
        let mut r = reply("uncertain", vec![]);
        r.confidence = Some(3.0);
        assert_eq!(into_verdict(r, vec![]).expect("verdict").confidence, 1.0);

        let mut r = reply("uncertain", vec![]);
        r.confidence = None;
        assert_eq!(into_verdict(r, vec![]).expect("verdict").confidence, 0.5);
    }
}
