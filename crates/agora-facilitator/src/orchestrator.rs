//! Dispatches facilitation decisions to the pipelines and persists results.

use std::sync::Arc;
use std::time::Instant;

use agora_threads::Message;
use agora_types::{
    ActionKind, ConversationState, Decision, EventContext, InterventionMetadata, MessageKind,
    Summary, ThreadConfig, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::claims::{detect, rank_claims};
use crate::fact_check::FactChecker;
use crate::policy::InterventionPolicy;
use crate::summarize::{Summarizer, SummaryOutcome, DEFAULT_MESSAGE_LIMIT};
use crate::{
    FacilitationEvent, FacilitatorStore, NewFacilitatorMessage, NewVerdictRecord, Notifier,
    PipelineError,
};

/// What happened in response to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    /// Whether a facilitator message was written.
    pub intervened: bool,
    pub action: ActionKind,
    /// The policy's reason for acting or not acting.
    pub reason: String,
    /// ID of the facilitator message, when one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Failure description when the pipeline failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the chosen action is not implemented.
    pub unsupported: bool,
}

impl OutcomeReport {
    fn skipped(decision: &Decision) -> Self {
        Self {
            intervened: false,
            action: decision.action(),
            reason: decision.reason().to_string(),
            message_id: None,
            error: None,
            unsupported: false,
        }
    }

    fn failed(action: ActionKind, reason: &str, error: impl ToString) -> Self {
        Self {
            intervened: false,
            action,
            reason: reason.to_string(),
            message_id: None,
            error: Some(error.to_string()),
            unsupported: false,
        }
    }
}

/// Optional details accompanying an explicit facilitation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExplicitRequestContext {
    #[serde(default)]
    pub claim_text: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Drives one facilitation round: load, decide, run, persist, notify.
///
/// Failures are never propagated. A failed round writes nothing and is
/// reported through [`OutcomeReport::error`].
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn FacilitatorStore>,
    notifier: Arc<dyn Notifier>,
    policy: InterventionPolicy,
    summarizer: Summarizer,
    fact_checker: FactChecker,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn FacilitatorStore>,
        notifier: Arc<dyn Notifier>,
        policy: InterventionPolicy,
        summarizer: Summarizer,
        fact_checker: FactChecker,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
            summarizer,
            fact_checker,
        }
    }

    /// Handles an explicit request for `kind` (a summary when `None`).
    pub async fn handle_explicit_request(
        &self,
        thread_id: &str,
        kind: Option<ActionKind>,
        context: ExplicitRequestContext,
    ) -> OutcomeReport {
        let event = EventContext::ExplicitRequest {
            kind,
            claim_text: context.claim_text,
            message_id: context.message_id,
        };
        self.handle_event(thread_id, event).await
    }

    pub async fn handle_event(&self, thread_id: &str, event: EventContext) -> OutcomeReport {
        let started = Instant::now();

        let thread = match self.store.get_thread(thread_id).await {
            Ok(thread) => thread,
            Err(e) => {
                tracing::warn!(thread_id, error = %e, "failed to load thread for facilitation");
                return OutcomeReport::failed(ActionKind::None, "thread unavailable", e);
            }
        };

        let decision = self.policy.decide(self.store.as_ref(), &thread, &event).await;
        if !decision.should_act() {
            tracing::debug!(
                thread_id,
                trigger = event.trigger_kind(),
                reason = decision.reason(),
                "no intervention"
            );
            return OutcomeReport::skipped(&decision);
        }

        let action = decision.action();
        let round = Round {
            thread: &thread,
            decision: &decision,
            event: &event,
            started,
        };
        let result = match action {
            ActionKind::Summary => self.run_summary(&round).await,
            ActionKind::FactCheck => self.run_fact_check(&round).await,
            ActionKind::Observation => self.run_observation(&round).await,
            ActionKind::Resolve => Err(PipelineError::Unsupported("resolution generation")),
            ActionKind::None => return OutcomeReport::skipped(&decision),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(message_id) => {
                tracing::info!(
                    thread_id,
                    action = action.as_str(),
                    priority = decision.priority().as_str(),
                    elapsed_ms,
                    message_id = %message_id,
                    "facilitator intervened"
                );
                OutcomeReport {
                    intervened: true,
                    action,
                    reason: decision.reason().to_string(),
                    message_id: Some(message_id),
                    error: None,
                    unsupported: false,
                }
            }
            Err(PipelineError::Unsupported(what)) => {
                tracing::info!(thread_id, action = action.as_str(), "{what} is not supported");
                OutcomeReport {
                    unsupported: true,
                    ..OutcomeReport::failed(
                        action,
                        decision.reason(),
                        PipelineError::Unsupported(what),
                    )
                }
            }
            Err(e) => {
                tracing::warn!(
                    thread_id,
                    action = action.as_str(),
                    elapsed_ms,
                    error = %e,
                    "facilitation failed"
                );
                OutcomeReport::failed(action, decision.reason(), e)
            }
        }
    }

    async fn run_summary(&self, round: &Round<'_>) -> Result<String, PipelineError> {
        let thread_id = &round.thread.thread_id;
        let outcome = self
            .summarizer
            .summarize(thread_id, DEFAULT_MESSAGE_LIMIT)
            .await?;

        let message = NewFacilitatorMessage {
            thread_id: thread_id.clone(),
            kind: MessageKind::LlmSummary,
            content: render_summary(&outcome.summary),
            metadata: Some(round.metadata(Some(outcome.model_id.clone()))),
        };
        let (written, state) = self.commit_summary(round.thread, &outcome, message).await?;

        self.notifier.notify(
            thread_id,
            FacilitationEvent::SummaryNew,
            json!({
                "message_id": written.message_id,
                "summary": outcome.summary,
                "model_id": outcome.model_id,
                "message_count": outcome.message_count,
            }),
        );
        self.notifier.notify(
            thread_id,
            FacilitationEvent::ThreadState,
            json!({ "state": state, "last_summary_at": outcome.last_message_at }),
        );
        Ok(written.message_id)
    }

    /// Writes the summary message together with the merged state, re-reading
    /// the thread once if another writer bumped the revision first.
    async fn commit_summary(
        &self,
        thread: &ThreadConfig,
        outcome: &SummaryOutcome,
        message: NewFacilitatorMessage,
    ) -> Result<(Message, ConversationState), PipelineError> {
        let thread_id = &thread.thread_id;
        let summarized_at = outcome.last_message_at.as_str();

        let next = thread.state.with_summary(&outcome.summary, summarized_at);
        if let Some(written) = self
            .store
            .commit_summary(message.clone(), thread.state.revision, &next, summarized_at)
            .await?
        {
            return Ok((written, next));
        }

        let current = self.store.get_thread(thread_id).await?;
        let next = current.state.with_summary(&outcome.summary, summarized_at);
        match self
            .store
            .commit_summary(message, current.state.revision, &next, summarized_at)
            .await?
        {
            Some(written) => Ok((written, next)),
            None => Err(PipelineError::StateConflict(thread_id.clone())),
        }
    }

    async fn run_fact_check(&self, round: &Round<'_>) -> Result<String, PipelineError> {
        let thread_id = &round.thread.thread_id;
        let source_message_id = round.event.message_id().map(str::to_string);

        let target = match &source_message_id {
            Some(id) => self
                .store
                .get_message(id)
                .await?
                .filter(|m| !m.deleted && &m.thread_id == thread_id),
            None => None,
        };
        let context = target.as_ref().map(|m| m.content.clone());

        let claim = match round.decision.claim_text() {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => match &context {
                Some(content) => claim_from_message(content).ok_or(PipelineError::NoClaim)?,
                None => return Err(PipelineError::NoClaim),
            },
        };

        let outcome = self.fact_checker.check(&claim, context.as_deref()).await?;

        let written = self
            .store
            .commit_fact_check(
                NewFacilitatorMessage {
                    thread_id: thread_id.clone(),
                    kind: MessageKind::LlmFactCheck,
                    content: render_verdict(&claim, &outcome.verdict),
                    metadata: Some(round.metadata(Some(outcome.model_id.clone()))),
                },
                NewVerdictRecord {
                    source_message_id: source_message_id.clone(),
                    claim_text: claim.clone(),
                    verdict: outcome.verdict.clone(),
                },
            )
            .await?;

        self.notifier.notify(
            thread_id,
            FacilitationEvent::FactCheckComplete,
            json!({
                "message_id": written.message_id,
                "source_message_id": source_message_id,
                "claim_text": claim,
                "verdict": outcome.verdict,
                "model_id": outcome.model_id,
            }),
        );
        Ok(written.message_id)
    }

    /// Posts the policy's details when there are any, otherwise a note built
    /// from the unresolved parts of the living summary.
    async fn run_observation(&self, round: &Round<'_>) -> Result<String, PipelineError> {
        let thread_id = &round.thread.thread_id;
        let content = match round.decision.details() {
            Some(details) if !details.trim().is_empty() => {
                format!("Observation: {}", details.trim())
            }
            _ => render_observation(&round.thread.state)
                .ok_or_else(|| PipelineError::NothingToObserve(thread_id.clone()))?,
        };
        let message = self
            .store
            .create_facilitator_message(NewFacilitatorMessage {
                thread_id: thread_id.clone(),
                kind: MessageKind::LlmIntervention,
                content,
                metadata: Some(round.metadata(None)),
            })
            .await?;

        self.notifier.notify(
            thread_id,
            FacilitationEvent::ObservationNew,
            json!({ "message_id": message.message_id, "content": message.content }),
        );
        Ok(message.message_id)
    }
}

/// Per-event context shared by the action handlers.
struct Round<'a> {
    thread: &'a ThreadConfig,
    decision: &'a Decision,
    event: &'a EventContext,
    started: Instant,
}

impl Round<'_> {
    fn metadata(&self, model_id: Option<String>) -> InterventionMetadata {
        InterventionMetadata {
            reason: self.decision.reason().to_string(),
            trigger_kind: self.event.trigger_kind().to_string(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            model_id,
        }
    }
}

/// The most important claim in `content`, or the whole message if none is
/// detected. `None` for blank content.
fn claim_from_message(content: &str) -> Option<String> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    Some(
        rank_claims(detect(content))
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_else(|| content.to_string()),
    )
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n\n{heading}:"));
    for item in items {
        out.push_str(&format!("\n- {item}"));
    }
}

fn render_summary(summary: &Summary) -> String {
    let mut out = format!("Summary: {}", summary.topic.trim());
    push_section(&mut out, "Key points", &summary.key_points);
    push_section(&mut out, "Agreements", &summary.agreements);
    push_section(&mut out, "Disagreements", &summary.disagreements);
    push_section(&mut out, "Open questions", &summary.open_questions);
    push_section(&mut out, "Next steps", &summary.next_steps);
    out
}

/// `None` when the living summary has no open disagreements or questions.
fn render_observation(state: &ConversationState) -> Option<String> {
    if state.disagreements.is_empty() && state.open_questions.is_empty() {
        return None;
    }
    let mut out = "Observation: some points in this thread are still unresolved.".to_string();
    push_section(&mut out, "Disagreements", &state.disagreements);
    push_section(&mut out, "Open questions", &state.open_questions);
    Some(out)
}

fn render_verdict(claim: &str, verdict: &Verdict) -> String {
    let mut out = format!(
        "Fact-check: {} (confidence {:.0}%)\nClaim: \"{}\"",
        verdict.status,
        verdict.confidence * 100.0,
        claim
    );
    if !verdict.explanation.trim().is_empty() {
        out.push_str(&format!("\n\n{}", verdict.explanation.trim()));
    }
    if !verdict.evidence.is_empty() {
        out.push_str("\n\nSources:");
        for item in &verdict.evidence {
            let marker = if item.supports { "" } else { " (contradicts)" };
            out.push_str(&format!("\n- {} ({}){marker}", item.source_label, item.url));
        }
    }
    out
}
