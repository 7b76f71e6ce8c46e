//! The intervention policy: whether, why, and how to act on an event.
//!
//! Rules are checked in a fixed priority order and the first match wins.
//! The rules themselves live in [`evaluate`], a pure function. [`decide`]
//! wraps it with the single storage lookup the rules need (the user-message
//! count since the last summary), issued only when the summary rule could
//! fire.

use agora_types::{
    ActionKind, Decision, EventContext, InterventionLevel, Priority, ThreadConfig, VERIFY_EMOJI,
};

use crate::claims::has_high_impact_claim;
use crate::summarize::should_generate_summary;
use crate::{FacilitatorStore, PolicyError};

pub const REASON_MINIMAL: &str = "minimal intervention mode";
pub const REASON_NO_TRIGGER: &str = "no intervention triggers met";
pub const REASON_ERROR: &str = "error evaluating policy";

/// Result of contradiction detection between thread participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContradictionSignal {
    /// Detection is not available; never triggers an observation.
    Unsupported,
    /// No conflicting statements were found.
    NoConflict,
    /// Participants made conflicting statements.
    Conflict { details: String },
}

/// Contradiction detection step.
///
/// TODO: compare the new message against the living summary's
/// disagreements once a detector model is wired in.
pub fn detect_contradiction(_thread: &ThreadConfig, _event: &EventContext) -> ContradictionSignal {
    ContradictionSignal::Unsupported
}

/// Applies the intervention rules to one event.
///
/// `messages_since_last_summary` is only consulted for new-message events.
pub fn evaluate(
    thread: &ThreadConfig,
    event: &EventContext,
    messages_since_last_summary: u64,
) -> Decision {
    let signal = detect_contradiction(thread, event);
    evaluate_with_signal(thread, event, messages_since_last_summary, &signal)
}

pub(crate) fn evaluate_with_signal(
    thread: &ThreadConfig,
    event: &EventContext,
    messages_since_last_summary: u64,
    contradiction: &ContradictionSignal,
) -> Decision {
    let level = thread.intervention_level;

    if level == InterventionLevel::Minimal && !event.is_user_initiated() {
        return Decision::no_act(REASON_MINIMAL);
    }

    if let EventContext::ExplicitRequest {
        kind, claim_text, ..
    } = event
    {
        let action = match kind {
            Some(ActionKind::None) | None => ActionKind::Summary,
            Some(kind) => *kind,
        };
        return Decision::act(
            action,
            Priority::High,
            format!("explicit {} request", action.as_str()),
        )
        .with_claim_text(claim_text.clone());
    }

    if let EventContext::NewMessage { text, .. } = event {
        if should_generate_summary(thread, messages_since_last_summary) {
            return Decision::act(
                ActionKind::Summary,
                Priority::Normal,
                format!(
                    "{messages_since_last_summary} messages since last summary (threshold {})",
                    thread.summary_frequency
                ),
            );
        }

        if level == InterventionLevel::Active && thread.auto_fact_check_enabled {
            if let Some(found) = has_high_impact_claim(text) {
                return Decision::act(
                    ActionKind::FactCheck,
                    Priority::High,
                    format!("high-impact {} claim detected", found.category.as_str()),
                )
                .with_claim_text(Some(found.text));
            }
        }
    }

    if level != InterventionLevel::Minimal {
        if let ContradictionSignal::Conflict { details } = contradiction {
            return Decision::act(
                ActionKind::Observation,
                Priority::Normal,
                "conflicting statements detected",
            )
            .with_details(details.clone());
        }
    }

    if event.is_verify_reaction() {
        return Decision::act(
            ActionKind::FactCheck,
            Priority::Normal,
            format!("fact-check requested with {VERIFY_EMOJI} reaction"),
        );
    }

    Decision::no_act(REASON_NO_TRIGGER)
}

/// Whether the summary rule could apply, and the count lookup is needed.
fn needs_message_count(thread: &ThreadConfig, event: &EventContext) -> bool {
    thread.intervention_level != InterventionLevel::Minimal
        && thread.auto_summary_enabled
        && matches!(event, EventContext::NewMessage { .. })
}

async fn messages_since_last_summary(
    store: &dyn FacilitatorStore,
    thread: &ThreadConfig,
) -> Result<u64, PolicyError> {
    Ok(store
        .count_user_messages_since(&thread.thread_id, thread.last_summary_at.as_deref())
        .await?)
}

/// Decides how to respond to `event`. Never fails: storage errors yield a
/// non-acting decision.
pub async fn decide(
    store: &dyn FacilitatorStore,
    thread: &ThreadConfig,
    event: &EventContext,
) -> Decision {
    let count = if needs_message_count(thread, event) {
        match messages_since_last_summary(store, thread).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(thread_id = %thread.thread_id, error = %e, "policy evaluation failed");
                return Decision::no_act(REASON_ERROR);
            }
        }
    } else {
        0
    };
    evaluate(thread, event, count)
}

/// Constructor-injectable handle on the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterventionPolicy;

impl InterventionPolicy {
    pub async fn decide(
        &self,
        store: &dyn FacilitatorStore,
        thread: &ThreadConfig,
        event: &EventContext,
    ) -> Decision {
        decide(store, thread, event).await
    }
}
