//! Thread facilitation settings and the living conversation state.

use serde::{Deserialize, Serialize};

use crate::InterventionLevel;

/// Default number of user messages between automatic summaries.
pub const DEFAULT_SUMMARY_FREQUENCY: u32 = 15;

/// Facilitation settings and state for one discussion thread.
///
/// Read-only to the intervention policy. Only the orchestrator mutates the
/// conversation state, and only after a summary has been generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Unique public ID of the thread.
    pub thread_id: String,
    /// Display title.
    pub title: String,
    /// How proactive the facilitator may be.
    pub intervention_level: InterventionLevel,
    /// Whether summaries are generated automatically.
    pub auto_summary_enabled: bool,
    /// User messages between automatic summaries.
    pub summary_frequency: u32,
    /// Whether high-impact claims are fact-checked unprompted (active level only).
    pub auto_fact_check_enabled: bool,
    /// Timestamp of the last successful summary, if any.
    pub last_summary_at: Option<String>,
    /// Running count of non-deleted user messages in the thread.
    pub message_count: u64,
    /// The living summary.
    pub state: ConversationState,
}

impl ThreadConfig {
    /// Creates settings for a new thread with the default facilitation policy.
    pub fn new(thread_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            title: title.into(),
            intervention_level: InterventionLevel::default(),
            auto_summary_enabled: true,
            summary_frequency: DEFAULT_SUMMARY_FREQUENCY,
            auto_fact_check_enabled: true,
            last_summary_at: None,
            message_count: 0,
            state: ConversationState::default(),
        }
    }
}

/// The structured synopsis a summarization run produces.
///
/// Field names accept both snake_case and camelCase so that either spelling
/// from the model is treated as valid structured output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// One-sentence statement of what the thread is about.
    #[serde(alias = "topicStatement", alias = "topic_statement")]
    pub topic: String,
    #[serde(default, alias = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub agreements: Vec<String>,
    #[serde(default)]
    pub disagreements: Vec<String>,
    #[serde(default, alias = "openQuestions")]
    pub open_questions: Vec<String>,
    #[serde(default, alias = "nextSteps")]
    pub next_steps: Vec<String>,
}

/// The living summary of a thread, stored alongside its settings.
///
/// `revision` increases by one on every applied summary and is used as a
/// compare-and-set token when writing the state back.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub topic: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub agreements: Vec<String>,
    #[serde(default)]
    pub disagreements: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub revision: u64,
    pub updated_at: Option<String>,
}

impl ConversationState {
    /// Returns the state that results from applying `summary` on top of `self`.
    ///
    /// Summaries are complete snapshots, so every field is overwritten. The
    /// revision advances from the revision this state was read at.
    pub fn with_summary(&self, summary: &Summary, updated_at: &str) -> Self {
        Self {
            topic: Some(summary.topic.clone()),
            key_points: summary.key_points.clone(),
            agreements: summary.agreements.clone(),
            disagreements: summary.disagreements.clone(),
            open_questions: summary.open_questions.clone(),
            next_steps: summary.next_steps.clone(),
            revision: self.revision + 1,
            updated_at: Some(updated_at.to_string()),
        }
    }
}

/// Provenance attached to every facilitator-authored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionMetadata {
    /// Why the facilitator acted.
    pub reason: String,
    /// What kind of event triggered it (`new_message`, `explicit_request`, `reaction`).
    pub trigger_kind: String,
    /// Wall-clock time spent in the pipeline.
    pub elapsed_ms: u64,
    /// The model that produced the content, when one was called.
    pub model_id: Option<String>,
}
