//! Living-summary generation.

use std::sync::Arc;

use agora_gateway::{CompletionOptions, ModelGateway};
use agora_threads::Message;
use agora_types::{Summary, ThreadConfig};

use crate::{FacilitatorStore, PipelineError};

/// Number of recent user messages fed to the model by default.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 20;

const SUMMARY_TEMPERATURE: f32 = 0.7;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a neutral discussion facilitator. \
Summarize the conversation without taking sides or adding opinions. \
Attribute positions to participants only when it clarifies a disagreement. \
Reply with a single JSON object and nothing else.";

/// Whether enough user messages have accumulated to warrant a new summary.
pub fn should_generate_summary(thread: &ThreadConfig, messages_since_last_summary: u64) -> bool {
    thread.auto_summary_enabled && messages_since_last_summary >= u64::from(thread.summary_frequency)
}

/// Result of one summarization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub summary: Summary,
    pub model_id: String,
    pub elapsed_ms: u64,
    /// How many user messages the summary was built from.
    pub message_count: usize,
    /// `created_at` of the newest summarized message. Messages after it
    /// count toward the next summary.
    pub last_message_at: String,
}

/// Turns a thread's recent history into a structured [`Summary`].
#[derive(Clone)]
pub struct Summarizer {
    store: Arc<dyn FacilitatorStore>,
    gateway: ModelGateway,
}

impl Summarizer {
    pub fn new(store: Arc<dyn FacilitatorStore>, gateway: ModelGateway) -> Self {
        Self { store, gateway }
    }

    pub async fn summarize(
        &self,
        thread_id: &str,
        message_limit: u32,
    ) -> Result<SummaryOutcome, PipelineError> {
        let thread = self.store.get_thread(thread_id).await?;
        let messages = self
            .store
            .recent_user_messages(thread_id, message_limit)
            .await?;
        let Some(last_message_at) = messages.last().map(|m| m.created_at.clone()) else {
            return Err(PipelineError::NothingToSummarize(thread_id.to_string()));
        };

        let prompt = build_prompt(&thread, &messages);
        let options = CompletionOptions::json(SUMMARY_TEMPERATURE, SUMMARY_SYSTEM_PROMPT);
        let completion = self
            .gateway
            .complete_json::<Summary>(&prompt, &options)
            .await?;

        if completion.value.topic.trim().is_empty() {
            return Err(agora_gateway::GatewayError::InvalidStructuredOutput(
                "summary topic is empty".to_string(),
            )
            .into());
        }

        tracing::debug!(
            thread_id,
            messages = messages.len(),
            elapsed_ms = completion.elapsed_ms,
            "summary generated"
        );

        Ok(SummaryOutcome {
            summary: completion.value,
            model_id: completion.model_id,
            elapsed_ms: completion.elapsed_ms,
            message_count: messages.len(),
            last_message_at,
        })
    }
}

fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {}: {}", i + 1, m.author_name, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(thread: &ThreadConfig, messages: &[Message]) -> String {
    let previous_topic = thread.state.topic.as_deref().unwrap_or("None yet");
    format!(
        "Thread: {title}\n\
         Previous summary topic: {previous_topic}\n\n\
         Conversation:\n{transcript}\n\n\
         Respond with JSON of the form:\n\
         {{\"topic\": \"one sentence describing what the thread is about\", \
         \"key_points\": [], \"agreements\": [], \"disagreements\": [], \
         \"open_questions\": [], \"next_steps\": []}}",
        title = thread.title,
        transcript = format_transcript(messages),
    )
}
