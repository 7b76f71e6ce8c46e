//! Outbound notifications about facilitator activity.

use serde::{Deserialize, Serialize};

/// Kinds of notification pushed to thread subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilitationEvent {
    #[serde(rename = "summary:new")]
    SummaryNew,
    #[serde(rename = "factcheck:complete")]
    FactCheckComplete,
    #[serde(rename = "observation:new")]
    ObservationNew,
    #[serde(rename = "thread:state")]
    ThreadState,
}

impl FacilitationEvent {
    /// Wire name, also used as the SSE event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SummaryNew => "summary:new",
            Self::FactCheckComplete => "factcheck:complete",
            Self::ObservationNew => "observation:new",
            Self::ThreadState => "thread:state",
        }
    }
}

impl std::fmt::Display for FacilitationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers notifications to whoever is watching a thread.
///
/// Delivery is fire-and-forget: a notifier must not block and has no way to
/// report failure back to the facilitator.
pub trait Notifier: Send + Sync {
    fn notify(&self, thread_id: &str, event: FacilitationEvent, payload: serde_json::Value);
}
