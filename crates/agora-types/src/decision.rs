//! Inbound facilitation events and the decisions made about them.

use serde::{Deserialize, Serialize};

use crate::{ActionKind, Priority};

/// Reaction emoji that asks the facilitator to fact-check the target message.
pub const VERIFY_EMOJI: &str = "🧾";

/// An inbound event the facilitator may react to.
///
/// Constructed per event and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventContext {
    /// A participant posted a message.
    NewMessage {
        #[serde(default)]
        message_id: Option<String>,
        text: String,
        author: String,
    },
    /// A participant explicitly asked the facilitator to act.
    ExplicitRequest {
        /// Requested action; a summary when absent.
        #[serde(default)]
        kind: Option<ActionKind>,
        #[serde(default)]
        claim_text: Option<String>,
        /// Message the request refers to, if any.
        #[serde(default)]
        message_id: Option<String>,
    },
    /// A participant reacted to a message.
    Reaction { emoji: String, message_id: String },
}

impl EventContext {
    /// Label recorded as the trigger of any resulting intervention.
    pub fn trigger_kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::ExplicitRequest { .. } => "explicit_request",
            Self::Reaction { .. } => "reaction",
        }
    }

    /// Whether this is a reaction with [`VERIFY_EMOJI`].
    pub fn is_verify_reaction(&self) -> bool {
        matches!(self, Self::Reaction { emoji, .. } if emoji == VERIFY_EMOJI)
    }

    /// Whether a participant directly asked for facilitation, either with an
    /// explicit request or with the verify reaction.
    pub fn is_user_initiated(&self) -> bool {
        matches!(self, Self::ExplicitRequest { .. }) || self.is_verify_reaction()
    }

    /// The message this event points at, if any.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::NewMessage { message_id, .. } | Self::ExplicitRequest { message_id, .. } => {
                message_id.as_deref()
            }
            Self::Reaction { message_id, .. } => Some(message_id),
        }
    }
}

/// The policy's verdict on whether and how to intervene.
///
/// Only constructible through [`Decision::act`] and [`Decision::no_act`],
/// which guarantee that an acting decision has a non-empty reason and a
/// real action, and that a non-acting decision carries `ActionKind::None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    should_act: bool,
    reason: String,
    action: ActionKind,
    priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    claim_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl Decision {
    /// A decision to intervene with `action`.
    ///
    /// `ActionKind::None` yields a non-acting decision instead. An empty
    /// reason is replaced by `"<action> requested"`.
    pub fn act(action: ActionKind, priority: Priority, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if action == ActionKind::None {
            return Self::no_act(reason);
        }
        let reason = if reason.trim().is_empty() {
            format!("{} requested", action.as_str())
        } else {
            reason
        };
        Self {
            should_act: true,
            reason,
            action,
            priority,
            claim_text: None,
            details: None,
        }
    }

    /// A decision not to intervene.
    pub fn no_act(reason: impl Into<String>) -> Self {
        Self {
            should_act: false,
            reason: reason.into(),
            action: ActionKind::None,
            priority: Priority::Low,
            claim_text: None,
            details: None,
        }
    }

    /// Attaches the claim a fact-check should verify.
    pub fn with_claim_text(mut self, claim_text: Option<String>) -> Self {
        self.claim_text = claim_text.filter(|text| !text.trim().is_empty());
        self
    }

    /// Attaches free-form details (used by observations).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn should_act(&self) -> bool {
        self.should_act
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn claim_text(&self) -> Option<&str> {
        self.claim_text.as_deref()
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}
