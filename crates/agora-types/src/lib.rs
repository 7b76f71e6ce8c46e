//! Shared types for the Agora facilitation engine.
//!
//! This crate provides the vocabulary used across all Agora crates: the
//! per-thread facilitation settings, the events the facilitator reacts to,
//! the decisions it produces, and the artifacts (claims, evidence, verdicts,
//! summaries) its pipelines emit.
//!
//! Every other crate in the workspace depends on `agora-types` for these
//! definitions and on nothing else for cross-cutting types. This keeps the
//! dependency graph acyclic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod decision;
mod facts;
mod thread;

pub use decision::{Decision, EventContext, VERIFY_EMOJI};
pub use facts::{clamp_unit, Claim, ClaimType, EvidenceItem, Verdict, VerdictStatus};
pub use thread::{ConversationState, InterventionMetadata, Summary, ThreadConfig};

/// Error returned when a stored or submitted label does not name a known
/// enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseLabelError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// How proactively the facilitator may act in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    /// Only act on explicit user requests.
    Minimal,
    /// Explicit requests plus periodic summaries.
    #[default]
    Balanced,
    /// Everything in `Balanced`, plus unprompted fact-checks of high-impact claims.
    Active,
}

impl InterventionLevel {
    /// Returns the canonical label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Balanced => "balanced",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for InterventionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InterventionLevel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "balanced" => Ok(Self::Balanced),
            "active" => Ok(Self::Active),
            _ => Err(ParseLabelError {
                kind: "intervention level",
                value: s.to_string(),
            }),
        }
    }
}

/// The concrete action a decision dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Generate or refresh the living summary.
    Summary,
    /// Verify a factual claim against search evidence.
    FactCheck,
    /// Post a rule-based facilitator note (no model call).
    Observation,
    /// Propose a resolution for a disagreement. Not implemented.
    Resolve,
    /// Do nothing.
    None,
}

impl ActionKind {
    /// Returns the canonical label for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::FactCheck => "fact_check",
            Self::Observation => "observation",
            Self::Resolve => "resolve",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "fact_check" => Ok(Self::FactCheck),
            "observation" => Ok(Self::Observation),
            "resolve" => Ok(Self::Resolve),
            "none" => Ok(Self::None),
            _ => Err(ParseLabelError {
                kind: "action kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Urgency attached to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Distinguishes user content from facilitator-authored messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Written by a participant.
    #[default]
    User,
    /// A living-summary refresh.
    LlmSummary,
    /// A fact-check verdict.
    LlmFactCheck,
    /// A rule-based observation or other facilitator note.
    LlmIntervention,
}

impl MessageKind {
    /// Returns the canonical label stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::LlmSummary => "llm_summary",
            Self::LlmFactCheck => "llm_fact_check",
            Self::LlmIntervention => "llm_intervention",
        }
    }

    /// Whether the message was authored by the facilitator.
    pub fn is_facilitator(self) -> bool {
        !matches!(self, Self::User)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageKind {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "llm_summary" => Ok(Self::LlmSummary),
            "llm_fact_check" => Ok(Self::LlmFactCheck),
            "llm_intervention" => Ok(Self::LlmIntervention),
            _ => Err(ParseLabelError {
                kind: "message kind",
                value: s.to_string(),
            }),
        }
    }
}
