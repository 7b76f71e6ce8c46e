//! The Agora facilitation engine.
//!
//! For every thread event the [`Orchestrator`] loads the thread, asks the
//! intervention policy whether to act, and dispatches to a pipeline:
//!
//! - **summary**: [`Summarizer`] refreshes the living summary, which is
//!   merged into the thread's conversation state with a revision
//!   compare-and-set;
//! - **fact_check**: [`FactChecker`] gathers web evidence and asks the
//!   model for a [`Verdict`](agora_types::Verdict);
//! - **observation**: a rule-based note, no model call.
//!
//! Storage and delivery are behind the [`FacilitatorStore`] and [`Notifier`]
//! traits so the engine can run against fakes.

mod error;
mod notify;
mod orchestrator;
mod store;

pub mod claims;
pub mod fact_check;
pub mod policy;
pub mod summarize;

pub use error::{PipelineError, PolicyError, StoreError};
pub use fact_check::{FactCheckOutcome, FactChecker};
pub use notify::{FacilitationEvent, Notifier};
pub use orchestrator::{ExplicitRequestContext, Orchestrator, OutcomeReport};
pub use policy::{ContradictionSignal, InterventionPolicy};
pub use store::{
    FacilitatorStore, NewFacilitatorMessage, NewVerdictRecord, SqliteStore,
    FACILITATOR_AUTHOR_ID, FACILITATOR_AUTHOR_NAME,
};
pub use summarize::{Summarizer, SummaryOutcome};
