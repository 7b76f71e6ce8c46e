//! Model gateway for the Agora facilitator.
//!
//! Every generative-model call in the workspace goes through
//! [`ModelGateway`]. It applies the configured default model, bounds each
//! call with a deadline, and validates structured (JSON) output before any
//! pipeline sees it. The wire protocol lives behind [`CompletionBackend`];
//! [`OllamaBackend`] speaks the Ollama HTTP API.

mod backend;
mod error;
mod gateway;
mod ollama;

pub use backend::{CompletionBackend, GenerateRequest, GenerateResponse};
pub use error::GatewayError;
pub use gateway::{
    Completion, CompletionOptions, CompletionOutput, GatewayConfig, ModelGateway, OutputFormat,
    TypedCompletion, DEFAULT_GENERATION_TIMEOUT, DEFAULT_HEALTH_TIMEOUT,
};
pub use ollama::OllamaBackend;
