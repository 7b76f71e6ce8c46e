use async_trait::async_trait;

use crate::GatewayError;

/// A single generation call as the backend sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    /// Ask the backend to constrain output to JSON.
    pub json: bool,
    pub temperature: Option<f32>,
}

/// Raw backend output before any structured parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    /// The model that actually served the request.
    pub model: String,
    pub text: String,
}

/// A text-completion backend.
///
/// There is exactly one production implementation
/// ([`OllamaBackend`](crate::OllamaBackend)); the trait exists so the
/// pipelines can be exercised against canned responses.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;

    /// Names of the models the backend can serve.
    async fn list_models(&self) -> Result<Vec<String>, GatewayError>;
}
