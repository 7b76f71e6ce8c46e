use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{CompletionBackend, GenerateRequest, GenerateResponse};
use crate::GatewayError;

/// Upper bound on how much of an error body is kept in `GatewayError::Backend`.
const MAX_ERROR_BODY: usize = 512;

/// Connection establishment timeout. Whole-call deadlines are enforced by
/// [`ModelGateway`](crate::ModelGateway).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct OllamaGenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaGenerateReply {
    #[serde(default)]
    model: Option<String>,
    response: String,
}

#[derive(Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

/// Completion backend speaking the Ollama HTTP API
/// (`POST /api/generate`, `GET /api/tags`).
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent("AgoraFacilitator/0.1 (model-gateway)")
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_connect() {
            GatewayError::Unreachable {
                url: self.base_url.clone(),
                reason: err.to_string(),
            }
        } else if err.is_timeout() {
            GatewayError::Timeout(CONNECT_TIMEOUT)
        } else {
            GatewayError::Http(err)
        }
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let body = OllamaGenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            format: request.json.then_some("json"),
            system: request.system.as_deref(),
            options: request
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::NOT_FOUND
                || text.to_ascii_lowercase().contains("not found")
            {
                return Err(GatewayError::ModelNotFound(request.model.clone()));
            }
            return Err(GatewayError::Backend {
                status: status.as_u16(),
                body: truncate_body(text),
            });
        }

        let reply: OllamaGenerateReply = response.json().await?;
        Ok(GenerateResponse {
            model: reply.model.unwrap_or_else(|| request.model.clone()),
            text: reply.response,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Backend {
                status: status.as_u16(),
                body: truncate_body(text),
            });
        }

        let tags: OllamaTags = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
