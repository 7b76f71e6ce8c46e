use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::{CompletionBackend, GenerateRequest};
use crate::GatewayError;

/// Default deadline for a generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default deadline for a health check.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway settings, normally taken from the `[model]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub default_model: String,
    pub generation_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_model: "llama3.1".to_string(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

/// Requested output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    /// Overrides the configured default model.
    pub model: Option<String>,
    pub format: OutputFormat,
    pub temperature: Option<f32>,
    /// System preamble sent ahead of the prompt.
    pub system: Option<String>,
}

impl CompletionOptions {
    /// JSON output at the given temperature with a system preamble.
    pub fn json(temperature: f32, system: impl Into<String>) -> Self {
        Self {
            model: None,
            format: OutputFormat::Json,
            temperature: Some(temperature),
            system: Some(system.into()),
        }
    }
}

/// Model output, parsed according to the requested format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CompletionOutput {
    Text(String),
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub output: CompletionOutput,
    pub model_id: String,
    pub elapsed_ms: u64,
}

/// A completion deserialized into a caller-chosen type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedCompletion<T> {
    pub value: T,
    pub model_id: String,
    pub elapsed_ms: u64,
}

/// The single entry point to the model backend.
///
/// Enforces deadlines and turns raw text into structured output. Calls are
/// never retried here.
#[derive(Clone)]
pub struct ModelGateway {
    backend: Arc<dyn CompletionBackend>,
    config: GatewayConfig,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModelGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: GatewayConfig) -> Self {
        Self { backend, config }
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Runs one completion.
    ///
    /// With [`OutputFormat::Json`] the text must parse as JSON, otherwise
    /// the call fails with `GatewayError::InvalidStructuredOutput`.
    pub async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion, GatewayError> {
        let request = GenerateRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
            prompt: prompt.to_string(),
            system: options.system.clone(),
            json: options.format == OutputFormat::Json,
            temperature: options.temperature,
        };

        let started = Instant::now();
        let timeout = self.config.generation_timeout;
        let response = tokio::time::timeout(timeout, self.backend.generate(&request))
            .await
            .map_err(|_| GatewayError::Timeout(timeout))??;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let output = match options.format {
            OutputFormat::Text => CompletionOutput::Text(response.text),
            OutputFormat::Json => CompletionOutput::Json(parse_json_output(&response.text)?),
        };

        tracing::debug!(
            model = %response.model,
            elapsed_ms,
            json = request.json,
            "model completion finished"
        );

        Ok(Completion {
            output,
            model_id: response.model,
            elapsed_ms,
        })
    }

    /// Runs a JSON completion and deserializes it into `T`.
    ///
    /// The format in `options` is forced to JSON.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<TypedCompletion<T>, GatewayError> {
        let options = CompletionOptions {
            format: OutputFormat::Json,
            ..options.clone()
        };
        let completion = self.complete(prompt, &options).await?;
        let CompletionOutput::Json(json) = completion.output else {
            return Err(GatewayError::InvalidStructuredOutput(
                "expected JSON output".to_string(),
            ));
        };
        let value = serde_json::from_value(json)
            .map_err(|e| GatewayError::InvalidStructuredOutput(e.to_string()))?;
        Ok(TypedCompletion {
            value,
            model_id: completion.model_id,
            elapsed_ms: completion.elapsed_ms,
        })
    }

    /// Lists the models the backend can serve, under the health deadline.
    pub async fn health(&self) -> Result<Vec<String>, GatewayError> {
        let timeout = self.config.health_timeout;
        tokio::time::timeout(timeout, self.backend.list_models())
            .await
            .map_err(|_| GatewayError::Timeout(timeout))?
    }
}

/// Parses model text as JSON, tolerating a surrounding markdown code fence.
fn parse_json_output(text: &str) -> Result<serde_json::Value, GatewayError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(unfenced).map_err(|e| GatewayError::InvalidStructuredOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerateResponse;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    struct CannedBackend {
        text: String,
        delay: Option<Duration>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl CannedBackend {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateResponse, GatewayError> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(GenerateResponse {
                model: request.model.clone(),
                text: self.text.clone(),
            })
        }

        async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(vec!["llama3.1".to_string(), "mistral".to_string()])
        }
    }

    fn gateway(backend: Arc<CannedBackend>) -> ModelGateway {
        ModelGateway::new(backend, GatewayConfig::default())
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Shape {
        status: String,
        confidence: f64,
    }

    #[tokio::test]
    async fn json_completion_is_parsed() {
        let backend = Arc::new(CannedBackend::new(r#"{"status":"verified","confidence":0.9}"#));
        let gw = gateway(backend.clone());

        let completion = gw
            .complete("prompt", &CompletionOptions::json(0.3, "be neutral"))
            .await
            .expect("completion");
        assert_eq!(
            completion.output,
            CompletionOutput::Json(serde_json::json!({"status": "verified", "confidence": 0.9}))
        );
        assert_eq!(completion.model_id, "llama3.1");

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].json);
        assert_eq!(seen[0].temperature, Some(0.3));
        assert_eq!(seen[0].system.as_deref(), Some("be neutral"));
    }

    #[tokio::test]
    async fn non_json_text_is_invalid_structured_output() {
        let gw = gateway(Arc::new(CannedBackend::new("Sure! Here is my answer.")));
        let err = gw
            .complete("prompt", &CompletionOptions::json(0.3, "sys"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidStructuredOutput(_)));
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let gw = gateway(Arc::new(CannedBackend::new(
            "```json\n{\"status\":\"uncertain\",\"confidence\":0.4}\n```",
        )));
        let typed: TypedCompletion<Shape> = gw
            .complete_json("prompt", &CompletionOptions::default())
            .await
            .expect("typed completion");
        assert_eq!(
            typed.value,
            Shape {
                status: "uncertain".to_string(),
                confidence: 0.4
            }
        );
    }

    #[tokio::test]
    async fn typed_mismatch_is_invalid_structured_output() {
        let gw = gateway(Arc::new(CannedBackend::new(r#"{"verdict":"yes"}"#)));
        let err = gw
            .complete_json::<Shape>("prompt", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidStructuredOutput(_)));
    }

    #[tokio::test]
    async fn text_completion_uses_requested_model() {
        let backend = Arc::new(CannedBackend::new("plain words"));
        let gw = gateway(backend.clone());
        let options = CompletionOptions {
            model: Some("mistral".to_string()),
            ..Default::default()
        };
        let completion = gw.complete("prompt", &options).await.expect("completion");
        assert_eq!(
            completion.output,
            CompletionOutput::Text("plain words".to_string())
        );
        assert_eq!(completion.model_id, "mistral");
        assert!(!backend.seen.lock().unwrap()[0].json);
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let backend = Arc::new(CannedBackend {
            delay: Some(Duration::from_secs(5)),
            ..CannedBackend::new("{}")
        });
        let gw = ModelGateway::new(
            backend,
            GatewayConfig {
                generation_timeout: Duration::from_millis(20),
                health_timeout: Duration::from_millis(20),
                ..GatewayConfig::default()
            },
        );

        let err = gw
            .complete("prompt", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)));
        assert!(matches!(gw.health().await, Err(GatewayError::Timeout(_))));
    }

    #[tokio::test]
    async fn health_lists_models() {
        let gw = gateway(Arc::new(CannedBackend::new("")));
        let models = gw.health().await.expect("health");
        assert_eq!(models, vec!["llama3.1".to_string(), "mistral".to_string()]);
    }
}
