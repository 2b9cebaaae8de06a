use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{Content, ErrorResponse, GenerateContentRequest, GenerateContentResponse, Tool};
use crate::config::{GeminiConfig, RequestConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::gateway::{ModelProvider, ModelRequest, ProviderReply, RawCitation, TurnRole};

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig, request_config: RequestConfig) -> ProviderResult<Self> {
        let api_key = config.api_key.clone().ok_or(ProviderError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            request_config,
        })
    }

    /// Call `generateContent` once. Failures are returned as-is; there is no
    /// retry loop.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let start = Instant::now();

        debug!(
            model = %self.model,
            contents = request.contents.len(),
            tools = request.tools.len(),
            "Calling Gemini"
        );

        match self.execute_request(&url, request).await {
            Ok(response) => {
                info!(
                    model = %self.model,
                    latency_ms = start.elapsed().as_millis() as u64,
                    candidates = response.candidates.len(),
                    "Gemini call succeeded"
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    model = %self.model,
                    error = %e,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Gemini call failed"
                );
                Err(e)
            }
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> ProviderResult<GenerateContentResponse> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&error_body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => error_body,
            };
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured model
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Map a provider-agnostic request onto the Gemini wire format.
impl From<ModelRequest> for GenerateContentRequest {
    fn from(request: ModelRequest) -> Self {
        let contents = request
            .turns
            .into_iter()
            .map(|t| match t.role {
                TurnRole::User => Content::user(t.text),
                TurnRole::Model => Content::model(t.text),
            })
            .collect();

        GenerateContentRequest::new(contents)
            .with_system_instruction(request.system_instruction)
            .with_temperature(request.temperature)
            .with_tool(Tool::google_search())
    }
}

impl From<GenerateContentResponse> for ProviderReply {
    fn from(response: GenerateContentResponse) -> Self {
        let citations = response
            .grounding_chunks()
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .map(|web| RawCitation {
                title: web.title.clone(),
                uri: web.uri.clone(),
            })
            .collect();

        Self {
            text: response.text(),
            citations,
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> ProviderResult<ProviderReply> {
        let body = GenerateContentRequest::from(request);
        let response = self.generate_content(&body).await?;
        Ok(response.into())
    }
}
