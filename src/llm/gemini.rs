//! Google Gemini provider implementation

use super::types::{LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Connection settings for the Gemini `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(config: &GeminiConfig) -> Result<Self, LlmError> {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        // No explicit timeout: a hung upstream blocks only its own session.
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint,
            model_id: config.model.clone(),
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = request.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(text.clone()),
            }],
        });

        let contents = request
            .messages
            .iter()
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: Some(msg.text.clone()),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::malformed("No candidates in response"))?;

        let content = candidate
            .content
            .ok_or_else(|| LlmError::malformed("Candidate has no content"))?;

        let text = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>();
        let text = text.trim();

        if text.is_empty() {
            return Err(LlmError::malformed(format!(
                "Candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("none")
            )));
        }

        let usage = resp.usage_metadata.unwrap_or_default();

        Ok(LlmResponse {
            text: text.to_string(),
            finish_reason: candidate.finish_reason,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                let message = error_resp.error.message;
                return Err(match status.as_u16() {
                    400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                    401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                    429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                    500..=599 => LlmError::server_error(format!("Server error: {message}")),
                    _ => LlmError::unknown(format!("HTTP {status}: {message}")),
                });
            }
            return Err(LlmError::unknown(format!("HTTP {status} error: {body}")));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::malformed(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
