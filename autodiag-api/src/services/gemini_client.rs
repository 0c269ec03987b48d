//! Gemini diagnosis provider
//!
//! Calls the `generateContent` endpoint of the Generative Language API.
//!
//! API Documentation: https://ai.google.dev/api/generate-content

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use autodiag_common::config::{get_user_agent, DiagnosisProviderConfig};

use crate::types::{DiagnosisProvider, ProviderError, ProviderRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create client
    ///
    /// # Errors
    /// Returns `ProviderError::Network` if the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
        temperature: f32,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            temperature,
            timeout,
        })
    }

    /// Create client from the `[diagnosis]` config section and a resolved key
    pub fn from_config(api_key: String, config: &DiagnosisProviderConfig) -> Result<Self, ProviderError> {
        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs.max(1)),
            config.temperature,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl DiagnosisProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![TextPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, stage = ?request.stage, "Querying Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(ProviderError::Api(status.as_u16(), message));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            tracing::warn!(model = %self.model, reason = %reason, "Gemini blocked the prompt");
            return Err(ProviderError::EmptyResponse);
        }

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        tracing::info!(model = %self.model, chars = text.len(), "Gemini diagnosis received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiagnosisStage;

    #[test]
    fn test_request_body_shape() {
        let request = ProviderRequest {
            stage: DiagnosisStage::Initial,
            system_instruction: "be a mechanic".to_string(),
            prompt: "engine knocking".to_string(),
        };
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![TextPart { text: &request.prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be a mechanic");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "engine knocking");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(
            "key".to_string(),
            "gemini-1.5-flash".to_string(),
            "http://localhost:9999/v1beta/".to_string(),
            Duration::from_secs(5),
            0.4,
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
