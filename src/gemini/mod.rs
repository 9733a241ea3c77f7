use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::Result;

/// Text produced by a generative model call
#[derive(Debug, Clone)]
pub struct GeneratedText {
    pub text: String,
}

/// Generative text model consumed through two synchronous, network-bound
/// operations. `GeminiClient` is the production implementation; tests mock
/// this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt
    async fn generate(&self, prompt: &str) -> Result<GeneratedText>;

    /// Count the tokens the model would consume for a text
    async fn count_tokens(&self, text: &str) -> Result<u64>;
}

/// Client for the Google Gemini generateContent / countTokens API.
///
/// Constructed once from configuration and shared by reference; the API key
/// and decoding parameters are fixed at construction and never mutated.
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    generation_config: GenerationConfig,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    #[serde(rename = "totalTokens")]
    total_tokens: u64,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Fails when no API key is available - callers treat this as fatal
    /// before any loader runs.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: "text/plain".to_string(),
            },
        })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            GEMINI_BASE_URL, self.model, operation, self.api_key
        )
    }

    fn contents(text: &str) -> Vec<Content> {
        vec![Content {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }]
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedText> {
        let request = GenerateRequest {
            contents: Self::contents(prompt),
            generation_config: self.generation_config.clone(),
        };

        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = extract_candidate_text(&body)
            .ok_or_else(|| anyhow!("Gemini API returned no candidates"))?;

        Ok(GeneratedText { text })
    }

    async fn count_tokens(&self, text: &str) -> Result<u64> {
        let request = CountTokensRequest {
            contents: Self::contents(text),
        };

        let response = self
            .client
            .post(self.endpoint("countTokens"))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let body: CountTokensResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        Ok(body.total_tokens)
    }
}

/// Join the text parts of the first candidate, if any
fn extract_candidate_text(response: &GenerateResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    if content.parts.is_empty() {
        return None;
    }
    Some(
        content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect(),
    )
}
