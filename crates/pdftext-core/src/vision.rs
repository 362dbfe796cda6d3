//! Vision OCR through an Azure OpenAI chat-completions deployment
//!
//! Each rendered page is sent as a base64 PNG data URL together with a fixed
//! transcription instruction. One request per page, no retries.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VisionConfig;
use crate::error::ExtractionError;

/// System instruction for verbatim transcription
pub const OCR_SYSTEM_PROMPT: &str = "You are an OCR assistant. Extract ALL text from this \
medical document image exactly as written. Preserve formatting, line breaks, and structure. \
Include all headers, dates, names, values, and notes. Do not summarize - extract the complete text.";

const OCR_USER_PROMPT: &str = "Extract all text from this medical document page:";

/// Recognizes the text on one rendered page
#[async_trait]
pub trait VisionRecognizer: Send + Sync {
    /// `page_ordinal` is 1-based and only used for diagnostics
    async fn recognize(&self, png: &[u8], page_ordinal: usize) -> Result<String, ExtractionError>;
}

/// Azure OpenAI vision recognizer
pub struct AzureVisionRecognizer {
    client: reqwest::Client,
    completions_url: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl AzureVisionRecognizer {
    /// Build from configuration; incomplete configuration is `VisionUnavailable`
    pub fn from_config(config: &VisionConfig) -> Result<Self, ExtractionError> {
        let (Some(endpoint), Some(api_key), Some(deployment)) =
            (&config.endpoint, &config.api_key, &config.deployment)
        else {
            return Err(ExtractionError::VisionUnavailable(format!(
                "Azure OpenAI not configured (missing {})",
                config.missing_settings().join(", ")
            )));
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ExtractionError::VisionUnavailable(format!("HTTP client setup: {}", e))
            })?;

        Ok(Self {
            client,
            completions_url: completions_url(endpoint, deployment, &config.api_version),
            api_key: api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
pub fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn build_request(png: &[u8], max_tokens: u32, temperature: f32) -> ChatRequest<'static> {
    let data_url = format!("data:image/png;base64,{}", BASE64.encode(png));
    ChatRequest {
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(OCR_SYSTEM_PROMPT),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: OCR_USER_PROMPT,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url,
                            detail: "high",
                        },
                    },
                ]),
            },
        ],
        max_tokens,
        temperature,
    }
}

#[async_trait]
impl VisionRecognizer for AzureVisionRecognizer {
    async fn recognize(&self, png: &[u8], page_ordinal: usize) -> Result<String, ExtractionError> {
        let request = build_request(png, self.max_tokens, self.temperature);
        debug!("Sending page {} ({} bytes PNG) to vision OCR", page_ordinal, png.len());

        let response = self
            .client
            .post(&self.completions_url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout
                } else {
                    ExtractionError::NetworkError(format!("Vision request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!("Vision API error {} on page {}: {}", status, page_ordinal, body);
            return Err(ExtractionError::NetworkError(format!(
                "Vision API error {}",
                status
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ExtractionError::InternalError(format!("Failed to parse vision response: {}", e))
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
