//! Gemini-backed capabilities over the Generative Language REST API.
//!
//! One [`GeminiClient`] implements all three capability traits:
//!
//! * [`Digitizer`] and [`TextGenerator`] via `models/{model}:generateContent`
//! * [`ImageGenerator`] via `models/{image_model}:predict` (Imagen)
//!
//! Authentication is a plain API key, taken from `GEMINI_API_KEY` by
//! [`GeminiClient::from_env`] or passed explicitly to [`GeminiClient::new`].
//! The key is sent as the `x-goog-api-key` header, never logged.
//!
//! The client holds a single `reqwest::Client` and is cheap to clone; the
//! usual pattern is one `Arc<GeminiClient>` shared across all three slots of
//! a [`CapabilitySet`] (see [`GeminiClient::into_capabilities`]).

use crate::capability::{
    CapabilityError, CapabilitySet, Digitizer, GeneratedImage, ImageGenerator, SourceDocument,
    TextGenerator,
};
use crate::error::ChapterError;
use crate::prompts;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Gemini REST client implementing [`Digitizer`], [`TextGenerator`], and
/// [`ImageGenerator`].
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    text_model: String,
    image_model: String,
    digitize_instruction: Option<String>,
}

impl GeminiClient {
    /// Create a client with the default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            digitize_instruction: None,
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ChapterError> {
        let key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            ChapterError::InvalidConfig(
                "GEMINI_API_KEY environment variable not set".into(),
            )
        })?;
        if key.trim().is_empty() {
            return Err(ChapterError::InvalidConfig(
                "GEMINI_API_KEY environment variable is empty".into(),
            ));
        }
        Ok(Self::new(key))
    }

    /// Override the text model (digitization, composition, enhancement).
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Override the image model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Override the API base URL (for proxies and test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the digitization instruction sent with the note image.
    pub fn with_digitize_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.digitize_instruction = Some(instruction.into());
        self
    }

    /// Wrap this client into a [`CapabilitySet`], one shared `Arc` serving
    /// all three capability slots.
    pub fn into_capabilities(self) -> CapabilitySet {
        let shared = Arc::new(self);
        CapabilitySet::new(shared.clone(), shared.clone(), shared)
    }

    async fn generate_content(&self, parts: Vec<Part>) -> Result<String, CapabilityError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.text_model
        );
        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Gemini generateContent failed: HTTP {}", status);
            return Err(CapabilityError::Api(format!(
                "HTTP {status}: {}",
                truncate(&detail, 300)
            )));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(transport_error)?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CapabilityError::EmptyResponse);
        }
        debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Digitizer for GeminiClient {
    async fn digitize(&self, document: &SourceDocument) -> Result<String, CapabilityError> {
        let instruction = self
            .digitize_instruction
            .as_deref()
            .unwrap_or(prompts::DIGITIZE_PROMPT);

        let parts = vec![
            Part {
                text: Some(instruction.to_string()),
                inline_data: None,
            },
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: document.media_type.clone(),
                    data: STANDARD.encode(&document.bytes),
                }),
            },
        ];
        self.generate_content(parts).await
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, CapabilityError> {
        let parts = vec![Part {
            text: Some(prompt.to_string()),
            inline_data: None,
        }];
        self.generate_content(parts).await
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CapabilityError> {
        let url = format!("{}/models/{}:predict", self.base_url, self.image_model);
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "4:3".to_string(),
                output_mime_type: "image/jpeg".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Imagen predict failed: HTTP {}", status);
            return Err(CapabilityError::Api(format!(
                "HTTP {status}: {}",
                truncate(&detail, 300)
            )));
        }

        let parsed: PredictResponse = response.json().await.map_err(transport_error)?;

        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or(CapabilityError::EmptyResponse)?;
        if prediction.bytes_base64_encoded.is_empty() {
            return Err(CapabilityError::EmptyResponse);
        }

        Ok(GeneratedImage::new(
            prediction.bytes_base64_encoded,
            prediction
                .mime_type
                .unwrap_or_else(|| "image/jpeg".to_string()),
        ))
    }
}

fn transport_error(e: reqwest::Error) -> CapabilityError {
    if e.is_connect() || e.is_timeout() {
        CapabilityError::Transport(e.to_string())
    } else {
        CapabilityError::Api(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
struct PredictParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    #[serde(rename = "outputMimeType")]
    output_mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded", default)]
    bytes_base64_encoded: String,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_content_response_parses() {
        let json = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn predict_response_parses() {
        let json = r#"{
            "predictions": [{ "bytesBase64Encoded": "aW1n", "mimeType": "image/jpeg" }]
        }"#;
        let parsed: PredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.predictions[0].bytes_base64_encoded, "aW1n");
    }

    #[test]
    fn empty_candidates_is_default() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn predict_request_serializes_camel_case() {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: "a diagram".into(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "4:3".into(),
                output_mime_type: "image/jpeg".into(),
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"sampleCount\":1"));
        assert!(json.contains("\"aspectRatio\":\"4:3\""));
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = GeminiClient::new("super-secret");
        let dbg = format!("{:?}", client);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn into_capabilities_shares_one_client() {
        let caps = GeminiClient::new("key").into_capabilities();
        // All three slots are populated; the Debug impl confirms the wiring.
        assert!(format!("{:?}", caps).contains("CapabilitySet"));
    }
}
