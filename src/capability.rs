//! Capability traits: the seam between the synthesis pipeline and the
//! generative models that power it.
//!
//! The pipeline never talks to a model API directly. It consumes three
//! narrow, object-safe traits — [`Digitizer`], [`TextGenerator`], and
//! [`ImageGenerator`] — bundled into a [`CapabilitySet`]. Anything that can
//! transcribe an image, complete a prompt, and draw a picture can drive the
//! pipeline: a hosted API, a local model, or a scripted mock in tests.
//!
//! Keeping the traits this small has a second benefit: cross-invocation
//! concerns (caching, rate limiting, auth) belong in a wrapper around these
//! traits, not inside the pipeline, which stays stateless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A raw source document: opaque bytes plus a media type.
///
/// Owned by the caller and passed by reference into the pipeline.
/// Typically a photographed or scanned page of handwritten notes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Raw payload bytes (image or PDF data).
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/jpeg` or `application/pdf`.
    pub media_type: String,
}

impl SourceDocument {
    /// Construct a document from bytes and a media type.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }
}

/// A generated image payload: base64 data plus its MIME type.
///
/// Images travel as base64 because that is how every generative image API
/// returns them; decoding to raw bytes is deferred until a caller actually
/// needs to write a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes (no data-URI prefix).
    pub data: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
}

impl GeneratedImage {
    /// Construct an image from base64 data and a MIME type.
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Render as a `data:` URI suitable for direct embedding in HTML/Markdown.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the base64 payload to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        STANDARD.decode(&self.data)
    }
}

/// Error returned by any capability call.
///
/// Deliberately coarse: the pipeline only distinguishes "the call failed"
/// (fall back / empty slot) from "the call produced nothing usable". Rich
/// provider-specific diagnostics belong in the provider's log output.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// The underlying API returned an error.
    #[error("capability API error: {0}")]
    Api(String),

    /// The call succeeded but the response was empty or unusable.
    #[error("capability returned an empty response")]
    EmptyResponse,

    /// Transport-level failure (connection refused, DNS, TLS).
    #[error("capability transport error: {0}")]
    Transport(String),
}

/// Transcribes a source document into clean text.
#[async_trait]
pub trait Digitizer: Send + Sync {
    /// Extract the textual content of `document`.
    async fn digitize(&self, document: &SourceDocument) -> Result<String, CapabilityError>;
}

/// Completes a text prompt. Used for both chapter composition and prompt
/// enhancement.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a text completion for `prompt`.
    async fn generate_text(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Generates exactly one image for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CapabilityError>;
}

/// The full set of capabilities the pipeline needs, shared behind `Arc` so
/// concurrent fan-out tasks can each hold a handle.
#[derive(Clone)]
pub struct CapabilitySet {
    /// Document transcription capability.
    pub digitizer: Arc<dyn Digitizer>,
    /// Text completion capability.
    pub text: Arc<dyn TextGenerator>,
    /// Image generation capability.
    pub image: Arc<dyn ImageGenerator>,
}

impl CapabilitySet {
    /// Bundle three capability implementations.
    pub fn new(
        digitizer: Arc<dyn Digitizer>,
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            digitizer,
            text,
            image,
        }
    }
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("digitizer", &"<dyn Digitizer>")
            .field("text", &"<dyn TextGenerator>")
            .field("image", &"<dyn ImageGenerator>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_round_trip() {
        let img = GeneratedImage::new("aGVsbG8=", "image/png");
        assert_eq!(img.to_data_uri(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(img.decode().unwrap(), b"hello");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        let img = GeneratedImage::new("not base64!!!", "image/png");
        assert!(img.decode().is_err());
    }
}
