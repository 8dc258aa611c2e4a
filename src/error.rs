//! Error types for the note2chapter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ChapterError`] — **Fatal**: the synthesis cannot produce a chapter at
//!   all (unreadable input, digitization failed, chapter composition failed).
//!   Returned as `Err(ChapterError)` from the top-level entry points.
//!
//! * [`SlotError`] — **Non-fatal**: a single placeholder's enhancement or
//!   image generation failed but every other placeholder is fine. Stored
//!   inside [`crate::pipeline::illustrate::ImageSlot`] so the chapter is
//!   still assembled with that illustration simply missing.
//!
//! The separation encodes the propagation policy directly in the types: a
//! partially illustrated chapter is a valid success outcome, so nothing a
//! single placeholder does can surface as `Err` to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the note2chapter library.
///
/// Per-placeholder failures use [`SlotError`] and are stored in their slot
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum ChapterError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The payload is neither a supported image format nor a PDF.
    #[error("Unsupported document type for '{input}'\nSupported: PNG, JPEG, WebP, GIF, PDF. First bytes: {magic:?}")]
    UnsupportedMediaType { input: String, magic: [u8; 4] },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The digitization capability failed; nothing downstream has meaning.
    #[error("Failed to digitize the note: {detail}\nCheck the image is legible and try again.")]
    DigitizationFailed { detail: String },

    /// Chapter-text composition failed; there is no draft to illustrate.
    #[error("Failed to compose the chapter text: {detail}")]
    CompositionFailed { detail: String },

    /// The composed draft was empty after cleanup.
    #[error("Chapter composition produced an empty draft")]
    EmptyDraft,

    /// A study-aid call (summary, translation, quiz) failed.
    #[error("Failed to {action}: {detail}")]
    StudyAidFailed { action: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single placeholder.
///
/// Stored alongside the placeholder's image slot. The surrounding chapter is
/// assembled regardless; the affected position simply contributes no image
/// block (and, for enhancement, falls back to the raw placeholder prompt).
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SlotError {
    /// Prompt enhancement failed; the raw placeholder prompt was used instead.
    #[error("Placeholder {index}: prompt enhancement failed: {detail}")]
    EnhancementFailed { index: usize, detail: String },

    /// Image generation failed; the slot stays empty.
    #[error("Placeholder {index}: image generation failed: {detail}")]
    ImageFailed { index: usize, detail: String },

    /// A capability call exceeded its configured timeout.
    #[error("Placeholder {index}: call timed out after {secs}s")]
    Timeout { index: usize, secs: u64 },
}

impl SlotError {
    /// The placeholder index this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            SlotError::EnhancementFailed { index, .. }
            | SlotError::ImageFailed { index, .. }
            | SlotError::Timeout { index, .. } => *index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digitization_failed_display() {
        let e = ChapterError::DigitizationFailed {
            detail: "API quota exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("digitize"), "got: {msg}");
        assert!(msg.contains("API quota exceeded"));
    }

    #[test]
    fn unsupported_media_type_display() {
        let e = ChapterError::UnsupportedMediaType {
            input: "notes.bin".into(),
            magic: [0, 1, 2, 3],
        };
        assert!(e.to_string().contains("notes.bin"));
    }

    #[test]
    fn slot_error_index() {
        assert_eq!(
            SlotError::EnhancementFailed {
                index: 2,
                detail: "x".into()
            }
            .index(),
            2
        );
        assert_eq!(
            SlotError::Timeout { index: 5, secs: 60 }.index(),
            5
        );
    }

    #[test]
    fn slot_errors_compare_by_value() {
        let a = SlotError::ImageFailed {
            index: 1,
            detail: "safety filter".into(),
        };
        assert_eq!(a, a.clone());
        assert_ne!(a, SlotError::Timeout { index: 1, secs: 5 });
        assert_ne!(
            a,
            SlotError::ImageFailed {
                index: 2,
                detail: "safety filter".into()
            }
        );
    }

    #[test]
    fn image_failed_display() {
        let e = SlotError::ImageFailed {
            index: 1,
            detail: "safety filter".into(),
        };
        assert!(e.to_string().contains("Placeholder 1"));
        assert!(e.to_string().contains("safety filter"));
    }
}
