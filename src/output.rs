//! Output types: the assembled chapter and its statistics.
//!
//! The externally consumed artifact is [`ChapterOutput::blocks`] — an ordered
//! sequence of [`ContentBlock`] in document reading order. A renderer walks
//! the sequence top to bottom; it never needs to know about placeholders,
//! slots, or which illustrations failed. Everything serialises with serde so
//! the sequence can cross a process boundary as JSON unchanged.

use crate::capability::GeneratedImage;
use serde::{Deserialize, Serialize};

/// The smallest unit of final chapter output: a text run or an image with
/// its caption.
///
/// Serialises with an external `type` tag (`"text"` / `"image"`) so
/// renderers can dispatch on it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// A run of chapter text (Markdown), trimmed, never empty.
    Text {
        /// The text content.
        content: String,
    },
    /// A generated illustration with accessible caption text.
    Image {
        /// The image payload.
        image: GeneratedImage,
        /// Caption / alt text — the prompt the image was generated from.
        alt_text: String,
    },
}

impl ContentBlock {
    /// True for `Text` blocks.
    pub fn is_text(&self) -> bool {
        matches!(self, ContentBlock::Text { .. })
    }

    /// True for `Image` blocks.
    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }
}

/// Counters and timings for one synthesis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisStats {
    /// Image placeholders found in the chapter draft.
    pub placeholders: usize,
    /// Placeholders whose enhancement failed and fell back to the raw prompt.
    pub enhancement_fallbacks: usize,
    /// Placeholders that received a generated image.
    pub images_generated: usize,
    /// Placeholders whose image generation failed or timed out.
    pub images_failed: usize,
    /// Wall-clock time spent digitizing, in milliseconds.
    pub digitize_duration_ms: u64,
    /// Wall-clock time spent composing the chapter draft, in milliseconds.
    pub compose_duration_ms: u64,
    /// Wall-clock time of the prompt-enhancement fan-out, in milliseconds.
    pub enhance_duration_ms: u64,
    /// Wall-clock time of the image-generation fan-out, in milliseconds.
    pub image_duration_ms: u64,
    /// Total wall-clock time of the run, in milliseconds.
    pub total_duration_ms: u64,
}

/// The complete result of a synthesis run.
///
/// Returned `Ok` even when some illustrations failed — check
/// [`SynthesisStats::images_failed`]. A chapter with some concepts
/// illustrated and others not is a valid, expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterOutput {
    /// The ordered block sequence, in document reading order.
    pub blocks: Vec<ContentBlock>,
    /// The digitized note text (empty when synthesis started from a draft).
    pub digitized_text: String,
    /// The cleaned chapter draft the blocks were assembled from, markers
    /// included. Useful for debugging and for re-running illustration.
    pub draft: String,
    /// Counters and timings.
    pub stats: SynthesisStats,
}

impl ChapterOutput {
    /// Iterate over the text blocks only.
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Text { content } => Some(content.as_str()),
            ContentBlock::Image { .. } => None,
        })
    }

    /// Iterate over the image blocks only.
    pub fn image_blocks(&self) -> impl Iterator<Item = (&GeneratedImage, &str)> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::Image { image, alt_text } => Some((image, alt_text.as_str())),
            ContentBlock::Text { .. } => None,
        })
    }
}
