//! Assembly: merge text segments and image slots into the final ordered
//! block sequence.
//!
//! The assembler is pure and synchronous — given identical segments and
//! slots it produces a byte-identical block sequence. It walks the segments
//! in document order; after segment `i` it looks up slot `i` by index. A
//! filled slot becomes an image block; an empty slot contributes nothing,
//! so a failed illustration silently collapses without shifting any later
//! image onto the wrong position. Text segments are trimmed and empty ones
//! dropped, so the output never contains empty blocks and no marker text
//! ever leaks through.

use crate::output::ContentBlock;
use crate::pipeline::illustrate::ImageSlot;

/// Merge `segments` and index-aligned `slots` into the final block sequence.
///
/// `segments.len()` must be `slots.len() + 1` (the parser guarantees this
/// shape); extra slots beyond the last interior position are ignored rather
/// than panicking.
pub fn assemble(segments: &[String], slots: &[ImageSlot]) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(segments.len() + slots.len());

    for (i, segment) in segments.iter().enumerate() {
        let text = segment.trim();
        if !text.is_empty() {
            blocks.push(ContentBlock::Text {
                content: text.to_string(),
            });
        }

        if i < segments.len().saturating_sub(1) {
            if let Some(slot) = slots.get(i) {
                if let Some(image) = &slot.image {
                    blocks.push(ContentBlock::Image {
                        image: image.clone(),
                        alt_text: slot.alt_text.clone(),
                    });
                }
            }
        }
    }

    blocks
}
