//! Streaming illustration API: emit image slots as they complete.
//!
//! ## Why stream?
//!
//! Image generation dominates wall-clock time. A streams-based API lets a
//! host application show each illustration the moment it is ready — a
//! progressive page fill — instead of staring at a spinner until the whole
//! fan-in barrier clears.
//!
//! Unlike the eager [`crate::synthesize::illustrate_draft`] which returns
//! only after assembly, [`illustrate_stream`] yields one [`ImageSlot`] per
//! placeholder as each generation finishes. Slots arrive in **completion
//! order**, not placeholder order; the `index` field says where each one
//! belongs. Failed generations still yield their (empty) slot, so a
//! consumer always receives exactly as many slots as there are
//! placeholders. Collect the slots, sort by `index`, and feed them to
//! [`crate::pipeline::assemble::assemble`] to produce the final sequence.

use crate::capability::CapabilitySet;
use crate::config::SynthesisConfig;
use crate::pipeline::enhance;
use crate::pipeline::illustrate::{illustrate_one, ImageSlot};
use crate::pipeline::parse::{self, ParsedDraft};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of image slots.
pub type SlotStream = Pin<Box<dyn Stream<Item = ImageSlot> + Send>>;

/// Illustrate a chapter draft, streaming slots as they are ready.
///
/// Prompt enhancement runs to completion first (it is fast relative to
/// image generation and the two stages are sequentially dependent); the
/// returned stream then emits image slots in completion order.
///
/// Also returns the [`ParsedDraft`] so the caller can assemble the final
/// block sequence once the stream is drained.
pub async fn illustrate_stream(
    draft: &str,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> (ParsedDraft, SlotStream) {
    let parsed = parse::parse_draft(draft);
    info!(
        "Streaming illustration: {} placeholders",
        parsed.placeholders.len()
    );

    let enhanced = enhance::enhance_all(&capabilities.text, &parsed, config).await;

    let image_gen = Arc::clone(&capabilities.image);
    let timeout_secs = config.image_timeout_secs;
    let concurrency = config.concurrency;

    let s = stream::iter(enhanced.into_iter().map(move |prompt| {
        let image_gen = Arc::clone(&image_gen);
        async move { illustrate_one(&image_gen, &prompt, timeout_secs).await }
    }))
    .buffer_unordered(concurrency);

    (parsed, Box::pin(s))
}
