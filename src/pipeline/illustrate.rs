//! Image generation: one concurrent call per enhanced prompt, into a fixed
//! slot vector.
//!
//! ## The index-aligned slot invariant
//!
//! The stage always returns exactly one [`ImageSlot`] per enhanced prompt,
//! at the slot position matching the placeholder index, **even when the call
//! failed** — a failed slot carries `image: None` plus the error. The slot
//! vector is never filtered or compacted before assembly. Filtering failed
//! results out and zipping the remainder against the placeholders would
//! shift every later image onto the wrong text segment the moment any single
//! generation fails; the explicit "absent" marker keeps image-to-position
//! alignment correct under partial failure.
//!
//! No retries are performed: a failed slot is final for this invocation.

use crate::capability::{GeneratedImage, ImageGenerator};
use crate::config::SynthesisConfig;
use crate::error::SlotError;
use crate::pipeline::enhance::EnhancedPrompt;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// The result container for one placeholder's image, present even when
/// generation failed.
#[derive(Debug, Clone)]
pub struct ImageSlot {
    /// Placeholder index this slot belongs to.
    pub index: usize,
    /// The generated image, or `None` when generation failed or timed out.
    pub image: Option<GeneratedImage>,
    /// Caption / alt text — the prompt the image was generated from.
    /// Populated even for failed slots so diagnostics can show what was asked.
    pub alt_text: String,
    /// Why the slot is empty, if it is.
    pub error: Option<SlotError>,
}

impl ImageSlot {
    /// True when the slot holds an image.
    pub fn is_filled(&self) -> bool {
        self.image.is_some()
    }
}

/// Generate the image for a single enhanced prompt.
///
/// Never errors: every failure path yields an empty slot with the cause
/// recorded in [`ImageSlot::error`].
pub async fn illustrate_one(
    image_gen: &Arc<dyn ImageGenerator>,
    prompt: &EnhancedPrompt,
    timeout_secs: u64,
) -> ImageSlot {
    let index = prompt.index;

    let empty = |error: SlotError| {
        warn!("Placeholder {}: {} — slot left empty", index, error);
        ImageSlot {
            index,
            image: None,
            alt_text: prompt.text.clone(),
            error: Some(error),
        }
    };

    match timeout(
        Duration::from_secs(timeout_secs),
        image_gen.generate_image(&prompt.text),
    )
    .await
    {
        Ok(Ok(image)) => {
            debug!(
                "Placeholder {}: generated {} image ({} base64 bytes)",
                index,
                image.mime_type,
                image.data.len()
            );
            ImageSlot {
                index,
                image: Some(image),
                alt_text: prompt.text.clone(),
                error: None,
            }
        }
        Ok(Err(e)) => empty(SlotError::ImageFailed {
            index,
            detail: e.to_string(),
        }),
        Err(_) => empty(SlotError::Timeout {
            index,
            secs: timeout_secs,
        }),
    }
}

/// Generate images for every enhanced prompt concurrently.
///
/// Returns exactly `prompts.len()` slots sorted by placeholder index;
/// completion order of the concurrent calls never affects slot order.
pub async fn illustrate_all(
    image_gen: &Arc<dyn ImageGenerator>,
    prompts: &[EnhancedPrompt],
    config: &SynthesisConfig,
) -> Vec<ImageSlot> {
    let total = prompts.len();

    let mut slots: Vec<ImageSlot> = stream::iter(prompts.iter().map(|prompt| {
        let image_gen = Arc::clone(image_gen);
        let prompt = prompt.clone();
        let timeout_secs = config.image_timeout_secs;
        let callback = config.progress_callback.clone();
        async move {
            if let Some(cb) = &callback {
                cb.on_slot_start(prompt.index, total);
            }
            let slot = illustrate_one(&image_gen, &prompt, timeout_secs).await;
            if let Some(cb) = &callback {
                match &slot.error {
                    None => cb.on_slot_complete(slot.index, total),
                    Some(e) => cb.on_slot_error(slot.index, total, &e.to_string()),
                }
            }
            slot
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    slots.sort_by_key(|s| s.index);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct StubImageGenerator;

    #[async_trait]
    impl ImageGenerator for StubImageGenerator {
        async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, CapabilityError> {
            Ok(GeneratedImage::new("aW1n", "image/jpeg"))
        }
    }

    /// Fails for prompts whose index (read from the queue order) is listed.
    struct SelectivelyFailing {
        fail_prompts: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageGenerator for SelectivelyFailing {
        async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CapabilityError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            if self.fail_prompts.contains(prompt) {
                Err(CapabilityError::Api("safety filter".into()))
            } else {
                Ok(GeneratedImage::new("aW1n", "image/jpeg"))
            }
        }
    }

    fn prompt(index: usize, text: &str) -> EnhancedPrompt {
        EnhancedPrompt {
            index,
            text: text.to_string(),
            error: None,
        }
    }

    #[tokio::test]
    async fn success_fills_slot_with_alt_text() {
        let gen: Arc<dyn ImageGenerator> = Arc::new(StubImageGenerator);
        let slot = illustrate_one(&gen, &prompt(0, "a labeled diagram"), 5).await;
        assert!(slot.is_filled());
        assert_eq!(slot.alt_text, "a labeled diagram");
        assert!(slot.error.is_none());
    }

    #[tokio::test]
    async fn failure_emits_empty_slot_not_nothing() {
        let gen: Arc<dyn ImageGenerator> = Arc::new(SelectivelyFailing {
            fail_prompts: HashSet::from(["bad".to_string()]),
            calls: Mutex::new(Vec::new()),
        });
        let slot = illustrate_one(&gen, &prompt(2, "bad"), 5).await;
        assert!(!slot.is_filled());
        assert_eq!(slot.index, 2);
        assert!(matches!(
            slot.error,
            Some(SlotError::ImageFailed { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn slot_count_matches_prompt_count_despite_failures() {
        let gen: Arc<dyn ImageGenerator> = Arc::new(SelectivelyFailing {
            fail_prompts: HashSet::from(["p1".to_string(), "p3".to_string()]),
            calls: Mutex::new(Vec::new()),
        });
        let prompts = vec![
            prompt(0, "p0"),
            prompt(1, "p1"),
            prompt(2, "p2"),
            prompt(3, "p3"),
        ];
        let config = SynthesisConfig::default();

        let slots = illustrate_all(&gen, &prompts, &config).await;

        assert_eq!(slots.len(), 4);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.index, i);
        }
        assert!(slots[0].is_filled());
        assert!(!slots[1].is_filled());
        assert!(slots[2].is_filled());
        assert!(!slots[3].is_filled());
    }
}
