//! Prompt enhancement: turn terse marker prompts into detailed image prompts.
//!
//! For each placeholder the enhancer composes an instruction from the raw
//! marker prompt and the context window of the preceding text, then asks the
//! text-generation capability for a single descriptive paragraph suitable
//! for an image generator.
//!
//! All placeholders are enhanced concurrently — there is no data dependency
//! between them — and the stage **cannot fail**: a capability error, an
//! empty response, or a timeout makes that one placeholder fall back to its
//! raw prompt, logged and reported but never propagated. The stage always
//! returns exactly one [`EnhancedPrompt`] per placeholder, in placeholder
//! order regardless of completion order.

use crate::capability::TextGenerator;
use crate::config::SynthesisConfig;
use crate::error::SlotError;
use crate::pipeline::context::context_window;
use crate::pipeline::parse::ParsedDraft;
use crate::pipeline::postprocess::clean_enhanced_prompt;
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// The prompt that will be sent to the image generator for one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedPrompt {
    /// Placeholder index this prompt belongs to.
    pub index: usize,
    /// The enhanced prompt, or the raw marker prompt on fallback.
    pub text: String,
    /// Why enhancement fell back, if it did. Informational only.
    pub error: Option<SlotError>,
}

impl EnhancedPrompt {
    /// True when this prompt is the raw-marker fallback.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Enhance a single placeholder prompt.
///
/// Never errors: every failure path returns the raw prompt as fallback with
/// the cause recorded in [`EnhancedPrompt::error`].
pub async fn enhance_one(
    text_gen: &Arc<dyn TextGenerator>,
    index: usize,
    raw_prompt: &str,
    context: &str,
    timeout_secs: u64,
) -> EnhancedPrompt {
    let instruction = prompts::enhance_prompt(raw_prompt, context);

    let fallback = |error: SlotError| {
        warn!("Placeholder {}: {} — using raw prompt", index, error);
        EnhancedPrompt {
            index,
            text: raw_prompt.to_string(),
            error: Some(error),
        }
    };

    match timeout(
        Duration::from_secs(timeout_secs),
        text_gen.generate_text(&instruction),
    )
    .await
    {
        Ok(Ok(response)) => {
            let cleaned = clean_enhanced_prompt(&response);
            if cleaned.is_empty() {
                return fallback(SlotError::EnhancementFailed {
                    index,
                    detail: "empty response".into(),
                });
            }
            debug!("Placeholder {}: enhanced to {} chars", index, cleaned.len());
            EnhancedPrompt {
                index,
                text: cleaned,
                error: None,
            }
        }
        Ok(Err(e)) => fallback(SlotError::EnhancementFailed {
            index,
            detail: e.to_string(),
        }),
        Err(_) => fallback(SlotError::Timeout {
            index,
            secs: timeout_secs,
        }),
    }
}

/// Enhance every placeholder in the draft concurrently.
///
/// Returns exactly `parsed.placeholders.len()` prompts, sorted by
/// placeholder index — completion order never leaks into the result.
pub async fn enhance_all(
    text_gen: &Arc<dyn TextGenerator>,
    parsed: &ParsedDraft,
    config: &SynthesisConfig,
) -> Vec<EnhancedPrompt> {
    let total = parsed.placeholders.len();

    let mut enhanced: Vec<EnhancedPrompt> = stream::iter(parsed.placeholders.iter().map(|p| {
        let text_gen = Arc::clone(text_gen);
        let window = context_window(&p.preceding_text, config.context_tokens);
        let raw = p.raw_prompt.clone();
        let index = p.index;
        let timeout_secs = config.enhance_timeout_secs;
        let callback = config.progress_callback.clone();
        async move {
            let prompt = enhance_one(&text_gen, index, &raw, &window, timeout_secs).await;
            if let (Some(cb), Some(err)) = (&callback, &prompt.error) {
                cb.on_slot_error(index, total, &err.to_string());
            }
            prompt
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    enhanced.sort_by_key(|e| e.index);
    enhanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate_text(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Ok("  A polished, detailed prompt.  ".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate_text(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Err(CapabilityError::Api("quota exceeded".into()))
        }
    }

    struct EmptyGenerator;

    #[async_trait]
    impl TextGenerator for EmptyGenerator {
        async fn generate_text(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Ok("   ".to_string())
        }
    }

    #[tokio::test]
    async fn success_uses_cleaned_response() {
        let gen: Arc<dyn TextGenerator> = Arc::new(EchoGenerator);
        let p = enhance_one(&gen, 0, "a cat", "cats are mammals", 5).await;
        assert_eq!(p.text, "A polished, detailed prompt.");
        assert!(!p.is_fallback());
    }

    #[tokio::test]
    async fn api_error_falls_back_to_raw_prompt() {
        let gen: Arc<dyn TextGenerator> = Arc::new(FailingGenerator);
        let p = enhance_one(&gen, 3, "a dog", "", 5).await;
        assert_eq!(p.text, "a dog");
        assert!(p.is_fallback());
        assert!(matches!(
            p.error,
            Some(SlotError::EnhancementFailed { index: 3, .. })
        ));
        // Fallback prompts compare by value, error cause included.
        assert_eq!(p, p.clone());
    }

    #[tokio::test]
    async fn empty_response_falls_back() {
        let gen: Arc<dyn TextGenerator> = Arc::new(EmptyGenerator);
        let p = enhance_one(&gen, 1, "a graph", "context", 5).await;
        assert_eq!(p.text, "a graph");
        assert!(p.is_fallback());
    }

    #[tokio::test]
    async fn enhance_all_preserves_placeholder_order() {
        use crate::pipeline::parse::parse_draft;

        let gen: Arc<dyn TextGenerator> = Arc::new(EchoGenerator);
        let parsed = parse_draft("a [IMAGE: one] b [IMAGE: two] c [IMAGE: three] d");
        let config = SynthesisConfig::default();

        let enhanced = enhance_all(&gen, &parsed, &config).await;
        assert_eq!(enhanced.len(), 3);
        for (i, e) in enhanced.iter().enumerate() {
            assert_eq!(e.index, i);
        }
    }
}
