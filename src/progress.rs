//! Progress-callback trait for synthesis stage and per-slot events.
//!
//! Inject an [`Arc<dyn SynthesisProgressCallback>`] via
//! [`crate::config::SynthesisConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline moves through its stages and processes
//! each placeholder.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database
//! record, or a terminal progress bar — without the library knowing anything
//! about how the host application communicates. The trait is `Send + Sync` so
//! it works correctly when placeholders are processed concurrently.

use std::fmt;
use std::sync::Arc;

/// The synthesis pipeline's stages, in execution order.
///
/// Only [`Stage::Digitizing`] and [`Stage::ComposingChapter`] can fail the
/// run; failures inside the two fan-out stages are absorbed per placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Waiting for work.
    Idle,
    /// Transcribing the source document into text.
    Digitizing,
    /// Composing the chapter draft with inline image markers.
    ComposingChapter,
    /// Fan-out: enhancing each placeholder prompt with its context window.
    EnhancingPrompts,
    /// Fan-out: generating one image per enhanced prompt.
    GeneratingImages,
    /// Merging text segments and image slots into the final block sequence.
    Assembling,
    /// Synthesis finished; the block sequence is ready.
    Done,
    /// A fatal stage failed; no chapter was produced.
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::Digitizing => "digitizing",
            Stage::ComposingChapter => "composing chapter",
            Stage::EnhancingPrompts => "enhancing prompts",
            Stage::GeneratingImages => "generating images",
            Stage::Assembling => "assembling",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the synthesis pipeline as it progresses.
///
/// Implementations must be `Send + Sync` (slot events fire concurrently
/// during the fan-out stages). All methods have default no-op
/// implementations so callers only override what they care about.
///
/// # Thread safety
///
/// `on_slot_start`, `on_slot_complete`, and `on_slot_error` may be called
/// concurrently from different tasks. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives (e.g. `Mutex`,
/// `AtomicUsize`).
pub trait SynthesisProgressCallback: Send + Sync {
    /// Called on every stage transition, including the terminal
    /// [`Stage::Done`] / [`Stage::Failed`].
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once after parsing, before any fan-out work.
    ///
    /// # Arguments
    /// * `placeholders` — number of image placeholders found in the draft
    fn on_fanout_start(&self, placeholders: usize) {
        let _ = placeholders;
    }

    /// Called just before a capability call is issued for a placeholder.
    ///
    /// # Arguments
    /// * `index` — 0-based placeholder index
    /// * `total` — total placeholders in the draft
    fn on_slot_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a placeholder's image is successfully generated.
    fn on_slot_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a placeholder's call fails or times out.
    ///
    /// Enhancement failures report here too, even though the placeholder
    /// continues with its raw prompt.
    fn on_slot_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after assembly with the final tallies.
    ///
    /// # Arguments
    /// * `placeholders` — total placeholders
    /// * `illustrated`  — placeholders that received an image
    fn on_synthesis_complete(&self, placeholders: usize, illustrated: usize) {
        let _ = (placeholders, illustrated);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SynthesisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SynthesisConfig`].
pub type ProgressCallback = Arc<dyn SynthesisProgressCallback>;
