//! # note2chapter
//!
//! Turn a photographed page of handwritten notes into an illustrated
//! textbook chapter using generative models.
//!
//! ## Why this crate?
//!
//! Raw lecture notes are terse, unordered, and hard to revise from. This
//! crate digitizes a scanned note, rewrites it as a structured chapter, and
//! generates contextual illustrations where the text calls for them — the
//! model marks illustration points inline with `[IMAGE: ...]` placeholders
//! and the pipeline resolves each one into a generated image, keeping text
//! and images in strict document order even when some generations fail.
//!
//! ## Pipeline Overview
//!
//! ```text
//! note photo / PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, sniff type
//!  ├─ 2. Digitize   transcribe the note to clean text          (fatal on error)
//!  ├─ 3. Compose    draft a chapter with [IMAGE: ...] markers  (fatal on error)
//!  ├─ 4. Parse      split draft into text segments + placeholders
//!  ├─ 5. Enhance    concurrent prompt enrichment, context-aware (falls back)
//!  ├─ 6. Illustrate concurrent image generation into indexed slots (may skip)
//!  └─ 7. Assemble   ordered text/image block sequence + stats
//! ```
//!
//! Stages 5 and 6 fan out up to `concurrency` calls at once. A failure in
//! either affects only its own placeholder: enhancement falls back to the
//! raw marker prompt, and a failed image simply leaves that position
//! unillustrated. The surrounding text never shifts or disappears.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use note2chapter::{synthesize, SynthesisConfig};
//! use note2chapter::providers::gemini::GeminiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY from the environment.
//!     let capabilities = GeminiClient::from_env()?.into_capabilities();
//!     let config = SynthesisConfig::default();
//!
//!     let chapter = synthesize("notes.jpg", &capabilities, &config).await?;
//!     println!("{} blocks, {}/{} illustrated",
//!         chapter.blocks.len(),
//!         chapter.stats.images_generated,
//!         chapter.stats.placeholders);
//!     Ok(())
//! }
//! ```
//!
//! Any backend works: implement [`Digitizer`], [`TextGenerator`], and
//! [`ImageGenerator`] and bundle them in a [`CapabilitySet`].
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `note2chapter` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `gemini` | on      | Enables the built-in Gemini/Imagen provider |
//!
//! Disable both when bringing your own capabilities:
//! ```toml
//! note2chapter = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capability;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod providers;
pub mod stream;
pub mod study;
pub mod synthesize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capability::{
    CapabilityError, CapabilitySet, Digitizer, GeneratedImage, ImageGenerator, SourceDocument,
    TextGenerator,
};
pub use config::{SynthesisConfig, SynthesisConfigBuilder, DEFAULT_CONTEXT_TOKENS};
pub use error::{ChapterError, SlotError};
pub use output::{ChapterOutput, ContentBlock, SynthesisStats};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, SynthesisProgressCallback};
pub use stream::{illustrate_stream, SlotStream};
pub use study::{generate_quiz, summarize, translate, QuizQuestion};
pub use synthesize::{
    illustrate_draft, synthesize, synthesize_document, synthesize_from_notes, synthesize_sync,
    write_chapter_markdown,
};
