//! Configuration types for chapter synthesis.
//!
//! All synthesis behaviour is controlled through [`SynthesisConfig`], built
//! via its [`SynthesisConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ChapterError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default context window: trailing whitespace-delimited tokens of the text
/// segment preceding a placeholder that are fed to the prompt enhancer.
pub const DEFAULT_CONTEXT_TOKENS: usize = 150;

/// Configuration for a note-to-chapter synthesis run.
///
/// Built via [`SynthesisConfig::builder()`] or using
/// [`SynthesisConfig::default()`].
///
/// # Example
/// ```rust
/// use note2chapter::SynthesisConfig;
///
/// let config = SynthesisConfig::builder()
///     .concurrency(4)
///     .image_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SynthesisConfig {
    /// Number of concurrent capability calls within a fan-out stage. Default: 10.
    ///
    /// Both fan-out stages (prompt enhancement, image generation) are
    /// network-bound. Issuing 10 calls at once typically cuts wall-clock time
    /// by 8–9× compared to sequential synthesis. If you hit rate-limit errors
    /// (`429`), lower this.
    pub concurrency: usize,

    /// Context window size in whitespace-delimited tokens. Default: 150.
    ///
    /// The prompt enhancer sees the trailing `context_tokens` tokens of the
    /// text segment immediately preceding each placeholder. This bounds
    /// enhancement input cost and keeps the enhanced prompt anchored to the
    /// nearest preceding discussion. Earlier segments are never included,
    /// even when the preceding segment is very short.
    pub context_tokens: usize,

    /// Per-call timeout for prompt enhancement, in seconds. Default: 60.
    ///
    /// A timed-out enhancement is treated exactly like a failed one: the
    /// placeholder falls back to its raw prompt and the run continues.
    pub enhance_timeout_secs: u64,

    /// Per-call timeout for image generation, in seconds. Default: 120.
    ///
    /// Image models are slower than text models; 120 s covers the slow tail
    /// without letting one stuck call hold the whole fan-in barrier hostage.
    /// A timed-out call leaves its slot empty, like any other failure.
    pub image_timeout_secs: u64,

    /// Download timeout for URL inputs, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom chapter-composition instruction template. If None, uses the
    /// built-in default. The notes text is appended by the pipeline.
    /// (The digitization instruction is a provider concern; see the
    /// provider's own configuration.)
    pub compose_prompt: Option<String>,

    /// Progress callback invoked on stage transitions and per-slot events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            enhance_timeout_secs: 60,
            image_timeout_secs: 120,
            download_timeout_secs: 120,
            compose_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("concurrency", &self.concurrency)
            .field("context_tokens", &self.context_tokens)
            .field("enhance_timeout_secs", &self.enhance_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("compose_prompt", &self.compose_prompt.as_deref().map(|_| "<custom>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SynthesisProgressCallback>"),
            )
            .finish()
    }
}

impl SynthesisConfig {
    /// Create a new builder for `SynthesisConfig`.
    pub fn builder() -> SynthesisConfigBuilder {
        SynthesisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SynthesisConfig`].
#[derive(Debug)]
pub struct SynthesisConfigBuilder {
    config: SynthesisConfig,
}

impl SynthesisConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn context_tokens(mut self, n: usize) -> Self {
        self.config.context_tokens = n.max(1);
        self
    }

    pub fn enhance_timeout_secs(mut self, secs: u64) -> Self {
        self.config.enhance_timeout_secs = secs;
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn compose_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.compose_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SynthesisConfig, ChapterError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ChapterError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.context_tokens == 0 {
            return Err(ChapterError::InvalidConfig(
                "Context window must be ≥ 1 token".into(),
            ));
        }
        if c.enhance_timeout_secs == 0 || c.image_timeout_secs == 0 {
            return Err(ChapterError::InvalidConfig(
                "Per-call timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
