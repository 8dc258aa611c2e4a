//! Synthesis entry points: the pipeline orchestrator.
//!
//! A run moves through the stages of [`Stage`] in order: digitize the source
//! document, compose the chapter draft, then two sequential fan-out/fan-in
//! barriers (prompt enhancement, image generation), then pure assembly.
//! Only the first two stages can fail the run — they produce the primary
//! artifact, and without them nothing downstream has meaning. Failures in
//! either fan-out stage are absorbed per placeholder and reflected only as
//! a fallback prompt or a missing illustration.
//!
//! ## Cancellation
//!
//! Every entry point returns a plain future; dropping it cancels the run.
//! No new capability calls are issued after the drop, and in-flight calls
//! are aborted at their next await point. No partial result is observable
//! after cancellation. Callers that need cancel-on-signal can wrap the
//! future in `tokio::select!`.

use crate::capability::{CapabilitySet, SourceDocument};
use crate::config::SynthesisConfig;
use crate::error::ChapterError;
use crate::output::{ChapterOutput, SynthesisStats};
use crate::pipeline::{assemble, enhance, illustrate, input, parse, postprocess};
use crate::progress::Stage;
use crate::prompts;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a note (local file path or HTTP/HTTPS URL) into an illustrated
/// chapter.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ChapterOutput)` on success, even if some illustrations failed
/// (check `output.stats.images_failed`).
///
/// # Errors
/// Returns `Err(ChapterError)` only for fatal errors: unreadable or
/// unsupported input, digitization failure, or chapter-composition failure.
pub async fn synthesize(
    input_str: impl AsRef<str>,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<ChapterOutput, ChapterError> {
    let input_str = input_str.as_ref();
    info!("Starting synthesis: {}", input_str);

    let document = input::resolve_input(input_str, config.download_timeout_secs).await?;
    synthesize_document(&document, capabilities, config).await
}

/// Convert an in-memory [`SourceDocument`] into an illustrated chapter.
///
/// Use this when the note bytes come from an upload, a database, or a
/// camera rather than a file on disk.
pub async fn synthesize_document(
    document: &SourceDocument,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<ChapterOutput, ChapterError> {
    let total_start = Instant::now();

    // ── Stage 1: Digitize ────────────────────────────────────────────────
    set_stage(config, Stage::Digitizing);
    let digitize_start = Instant::now();
    let digitized = match capabilities.digitizer.digitize(document).await {
        Ok(text) => text,
        Err(e) => {
            set_stage(config, Stage::Failed);
            return Err(ChapterError::DigitizationFailed {
                detail: e.to_string(),
            });
        }
    };
    let digitize_duration_ms = digitize_start.elapsed().as_millis() as u64;
    info!(
        "Digitized {} chars in {}ms",
        digitized.len(),
        digitize_duration_ms
    );

    let mut output = synthesize_from_notes(&digitized, capabilities, config).await?;
    output.digitized_text = digitized;
    output.stats.digitize_duration_ms = digitize_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Compose and illustrate a chapter from already-digitized note text.
///
/// The original digitized text is typically kept around by the host
/// application (for search, summaries, quizzes); this entry point lets it
/// re-run chapter synthesis without paying for digitization again.
pub async fn synthesize_from_notes(
    notes: &str,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<ChapterOutput, ChapterError> {
    let total_start = Instant::now();

    // ── Stage 2: Compose the chapter draft ───────────────────────────────
    set_stage(config, Stage::ComposingChapter);
    let compose_start = Instant::now();
    let instruction = match &config.compose_prompt {
        Some(custom) => format!("{custom}\n\nNotes:\n---\n{notes}\n---\n"),
        None => prompts::compose_prompt(notes),
    };
    let raw_draft = match capabilities.text.generate_text(&instruction).await {
        Ok(text) => text,
        Err(e) => {
            set_stage(config, Stage::Failed);
            return Err(ChapterError::CompositionFailed {
                detail: e.to_string(),
            });
        }
    };
    let draft = postprocess::clean_draft(&raw_draft);
    if draft.trim().is_empty() {
        set_stage(config, Stage::Failed);
        return Err(ChapterError::EmptyDraft);
    }
    let compose_duration_ms = compose_start.elapsed().as_millis() as u64;
    info!(
        "Composed draft: {} chars in {}ms",
        draft.len(),
        compose_duration_ms
    );

    let mut output = illustrate_draft(&draft, capabilities, config).await?;
    output.stats.compose_duration_ms = compose_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Run the core illustration pipeline on an existing chapter draft.
///
/// Parses `[IMAGE: ...]` markers, enhances each prompt with its context
/// window, generates one image per placeholder, and assembles the ordered
/// block sequence. Nothing past parsing can fail the run: per-placeholder
/// failures only thin out the illustrations.
pub async fn illustrate_draft(
    draft: &str,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<ChapterOutput, ChapterError> {
    let total_start = Instant::now();

    // ── Parse markers ────────────────────────────────────────────────────
    let parsed = parse::parse_draft(draft);
    let placeholders = parsed.placeholders.len();
    debug!("Parsed draft: {} placeholders", placeholders);
    if let Some(cb) = &config.progress_callback {
        cb.on_fanout_start(placeholders);
    }

    // ── Stage 3: Enhance prompts (fan-out) ───────────────────────────────
    set_stage(config, Stage::EnhancingPrompts);
    let enhance_start = Instant::now();
    let enhanced = enhance::enhance_all(&capabilities.text, &parsed, config).await;
    let enhance_duration_ms = enhance_start.elapsed().as_millis() as u64;
    let enhancement_fallbacks = enhanced.iter().filter(|e| e.is_fallback()).count();
    info!(
        "Enhanced {} prompts ({} fallbacks) in {}ms",
        placeholders, enhancement_fallbacks, enhance_duration_ms
    );

    // ── Stage 4: Generate images (fan-out) ───────────────────────────────
    set_stage(config, Stage::GeneratingImages);
    let image_start = Instant::now();
    let slots = illustrate::illustrate_all(&capabilities.image, &enhanced, config).await;
    let image_duration_ms = image_start.elapsed().as_millis() as u64;
    let images_generated = slots.iter().filter(|s| s.is_filled()).count();
    let images_failed = placeholders - images_generated;
    info!(
        "Generated {}/{} images in {}ms",
        images_generated, placeholders, image_duration_ms
    );

    // ── Stage 5: Assemble ────────────────────────────────────────────────
    set_stage(config, Stage::Assembling);
    let blocks = assemble::assemble(&parsed.segments, &slots);

    set_stage(config, Stage::Done);
    if let Some(cb) = &config.progress_callback {
        cb.on_synthesis_complete(placeholders, images_generated);
    }

    Ok(ChapterOutput {
        blocks,
        digitized_text: String::new(),
        draft: draft.to_string(),
        stats: SynthesisStats {
            placeholders,
            enhancement_fallbacks,
            images_generated,
            images_failed,
            digitize_duration_ms: 0,
            compose_duration_ms: 0,
            enhance_duration_ms,
            image_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        },
    })
}

/// Synchronous wrapper around [`synthesize`].
///
/// Creates a temporary tokio runtime internally.
pub fn synthesize_sync(
    input_str: impl AsRef<str>,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<ChapterOutput, ChapterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ChapterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(synthesize(input_str, capabilities, config))
}

/// Write a chapter to disk as Markdown, with images saved alongside.
///
/// Images are decoded and written as `{stem}-img-{n}.{ext}` next to the
/// Markdown file and referenced with relative links. The Markdown itself is
/// written atomically (temp file + rename) to prevent partial files.
pub async fn write_chapter_markdown(
    output: &ChapterOutput,
    path: impl AsRef<Path>,
) -> Result<(), ChapterError> {
    use crate::output::ContentBlock;

    let path = path.as_ref();
    let write_err = |source: std::io::Error| ChapterError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "chapter".to_string());

    let mut markdown = String::new();
    let mut image_num = 0usize;

    for block in &output.blocks {
        match block {
            ContentBlock::Text { content } => {
                markdown.push_str(content);
                markdown.push_str("\n\n");
            }
            ContentBlock::Image { image, alt_text } => {
                image_num += 1;
                let ext = extension_for(&image.mime_type);
                let filename = format!("{stem}-img-{image_num}.{ext}");
                let image_path = path.with_file_name(&filename);

                let bytes = image.decode().map_err(|e| {
                    ChapterError::Internal(format!("invalid base64 image payload: {e}"))
                })?;
                tokio::fs::write(&image_path, bytes).await.map_err(write_err)?;

                markdown.push_str(&format!("![{alt_text}]({filename})\n\n"));
                markdown.push_str(&format!("*{alt_text}*\n\n"));
            }
        }
    }

    // Atomic write: write to temp, then rename.
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown.trim_end().to_string() + "\n")
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(())
}

/// Map a MIME type to a file extension for saved illustrations.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Notify the progress callback of a stage transition.
fn set_stage(config: &SynthesisConfig, stage: Stage) {
    debug!("Stage: {}", stage);
    if let Some(cb) = &config.progress_callback {
        cb.on_stage(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/octet-stream"), "bin");
    }
}
