//! CLI binary for note2chapter.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SynthesisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use note2chapter::providers::gemini::GeminiClient;
use note2chapter::{
    generate_quiz, illustrate_draft, summarize, synthesize_document, synthesize_from_notes,
    translate, write_chapter_markdown, CapabilitySet, ChapterOutput, Digitizer, ProgressCallback,
    Stage, SynthesisConfig, SynthesisProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner through the sequential stages, then
/// a live bar over the image fan-out. Slot events arrive out of order
/// (concurrent fan-out), so per-slot state is atomic.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
    /// The bar counts images only; enhancement fallbacks report via
    /// `on_slot_error` too and must not advance it.
    in_image_stage: AtomicBool,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_fanout_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
            in_image_stage: AtomicBool::new(false),
        })
    }

    /// Switch from spinner to the full bar once the placeholder count is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Illustrating");
        self.bar.reset_eta();
    }
}

impl SynthesisProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Digitizing => {
                self.bar.set_prefix("Digitizing");
                self.bar.set_message("reading the note…");
            }
            Stage::ComposingChapter => {
                self.bar.set_prefix("Composing");
                self.bar.set_message("drafting the chapter…");
            }
            Stage::EnhancingPrompts => {
                self.bar.set_prefix("Enhancing");
            }
            Stage::GeneratingImages => {
                self.in_image_stage.store(true, Ordering::SeqCst);
                self.bar.set_prefix("Illustrating");
            }
            _ => {
                self.in_image_stage.store(false, Ordering::SeqCst);
            }
        }
    }

    fn on_fanout_start(&self, placeholders: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {placeholders} illustration points"))
        ));
        self.activate_bar(placeholders);
    }

    fn on_slot_complete(&self, index: usize, total: usize) {
        self.bar.println(format!(
            "  {} Image {:>2}/{:<2}  {}",
            green("✓"),
            index + 1,
            total,
            dim("generated"),
        ));
        self.bar.inc(1);
    }

    fn on_slot_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        if self.in_image_stage.load(Ordering::SeqCst) {
            self.bar.println(format!(
                "  {} Image {:>2}/{:<2}  {}",
                red("✗"),
                index + 1,
                total,
                red(&msg),
            ));
            self.bar.inc(1);
        } else {
            // Enhancement fallback: informational only, the bar tracks images.
            self.bar.println(format!(
                "  {} Prompt {:>2}/{:<2}  {}",
                cyan("⚠"),
                index + 1,
                total,
                dim(&msg),
            ));
        }
    }

    fn on_synthesis_complete(&self, placeholders: usize, illustrated: usize) {
        let failed = placeholders.saturating_sub(illustrated);
        self.bar.finish_and_clear();

        if placeholders == 0 {
            eprintln!("{} chapter assembled (no illustration points)", green("✔"));
        } else if failed == 0 {
            eprintln!(
                "{} {} illustrations generated",
                green("✔"),
                bold(&illustrated.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} illustrations generated  ({} failed)",
                if illustrated == 0 { red("✘") } else { cyan("⚠") },
                bold(&illustrated.to_string()),
                placeholders,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Synthesize a chapter from a photographed note (Markdown + images to chapter.md)
  note2chapter notes.jpg -o chapter.md

  # From a URL
  note2chapter https://example.com/lecture-notes.png -o chapter.md

  # Structured JSON output (blocks, stats, digitized text)
  note2chapter notes.jpg --json > chapter.json

  # Start from already-digitized notes (plain text file)
  note2chapter --from-notes notes.txt -o chapter.md

  # Re-illustrate an existing chapter draft with [IMAGE: ...] markers
  note2chapter --from-draft draft.md -o chapter.md

  # Study aids instead of a chapter
  note2chapter notes.jpg --summarize
  note2chapter notes.jpg --translate Spanish
  note2chapter notes.jpg --quiz

  # Tune the fan-out
  note2chapter notes.jpg -c 4 --image-timeout 90 -o chapter.md

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    Google Gemini API key (required)

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Synthesize:    note2chapter notes.jpg -o chapter.md
"#;

/// Turn handwritten notes into an illustrated textbook chapter.
#[derive(Parser, Debug)]
#[command(
    name = "note2chapter",
    version,
    about = "Turn handwritten notes into an illustrated textbook chapter",
    long_about = "Digitize a photographed or scanned note (local file or URL), compose a \
structured textbook chapter from it, and generate contextual illustrations where the \
chapter calls for them. Text and images stay in document order even when individual \
image generations fail.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Note image/PDF path or HTTP/HTTPS URL (plain text with --from-notes/--from-draft).
    input: String,

    /// Write the chapter as Markdown to this file (images saved alongside).
    #[arg(short, long, env = "NOTE2CHAPTER_OUTPUT")]
    output: Option<PathBuf>,

    /// Treat the input as a plain-text file of already-digitized notes.
    #[arg(long, conflicts_with = "from_draft")]
    from_notes: bool,

    /// Treat the input as an existing chapter draft with [IMAGE: ...] markers.
    #[arg(long)]
    from_draft: bool,

    /// Print key-point summary of the notes instead of a chapter.
    #[arg(long, conflicts_with_all = ["translate", "quiz", "from_draft"])]
    summarize: bool,

    /// Translate the notes to this language instead of writing a chapter.
    #[arg(long, value_name = "LANGUAGE", conflicts_with_all = ["quiz", "from_draft"])]
    translate: Option<String>,

    /// Generate a multiple-choice quiz from the notes instead of a chapter.
    #[arg(long, conflicts_with = "from_draft")]
    quiz: bool,

    /// Number of concurrent capability calls per fan-out stage.
    #[arg(short, long, env = "NOTE2CHAPTER_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Context window fed to the prompt enhancer, in words.
    #[arg(long, env = "NOTE2CHAPTER_CONTEXT_TOKENS", default_value_t = 150)]
    context_tokens: usize,

    /// Gemini text model ID.
    #[arg(long, env = "NOTE2CHAPTER_TEXT_MODEL")]
    text_model: Option<String>,

    /// Imagen image model ID.
    #[arg(long, env = "NOTE2CHAPTER_IMAGE_MODEL")]
    image_model: Option<String>,

    /// Path to a text file with a custom digitization instruction.
    #[arg(long, env = "NOTE2CHAPTER_DIGITIZE_PROMPT")]
    digitize_prompt: Option<PathBuf>,

    /// Path to a text file with a custom chapter-composition instruction.
    #[arg(long, env = "NOTE2CHAPTER_COMPOSE_PROMPT")]
    compose_prompt: Option<PathBuf>,

    /// Per-call prompt-enhancement timeout in seconds.
    #[arg(long, env = "NOTE2CHAPTER_ENHANCE_TIMEOUT", default_value_t = 60)]
    enhance_timeout: u64,

    /// Per-call image-generation timeout in seconds.
    #[arg(long, env = "NOTE2CHAPTER_IMAGE_TIMEOUT", default_value_t = 120)]
    image_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "NOTE2CHAPTER_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (ChapterOutput) instead of Markdown.
    #[arg(long, env = "NOTE2CHAPTER_JSON")]
    json: bool,

    /// Disable progress output.
    #[arg(long, env = "NOTE2CHAPTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTE2CHAPTER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "NOTE2CHAPTER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build capabilities ───────────────────────────────────────────────
    let mut client = GeminiClient::from_env().context(
        "Gemini setup failed (is GEMINI_API_KEY set?)",
    )?;
    if let Some(ref model) = cli.text_model {
        client = client.with_text_model(model);
    }
    if let Some(ref model) = cli.image_model {
        client = client.with_image_model(model);
    }
    if let Some(ref path) = cli.digitize_prompt {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read digitize prompt from {:?}", path))?;
        client = client.with_digitize_instruction(instruction);
    }
    let capabilities = client.into_capabilities();

    let config = build_config(&cli, show_progress).await?;

    // ── Study-aid modes ──────────────────────────────────────────────────
    if cli.summarize || cli.translate.is_some() || cli.quiz {
        let notes = resolve_notes(&cli, &capabilities, &config).await?;
        return run_study_aid(&cli, &notes, &capabilities).await;
    }

    // ── Chapter synthesis ────────────────────────────────────────────────
    let output = if cli.from_draft {
        let draft = tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read draft from '{}'", cli.input))?;
        illustrate_draft(&draft, &capabilities, &config)
            .await
            .context("Illustration failed")?
    } else if cli.from_notes {
        let notes = tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read notes from '{}'", cli.input))?;
        synthesize_from_notes(&notes, &capabilities, &config)
            .await
            .context("Synthesis failed")?
    } else {
        let document =
            note2chapter::pipeline::input::resolve_input(&cli.input, config.download_timeout_secs)
                .await
                .context("Failed to resolve input")?;
        synthesize_document(&document, &capabilities, &config)
            .await
            .context("Synthesis failed")?
    };

    emit_chapter(&cli, &output).await
}

/// Write the chapter to the requested destination.
async fn emit_chapter(cli: &Cli, output: &ChapterOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if let Some(ref path) = cli.output {
        write_chapter_markdown(output, path)
            .await
            .context("Failed to write chapter")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} blocks  {}ms  →  {}",
                green("✔"),
                output.blocks.len(),
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
        return Ok(());
    }

    // Stdout fallback: Markdown with inline data URIs so the result is
    // self-contained.
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for block in &output.blocks {
        match block {
            note2chapter::ContentBlock::Text { content } => {
                writeln!(handle, "{content}\n").context("Failed to write to stdout")?;
            }
            note2chapter::ContentBlock::Image { image, alt_text } => {
                writeln!(handle, "![{alt_text}]({})\n", image.to_data_uri())
                    .context("Failed to write to stdout")?;
            }
        }
    }
    Ok(())
}

/// Produce digitized note text for the study-aid modes.
async fn resolve_notes(
    cli: &Cli,
    capabilities: &CapabilitySet,
    config: &SynthesisConfig,
) -> Result<String> {
    if cli.from_notes {
        return tokio::fs::read_to_string(&cli.input)
            .await
            .with_context(|| format!("Failed to read notes from '{}'", cli.input));
    }

    let document =
        note2chapter::pipeline::input::resolve_input(&cli.input, config.download_timeout_secs)
            .await
            .context("Failed to resolve input")?;
    capabilities
        .digitizer
        .digitize(&document)
        .await
        .context("Failed to digitize the note")
}

/// Run the selected study aid and print its result.
async fn run_study_aid(cli: &Cli, notes: &str, capabilities: &CapabilitySet) -> Result<()> {
    if cli.summarize {
        let summary = summarize(notes, &capabilities.text)
            .await
            .context("Summarization failed")?;
        println!("{summary}");
    } else if let Some(ref language) = cli.translate {
        let translated = translate(notes, language, &capabilities.text)
            .await
            .context("Translation failed")?;
        println!("{translated}");
    } else if cli.quiz {
        let quiz = generate_quiz(notes, &capabilities.text)
            .await
            .context("Quiz generation failed")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&quiz)?);
        } else {
            for (n, q) in quiz.iter().enumerate() {
                println!("{} {}", bold(&format!("{}.", n + 1)), q.question);
                for (i, option) in q.options.iter().enumerate() {
                    let letter = (b'a' + i as u8) as char;
                    println!("   {letter}) {option}");
                }
                println!("   {} {}\n", dim("answer:"), q.answer);
            }
        }
    }
    Ok(())
}

/// Map CLI args to `SynthesisConfig`.
async fn build_config(cli: &Cli, show_progress: bool) -> Result<SynthesisConfig> {
    let compose_prompt = if let Some(ref path) = cli.compose_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read compose prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = SynthesisConfig::builder()
        .concurrency(cli.concurrency)
        .context_tokens(cli.context_tokens)
        .enhance_timeout_secs(cli.enhance_timeout)
        .image_timeout_secs(cli.image_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(prompt) = compose_prompt {
        builder = builder.compose_prompt(prompt);
    }

    if show_progress {
        let cb = CliProgressCallback::new();
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhancement_fallbacks_do_not_advance_the_image_bar() {
        let cb = CliProgressCallback::new();
        cb.on_fanout_start(2);

        // Enhancement stage: fallbacks report here but count no images.
        cb.on_stage(Stage::EnhancingPrompts);
        cb.on_slot_error(0, 2, "prompt enhancement failed");
        cb.on_slot_error(1, 2, "prompt enhancement failed");
        assert_eq!(cb.bar.position(), 0);

        // Image stage: every slot outcome advances the bar exactly once.
        cb.on_stage(Stage::GeneratingImages);
        cb.on_slot_error(0, 2, "image generation failed");
        cb.on_slot_complete(1, 2);
        assert_eq!(cb.bar.position(), 2);
        assert_eq!(cb.bar.length(), Some(2));
    }
}
