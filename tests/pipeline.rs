//! End-to-end pipeline tests against scripted capabilities.
//!
//! No network: each test wires a [`CapabilitySet`] whose capabilities return
//! canned responses (with selective failures) and drives the real pipeline
//! through the public entry points.

use async_trait::async_trait;
use note2chapter::{
    synthesize_document, synthesize_from_notes, CapabilityError, CapabilitySet, ChapterError,
    ContentBlock, Digitizer, GeneratedImage, ImageGenerator, SourceDocument, Stage,
    SynthesisConfig, SynthesisProgressCallback, TextGenerator,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Scripted capabilities ────────────────────────────────────────────────

struct ScriptedDigitizer {
    response: Result<String, CapabilityError>,
}

#[async_trait]
impl Digitizer for ScriptedDigitizer {
    async fn digitize(&self, _document: &SourceDocument) -> Result<String, CapabilityError> {
        self.response.clone()
    }
}

/// Distinguishes composition calls from enhancement calls by the
/// instruction text and answers each with its own script.
struct ScriptedText {
    draft: Result<String, CapabilityError>,
    enhancement: Result<String, CapabilityError>,
}

impl ScriptedText {
    fn ok(draft: &str) -> Self {
        Self {
            draft: Ok(draft.to_string()),
            enhancement: Ok("A rich, detailed illustration prompt.".to_string()),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedText {
    async fn generate_text(&self, prompt: &str) -> Result<String, CapabilityError> {
        if prompt.contains("textbook chapter") {
            self.draft.clone()
        } else {
            self.enhancement.clone()
        }
    }
}

/// Fails image generation for prompts containing any of the listed words.
struct SelectiveImages {
    fail_on: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl SelectiveImages {
    fn failing_on(words: &[&str]) -> Self {
        Self {
            fail_on: words.iter().map(|w| w.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageGenerator for SelectiveImages {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CapabilityError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if self.fail_on.iter().any(|w| prompt.contains(w.as_str())) {
            Err(CapabilityError::Api("safety filter rejected prompt".into()))
        } else {
            Ok(GeneratedImage::new("aW1hZ2U=", "image/jpeg"))
        }
    }
}

fn caps(digitized: &str, draft: &str) -> CapabilitySet {
    CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok(digitized.to_string()),
        }),
        Arc::new(ScriptedText::ok(draft)),
        Arc::new(SelectiveImages::failing_on(&[])),
    )
}

fn jpeg_note() -> SourceDocument {
    SourceDocument::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00], "image/jpeg")
}

// ── Full-run behaviour ───────────────────────────────────────────────────

#[tokio::test]
async fn full_run_produces_ordered_blocks_and_stats() {
    let draft = "## Cells\n\nIntro text. [IMAGE: an animal cell] More text. \
                 [IMAGE: a plant cell] Closing text.";
    let capabilities = caps("cell biology notes", draft);
    let config = SynthesisConfig::default();

    let output = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    assert_eq!(output.digitized_text, "cell biology notes");
    assert_eq!(output.stats.placeholders, 2);
    assert_eq!(output.stats.images_generated, 2);
    assert_eq!(output.stats.images_failed, 0);

    // text, image, text, image, text
    let kinds: Vec<bool> = output.blocks.iter().map(ContentBlock::is_image).collect();
    assert_eq!(kinds, vec![false, true, false, true, false]);

    // No marker text survives into the output.
    for text in output.text_blocks() {
        assert!(!text.contains("[IMAGE:"), "marker leaked: {text}");
    }
}

#[tokio::test]
async fn failed_image_never_shifts_later_images() {
    // The classic misalignment case: the first generation fails, the second
    // succeeds. The surviving image must stay attached to the dog text.
    let draft = "About cats. [IMAGE: a cat] About dogs. [IMAGE: a dog] The end.";
    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok("pet notes".into()),
        }),
        Arc::new(ScriptedText {
            draft: Ok(draft.to_string()),
            // Enhancement fails so image prompts are the raw marker prompts,
            // which lets the image generator target "a cat" precisely.
            enhancement: Err(CapabilityError::Api("down".into())),
        }),
        Arc::new(SelectiveImages::failing_on(&["a cat"])),
    );
    let config = SynthesisConfig::default();

    let output = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    assert_eq!(output.stats.placeholders, 2);
    assert_eq!(output.stats.images_generated, 1);
    assert_eq!(output.stats.images_failed, 1);
    assert_eq!(output.stats.enhancement_fallbacks, 2);

    // Expected: "About cats." "About dogs." [dog image] "The end."
    assert_eq!(output.blocks.len(), 4);
    assert_eq!(
        output.blocks[0],
        ContentBlock::Text {
            content: "About cats.".into()
        }
    );
    assert_eq!(
        output.blocks[1],
        ContentBlock::Text {
            content: "About dogs.".into()
        }
    );
    match &output.blocks[2] {
        ContentBlock::Image { alt_text, .. } => assert_eq!(alt_text, "a dog"),
        other => panic!("expected the dog image after the dog text, got {other:?}"),
    }
    assert_eq!(
        output.blocks[3],
        ContentBlock::Text {
            content: "The end.".into()
        }
    );
}

#[tokio::test]
async fn draft_without_markers_yields_text_only_chapter() {
    let capabilities = caps("notes", "Just a chapter with no illustrations at all.");
    let config = SynthesisConfig::default();

    let output = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    assert_eq!(output.stats.placeholders, 0);
    assert_eq!(output.stats.images_generated, 0);
    assert!(output.blocks.iter().all(ContentBlock::is_text));
}

#[tokio::test]
async fn all_images_failing_still_succeeds() {
    let draft = "a [IMAGE: x] b [IMAGE: y] c";
    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok("notes".into()),
        }),
        Arc::new(ScriptedText::ok(draft)),
        Arc::new(SelectiveImages::failing_on(&["illustration"])), // enhanced prompt
    );
    let config = SynthesisConfig::default();

    let output = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    assert_eq!(output.stats.placeholders, 2);
    assert_eq!(output.stats.images_failed, 2);
    assert!(output.blocks.iter().all(ContentBlock::is_text));
}

// ── Fatal stages ─────────────────────────────────────────────────────────

#[tokio::test]
async fn digitization_failure_is_fatal() {
    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Err(CapabilityError::Api("quota exceeded".into())),
        }),
        Arc::new(ScriptedText::ok("unused")),
        Arc::new(SelectiveImages::failing_on(&[])),
    );
    let config = SynthesisConfig::default();

    let err = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ChapterError::DigitizationFailed { .. }));
}

#[tokio::test]
async fn composition_failure_is_fatal() {
    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok("notes".into()),
        }),
        Arc::new(ScriptedText {
            draft: Err(CapabilityError::Api("model overloaded".into())),
            enhancement: Ok("unused".into()),
        }),
        Arc::new(SelectiveImages::failing_on(&[])),
    );
    let config = SynthesisConfig::default();

    let err = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ChapterError::CompositionFailed { .. }));
}

#[tokio::test]
async fn empty_draft_is_fatal() {
    let capabilities = caps("notes", "   \n  ");
    let config = SynthesisConfig::default();

    let err = synthesize_from_notes("notes", &capabilities, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ChapterError::EmptyDraft));
}

// ── Progress events ──────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    stages: Mutex<Vec<Stage>>,
    slot_completes: AtomicUsize,
    slot_errors: AtomicUsize,
    final_counts: Mutex<Option<(usize, usize)>>,
}

impl SynthesisProgressCallback for RecordingCallback {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_slot_complete(&self, _index: usize, _total: usize) {
        self.slot_completes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_slot_error(&self, _index: usize, _total: usize, _error: &str) {
        self.slot_errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_synthesis_complete(&self, placeholders: usize, illustrated: usize) {
        *self.final_counts.lock().unwrap() = Some((placeholders, illustrated));
    }
}

#[tokio::test]
async fn progress_callback_sees_stages_in_order() {
    let recorder = Arc::new(RecordingCallback::default());
    let draft = "a [IMAGE: one] b [IMAGE: two] c";
    let capabilities = caps("notes", draft);
    let config = SynthesisConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            Stage::Digitizing,
            Stage::ComposingChapter,
            Stage::EnhancingPrompts,
            Stage::GeneratingImages,
            Stage::Assembling,
            Stage::Done,
        ]
    );
    assert_eq!(recorder.slot_completes.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.slot_errors.load(Ordering::SeqCst), 0);
    assert_eq!(*recorder.final_counts.lock().unwrap(), Some((2, 2)));
}

#[tokio::test]
async fn progress_callback_reports_slot_errors() {
    let recorder = Arc::new(RecordingCallback::default());
    let draft = "a [IMAGE: x] b [IMAGE: y] c";
    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok("notes".into()),
        }),
        Arc::new(ScriptedText {
            draft: Ok(draft.to_string()),
            enhancement: Err(CapabilityError::Api("down".into())),
        }),
        Arc::new(SelectiveImages::failing_on(&["x"])),
    );
    let config = SynthesisConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let output = synthesize_document(&jpeg_note(), &capabilities, &config)
        .await
        .unwrap();

    // Two enhancement fallbacks plus one image failure.
    assert_eq!(recorder.slot_errors.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.slot_completes.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.final_counts.lock().unwrap(), Some((2, 1)));
    assert_eq!(output.stats.images_generated, 1);
}

// ── Custom composition prompt ────────────────────────────────────────────

#[tokio::test]
async fn custom_compose_prompt_is_used() {
    struct PromptAsserting;

    #[async_trait]
    impl TextGenerator for PromptAsserting {
        async fn generate_text(&self, prompt: &str) -> Result<String, CapabilityError> {
            assert!(prompt.contains("write it as a pirate"));
            assert!(prompt.contains("treasure map notes"));
            Ok("Arr, a chapter.".to_string())
        }
    }

    let capabilities = CapabilitySet::new(
        Arc::new(ScriptedDigitizer {
            response: Ok("unused".into()),
        }),
        Arc::new(PromptAsserting),
        Arc::new(SelectiveImages::failing_on(&[])),
    );
    let config = SynthesisConfig::builder()
        .compose_prompt("write it as a pirate")
        .build()
        .unwrap();

    let output = synthesize_from_notes("treasure map notes", &capabilities, &config)
        .await
        .unwrap();
    assert_eq!(
        output.blocks,
        vec![ContentBlock::Text {
            content: "Arr, a chapter.".into()
        }]
    );
}
