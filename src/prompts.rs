//! Prompt templates for every capability call the pipeline makes.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g. how
//!    aggressively markers are inserted) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect composed prompts directly
//!    without spinning up a real model, making prompt regressions easy to
//!    catch.
//!
//! Callers can override the composition prompt via
//! [`crate::config::SynthesisConfig`]; the digitization instruction is
//! configured on the provider, which receives only the document. The
//! templates here are used when no override is provided.

/// The literal opening tag of an inline image marker in a chapter draft.
pub const IMAGE_MARKER_OPEN: &str = "[IMAGE: ";

/// Default instruction for transcribing a photographed/scanned note.
pub const DIGITIZE_PROMPT: &str = "\
Transcribe the handwritten text from this image. The notes are from a student.
Ensure the output is clean, well-formatted, and easy to read.
Correct any obvious spelling mistakes and structure the content logically with \
headings and bullet points if applicable.";

/// Build the chapter-composition prompt for the given digitized notes.
///
/// The instruction asks the model to insert inline `[IMAGE: ...]` markers
/// where a visual aid would help; those markers are what the parser later
/// resolves into generated illustrations.
pub fn compose_prompt(notes: &str) -> String {
    format!(
        "Based on the following notes, create a user-friendly textbook chapter. \
Structure the content with clear headings (use ## for main headings and ### for \
subheadings), paragraphs, and use markdown bold for key terms (**term**). Where a \
visual aid would be helpful to explain a concept, insert a placeholder in the format \
[IMAGE: A concise, descriptive prompt for an image generation model about the \
preceding topic.]. Only add images for the most important concepts.\n\n\
Notes:\n---\n{notes}\n---\n"
    )
}

/// Build the prompt-enhancement instruction for one placeholder.
///
/// `raw_prompt` is the terse suggestion found inside the marker;
/// `context` is the trailing context window of the preceding text segment.
pub fn enhance_prompt(raw_prompt: &str, context: &str) -> String {
    format!(
        "Based on the following context from a textbook, create a detailed, visually \
appealing, and contextually accurate prompt for an image generation model. The \
original suggestion was \"{raw_prompt}\".\n\n\
The goal is to create a clear, educational image that helps a student understand the \
topic. The image style should be appropriate for a textbook (e.g., a clear diagram, \
an explanatory infographic, a realistic photo of a relevant object, or a helpful \
illustration). Avoid generic or abstract images.\n\n\
Context:\n---\n{context}\n---\n\n\
Generate an enhanced prompt that is descriptive and ready for an AI image generator. \
The prompt should be a single, concise paragraph. For example, instead of 'a cell', \
the prompt could be 'A detailed diagram of an animal cell, labeling the nucleus, \
mitochondria, and cell membrane, in a clean, educational art style with vibrant \
colors and clear annotations.'\n\n\
Respond with ONLY the new, enhanced prompt."
    )
}

/// Build the summarization prompt for digitized notes.
pub fn summarize_prompt(notes: &str) -> String {
    format!(
        "Summarize the following notes into key points for quick revision.\n\
Focus on the most important concepts, definitions, and formulas.\n\
Use bullet points for clarity.\n\n\
Notes:\n---\n{notes}\n---\n"
    )
}

/// Build the translation prompt for digitized notes.
pub fn translate_prompt(notes: &str, language: &str) -> String {
    format!(
        "Translate the following notes to {language}.\n\
Maintain the original formatting as much as possible (e.g., headings, lists).\n\n\
Notes:\n---\n{notes}\n---\n"
    )
}

/// Build the quiz-generation prompt for digitized notes.
///
/// The model is asked for raw JSON; [`crate::study::generate_quiz`] is
/// tolerant of a fenced response anyway.
pub fn quiz_prompt(notes: &str) -> String {
    format!(
        "Based on the following notes, generate a 5-question multiple-choice quiz to \
test understanding. For each question, provide 4 options and clearly indicate the \
correct answer.\n\n\
Respond with ONLY a JSON object of the form:\n\
{{\"quiz\": [{{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \
\"answer\": \"...\"}}]}}\n\n\
Notes:\n---\n{notes}\n---\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_prompt_embeds_notes_and_marker_format() {
        let p = compose_prompt("photosynthesis basics");
        assert!(p.contains("photosynthesis basics"));
        assert!(p.contains("[IMAGE:"));
        assert!(p.contains("textbook chapter"));
    }

    #[test]
    fn enhance_prompt_embeds_both_inputs() {
        let p = enhance_prompt("a cat", "cats are mammals");
        assert!(p.contains("\"a cat\""));
        assert!(p.contains("cats are mammals"));
        assert!(p.contains("ONLY the new, enhanced prompt"));
    }

    #[test]
    fn quiz_prompt_requests_json_shape() {
        let p = quiz_prompt("notes");
        assert!(p.contains("\"quiz\""));
        assert!(p.contains("\"options\""));
    }
}
