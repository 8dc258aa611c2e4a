//! Post-processing: deterministic cleanup of model-generated text.
//!
//! ## Why is post-processing necessary?
//!
//! Even well-prompted models occasionally introduce artefacts that are
//! *semantically correct* but *structurally unwanted* — for example:
//!
//! - Wrapping the chapter draft in ` ```markdown ... ``` ` fences despite
//!   the prompt saying not to
//! - Using Windows-style `\r\n` line endings
//! - Returning an enhanced image prompt wrapped in quotation marks or spread
//!   across several lines
//!
//! This module applies cheap, deterministic regex/string rules that fix
//! model quirks without touching content. Keeping them here rather than in
//! the prompts means the prompts stay focused on *what to produce*, not on
//! *formatting edge-cases*. Each rule is independently testable.
//!
//! Note that draft cleanup runs **before** marker parsing, so none of these
//! rules may alter `[IMAGE: ...]` marker text — they operate on line endings
//! and surrounding structure only.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean a freshly composed chapter draft.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences (models sometimes disobey the prompt)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Ensure the draft ends with exactly one newline
pub fn clean_draft(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

/// Clean an enhanced image prompt into a single tidy paragraph.
///
/// Rules: strip fences, drop surrounding quotation marks, collapse all
/// whitespace runs (including newlines) to single spaces, trim.
pub fn clean_enhanced_prompt(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = s.trim();
    let s = strip_surrounding_quotes(s);
    collapse_whitespace(s)
}

// ── Rule: strip outer markdown fences ────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|text)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule: normalise line endings ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule: trim trailing whitespace per line ──────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule: collapse excessive blank lines ─────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule: remove invisible Unicode characters ────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule: ensure final newline ───────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Rule: strip surrounding quotes (enhanced prompts only) ───────────────────

fn strip_surrounding_quotes(input: &str) -> &str {
    let quoted = (input.starts_with('"') && input.ends_with('"'))
        || (input.starts_with('\u{201C}') && input.ends_with('\u{201D}'));
    if quoted && input.chars().count() >= 2 {
        let mut chars = input.chars();
        chars.next();
        chars.next_back();
        chars.as_str()
    } else {
        input
    }
}

// ── Rule: collapse whitespace to single spaces ───────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_with_lang() {
        assert_eq!(
            strip_outer_fences("```markdown\n## Title\nBody\n```"),
            "## Title\nBody"
        );
    }

    #[test]
    fn strip_fences_without_lang() {
        assert_eq!(strip_outer_fences("```\nBody\n```"), "Body");
    }

    #[test]
    fn no_fences_passthrough() {
        assert_eq!(strip_outer_fences("## Title\nBody"), "## Title\nBody");
    }

    #[test]
    fn clean_draft_preserves_markers() {
        let input = "Intro.   \r\n\r\n[IMAGE: a cat]\r\nEnd.";
        let cleaned = clean_draft(input);
        assert!(cleaned.contains("[IMAGE: a cat]"));
        assert!(!cleaned.contains('\r'));
        assert!(cleaned.ends_with('\n'));
    }

    #[test]
    fn clean_draft_collapses_blank_runs() {
        let cleaned = clean_draft("a\n\n\n\n\n\nb");
        assert_eq!(cleaned, "a\n\n\nb\n");
    }

    #[test]
    fn clean_draft_strips_invisible_chars() {
        assert_eq!(clean_draft("a\u{200B}b\u{FEFF}c"), "abc\n");
    }

    #[test]
    fn empty_draft_becomes_single_newline() {
        assert_eq!(clean_draft("   \n  "), "\n");
    }

    #[test]
    fn enhanced_prompt_single_paragraph() {
        let input = "```\nA detailed diagram\nof a plant cell,\n  labeled.\n```";
        assert_eq!(
            clean_enhanced_prompt(input),
            "A detailed diagram of a plant cell, labeled."
        );
    }

    #[test]
    fn enhanced_prompt_drops_surrounding_quotes() {
        assert_eq!(clean_enhanced_prompt("\"a clear diagram\""), "a clear diagram");
        assert_eq!(
            clean_enhanced_prompt("\u{201C}a clear diagram\u{201D}"),
            "a clear diagram"
        );
    }

    #[test]
    fn enhanced_prompt_keeps_inner_quotes() {
        assert_eq!(
            clean_enhanced_prompt("the word \"mitosis\" on a whiteboard"),
            "the word \"mitosis\" on a whiteboard"
        );
    }
}
