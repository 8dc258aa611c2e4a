//! Marker parsing: split a chapter draft into text segments and placeholders.
//!
//! A draft with `n` well-formed `[IMAGE: ...]` markers always yields exactly
//! `n` placeholders and `n + 1` text segments, such that interleaving
//! `S[0], P[0], S[1], P[1], …, S[n]` reconstructs the draft byte-for-byte.
//! That alignment is what the assembler relies on: segment `i` is the text
//! before placeholder `i`, segment `n` is the tail after the last marker.
//!
//! Parsing is a single linear pass, case-sensitive on the literal tag.
//! A marker's prompt may contain anything except `]`, so an unterminated
//! marker simply never matches and flows through as ordinary text — garbage
//! in the draft degrades to visible text, never to a parse error.

use crate::prompts::IMAGE_MARKER_OPEN;
use once_cell::sync::Lazy;
use regex::Regex;

/// One inline image marker found in a chapter draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Ordinal position among the draft's placeholders (0-based).
    pub index: usize,
    /// The prompt text between `[IMAGE: ` and `]`, as written.
    pub raw_prompt: String,
    /// The text segment immediately preceding this marker in document order.
    pub preceding_text: String,
}

/// A chapter draft split into alternating text segments and placeholders.
///
/// Invariant: `segments.len() == placeholders.len() + 1`, always — even for
/// a draft with zero markers (one segment, the whole draft).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDraft {
    /// Text segments in document order; `segments[i]` precedes
    /// `placeholders[i]`, and the last segment is the tail of the draft.
    pub segments: Vec<String>,
    /// Placeholders in document order, index-aligned with their slots.
    pub placeholders: Vec<Placeholder>,
}

static RE_MARKER: Lazy<Regex> = Lazy::new(|| {
    // The tag is literal and case-sensitive; the prompt is any non-`]` run.
    Regex::new(r"\[IMAGE: ([^\]]*)\]").unwrap()
});

/// Parse a chapter draft into segments and placeholders.
pub fn parse_draft(draft: &str) -> ParsedDraft {
    let mut segments = Vec::new();
    let mut placeholders = Vec::new();
    let mut cursor = 0usize;

    for m in RE_MARKER.find_iter(draft) {
        // The match is `[IMAGE: <prompt>]`; slice the prompt out directly.
        let prompt = &draft[m.start() + IMAGE_MARKER_OPEN.len()..m.end() - 1];
        let preceding = &draft[cursor..m.start()];

        placeholders.push(Placeholder {
            index: placeholders.len(),
            raw_prompt: prompt.to_string(),
            preceding_text: preceding.to_string(),
        });
        segments.push(preceding.to_string());
        cursor = m.end();
    }

    // Tail segment after the last marker (or the whole draft when none).
    segments.push(draft[cursor..].to_string());

    ParsedDraft {
        segments,
        placeholders,
    }
}

impl ParsedDraft {
    /// Reconstruct the original draft by interleaving segments and markers.
    ///
    /// Exists to make the round-trip invariant directly testable; the
    /// pipeline itself never needs the draft back.
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            out.push_str(segment);
            if let Some(p) = self.placeholders.get(i) {
                out.push_str(IMAGE_MARKER_OPEN);
                out.push_str(&p.raw_prompt);
                out.push(']');
            }
        }
        out
    }
}
