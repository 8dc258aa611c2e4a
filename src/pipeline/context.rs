//! Context extraction: the bounded window fed to the prompt enhancer.
//!
//! Only the text segment immediately preceding a placeholder contributes to
//! its context — never earlier segments. The window is the trailing K
//! whitespace-delimited tokens of that segment, joined with single spaces.
//! This bounds enhancement input size and keeps the enhanced prompt anchored
//! to the nearest preceding discussion. Pure function, no failure mode.

/// Extract the trailing `max_tokens` whitespace-delimited tokens of
/// `preceding_text`, in original order.
///
/// Shorter inputs are returned whole (re-joined on single spaces); an empty
/// or all-whitespace input yields an empty window.
pub fn context_window(preceding_text: &str, max_tokens: usize) -> String {
    let tokens: Vec<&str> = preceding_text.split_whitespace().collect();
    let start = tokens.len().saturating_sub(max_tokens);
    tokens[start..].join(" ")
}
