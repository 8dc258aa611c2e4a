//! Pipeline stages for note-to-chapter synthesis.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ context ──▶ enhance ──▶ illustrate ──▶ assemble
//! (path/URL) (markers)  (window)   (fan-out)    (fan-out)     (merge)
//! ```
//!
//! 1. [`input`]       — canonicalise the user-supplied path or URL to a
//!    [`crate::capability::SourceDocument`]
//! 2. [`parse`]       — split the chapter draft into text segments and
//!    `[IMAGE: ...]` placeholders
//! 3. [`context`]     — derive the bounded context window preceding each
//!    placeholder
//! 4. [`enhance`]     — fan out one text-generation call per placeholder to
//!    turn terse marker prompts into detailed image prompts
//! 5. [`illustrate`]  — fan out one image-generation call per enhanced
//!    prompt into a fixed, index-aligned slot vector
//! 6. [`assemble`]    — merge segments and slots into the final ordered
//!    block sequence
//! 7. [`postprocess`] — deterministic text-cleanup rules for generated
//!    drafts and enhanced prompts

pub mod assemble;
pub mod context;
pub mod enhance;
pub mod illustrate;
pub mod input;
pub mod parse;
pub mod postprocess;
