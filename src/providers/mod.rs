//! Built-in capability providers.
//!
//! Each provider implements the [`crate::capability`] traits against one
//! concrete backend. Providers are feature-gated so library consumers that
//! bring their own capabilities pay nothing for them.

#[cfg(feature = "gemini")]
pub mod gemini;
