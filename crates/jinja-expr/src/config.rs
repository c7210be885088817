//! Engine-wide configuration knobs.
//!
//! Evaluation itself never reads global state; every render thread carries
//! its own [`EngineConfig`] for the lifetime of one render, the same way a
//! `RenderContext` borrows its pool and scope stack for exactly one render.

use serde::{Deserialize, Serialize};

/// Casing rule applied by the `upper`, `lower` and `title` string filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasingMode {
    /// Full Unicode case conversion (`char::to_uppercase`/`to_lowercase`).
    Unicode,
    /// Restrict case conversion to ASCII letters; all other characters pass through untouched.
    AsciiOnly,
}

impl Default for CasingMode {
    fn default() -> Self {
        Self::Unicode
    }
}

/// Render-time configuration.
///
/// `max_call_depth` bounds recursion through user callables (see
/// `RenderContext::enter_call`/`leave_call`); it does not bound expression
/// tree depth, which is bounded by the host's recursion limit on `Eval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub casing: CasingMode,
    pub max_call_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            casing: CasingMode::default(),
            max_call_depth: 256,
        }
    }
}
