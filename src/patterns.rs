//! The three optional pattern slots evaluated against the current line.
//!
//! Patterns are compiled lazily on first use, so an invalid expression in an
//! unused slot never surfaces, and an invalid one in a used slot fails at
//! first evaluation rather than at option parsing.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

/// One lazily compiled pattern slot. An empty pattern string is disabled.
#[derive(Debug)]
pub struct PatternSlot {
    raw: String,
    anchored: bool,
    compiled: OnceCell<Regex>,
}

impl PatternSlot {
    fn new(raw: Option<String>, anchored: bool) -> Self {
        Self {
            raw: raw.unwrap_or_default(),
            anchored,
            compiled: OnceCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.raw.is_empty()
    }

    /// The literal pattern text, for operator-visible messages.
    pub fn text(&self) -> &str {
        &self.raw
    }

    fn regex(&self) -> Result<&Regex> {
        self.compiled.get_or_try_init(|| {
            let source = if self.anchored {
                format!("^(?:{})", self.raw)
            } else {
                self.raw.clone()
            };
            Regex::new(&source)
                .map_err(|e| Error::Pattern(format!("invalid pattern '{}': {e}", self.raw)))
        })
    }

    /// Evaluate against `text`; a disabled slot never matches.
    pub fn matches(&self, text: &str) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        Ok(self.regex()?.is_match(text))
    }
}

/// The base / inline / quit pattern slots for one session.
#[derive(Debug)]
pub struct LinePatterns {
    /// Start-anchored, evaluated against completed lines; triggers rebasing.
    pub base: PatternSlot,
    /// Unanchored, evaluated per byte; first match time reported at end-of-run.
    pub inline: PatternSlot,
    /// Unanchored, evaluated per byte; a match terminates the run.
    pub quit: PatternSlot,
}

impl LinePatterns {
    pub fn new(base: Option<String>, inline: Option<String>, quit: Option<String>) -> Self {
        Self {
            base: PatternSlot::new(base, true),
            inline: PatternSlot::new(inline, false),
            quit: PatternSlot::new(quit, false),
        }
    }
}
