//! # Matching
//!
//! Turns one text run plus the prioritized patterns into the ranges that
//! should be annotated.
//!
//! ```text
//! text run ──► CompiledPattern::find_matches (per pattern) ──► tag with priority
//!          ──► resolve_overlaps ──► non-overlapping Matches ordered by start
//! ```
//!
//! ## Modules
//!
//! - **`pattern`**: `CompiledPattern`, the per-pattern matcher (text, regex, list)
//! - **`overlap`**: `resolve_overlaps`, the deterministic overlap resolution
//!
//! All offsets are byte offsets into the run and always fall on UTF-8
//! character boundaries.

pub mod overlap;
pub mod pattern;

use std::ops::Range;
use std::rc::Rc;

use crate::rules::SpanStyle;

pub use overlap::resolve_overlaps;
pub use pattern::CompiledPattern;

/// A prioritized hit inside one text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub priority: usize,
    pub style: Rc<SpanStyle>,
}

impl Match {
    pub fn new(text: &str, range: Range<usize>, priority: usize, style: Rc<SpanStyle>) -> Self {
        Self {
            text: text[range.clone()].to_string(),
            start: range.start,
            end: range.end,
            priority,
            style,
        }
    }

    pub fn overlaps(&self, other: &Match) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}
