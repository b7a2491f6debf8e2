//! # Text Scanning
//!
//! Enumerates the text leaves under a root that are worth matching against,
//! depth-first in document order.
//!
//! A leaf is skipped when its parent element
//! - is a raw-text or non-rendered container (`script`, `style`, ...),
//! - carries the annotation marker class, i.e. it is an annotated span
//!   produced by this engine,
//! - or the leaf holds only whitespace.
//!
//! The marker check keeps the engine off its own spans. The plain text it
//! splits off around them is tracked by the [`crate::Annotator`] instead,
//! since nothing in the tree distinguishes it from page text.

use crate::tree::{Document, NodeId};

pub const DEFAULT_MARKER_CLASS: &str = "highlighter-bear-mark";
pub const DEFAULT_EXCLUDED_TAGS: [&str; 4] = ["script", "style", "noscript", "textarea"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase tag names whose text children are never scanned.
    pub excluded_tags: Vec<String>,
    /// Class that marks engine-owned annotated spans.
    pub marker_class: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            excluded_tags: DEFAULT_EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
            marker_class: DEFAULT_MARKER_CLASS.to_string(),
        }
    }
}

impl ScanOptions {
    pub fn is_excluded_tag(&self, tag: &str) -> bool {
        self.excluded_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Whether `leaf` is a text node the scanner would visit.
pub fn is_eligible_leaf(doc: &Document, leaf: NodeId, options: &ScanOptions) -> bool {
    let Some(text) = doc.text(leaf) else {
        return false;
    };
    let Some(parent) = doc.parent_element(leaf) else {
        return false;
    };
    if options.is_excluded_tag(&parent.tag) || parent.has_class(&options.marker_class) {
        return false;
    }
    !text.trim().is_empty()
}

/// Lazily yields the eligible text leaves under `root`.
///
/// Calling it again restarts the walk over the tree as it is now.
pub fn text_leaves<'a>(
    doc: &'a Document,
    root: NodeId,
    options: &'a ScanOptions,
) -> TextLeaves<'a> {
    let mut stack: Vec<NodeId> = doc.children(root).to_vec();
    stack.reverse();
    TextLeaves { doc, options, stack }
}

pub struct TextLeaves<'a> {
    doc: &'a Document,
    options: &'a ScanOptions,
    stack: Vec<NodeId>,
}

impl Iterator for TextLeaves<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(node) = self.stack.pop() {
            if self.doc.is_text(node) {
                if is_eligible_leaf(self.doc, node, self.options) {
                    return Some(node);
                }
                continue;
            }
            self.stack
                .extend(self.doc.children(node).iter().rev().copied());
        }
        None
    }
}

/// The container an added node should be rescanned through.
///
/// Added elements are their own container; added text with visible content
/// is rescanned through its parent. Annotated spans and blank text need no
/// rescan.
pub fn container_for_added(
    doc: &Document,
    node: NodeId,
    options: &ScanOptions,
) -> Option<NodeId> {
    match doc.text(node) {
        Some(text) if text.trim().is_empty() => None,
        Some(_) => doc.parent(node),
        None if doc.has_class(node, &options.marker_class) => None,
        None => Some(node),
    }
}
