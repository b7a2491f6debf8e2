//! # Annotation
//!
//! The only writer of engine-owned content in the tree. `apply` splits one
//! text leaf into plain text and annotated `<span>`s; `clear` turns every
//! annotated span back into plain text and re-merges the pieces, so the text
//! of the tree is exactly what it was before.
//!
//! The plain text runs `apply` splits off have already been searched. The
//! annotator remembers them and scans skip them until the next `clear`, so
//! a match that lost an overlap does not resurface on a later pass.

use std::collections::BTreeSet;

use crate::matching::Match;
use crate::rules::SpanStyle;
use crate::scan::DEFAULT_MARKER_CLASS;
use crate::tree::{Document, NodeId, TreeError};

pub const SPAN_TAG: &str = "span";

/// A rendered annotation as seen in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedSpan {
    pub node: NodeId,
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotator {
    marker_class: String,
    searched: BTreeSet<NodeId>,
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_CLASS)
    }
}

impl Annotator {
    pub fn new(marker_class: &str) -> Self {
        Self {
            marker_class: marker_class.to_string(),
            searched: BTreeSet::new(),
        }
    }

    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    /// Whether `node` is a plain text run split off by [`Self::apply`].
    pub fn is_searched(&self, node: NodeId) -> bool {
        self.searched.contains(&node)
    }

    /// Replaces `leaf` with plain text runs and one annotated span per match.
    ///
    /// `matches` must be ordered by start and non-overlapping, as produced by
    /// [`crate::matching::resolve_overlaps`]. Returns the number of spans
    /// created; an empty match list leaves the leaf untouched.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        leaf: NodeId,
        matches: &[Match],
    ) -> Result<usize, TreeError> {
        if matches.is_empty() {
            return Ok(0);
        }
        let text = doc.text(leaf).ok_or(TreeError::NotText(leaf))?.to_string();
        if doc.parent(leaf).is_none() {
            return Err(TreeError::Detached(leaf));
        }

        let mut replacement = Vec::with_capacity(matches.len() * 2 + 1);
        let mut gaps = Vec::with_capacity(matches.len() + 1);
        let mut last = 0;
        let mut spans = 0;
        for m in matches {
            if m.start < last || m.end > text.len() || m.start >= m.end {
                log::debug!("Skipping out-of-order match {:?} in leaf {leaf:?}", m.range());
                continue;
            }
            if m.start > last {
                let gap = doc.create_text(&text[last..m.start]);
                gaps.push(gap);
                replacement.push(gap);
            }
            replacement.push(self.create_span(doc, &text[m.range()], &m.style)?);
            spans += 1;
            last = m.end;
        }
        if spans == 0 {
            return Ok(0);
        }
        if last < text.len() {
            let gap = doc.create_text(&text[last..]);
            gaps.push(gap);
            replacement.push(gap);
        }

        doc.replace_with(leaf, &replacement)?;
        self.searched.extend(gaps);
        Ok(spans)
    }

    fn create_span(
        &self,
        doc: &mut Document,
        text: &str,
        style: &SpanStyle,
    ) -> Result<NodeId, TreeError> {
        let span = doc.create_element(SPAN_TAG);
        if let Some(el) = doc.element_mut(span) {
            el.add_class(&self.marker_class);
            el.style = style.to_declarations();
        }
        let content = doc.create_text(text);
        doc.append_child(span, content)?;
        Ok(span)
    }

    /// Unwraps every annotated span under `root` and normalizes the parents.
    ///
    /// Text under `root` becomes searchable again. Returns the number of
    /// spans removed. Idempotent.
    pub fn clear(&mut self, doc: &mut Document, root: NodeId) -> usize {
        let spans = self.span_nodes(doc, root);
        let mut parents = Vec::new();
        let mut cleared = 0;

        for span in spans {
            let Some(parent) = doc.parent(span) else {
                continue;
            };
            let text = doc.text_content(span);
            let plain = doc.create_text(&text);
            match doc.replace_with(span, &[plain]) {
                Ok(()) => {
                    cleared += 1;
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
                Err(e) => log::warn!("Could not unwrap annotated span {span:?}: {e}"),
            }
        }

        for parent in parents {
            doc.normalize(parent);
        }
        self.searched
            .retain(|&node| doc.is_attached(node) && !doc.is_inclusive_ancestor(root, node));
        cleared
    }

    /// Every annotated span under `root`, in document order.
    pub fn spans(&self, doc: &Document, root: NodeId) -> Vec<AnnotatedSpan> {
        self.span_nodes(doc, root)
            .into_iter()
            .filter_map(|node| {
                let el = doc.element(node)?;
                Some(AnnotatedSpan {
                    node,
                    text: doc.text_content(node),
                    style: SpanStyle::from_declarations(&el.style),
                })
            })
            .collect()
    }

    fn span_nodes(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.descendants(root)
            .filter(|&n| doc.has_class(n, &self.marker_class))
            .collect()
    }
}

/// Annotated spans under `root` carrying the default marker class.
pub fn annotated_spans(doc: &Document, root: NodeId) -> Vec<AnnotatedSpan> {
    Annotator::default().spans(doc, root)
}
