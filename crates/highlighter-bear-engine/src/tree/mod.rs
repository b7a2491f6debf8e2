//! # Document Tree
//!
//! A mutable, arena-backed tree of elements and text leaves. This is the
//! "live document" the engine annotates: the host owns it, the engine only
//! rewrites text leaves into plain-text + annotated-span runs and back.
//!
//! ## Identity and attachment
//!
//! Nodes are addressed by [`NodeId`] and are never freed. Removing or
//! replacing a node detaches it (it loses its parent) but the id stays valid,
//! so a stale id held by a pending scan can still be asked
//! [`Document::is_attached`] before it is acted upon.
//!
//! ## Mutation records
//!
//! Every structural change to the attached tree is appended to a log of
//! [`MutationRecord`]s, the same shape a DOM mutation observer delivers
//! (`childList` changes only). The host drains the log with
//! [`Document::take_mutations`] and forwards it to the change watcher.
//! Changes to detached nodes are not recorded.
//!
//! ## Modules
//!
//! - **`node`**: `NodeId`, `NodeKind`, `Element`
//! - **`xhtml`**: parsing from and serializing to XHTML

pub mod node;
pub mod xhtml;

pub use node::{Element, NodeId, NodeKind};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("Failed to parse XHTML: {0}")]
    Xhtml(#[from] roxmltree::Error),
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("Node {0:?} has no parent")]
    Detached(NodeId),
    #[error("Node {reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },
    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// One batch of child-list changes under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena tree with a single root element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    mutations: Vec<MutationRecord>,
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            mutations: Vec::new(),
        };
        doc.root = doc.create_element(root_tag);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.data(id).kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.data_mut(id).kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        match &mut self.data_mut(id).kind {
            NodeKind::Text(existing) => {
                text.clone_into(existing);
                Ok(())
            }
            NodeKind::Element(_) => Err(TreeError::NotText(id)),
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Text(_))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<&Element> {
        self.parent(id).and_then(|p| self.element(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// True when `id` is the root or reaches it through its parent chain.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.data(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// True when `ancestor` is `id` itself or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.data(node).parent;
        }
        false
    }

    /// Pre-order traversal of everything below `id` (excluding `id`).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Concatenated text of every text node in the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
        self.record(parent, vec![child], vec![]);
        Ok(())
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), TreeError> {
        self.check_insertion(parent, child)?;
        if self.data(reference).parent != Some(parent) {
            return Err(TreeError::NotAChild { parent, reference });
        }
        self.detach(child);
        let index = self.index_in_parent(parent, reference);
        self.data_mut(parent).children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        self.record(parent, vec![child], vec![]);
        Ok(())
    }

    /// Detaches `id` from its parent. A no-op for already detached nodes.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.detach(id) {
            self.record(parent, vec![], vec![id]);
        }
    }

    /// Replaces `id` with `replacement`, in order, as one change.
    pub fn replace_with(&mut self, id: NodeId, replacement: &[NodeId]) -> Result<(), TreeError> {
        let parent = self.data(id).parent.ok_or(TreeError::Detached(id))?;
        for &node in replacement {
            if node == id {
                return Err(TreeError::Cycle { parent, child: node });
            }
            self.check_insertion(parent, node)?;
        }
        for &node in replacement {
            self.detach(node);
        }
        let index = self.index_in_parent(parent, id);
        self.data_mut(parent)
            .children
            .splice(index..=index, replacement.iter().copied());
        self.data_mut(id).parent = None;
        for &node in replacement {
            self.data_mut(node).parent = Some(parent);
        }
        self.record(parent, replacement.to_vec(), vec![id]);
        Ok(())
    }

    /// Merges adjacent text children and drops empty text nodes, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept = Vec::with_capacity(children.len());
        let mut removed = Vec::new();
        let mut run_head: Option<NodeId> = None;

        for child in children {
            match &self.data(child).kind {
                NodeKind::Text(text) if text.is_empty() => removed.push(child),
                NodeKind::Text(text) => match run_head {
                    Some(head) => {
                        let tail = text.clone();
                        if let NodeKind::Text(head_text) = &mut self.data_mut(head).kind {
                            head_text.push_str(&tail);
                        }
                        removed.push(child);
                    }
                    None => {
                        run_head = Some(child);
                        kept.push(child);
                    }
                },
                NodeKind::Element(_) => {
                    run_head = None;
                    self.normalize(child);
                    kept.push(child);
                }
            }
        }

        if removed.is_empty() {
            return;
        }
        for &node in &removed {
            self.data_mut(node).parent = None;
        }
        self.data_mut(id).children = kept;
        self.record(id, vec![], removed);
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.element(parent).is_none() {
            return Err(TreeError::NotAnElement(parent));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    fn index_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .unwrap_or(self.children(parent).len())
    }

    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.data_mut(id).parent.take()?;
        self.data_mut(parent).children.retain(|&c| c != id);
        Some(parent)
    }

    /// Appends without recording, for building a tree before anyone observes it.
    pub(crate) fn attach_silently(&mut self, parent: NodeId, child: NodeId) {
        self.data_mut(parent).children.push(child);
        self.data_mut(child).parent = Some(parent);
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        if self.is_attached(target) {
            self.mutations.push(MutationRecord {
                target,
                added,
                removed,
            });
        }
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let p = doc.create_element("p");
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        doc.append_child(doc.root(), p).unwrap();
        (p, t)
    }

    #[test]
    fn new_document_has_attached_root() {
        let doc = Document::new("body");
        assert_eq!(doc.tag(doc.root()), Some("body"));
        assert!(doc.is_attached(doc.root()));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn append_records_mutation_only_when_attached() {
        let mut doc = Document::new("body");
        let p = doc.create_element("p");
        let t = doc.create_text("hello");

        // p is detached, so building it up is invisible
        doc.append_child(p, t).unwrap();
        assert!(doc.take_mutations().is_empty());

        doc.append_child(doc.root(), p).unwrap();
        assert_eq!(
            doc.take_mutations(),
            vec![MutationRecord {
                target: doc.root(),
                added: vec![p],
                removed: vec![],
            }]
        );
    }

    #[test]
    fn text_cannot_have_children() {
        let mut doc = Document::new("body");
        let (_, t) = paragraph(&mut doc, "x");
        let other = doc.create_text("y");
        assert!(matches!(
            doc.append_child(t, other),
            Err(TreeError::NotAnElement(_))
        ));
    }

    #[test]
    fn append_rejects_cycles() {
        let mut doc = Document::new("body");
        let (p, _) = paragraph(&mut doc, "x");
        assert!(matches!(
            doc.append_child(p, doc.root()),
            Err(TreeError::Cycle { .. })
        ));
    }

    #[test]
    fn replace_with_splices_in_order_and_detaches() {
        let mut doc = Document::new("body");
        let (p, t) = paragraph(&mut doc, "abc");
        doc.take_mutations();

        let a = doc.create_text("a");
        let b = doc.create_element("span");
        let c = doc.create_text("c");
        doc.replace_with(t, &[a, b, c]).unwrap();

        assert_eq!(doc.children(p), &[a, b, c]);
        assert!(!doc.is_attached(t));
        assert!(doc.is_attached(b));
        assert_eq!(
            doc.take_mutations(),
            vec![MutationRecord {
                target: p,
                added: vec![a, b, c],
                removed: vec![t],
            }]
        );
    }

    #[test]
    fn replace_detached_node_fails() {
        let mut doc = Document::new("body");
        let lonely = doc.create_text("x");
        let other = doc.create_text("y");
        assert!(matches!(
            doc.replace_with(lonely, &[other]),
            Err(TreeError::Detached(_))
        ));
    }

    #[test]
    fn insert_before_places_child() {
        let mut doc = Document::new("body");
        let (p, t) = paragraph(&mut doc, "world");
        let hello = doc.create_text("hello ");
        doc.insert_before(p, hello, t).unwrap();
        assert_eq!(doc.text_content(p), "hello world");
    }

    #[test]
    fn removed_subtree_is_detached() {
        let mut doc = Document::new("body");
        let (p, t) = paragraph(&mut doc, "bye");
        doc.remove(p);
        assert!(!doc.is_attached(p));
        assert!(!doc.is_attached(t));
        assert_eq!(doc.text_content(doc.root()), "");
    }

    #[test]
    fn normalize_merges_and_drops_empty_text() {
        let mut doc = Document::new("body");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p).unwrap();
        for piece in ["a", "", "b"] {
            let t = doc.create_text(piece);
            doc.append_child(p, t).unwrap();
        }
        let em = doc.create_element("em");
        doc.append_child(p, em).unwrap();
        let tail = doc.create_text("c");
        doc.append_child(p, tail).unwrap();

        doc.normalize(doc.root());

        let children = doc.children(p).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(doc.text(children[0]), Some("ab"));
        assert_eq!(doc.text_content(p), "abc");
    }

    #[test]
    fn descendants_are_document_order() {
        let mut doc = Document::new("body");
        let (p1, t1) = paragraph(&mut doc, "one");
        let (p2, t2) = paragraph(&mut doc, "two");
        let order: Vec<_> = doc.descendants(doc.root()).collect();
        assert_eq!(order, vec![p1, t1, p2, t2]);
    }
}
