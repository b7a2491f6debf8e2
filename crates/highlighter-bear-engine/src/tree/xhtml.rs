use roxmltree::ParsingOptions;

use super::{Document, NodeId, NodeKind, TreeError};

impl Document {
    /// Builds a tree from well-formed XHTML.
    ///
    /// Text is kept byte-for-byte, including whitespace-only runs between
    /// elements. Comments and processing instructions are dropped. Building
    /// records no mutations.
    pub fn parse_xhtml(input: &str) -> Result<Self, TreeError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(input, options)?;
        let source_root = xml.root_element();

        let mut doc = Document::new(source_root.tag_name().name());
        let root = doc.root();
        copy_attributes(&mut doc, root, source_root);
        build_children(&mut doc, root, source_root);
        Ok(doc)
    }

    /// Serializes `id` and its subtree. Attributes are written in source
    /// order, followed by `class` and `style`.
    pub fn to_xhtml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_xhtml(id, &mut out);
        out
    }

    fn write_xhtml(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attributes {
                    write_attribute(out, name, value);
                }
                if !el.classes.is_empty() {
                    write_attribute(out, "class", &el.classes.join(" "));
                }
                if !el.style.is_empty() {
                    write_attribute(out, "style", &el.style_attribute());
                }
                out.push('>');
                for &child in self.children(id) {
                    self.write_xhtml(child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn copy_attributes(doc: &mut Document, id: NodeId, source: roxmltree::Node<'_, '_>) {
    if let Some(element) = doc.element_mut(id) {
        for attr in source.attributes() {
            element.set_attribute(attr.name(), attr.value());
        }
    }
}

fn build_children(doc: &mut Document, parent: NodeId, source: roxmltree::Node<'_, '_>) {
    for child in source.children() {
        if child.is_element() {
            let el = doc.create_element(child.tag_name().name());
            copy_attributes(doc, el, child);
            doc.attach_silently(parent, el);
            build_children(doc, el, child);
        } else if child.is_text()
            && let Some(text) = child.text()
        {
            let node = doc.create_text(text);
            doc.attach_silently(parent, node);
        }
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_keeps_text_and_structure() {
        let doc = Document::parse_xhtml("<body><p>Hello <b>bold</b> world</p></body>").unwrap();
        assert_eq!(doc.text_content(doc.root()), "Hello bold world");
        assert!(!doc.has_pending_mutations());

        let p = doc.children(doc.root())[0];
        assert_eq!(doc.tag(p), Some("p"));
        assert_eq!(doc.children(p).len(), 3);
    }

    #[test]
    fn parse_splits_class_and_style() {
        let doc = Document::parse_xhtml(
            r#"<body><span id="s" class="one two" style="color: red">x</span></body>"#,
        )
        .unwrap();
        let span = doc.children(doc.root())[0];
        let el = doc.element(span).unwrap();
        assert_eq!(el.attribute("id"), Some("s"));
        assert!(el.has_class("two"));
        assert_eq!(el.style_property("color"), Some("red"));
    }

    #[test]
    fn parse_accepts_doctype() {
        let doc = Document::parse_xhtml("<!DOCTYPE html><html><body>hi</body></html>").unwrap();
        assert_eq!(doc.tag(doc.root()), Some("html"));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            Document::parse_xhtml("<body><p>unclosed</body>"),
            Err(TreeError::Xhtml(_))
        ));
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let doc = Document::parse_xhtml(
            r#"<body><a title="a &amp; b" class="k">1 &lt; 2 &amp; 3</a></body>"#,
        )
        .unwrap();
        insta::assert_snapshot!(
            doc.to_xhtml(doc.root()),
            @r#"<body><a title="a &amp; b" class="k">1 &lt; 2 &amp; 3</a></body>"#
        );
    }
}
