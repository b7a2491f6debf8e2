/// Stable handle to a node in a [`super::Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

/// An element node.
///
/// `class` and `style` are kept apart from the other attributes because the
/// engine reads them on every scan: the class list carries the annotation
/// marker and the style declarations carry the annotation styling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    /// Attributes other than `class` and `style`, in source order.
    pub attributes: Vec<(String, String)>,
    pub classes: Vec<String>,
    /// Inline CSS declarations as `(property, value)` pairs.
    pub style: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match name {
            "class" => {
                self.classes = value.split_whitespace().map(str::to_string).collect();
            }
            "style" => self.style = parse_declarations(value),
            _ => match self.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => value.clone_into(existing),
                None => self.attributes.push((name.to_string(), value.to_string())),
            },
        }
    }

    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
    }

    /// The `style` attribute value, `property: value` pairs joined by `; `.
    pub fn style_attribute(&self) -> String {
        self.style
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Splits an inline CSS string into `(property, value)` pairs.
pub fn parse_declarations(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn class_attribute_splits_on_whitespace() {
        let mut el = Element::new("SPAN");
        el.set_attribute("class", "a  b\tc");
        assert_eq!(el.tag, "span");
        assert_eq!(el.classes, vec!["a", "b", "c"]);
        assert!(el.has_class("b"));
    }

    #[test]
    fn style_round_trips_through_attribute() {
        let mut el = Element::new("span");
        el.set_attribute("style", "color: red;background-color:#fff ; ;bogus");
        assert_eq!(el.style_property("background-color"), Some("#fff"));
        assert_eq!(el.style_attribute(), "color: red; background-color: #fff");
    }

    #[test]
    fn plain_attributes_keep_order_and_overwrite() {
        let mut el = Element::new("a");
        el.set_attribute("href", "/x");
        el.set_attribute("id", "link");
        el.set_attribute("href", "/y");
        assert_eq!(
            el.attributes,
            vec![
                ("href".to_string(), "/y".to_string()),
                ("id".to_string(), "link".to_string()),
            ]
        );
        assert_eq!(el.attribute("id"), Some("link"));
    }
}
