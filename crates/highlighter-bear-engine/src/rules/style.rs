use serde::{Deserialize, Serialize};

/// Visual styling of an annotated span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStyle {
    pub text_color: String,
    pub background_color: String,
    pub border_radius_px: u32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl SpanStyle {
    /// Inline CSS for the span, in a fixed order.
    pub fn to_declarations(&self) -> Vec<(String, String)> {
        let mut decls = vec![
            ("color".to_string(), self.text_color.clone()),
            ("background-color".to_string(), self.background_color.clone()),
            ("border-radius".to_string(), format!("{}px", self.border_radius_px)),
            ("padding".to_string(), "0 2px".to_string()),
            ("transition".to_string(), "all 0.2s ease".to_string()),
        ];
        if self.bold {
            decls.push(("font-weight".to_string(), "bold".to_string()));
        }
        if self.italic {
            decls.push(("font-style".to_string(), "italic".to_string()));
        }
        if self.underline {
            decls.push(("text-decoration".to_string(), "underline".to_string()));
        }
        decls
    }

    /// Reads a style back from declarations written by [`Self::to_declarations`].
    pub fn from_declarations(decls: &[(String, String)]) -> Self {
        let get = |property: &str| {
            decls
                .iter()
                .find(|(key, _)| key == property)
                .map(|(_, value)| value.as_str())
        };
        Self {
            text_color: get("color").unwrap_or_default().to_string(),
            background_color: get("background-color").unwrap_or_default().to_string(),
            border_radius_px: get("border-radius")
                .and_then(|v| v.trim_end_matches("px").trim().parse().ok())
                .unwrap_or(0),
            bold: get("font-weight") == Some("bold"),
            italic: get("font-style") == Some("italic"),
            underline: get("text-decoration") == Some("underline"),
        }
    }
}
