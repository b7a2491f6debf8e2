use highlighter_bear_engine::tree::NodeKind;
use highlighter_bear_engine::{Document, NodeId, ScanOptions, SpanStyle};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::str::FromStr;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Flattens the document into display lines, one per block element.
///
/// Annotated spans keep their colors and text attributes. Content of
/// excluded tags and of `<head>` is not shown.
pub fn document_lines(doc: &Document, options: &ScanOptions) -> Vec<Line<'static>> {
    let mut out = LineBuilder::default();
    walk(doc, doc.root(), options, Style::default(), &mut out);
    out.finish()
}

fn walk(doc: &Document, node: NodeId, options: &ScanOptions, style: Style, out: &mut LineBuilder) {
    for &child in doc.children(node) {
        match doc.kind(child) {
            NodeKind::Text(text) => out.push_text(text, style),
            NodeKind::Element(el) => {
                if el.tag == "head" || options.is_excluded_tag(&el.tag) {
                    continue;
                }
                if el.tag == "br" {
                    out.break_line();
                    continue;
                }
                let block = BLOCK_TAGS.contains(&el.tag.as_str());
                if block {
                    out.break_line();
                }
                let child_style = if el.has_class(&options.marker_class) {
                    span_style(&SpanStyle::from_declarations(&el.style))
                } else {
                    style
                };
                walk(doc, child, options, child_style, out);
                if block {
                    out.break_line();
                }
            }
        }
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    pending_space: bool,
}

impl LineBuilder {
    /// Collapses whitespace runs the way a browser lays out normal text.
    fn push_text(&mut self, text: &str, style: Style) {
        let leading = text.starts_with(char::is_whitespace);
        let trailing = text.ends_with(char::is_whitespace);
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            self.pending_space |= !self.current.is_empty() && leading;
            return;
        }
        if (self.pending_space || leading) && !self.current.is_empty() {
            self.current.push(Span::raw(" "));
        }
        self.current.push(Span::styled(words.join(" "), style));
        self.pending_space = trailing;
    }

    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
        self.pending_space = false;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_line();
        self.lines
    }
}

pub fn span_style(style: &SpanStyle) -> Style {
    let mut out = Style::default();
    if let Some(fg) = parse_color(&style.text_color) {
        out = out.fg(fg);
    }
    if let Some(bg) = parse_color(&style.background_color) {
        out = out.bg(bg);
    }
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.underline {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Parses the CSS color forms the rule editor produces: `#RRGGBB`, `#RGB`,
/// `rgb(r, g, b)` and `rgba(r, g, b, a)` (alpha ignored). Anything else is
/// tried as a color name.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<u8> = args
            .split(',')
            .take(3)
            .map(|c| c.trim().parse().ok())
            .collect::<Option<_>>()?;
        return match channels[..] {
            [r, g, b] => Some(Color::Rgb(r, g, b)),
            _ => None,
        };
    }
    Color::from_str(value).ok()
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 17;
            }
            Some(Color::Rgb(rgb[0], rgb[1], rgb[2]))
        }
        _ => None,
    }
}
