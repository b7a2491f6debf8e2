//! # Rules
//!
//! The rule records the engine consumes, in the JSON shape the rule editor
//! stores and exports. Rules are owned by the rule repository; the engine
//! only reads them once per load.
//!
//! ## Modules
//!
//! - **`url`**: decides whether a rule applies to the current location
//! - **`style`**: `SpanStyle`, the visual part of a `MatchPattern`
//!
//! ## Priority
//!
//! Order matters. Flattening the `match_patterns` of every applicable rule,
//! in rule order then pattern order, gives each pattern its priority
//! (0 = first). Higher priority wins overlap conflicts.

pub mod style;
pub mod url;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use style::SpanStyle;
pub use url::{applicable_rules, url_matches};

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Failed to parse rules JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a \"rules\" array, a \"highlighterRules\" array or a bare array")]
    MissingRules,
    #[error("Invalid rule at index {index}: {reason}")]
    InvalidRule { index: usize, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    /// Case-insensitive literal.
    #[default]
    Text,
    /// Case-insensitive regular expression.
    Regex,
    /// Comma-separated literals, each matched like `Text`.
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPattern {
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: PatternKind,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// The editor stores `parseInt` of its input, so a cleared field arrives
    /// as `null`; anything that is not a whole number takes the default.
    #[serde(
        default = "default_border_radius",
        deserialize_with = "lenient_border_radius"
    )]
    pub border_radius: u32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl MatchPattern {
    /// A pattern with the rule editor's default styling.
    pub fn new(value: &str, kind: PatternKind) -> Self {
        Self {
            value: value.to_string(),
            kind,
            text_color: default_text_color(),
            background_color: default_background_color(),
            border_radius: default_border_radius(),
            bold: false,
            italic: false,
            underline: false,
        }
    }

    pub fn text(value: &str) -> Self {
        Self::new(value, PatternKind::Text)
    }

    pub fn regex(value: &str) -> Self {
        Self::new(value, PatternKind::Regex)
    }

    pub fn list(value: &str) -> Self {
        Self::new(value, PatternKind::List)
    }

    pub fn style(&self) -> SpanStyle {
        SpanStyle {
            text_color: self.text_color.clone(),
            background_color: self.background_color.clone(),
            border_radius_px: self.border_radius,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url_pattern: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub match_patterns: Vec<MatchPattern>,
}

impl Rule {
    pub fn new(id: &str, name: &str, url_pattern: &str, match_patterns: Vec<MatchPattern>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url_pattern: url_pattern.to_string(),
            enabled: true,
            match_patterns,
        }
    }

    /// Enabled and matching `location` per [`url_matches`].
    pub fn applies_to(&self, location: &str) -> bool {
        self.enabled && url_matches(location, &self.url_pattern)
    }
}

/// The `{ "rules": [...] }` envelope the rule editor exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Parses a rule document for import.
    ///
    /// Accepts the export envelope `{"rules": [...]}`, the storage envelope
    /// `{"highlighterRules": [...]}` or a bare array. Every rule needs a
    /// non-empty `name`, a `urlPattern` key and a `matchPatterns` array; the
    /// first rule that does not qualify rejects the whole document.
    pub fn from_json(input: &str) -> Result<Self, RuleError> {
        let rules = rule_values(input)?
            .into_iter()
            .enumerate()
            .map(|(index, item)| parse_rule(index, item))
            .collect::<Result<Vec<Rule>, RuleError>>()?;

        Ok(Self { rules })
    }

    /// Parses stored rules, dropping the ones that do not qualify.
    ///
    /// Only an unreadable document or a missing rules array is an error.
    pub fn from_stored_json(input: &str) -> Result<Self, RuleError> {
        let rules = rule_values(input)?
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                parse_rule(index, item)
                    .inspect_err(|e| log::warn!("Skipping stored rule: {e}"))
                    .ok()
            })
            .collect();

        Ok(Self { rules })
    }

    pub fn to_json(&self) -> Result<String, RuleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn rule_values(input: &str) -> Result<Vec<Value>, RuleError> {
    match serde_json::from_str::<Value>(input)? {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map
            .remove("rules")
            .or_else(|| map.remove("highlighterRules"))
        {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RuleError::MissingRules),
        },
        _ => Err(RuleError::MissingRules),
    }
}

fn parse_rule(index: usize, item: Value) -> Result<Rule, RuleError> {
    validate_rule(index, &item)?;
    serde_json::from_value(item).map_err(|e| RuleError::InvalidRule {
        index,
        reason: e.to_string(),
    })
}

fn validate_rule(index: usize, item: &Value) -> Result<(), RuleError> {
    let invalid = |reason: &str| RuleError::InvalidRule {
        index,
        reason: reason.to_string(),
    };
    let Value::Object(map) = item else {
        return Err(invalid("rule is not an object"));
    };
    match map.get("name") {
        Some(Value::String(name)) if !name.is_empty() => {}
        _ => return Err(invalid("missing name")),
    }
    if !map.contains_key("urlPattern") {
        return Err(invalid("missing urlPattern"));
    }
    if !matches!(map.get("matchPatterns"), Some(Value::Array(_))) {
        return Err(invalid("matchPatterns is not an array"));
    }
    Ok(())
}

fn default_enabled() -> bool {
    true
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_background_color() -> String {
    "#FFFF00".to_string()
}

fn default_border_radius() -> u32 {
    4
}

fn lenient_border_radius<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let radius = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(radius.unwrap_or_else(default_border_radius))
}
