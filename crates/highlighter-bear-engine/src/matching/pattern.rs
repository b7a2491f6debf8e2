use std::ops::Range;

use fancy_regex::Regex;

use crate::rules::{MatchPattern, PatternKind};

/// A [`MatchPattern`] compiled for repeated searching.
///
/// Every kind reduces to a list of case-insensitive regexes searched one
/// after another: `Text` is one escaped literal, `List` is one escaped
/// literal per comma-separated item, `Regex` is the user's expression, with
/// lookaround and backreferences available. A regex that fails to compile
/// leaves the list empty, so that pattern finds nothing while every other
/// pattern keeps working.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    matchers: Vec<Regex>,
}

impl CompiledPattern {
    pub fn compile(pattern: &MatchPattern) -> Self {
        if pattern.value.is_empty() {
            return Self { matchers: vec![] };
        }
        let matchers = match pattern.kind {
            PatternKind::Text => literal(&pattern.value).into_iter().collect(),
            PatternKind::List => pattern
                .value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .filter_map(literal)
                .collect(),
            PatternKind::Regex => match case_insensitive(&pattern.value) {
                Ok(re) => vec![re],
                Err(e) => {
                    log::warn!("Invalid regex pattern {:?}: {e}", pattern.value);
                    vec![]
                }
            },
        };
        Self { matchers }
    }

    /// True when this pattern can never produce a match.
    pub fn is_inert(&self) -> bool {
        self.matchers.is_empty()
    }

    /// All non-empty hits in `text`, matcher by matcher, each left to right.
    ///
    /// Hits of one matcher never overlap each other: the search resumes at
    /// the end of the previous hit. A zero-length hit is skipped and the
    /// search moves one character forward, so the scan always terminates.
    /// A matcher that fails while searching (backtrack limit) contributes
    /// nothing for this text.
    pub fn find_matches(&self, text: &str) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        for re in &self.matchers {
            match find_all(re, text) {
                Ok(found) => out.extend(found),
                Err(e) => log::warn!("Pattern {:?} failed while searching: {e}", re.as_str()),
            }
        }
        out
    }
}

fn find_all(re: &Regex, text: &str) -> Result<Vec<Range<usize>>, fancy_regex::Error> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while cursor <= text.len() {
        let Some(m) = re.find_from_pos(text, cursor)? else {
            break;
        };
        if m.start() == m.end() {
            cursor = text[m.end()..]
                .chars()
                .next()
                .map_or(text.len() + 1, |c| m.end() + c.len_utf8());
        } else {
            found.push(m.range());
            cursor = m.end();
        }
    }
    Ok(found)
}

fn literal(value: &str) -> Option<Regex> {
    case_insensitive(&regex::escape(value))
        .inspect_err(|e| log::warn!("Literal pattern {value:?} could not be compiled: {e}"))
        .ok()
}

fn case_insensitive(source: &str) -> Result<Regex, fancy_regex::Error> {
    Regex::new(&format!("(?i){source}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranges(pattern: MatchPattern, text: &str) -> Vec<Range<usize>> {
        CompiledPattern::compile(&pattern).find_matches(text)
    }

    #[test]
    fn text_is_case_insensitive() {
        assert_eq!(
            ranges(MatchPattern::text("todo"), "TODO: fix todo"),
            vec![0..4, 10..14]
        );
    }

    #[test]
    fn text_hits_do_not_self_overlap() {
        assert_eq!(ranges(MatchPattern::text("aa"), "aaaaa"), vec![0..2, 2..4]);
    }

    #[test]
    fn text_treats_regex_metacharacters_literally() {
        assert_eq!(ranges(MatchPattern::text("a.b"), "axb a.b"), vec![4..7]);
    }

    #[test]
    fn regex_is_global_and_case_insensitive() {
        assert_eq!(
            ranges(MatchPattern::regex(r"err(or)?"), "Error, ERR, err"),
            vec![0..5, 7..10, 12..15]
        );
    }

    #[test]
    fn invalid_regex_yields_nothing() {
        let compiled = CompiledPattern::compile(&MatchPattern::regex("(unclosed"));
        assert!(compiled.is_inert());
        assert!(compiled.find_matches("(unclosed").is_empty());
    }

    #[test]
    fn zero_length_matches_terminate_and_are_dropped() {
        let text = "abc".repeat(1000);
        assert!(ranges(MatchPattern::regex("x*"), &text).is_empty());
        assert!(ranges(MatchPattern::regex(r"\b"), &text).is_empty());
    }

    #[test]
    fn zero_length_matches_mixed_with_real_ones() {
        assert_eq!(ranges(MatchPattern::regex("b*"), "abba cb"), vec![1..3, 6..7]);
    }

    #[test]
    fn offsets_stay_on_char_boundaries() {
        let text = "çafé CAFÉ";
        let hits = ranges(MatchPattern::text("café"), text);
        assert_eq!(hits.len(), 1);
        assert_eq!(&text[hits[0].clone()], "CAFÉ");
        assert!(ranges(MatchPattern::regex(""), "日本語").is_empty());
    }

    #[test]
    fn regex_lookahead_and_backreferences() {
        assert_eq!(ranges(MatchPattern::regex("foo(?=bar)"), "foobar foobaz"), vec![0..3]);
        assert_eq!(ranges(MatchPattern::regex(r"(?<!\$)\b\d+"), "$5 or 7"), vec![6..7]);
        assert_eq!(ranges(MatchPattern::regex(r"(\w)\1"), "Book keeper"), vec![1..3, 6..8]);
    }

    #[test]
    fn pure_lookahead_over_long_run_terminates_empty() {
        let text = "a".repeat(10_000);
        assert!(ranges(MatchPattern::regex("(?=a)"), &text).is_empty());
        assert!(ranges(MatchPattern::regex("(?=a)"), "").is_empty());
    }

    #[test]
    fn list_items_are_independent_literals() {
        assert_eq!(
            ranges(MatchPattern::list("red, green,,blue "), "Blue green RED"),
            vec![11..14, 5..10, 0..4]
        );
    }

    #[test]
    fn empty_value_matches_nothing() {
        assert!(CompiledPattern::compile(&MatchPattern::text("")).is_inert());
        assert!(CompiledPattern::compile(&MatchPattern::list(" , ")).is_inert());
    }
}
