use std::rc::Rc;

use crate::annotate::Annotator;
use crate::matching::{CompiledPattern, Match, resolve_overlaps};
use crate::rules::{Rule, SpanStyle};
use crate::scan::{ScanOptions, text_leaves};
use crate::tree::{Document, NodeId};

/// One pattern of an applicable rule, compiled and ranked.
#[derive(Debug, Clone)]
pub struct ActivePattern {
    pub priority: usize,
    pub value: String,
    pub compiled: CompiledPattern,
    pub style: Rc<SpanStyle>,
}

/// Counters from one scan-and-annotate pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub leaves_scanned: usize,
    pub leaves_annotated: usize,
    pub spans_created: usize,
}

impl std::ops::AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.leaves_scanned += other.leaves_scanned;
        self.leaves_annotated += other.leaves_annotated;
        self.spans_created += other.spans_created;
    }
}

/// The compiled, prioritized patterns of the currently applicable rules.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    patterns: Vec<ActivePattern>,
}

impl Highlighter {
    /// Flattens the rules' patterns in rule order, then pattern order.
    ///
    /// Every pattern takes a priority slot, including ones with an empty
    /// value or an invalid regex that will never match.
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a Rule>) -> Self {
        let patterns = rules
            .into_iter()
            .flat_map(|rule| rule.match_patterns.iter())
            .enumerate()
            .map(|(priority, pattern)| ActivePattern {
                priority,
                value: pattern.value.clone(),
                compiled: CompiledPattern::compile(pattern),
                style: Rc::new(pattern.style()),
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[ActivePattern] {
        &self.patterns
    }

    /// Candidates from every pattern, before overlap resolution.
    pub fn candidates(&self, text: &str) -> Vec<Match> {
        let mut candidates = Vec::new();
        for pattern in &self.patterns {
            let found = pattern.compiled.find_matches(text);
            if !found.is_empty() {
                log::trace!("{} matches for pattern {:?}", found.len(), pattern.value);
            }
            candidates.extend(found.into_iter().map(|range| {
                Match::new(text, range, pattern.priority, Rc::clone(&pattern.style))
            }));
        }
        candidates
    }

    /// The non-overlapping matches to annotate in `text`, ordered by start.
    pub fn matches_for(&self, text: &str) -> Vec<Match> {
        resolve_overlaps(self.candidates(text))
    }

    /// Scans every eligible leaf under `root` and annotates its matches.
    ///
    /// Text the annotator split off on an earlier pass is not searched
    /// again, so a second pass over an unchanged tree changes nothing.
    pub fn highlight_subtree(
        &self,
        doc: &mut Document,
        root: NodeId,
        options: &ScanOptions,
        annotator: &mut Annotator,
    ) -> ScanStats {
        let mut stats = ScanStats::default();
        if self.is_empty() {
            return stats;
        }

        let leaves: Vec<NodeId> = text_leaves(doc, root, options)
            .filter(|&leaf| !annotator.is_searched(leaf))
            .collect();
        for leaf in leaves {
            stats.leaves_scanned += 1;
            let Some(text) = doc.text(leaf) else {
                continue;
            };
            let matches = self.matches_for(text);
            if matches.is_empty() {
                continue;
            }
            match annotator.apply(doc, leaf, &matches) {
                Ok(0) => {}
                Ok(spans) => {
                    stats.leaves_annotated += 1;
                    stats.spans_created += spans;
                }
                Err(e) => log::warn!("Failed to annotate leaf {leaf:?}: {e}"),
            }
        }
        log::debug!(
            "Scanned {} leaves under {root:?}, created {} spans",
            stats.leaves_scanned,
            stats.spans_created
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchPattern;
    use pretty_assertions::assert_eq;

    fn highlighter(patterns: Vec<MatchPattern>) -> Highlighter {
        let rules = vec![Rule::new("r", "rule", "", patterns)];
        Highlighter::from_rules(&rules)
    }

    fn summary(matches: &[Match]) -> Vec<(&str, usize)> {
        matches.iter().map(|m| (m.text.as_str(), m.priority)).collect()
    }

    #[test]
    fn priorities_flatten_across_rules() {
        let rules = vec![
            Rule::new("1", "a", "", vec![MatchPattern::text("a"), MatchPattern::text("b")]),
            Rule::new("2", "b", "", vec![MatchPattern::text("c")]),
        ];
        let h = Highlighter::from_rules(&rules);
        let priorities: Vec<_> = h
            .patterns()
            .iter()
            .map(|p| (p.value.as_str(), p.priority))
            .collect();
        assert_eq!(priorities, vec![("a", 0), ("b", 1), ("c", 2)]);
    }

    #[test]
    fn critical_important_update() {
        let h = highlighter(vec![
            MatchPattern::text("important"),
            MatchPattern::text("Critical"),
        ]);
        let matches = h.matches_for("Critical: important update");
        assert_eq!(summary(&matches), vec![("Critical", 1), ("important", 0)]);
        assert_eq!((matches[0].start, matches[0].end), (0, 8));
        assert_eq!((matches[1].start, matches[1].end), (10, 19));
    }

    #[test]
    fn later_pattern_wins_overlap() {
        let h = highlighter(vec![MatchPattern::regex(r"\d{4}"), MatchPattern::text("0 report")]);
        let matches = h.matches_for("2020 report");
        assert_eq!(summary(&matches), vec![("0 report", 1)]);
        assert_eq!((matches[0].start, matches[0].end), (3, 11));

        // No overlap, both kept.
        let matches = h.matches_for("2024 report");
        assert_eq!(summary(&matches), vec![("2024", 0)]);
    }

    #[test]
    fn invalid_regex_does_not_affect_other_patterns() {
        let h = highlighter(vec![MatchPattern::regex("([a-"), MatchPattern::text("ok")]);
        assert_eq!(summary(&h.matches_for("ok then")), vec![("ok", 1)]);
    }

    #[test]
    fn list_items_share_one_priority() {
        let h = highlighter(vec![MatchPattern::list("cat, dog"), MatchPattern::text("bird")]);
        let matches = h.matches_for("dog bird cat");
        assert_eq!(summary(&matches), vec![("dog", 0), ("bird", 1), ("cat", 0)]);
    }

    #[test]
    fn highlight_subtree_reports_stats() {
        let mut doc = Document::parse_xhtml(
            "<body><p>alpha beta</p><p>gamma</p><script>alpha</script></body>",
        )
        .unwrap();
        let h = highlighter(vec![MatchPattern::text("alpha"), MatchPattern::text("beta")]);
        let root = doc.root();
        let stats = h.highlight_subtree(
            &mut doc,
            root,
            &ScanOptions::default(),
            &mut Annotator::default(),
        );
        assert_eq!(
            stats,
            ScanStats {
                leaves_scanned: 2,
                leaves_annotated: 1,
                spans_created: 2,
            }
        );
    }

    #[test]
    fn evicted_pattern_does_not_resurface_in_leftover_text() {
        let mut doc = Document::parse_xhtml("<body><p>2020 report</p></body>").unwrap();
        let h = highlighter(vec![MatchPattern::regex(r"\d+"), MatchPattern::text("0 report")]);
        let options = ScanOptions::default();
        let mut annotator = Annotator::default();
        let root = doc.root();

        let first = h.highlight_subtree(&mut doc, root, &options, &mut annotator);
        let after_first = doc.to_xhtml(root);
        let second = h.highlight_subtree(&mut doc, root, &options, &mut annotator);

        assert_eq!(first.spans_created, 1);
        assert_eq!(second.spans_created, 0);
        assert_eq!(doc.to_xhtml(root), after_first);
        let texts: Vec<_> = annotator
            .spans(&doc, root)
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, vec!["0 report"]);

        // After a clear the whole text is searched again from scratch.
        annotator.clear(&mut doc, root);
        let third = h.highlight_subtree(&mut doc, root, &options, &mut annotator);
        assert_eq!(third.spans_created, 1);
        assert_eq!(doc.to_xhtml(root), after_first);
    }

    #[test]
    fn empty_highlighter_does_nothing() {
        let mut doc = Document::parse_xhtml("<body><p>alpha</p></body>").unwrap();
        let root = doc.root();
        let stats = Highlighter::default().highlight_subtree(
            &mut doc,
            root,
            &ScanOptions::default(),
            &mut Annotator::default(),
        );
        assert_eq!(stats, ScanStats::default());
        assert!(!doc.has_pending_mutations());
    }
}
