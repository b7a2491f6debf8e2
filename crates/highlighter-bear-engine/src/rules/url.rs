use fancy_regex::Regex;

use super::Rule;

/// Whether `url_pattern` selects `location`.
///
/// Blank patterns match everything. Otherwise a literal substring hit wins,
/// then the pattern is tried as a (case-sensitive) regular expression. A
/// pattern that does not compile, or fails while matching, behaves as the
/// substring test alone.
pub fn url_matches(location: &str, url_pattern: &str) -> bool {
    if url_pattern.trim().is_empty() {
        return true;
    }
    if location.contains(url_pattern) {
        return true;
    }
    match Regex::new(url_pattern) {
        Ok(re) => re.is_match(location).unwrap_or_else(|e| {
            log::debug!("URL pattern {url_pattern:?} failed on {location}: {e}");
            false
        }),
        Err(e) => {
            log::debug!("URL pattern {url_pattern:?} is not a valid regex, substring only: {e}");
            false
        }
    }
}

/// Enabled rules whose URL pattern selects `location`, in rule order.
pub fn applicable_rules<'a>(location: &str, rules: &'a [Rule]) -> Vec<&'a Rule> {
    let matching: Vec<&Rule> = rules
        .iter()
        .filter(|rule| rule.applies_to(location))
        .collect();
    for rule in &matching {
        log::info!("Rule {:?} applies to {location}", rule.name);
    }
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::rules::MatchPattern;

    #[rstest]
    #[case("https://shop.example.com/x", "shop.example.com", true)]
    #[case("https://shop.example.com/x", r"^https://shop\.", true)]
    #[case("https://shop.example.com/x", r"^http://shop\.", false)]
    #[case("https://shop.example.com/x", "", true)]
    #[case("https://shop.example.com/x", "   ", true)]
    #[case("https://shop.example.com/x", "other.org", false)]
    #[case("https://a.com/[x", "[x", true)]
    #[case("https://a.com/y", "[x", false)]
    #[case("https://A.com/", "a.com", false)]
    #[case("https://a.com/cart", r"^https://a\.com(?!/checkout)", true)]
    #[case("https://a.com/checkout", r"^https://a\.com(?!/checkout)", false)]
    fn url_pattern_policy(#[case] location: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(url_matches(location, pattern), expected);
    }

    #[test]
    fn disabled_rule_never_applies() {
        let mut rule = Rule::new("r1", "All", "", vec![MatchPattern::text("x")]);
        assert!(rule.applies_to("https://anything"));
        rule.enabled = false;
        assert!(!rule.applies_to("https://anything"));
    }

    #[test]
    fn applicable_rules_keep_rule_order() {
        let rules = vec![
            Rule::new("1", "first", "example", vec![]),
            Rule::new("2", "second", "nowhere", vec![]),
            Rule::new("3", "third", "", vec![]),
        ];
        let names: Vec<_> = applicable_rules("https://example.com", &rules)
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "third"]);
    }

    #[test]
    fn empty_rule_set_applies_nothing() {
        assert!(applicable_rules("https://example.com", &[]).is_empty());
    }
}
