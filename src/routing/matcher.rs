//! Redirect rule matching.
//!
//! # Responsibilities
//! - Find the single best active rule for a path
//! - Substitute capture groups into the destination template
//!
//! # Design Decisions
//! - Pure functions, no I/O or shared state
//! - Total order: priority desc, order asc, position asc
//! - Destinations are templates only; nothing in `to` is evaluated

use std::borrow::Cow;
use std::cmp::Reverse;

use crate::routing::rule::{CompiledRule, RedirectRule, RuleSet};

/// A rule that matched a path, together with its capture groups.
#[derive(Debug)]
pub struct RuleMatch<'a> {
    pub rule: &'a RedirectRule,
    captures: Vec<Option<String>>,
}

impl RuleMatch<'_> {
    /// Whether the rule points off-site. Decided from the template, so a
    /// capture can never turn an on-site rule into an off-site one.
    pub fn is_external(&self) -> bool {
        is_external(&self.rule.to)
    }

    /// The rule's destination with capture groups substituted. On-site
    /// destinations always start with exactly one `/`.
    pub fn destination(&self) -> String {
        let destination = substitute(&self.rule.to, &self.captures);
        if self.is_external() {
            destination
        } else {
            single_leading_slash(&destination).into_owned()
        }
    }
}

fn rank(rule: &CompiledRule) -> (Reverse<i64>, i64, usize) {
    (Reverse(rule.rule.priority), rule.rule.order, rule.position())
}

/// Return the winning rule for `path`, or `None` when no active rule matches.
pub fn best_match<'a>(path: &str, rules: &'a RuleSet) -> Option<RuleMatch<'a>> {
    let mut best: Option<(&'a CompiledRule, Vec<Option<String>>)> = None;

    for candidate in rules.iter() {
        if !candidate.rule.is_active {
            continue;
        }
        if let Some((current, _)) = &best {
            if rank(candidate) >= rank(current) {
                continue;
            }
        }
        if let Some(captures) = candidate.captures(path) {
            best = Some((candidate, captures));
        }
    }

    best.map(|(compiled, captures)| RuleMatch {
        rule: &compiled.rule,
        captures,
    })
}

/// Replace each `$N` in `template` with capture group N. Missing or
/// non-participating groups become the empty string.
pub fn substitute(template: &str, captures: &[Option<String>]) -> String {
    if !template.contains('$') {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while let Some(&(j, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            end = j + 1;
            chars.next();
        }

        if end == start {
            out.push('$');
            continue;
        }

        let group = template[start..end]
            .parse::<usize>()
            .ok()
            .and_then(|n| captures.get(n))
            .and_then(|value| value.as_deref());
        if let Some(value) = group {
            out.push_str(value);
        }
    }

    out
}

/// True when a destination leaves the site (anything not a rooted path).
pub fn is_external(destination: &str) -> bool {
    !destination.starts_with('/') || destination.starts_with("//")
}

/// Reduce a leading run of `/` or `\` to a single `/`. Browsers resolve
/// `//host` and `/\host` against another origin.
pub fn single_leading_slash(path: &str) -> Cow<'_, str> {
    let rest = path.trim_start_matches(['/', '\\']);
    if path.len() - rest.len() <= 1 && path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{}", rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::{rule, MatchType};

    fn caps(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_priority_wins() {
        let mut low = rule("low", "/test", "/low", MatchType::Exact);
        low.priority = 50;
        let mut high = rule("high", "/test", "/high", MatchType::Exact);
        high.priority = 100;

        let set = RuleSet::compile(vec![low, high]);
        assert_eq!(best_match("/test", &set).unwrap().rule.id, "high");
    }

    #[test]
    fn test_order_breaks_priority_tie() {
        let mut second = rule("second", "/test", "/2", MatchType::Exact);
        second.priority = 50;
        second.order = 2;
        let mut first = rule("first", "/test", "/1", MatchType::Exact);
        first.priority = 50;
        first.order = 1;

        let set = RuleSet::compile(vec![second, first]);
        assert_eq!(best_match("/test", &set).unwrap().rule.id, "first");
    }

    #[test]
    fn test_position_breaks_full_tie() {
        let a = rule("a", "/test", "/a", MatchType::Exact);
        let b = rule("b", "/test", "/b", MatchType::Exact);
        let set = RuleSet::compile(vec![a, b]);

        for _ in 0..10 {
            assert_eq!(best_match("/test", &set).unwrap().rule.id, "a");
        }
    }

    #[test]
    fn test_lower_ranked_match_does_not_shadow_winner() {
        let mut wildcard = rule("wild", "/docs/*", "/new-docs/$1", MatchType::Wildcard);
        wildcard.priority = 1;
        let exact = rule("exact", "/docs/intro", "/start", MatchType::Exact);

        let set = RuleSet::compile(vec![exact, wildcard]);
        let m = best_match("/docs/intro", &set).unwrap();
        assert_eq!(m.rule.id, "wild");
        assert_eq!(m.destination(), "/new-docs/intro");
    }

    #[test]
    fn test_wildcard_capture() {
        let set = RuleSet::compile(vec![rule("w", "/blog/*", "/articles/$1", MatchType::Wildcard)]);
        let m = best_match("/blog/my-post", &set).unwrap();
        assert_eq!(m.destination(), "/articles/my-post");

        // Zero characters still match after the literal prefix.
        assert_eq!(best_match("/blog/", &set).unwrap().destination(), "/articles/");
        assert!(best_match("/blog", &set).is_none());
    }

    #[test]
    fn test_wildcard_spans_segments() {
        let set = RuleSet::compile(vec![rule("w", "/shop/*", "/store/$1", MatchType::Wildcard)]);
        let m = best_match("/shop/shoes/red", &set).unwrap();
        assert_eq!(m.destination(), "/store/shoes/red");
    }

    #[test]
    fn test_regex_capture() {
        let set = RuleSet::compile(vec![rule(
            "re",
            "^/product/(\\d+)$",
            "/products/$1",
            MatchType::Regex,
        )]);
        assert_eq!(best_match("/product/12345", &set).unwrap().destination(), "/products/12345");
        assert!(best_match("/product/abc", &set).is_none());
    }

    #[test]
    fn test_regex_implicit_anchoring() {
        let set = RuleSet::compile(vec![rule("re", "/team/(\\w+)", "/about/$1", MatchType::Regex)]);
        assert!(best_match("/team/alex", &set).is_some());
        assert!(best_match("/old/team/alex", &set).is_none());
        assert!(best_match("/team/alex/extra", &set).is_none());
    }

    #[test]
    fn test_inactive_rule_excluded() {
        let mut inactive = rule("off", "/promo", "/sale", MatchType::Exact);
        inactive.is_active = false;
        inactive.priority = 1000;
        let set = RuleSet::compile(vec![inactive]);
        assert!(best_match("/promo", &set).is_none());
    }

    #[test]
    fn test_invalid_regex_does_not_break_other_rules() {
        let mut broken = rule("broken", "/(oops", "/x", MatchType::Regex);
        broken.priority = 100;
        let fine = rule("fine", "/keep", "/kept", MatchType::Exact);
        let set = RuleSet::compile(vec![broken, fine]);
        assert_eq!(best_match("/keep", &set).unwrap().rule.id, "fine");
    }

    #[test]
    fn test_case_sensitivity() {
        let mut strict = rule("strict", "/Blog/*", "/b/$1", MatchType::Wildcard);
        strict.case_sensitive = true;
        let set = RuleSet::compile(vec![strict]);
        assert!(best_match("/blog/x", &set).is_none());
        assert!(best_match("/Blog/x", &set).is_some());

        let loose = RuleSet::compile(vec![rule("loose", "/Blog/*", "/b/$1", MatchType::Wildcard)]);
        assert_eq!(best_match("/BLOG/Post", &loose).unwrap().destination(), "/b/Post");
    }

    #[test]
    fn test_substitute() {
        let c = caps(&[Some("/x/1/2"), Some("1"), None, Some("2")]);
        assert_eq!(substitute("/plain", &c), "/plain");
        assert_eq!(substitute("/a/$1/$3", &c), "/a/1/2");
        assert_eq!(substitute("/a/$2", &c), "/a/");
        assert_eq!(substitute("/a/$9", &c), "/a/");
        assert_eq!(substitute("/cost/$", &c), "/cost/$");
        assert_eq!(substitute("/$x", &c), "/$x");
        assert_eq!(substitute("$0", &c), "/x/1/2");
    }

    #[test]
    fn test_substitute_multi_digit_group() {
        let mut c: Vec<Option<String>> = (0..12).map(|i| Some(format!("g{}", i))).collect();
        c[1] = Some("one".into());
        assert_eq!(substitute("/$11", &c), "/g11");
        assert_eq!(substitute("/$1-x", &c), "/one-x");
    }

    #[test]
    fn test_capture_cannot_make_rule_external() {
        let set = RuleSet::compile(vec![rule("strip", "/old/*", "/$1", MatchType::Wildcard)]);
        let matched = best_match("/old//evil.com/x", &set).unwrap();
        assert!(!matched.is_external());
        assert_eq!(matched.destination(), "/evil.com/x");

        let matched = best_match("/old/\\evil.com", &set).unwrap();
        assert_eq!(matched.destination(), "/evil.com");
    }

    #[test]
    fn test_external_template_keeps_captures() {
        let set = RuleSet::compile(vec![rule("shop", "/shop/*", "https://shop.example.org/$1", MatchType::Wildcard)]);
        let matched = best_match("/shop/item/1", &set).unwrap();
        assert!(matched.is_external());
        assert_eq!(matched.destination(), "https://shop.example.org/item/1");
    }

    #[test]
    fn test_single_leading_slash() {
        assert_eq!(single_leading_slash("/a/b"), "/a/b");
        assert_eq!(single_leading_slash("//evil.com"), "/evil.com");
        assert_eq!(single_leading_slash("///evil.com/"), "/evil.com/");
        assert_eq!(single_leading_slash("/\\evil.com"), "/evil.com");
        assert_eq!(single_leading_slash("/"), "/");
    }

    #[test]
    fn test_is_external() {
        assert!(!is_external("/internal"));
        assert!(is_external("https://example.com/target"));
        assert!(is_external("//cdn.example.com/x"));
        assert!(is_external("mailto:hello@example.com"));
    }
}
