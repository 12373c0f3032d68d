//! Redirect chain resolution.
//!
//! # Responsibilities
//! - Follow internal redirect chains up to `MAX_DEPTH` hops
//! - Detect cycles and fall back to pass-through
//! - Produce a single terminal `Decision` per request
//!
//! # Design Decisions
//! - External destinations end the chain immediately
//! - Cycles pass the original request through (availability over redirects)
//! - Over-long chains are truncated, not failed
//! - Only the terminal rule's query policy applies

use std::collections::HashSet;

use axum::http::StatusCode;

use crate::observability::metrics;
use crate::routing::matcher::best_match;
use crate::routing::rule::{MatchType, QueryStringHandling, RedirectRule, RuleSet};

/// Maximum number of internal hops followed per request.
pub const MAX_DEPTH: usize = 3;

/// Outcome of resolving a path against the redirect rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Redirect the client to another path on this site.
    Internal {
        path: String,
        status: StatusCode,
        query_handling: QueryStringHandling,
        match_type: MatchType,
    },
    /// Redirect the client to an absolute URL. The query policy is already applied.
    External {
        url: String,
        status: StatusCode,
        query_handling: QueryStringHandling,
        match_type: MatchType,
    },
    /// No rule applied.
    PassThrough,
}

/// Per-request record of visited paths.
struct Trail {
    visited: HashSet<String>,
    order: Vec<String>,
}

impl Trail {
    fn new(start: &str) -> Self {
        Self {
            visited: HashSet::from([start.to_string()]),
            order: vec![start.to_string()],
        }
    }

    /// Record a hop. Returns false if the path was already on the trail.
    fn visit(&mut self, path: &str) -> bool {
        self.order.push(path.to_string());
        self.visited.insert(path.to_string())
    }

    fn hops(&self) -> usize {
        self.order.len() - 1
    }
}

/// Resolve `initial_path` (with the request's raw `query`) to a decision.
pub fn resolve(initial_path: &str, query: Option<&str>, rules: &RuleSet) -> Decision {
    let mut trail = Trail::new(initial_path);
    let mut current = initial_path.to_string();
    let mut last: Option<&RedirectRule> = None;

    while trail.hops() < MAX_DEPTH {
        let Some(matched) = best_match(&current, rules) else {
            break;
        };
        let destination = matched.destination();

        if matched.is_external() {
            let rule = matched.rule;
            tracing::debug!(
                from = %initial_path,
                to = %destination,
                rule_id = %rule.id,
                hops = trail.hops(),
                "External redirect ends chain"
            );
            return Decision::External {
                url: append_query(&destination, query, rule.query_string_handling),
                status: rule.status(),
                query_handling: rule.query_string_handling,
                match_type: rule.match_type,
            };
        }

        if !trail.visit(&destination) {
            tracing::error!(
                trail = %trail.order.join(" -> "),
                rule_id = %matched.rule.id,
                "Redirect cycle detected, serving original path"
            );
            metrics::record_redirect_cycle();
            return Decision::PassThrough;
        }

        current = destination;
        last = Some(matched.rule);
    }

    if trail.hops() >= MAX_DEPTH && best_match(&current, rules).is_some() {
        tracing::warn!(
            trail = %trail.order.join(" -> "),
            max_depth = MAX_DEPTH,
            "Redirect chain too long, truncating"
        );
    }

    match last {
        Some(rule) if current != initial_path => Decision::Internal {
            path: current,
            status: rule.status(),
            query_handling: rule.query_string_handling,
            match_type: rule.match_type,
        },
        _ => Decision::PassThrough,
    }
}

/// Append the request query to `destination` according to `handling`.
/// A fragment in the destination stays at the end.
pub fn append_query(destination: &str, query: Option<&str>, handling: QueryStringHandling) -> String {
    let query = match (handling, query) {
        (QueryStringHandling::Preserve, Some(q)) if !q.is_empty() => q,
        _ => return destination.to_string(),
    };

    let (base, fragment) = match destination.find('#') {
        Some(i) => destination.split_at(i),
        None => (destination, ""),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}{}", base, separator, query, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::rule;

    fn set(rules: Vec<RedirectRule>) -> RuleSet {
        RuleSet::compile(rules)
    }

    #[test]
    fn test_pass_through_when_nothing_matches() {
        let rules = set(vec![rule("r", "/a", "/b", MatchType::Exact)]);
        assert_eq!(resolve("/other", None, &rules), Decision::PassThrough);
        assert_eq!(resolve("/a", None, &RuleSet::default()), Decision::PassThrough);
    }

    #[test]
    fn test_single_internal_hop() {
        let mut r = rule("r", "/old", "/new", MatchType::Exact);
        r.status_code = 302;
        let decision = resolve("/old", None, &set(vec![r]));
        assert_eq!(
            decision,
            Decision::Internal {
                path: "/new".into(),
                status: StatusCode::FOUND,
                query_handling: QueryStringHandling::Preserve,
                match_type: MatchType::Exact,
            }
        );
    }

    #[test]
    fn test_cycle_passes_through() {
        let rules = set(vec![
            rule("ab", "/a", "/b", MatchType::Exact),
            rule("ba", "/b", "/a", MatchType::Exact),
        ]);
        assert_eq!(resolve("/a", None, &rules), Decision::PassThrough);
    }

    #[test]
    fn test_self_redirect_is_a_cycle() {
        let rules = set(vec![rule("self", "/loop", "/loop", MatchType::Exact)]);
        assert_eq!(resolve("/loop", None, &rules), Decision::PassThrough);
    }

    #[test]
    fn test_chain_is_followed() {
        let mut second = rule("bc", "/b", "/c", MatchType::Exact);
        second.status_code = 308;
        let rules = set(vec![rule("ab", "/a", "/b", MatchType::Exact), second]);
        match resolve("/a", None, &rules) {
            Decision::Internal { path, status, .. } => {
                assert_eq!(path, "/c");
                assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_depth_truncation() {
        let rules = set(vec![
            rule("1", "/1", "/2", MatchType::Exact),
            rule("2", "/2", "/3", MatchType::Exact),
            rule("3", "/3", "/4", MatchType::Exact),
            rule("4", "/4", "/5", MatchType::Exact),
        ]);
        match resolve("/1", None, &rules) {
            Decision::Internal { path, .. } => assert_eq!(path, "/4"),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_external_short_circuit() {
        let rules = set(vec![
            rule("ext", "/x", "https://example.com/target", MatchType::Exact),
            rule("target", "/target", "/elsewhere", MatchType::Exact),
        ]);
        match resolve("/x", None, &rules) {
            Decision::External { url, .. } => assert_eq!(url, "https://example.com/target"),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_external_mid_chain_uses_its_own_rule() {
        let mut ext = rule("ext", "/b", "https://other.example/b", MatchType::Exact);
        ext.status_code = 302;
        ext.query_string_handling = QueryStringHandling::Remove;
        let rules = set(vec![rule("ab", "/a", "/b", MatchType::Exact), ext]);

        match resolve("/a", Some("ref=1"), &rules) {
            Decision::External { url, status, query_handling, .. } => {
                assert_eq!(url, "https://other.example/b");
                assert_eq!(status, StatusCode::FOUND);
                assert_eq!(query_handling, QueryStringHandling::Remove);
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_prefix_strip_rule_stays_on_site() {
        let rules = set(vec![rule("strip", "/old/*", "/$1", MatchType::Wildcard)]);
        match resolve("/old//evil.com/x", None, &rules) {
            Decision::Internal { path, .. } => assert_eq!(path, "/evil.com/x"),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_external_preserves_query() {
        let rules = set(vec![rule("ext", "/go", "https://example.com/landing?src=site", MatchType::Exact)]);
        match resolve("/go", Some("utm=x"), &rules) {
            Decision::External { url, .. } => {
                assert_eq!(url, "https://example.com/landing?src=site&utm=x")
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_last_rule_controls_query_policy() {
        let mut first = rule("ab", "/a", "/b", MatchType::Exact);
        first.query_string_handling = QueryStringHandling::Remove;
        let rules = set(vec![first, rule("bc", "/b", "/c", MatchType::Exact)]);
        match resolve("/a", Some("q=1"), &rules) {
            Decision::Internal { query_handling, .. } => {
                assert_eq!(query_handling, QueryStringHandling::Preserve)
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_append_query() {
        use QueryStringHandling::*;
        assert_eq!(append_query("/new", Some("utm=x"), Preserve), "/new?utm=x");
        assert_eq!(append_query("/new", Some("utm=x"), Remove), "/new");
        assert_eq!(append_query("/new", None, Preserve), "/new");
        assert_eq!(append_query("/new", Some(""), Preserve), "/new");
        assert_eq!(append_query("/new?a=1", Some("b=2"), Preserve), "/new?a=1&b=2");
        assert_eq!(append_query("/new#top", Some("b=2"), Preserve), "/new?b=2#top");
    }
}
