//! Redirect rule model and compilation.
//!
//! # Responsibilities
//! - Deserialize CMS-authored redirect records
//! - Compile `from` patterns once per rule set refresh
//! - Drop inactive and malformed rules before matching
//!
//! # Design Decisions
//! - A `RuleSet` is immutable; refreshes build a new one
//! - A pattern that fails to compile disables only its own rule
//! - Original array position is kept for deterministic tie-breaks

use axum::http::StatusCode;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};

/// Upper bound on compiled pattern size for CMS-authored regexes.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// How a rule's `from` pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Exact,
    Wildcard,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Wildcard => "wildcard",
            MatchType::Regex => "regex",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the original request query string is carried to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStringHandling {
    #[default]
    Preserve,
    Remove,
}

/// A CMS-authored redirect record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    /// Opaque unique identifier (`_id` in CMS payloads).
    #[serde(alias = "_id")]
    pub id: String,

    /// Exact path, wildcard path, or regular expression.
    pub from: String,

    /// Destination template; may contain `$N` placeholders.
    pub to: String,

    #[serde(default, alias = "match_type", deserialize_with = "null_as_default")]
    pub match_type: MatchType,

    #[serde(
        default = "default_status_code",
        alias = "status_code",
        deserialize_with = "null_as_status"
    )]
    pub status_code: u16,

    #[serde(default = "default_active", alias = "is_active", deserialize_with = "null_as_active")]
    pub is_active: bool,

    /// Higher value wins.
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: i64,

    /// Ascending tie-break when priorities are equal.
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: i64,

    #[serde(default, alias = "case_sensitive", deserialize_with = "null_as_default")]
    pub case_sensitive: bool,

    #[serde(default, alias = "query_string_handling", deserialize_with = "null_as_default")]
    pub query_string_handling: QueryStringHandling,
}

fn default_status_code() -> u16 {
    301
}

fn default_active() -> bool {
    true
}

// CMS documents send unset optional fields as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    Ok(Option::<u16>::deserialize(deserializer)?.unwrap_or_else(default_status_code))
}

fn null_as_active<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_active))
}

impl RedirectRule {
    /// HTTP status to emit. Anything that is not a redirect status becomes 308.
    pub fn status(&self) -> StatusCode {
        match StatusCode::from_u16(self.status_code) {
            Ok(status) if status.is_redirection() && status != StatusCode::NOT_MODIFIED => status,
            _ => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

#[derive(Debug)]
enum Pattern {
    /// Comparison key, lower-cased when the rule is case-insensitive.
    Exact(String),
    Regex(Regex),
}

/// A rule with its pattern compiled for matching.
#[derive(Debug)]
pub struct CompiledRule {
    pub rule: RedirectRule,
    position: usize,
    pattern: Pattern,
}

impl CompiledRule {
    fn compile(rule: RedirectRule, position: usize) -> Result<Self, regex::Error> {
        let pattern = match rule.match_type {
            MatchType::Exact if rule.case_sensitive => Pattern::Exact(rule.from.clone()),
            MatchType::Exact => Pattern::Exact(rule.from.to_lowercase()),
            MatchType::Wildcard => {
                Pattern::Regex(build_regex(&wildcard_to_regex(&rule.from), rule.case_sensitive)?)
            }
            MatchType::Regex => {
                Pattern::Regex(build_regex(&anchor_regex(&rule.from), rule.case_sensitive)?)
            }
        };
        Ok(Self {
            rule,
            position,
            pattern,
        })
    }

    /// Position of the rule in the array it was compiled from.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Capture groups for `path`, or `None` when the rule does not match.
    /// Index 0 is the whole match.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        match &self.pattern {
            Pattern::Exact(expected) => {
                let matched = if self.rule.case_sensitive {
                    path == expected.as_str()
                } else {
                    path.to_lowercase() == *expected
                };
                matched.then(|| vec![Some(path.to_string())])
            }
            Pattern::Regex(re) => re.captures(path).map(|caps| {
                caps.iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect()
            }),
        }
    }
}

fn build_regex(source: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
}

/// Translate a `*` wildcard path into an anchored regex. Each `*` becomes a
/// capture group matching zero or more characters.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut source = String::from("^");
    for (i, literal) in pattern.split('*').enumerate() {
        if i > 0 {
            source.push_str("(.*)");
        }
        source.push_str(&regex::escape(literal));
    }
    source.push('$');
    source
}

/// Anchor an author-supplied regex at both ends unless it already carries
/// an explicit anchor.
pub fn anchor_regex(pattern: &str) -> String {
    if pattern.starts_with('^') || pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("^(?:{})$", pattern)
    }
}

/// An immutable, compiled set of active redirect rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile `rules`, keeping only active rules with valid patterns.
    pub fn compile(rules: Vec<RedirectRule>) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        for (position, rule) in rules.into_iter().enumerate() {
            if !rule.is_active {
                continue;
            }
            let id = rule.id.clone();
            match CompiledRule::compile(rule, position) {
                Ok(rule) => compiled.push(rule),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "Skipping redirect rule with invalid pattern");
                }
            }
        }
        Self { rules: compiled }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
pub(crate) fn rule(id: &str, from: &str, to: &str, match_type: MatchType) -> RedirectRule {
    RedirectRule {
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        match_type,
        status_code: 301,
        is_active: true,
        priority: 0,
        order: 0,
        case_sensitive: false,
        query_string_handling: QueryStringHandling::Preserve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_cms_record() {
        let json = r#"{
            "_id": "r1",
            "from": "/blog/*",
            "to": "/articles/$1",
            "matchType": "wildcard",
            "statusCode": 302,
            "isActive": true,
            "priority": 10,
            "order": 2,
            "caseSensitive": true,
            "queryStringHandling": "remove"
        }"#;
        let rule: RedirectRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.id, "r1");
        assert_eq!(rule.match_type, MatchType::Wildcard);
        assert_eq!(rule.status_code, 302);
        assert_eq!(rule.priority, 10);
        assert!(rule.case_sensitive);
        assert_eq!(rule.query_string_handling, QueryStringHandling::Remove);
    }

    #[test]
    fn test_deserialize_defaults() {
        let rule: RedirectRule =
            serde_json::from_str(r#"{"id": "r2", "from": "/a", "to": "/b"}"#).unwrap();
        assert_eq!(rule.match_type, MatchType::Exact);
        assert_eq!(rule.status_code, 301);
        assert!(rule.is_active);
        assert!(!rule.case_sensitive);
        assert_eq!(rule.query_string_handling, QueryStringHandling::Preserve);
    }

    #[test]
    fn test_deserialize_null_fields() {
        let json = r#"{
            "_id": "r3",
            "from": "/a",
            "to": "/b",
            "matchType": null,
            "statusCode": null,
            "isActive": null,
            "priority": null,
            "order": null,
            "caseSensitive": null,
            "queryStringHandling": null
        }"#;
        let rule: RedirectRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.match_type, MatchType::Exact);
        assert_eq!(rule.status_code, 301);
        assert!(rule.is_active);
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.query_string_handling, QueryStringHandling::Preserve);
    }

    #[test]
    fn test_status_fallback() {
        let mut r = rule("r", "/a", "/b", MatchType::Exact);
        r.status_code = 307;
        assert_eq!(r.status(), StatusCode::TEMPORARY_REDIRECT);
        r.status_code = 200;
        assert_eq!(r.status(), StatusCode::PERMANENT_REDIRECT);
        r.status_code = 304;
        assert_eq!(r.status(), StatusCode::PERMANENT_REDIRECT);
        r.status_code = 1000;
        assert_eq!(r.status(), StatusCode::PERMANENT_REDIRECT);
    }

    #[test]
    fn test_wildcard_translation_escapes_literals() {
        assert_eq!(wildcard_to_regex("/blog/*"), "^/blog/(.*)$");
        assert_eq!(wildcard_to_regex("/a.b/*/c"), r"^/a\.b/(.*)/c$");
    }

    #[test]
    fn test_anchor_regex() {
        assert_eq!(anchor_regex("/a|/b"), "^(?:/a|/b)$");
        assert_eq!(anchor_regex("^/product/(\\d+)$"), "^/product/(\\d+)$");
        assert_eq!(anchor_regex("^/docs"), "^/docs");
    }

    #[test]
    fn test_compile_skips_inactive_and_invalid() {
        let mut inactive = rule("off", "/a", "/b", MatchType::Exact);
        inactive.is_active = false;
        let broken = rule("broken", "/(unclosed", "/x", MatchType::Regex);
        let good = rule("good", "/c", "/d", MatchType::Exact);

        let set = RuleSet::compile(vec![inactive, broken, good]);
        assert_eq!(set.len(), 1);
        let only = set.iter().next().unwrap();
        assert_eq!(only.rule.id, "good");
        assert_eq!(only.position(), 2);
    }

    #[test]
    fn test_exact_case_folding() {
        let insensitive = CompiledRule::compile(rule("r", "/About", "/x", MatchType::Exact), 0).unwrap();
        assert!(insensitive.captures("/about").is_some());

        let mut r = rule("r", "/About", "/x", MatchType::Exact);
        r.case_sensitive = true;
        let sensitive = CompiledRule::compile(r, 0).unwrap();
        assert!(sensitive.captures("/about").is_none());
        assert!(sensitive.captures("/About").is_some());
    }
}
