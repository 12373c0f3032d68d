//! Redirect rule sources.
//!
//! # Responsibilities
//! - Fetch the active redirect rule set from the CMS
//! - Serve rules from the config file for local and test setups

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::schema::CmsConfig;
use crate::routing::rule::RedirectRule;

/// Errors returned by a rule source. Callers never surface these to clients.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("content source returned status {0}")]
    Status(u16),

    #[error("content source unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere redirect rules come from.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetch the full active rule set, ordered by priority desc, order asc.
    async fn fetch_rules(&self) -> Result<Vec<RedirectRule>, SourceError>;
}

/// Rules defined inline in the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleSource {
    rules: Vec<RedirectRule>,
}

impl StaticRuleSource {
    pub fn new(rules: Vec<RedirectRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn fetch_rules(&self) -> Result<Vec<RedirectRule>, SourceError> {
        Ok(sorted_active(self.rules.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Rules fetched from the CMS content query API.
pub struct CmsRuleSource {
    client: reqwest::Client,
    query_url: String,
    query: String,
    token: Option<String>,
}

impl CmsRuleSource {
    pub fn new(config: &CmsConfig, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            query_url: config.query_url.clone(),
            query: config.query.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl RuleSource for CmsRuleSource {
    async fn fetch_rules(&self) -> Result<Vec<RedirectRule>, SourceError> {
        let mut request = self
            .client
            .get(&self.query_url)
            .query(&[("query", self.query.as_str())]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body: QueryResponse = response.json().await?;
        let rules = parse_records(body.result);
        tracing::debug!(count = rules.len(), "Fetched redirect rules from CMS");
        Ok(sorted_active(rules))
    }
}

/// Convert CMS records one at a time. A record that is not a valid rule is
/// skipped so the rest of the set still loads.
fn parse_records(records: Vec<serde_json::Value>) -> Vec<RedirectRule> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record
                .get("_id")
                .or_else(|| record.get("id"))
                .and_then(|v| v.as_str())
                .unwrap_or("<unknown>")
                .to_string();
            match serde_json::from_value::<RedirectRule>(record) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "Skipping malformed redirect record");
                    None
                }
            }
        })
        .collect()
}

/// Filter to active rules and order by priority desc, order asc. The sort is
/// stable so equal rules keep their source order.
fn sorted_active(rules: Vec<RedirectRule>) -> Vec<RedirectRule> {
    let mut rules: Vec<_> = rules.into_iter().filter(|r| r.is_active).collect();
    rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::{rule, MatchType};

    #[tokio::test]
    async fn test_static_source_sorts_and_filters() {
        let mut a = rule("a", "/a", "/x", MatchType::Exact);
        a.priority = 1;
        a.order = 5;
        let mut b = rule("b", "/b", "/x", MatchType::Exact);
        b.priority = 10;
        let mut c = rule("c", "/c", "/x", MatchType::Exact);
        c.priority = 1;
        c.order = 2;
        let mut d = rule("d", "/d", "/x", MatchType::Exact);
        d.is_active = false;

        let source = StaticRuleSource::new(vec![a, b, c, d]);
        let ids: Vec<_> = source
            .fetch_rules()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_query_envelope() {
        let body = r#"{"result": [{"_id": "r1", "from": "/a", "to": "/b", "matchType": "exact"}]}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let rules = parse_records(parsed.result);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "r1");
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let body = r#"{"result": [
            {"_id": "good", "from": "/a", "to": "/b"},
            {"_id": "draft", "from": "/c"},
            {"_id": "nulls", "from": "/d", "to": "/e", "priority": null, "statusCode": null},
            {"_id": "bad-type", "from": "/f", "to": "/g", "matchType": "glob"},
            "not an object"
        ]}"#;
        let parsed: QueryResponse = serde_json::from_str(body).unwrap();
        let ids: Vec<_> = parse_records(parsed.result).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["good", "nulls"]);
    }

    #[test]
    fn test_empty_envelope() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(parse_records(parsed.result).is_empty());
    }
}
