//! Time-bounded redirect rule cache.
//!
//! # Responsibilities
//! - Serve the compiled rule set without I/O while it is fresh
//! - Refresh from the rule source once the TTL has passed
//! - Fall back to the last good set (or an empty one) when the source fails
//!
//! # Design Decisions
//! - Whole set is swapped atomically; readers never see a partial update
//! - Concurrent refreshes may race; last writer wins
//! - Fetch errors never reach the caller

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::time::{timeout, Instant};

use crate::observability::metrics;
use crate::routing::rule::RuleSet;
use crate::routing::source::RuleSource;

/// Default lifetime of a fetched rule set.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedRules {
    rules: Arc<RuleSet>,
    /// `None` once invalidated.
    fetched_at: Option<Instant>,
}

impl CachedRules {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.rules.is_empty()
            && self
                .fetched_at
                .map(|at| at.elapsed() < ttl)
                .unwrap_or(false)
    }
}

/// Summary of the cache state for operators.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub rule_count: usize,
    pub rule_ids: Vec<String>,
    pub age_secs: Option<u64>,
    pub fresh: bool,
}

/// Process-wide cache of the active redirect rules.
pub struct RuleCache {
    source: Arc<dyn RuleSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    state: ArcSwapOption<CachedRules>,
}

impl RuleCache {
    pub fn new(source: Arc<dyn RuleSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            state: ArcSwapOption::empty(),
        }
    }

    /// Current rule set, refreshing it first if it has expired.
    pub async fn get(&self) -> Arc<RuleSet> {
        let cached = self.state.load_full();
        if let Some(cached) = &cached {
            if cached.is_fresh(self.ttl) {
                return cached.rules.clone();
            }
        }

        let failure = match timeout(self.fetch_timeout, self.source.fetch_rules()).await {
            Ok(Ok(rules)) => {
                let rules = Arc::new(RuleSet::compile(rules));
                self.state.store(Some(Arc::new(CachedRules {
                    rules: rules.clone(),
                    fetched_at: Some(Instant::now()),
                })));
                metrics::record_rule_fetch("success");
                metrics::record_rules_cached(rules.len());
                tracing::debug!(count = rules.len(), "Redirect rules refreshed");
                return rules;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.fetch_timeout),
        };

        match cached {
            Some(stale) => {
                metrics::record_rule_fetch("stale");
                tracing::warn!(
                    error = %failure,
                    count = stale.rules.len(),
                    "Redirect rule fetch failed, serving stale rules"
                );
                stale.rules.clone()
            }
            None => {
                metrics::record_rule_fetch("empty");
                tracing::warn!(
                    error = %failure,
                    "Redirect rule fetch failed with no cached rules, redirects disabled"
                );
                Arc::new(RuleSet::default())
            }
        }
    }

    /// Expire the current set so the next `get` refetches. The set remains
    /// available as a stale fallback.
    pub fn invalidate(&self) {
        if let Some(current) = self.state.load_full() {
            self.state.store(Some(Arc::new(CachedRules {
                rules: current.rules.clone(),
                fetched_at: None,
            })));
        }
        tracing::info!("Redirect rule cache invalidated");
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        match self.state.load_full() {
            Some(cached) => CacheSnapshot {
                rule_count: cached.rules.len(),
                rule_ids: cached.rules.iter().map(|r| r.rule.id.clone()).collect(),
                age_secs: cached.fetched_at.map(|at| at.elapsed().as_secs()),
                fresh: cached.is_fresh(self.ttl),
            },
            None => CacheSnapshot {
                rule_count: 0,
                rule_ids: Vec::new(),
                age_secs: None,
                fresh: false,
            },
        }
    }
}
