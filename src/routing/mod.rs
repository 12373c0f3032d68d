//! Redirect routing subsystem.
//!
//! # Data Flow
//! ```text
//! Rule refresh (on TTL expiry):
//!     source.rs (CMS query or config rules)
//!     → rule.rs (filter inactive, compile patterns)
//!     → cache.rs (atomic swap of Arc<RuleSet>)
//!
//! Per request:
//!     cache.rs get()
//!     → resolver.rs (follow chain, detect cycles)
//!     → matcher.rs (best rule per hop, substitute captures)
//!     → Decision: Internal | External | PassThrough
//! ```
//!
//! # Design Decisions
//! - Rule sets are immutable once compiled
//! - Deterministic: same path and rules always give the same decision
//! - Rule source failures degrade to stale or empty rules, never errors

pub mod cache;
pub mod matcher;
pub mod resolver;
pub mod rule;
pub mod source;

pub use cache::RuleCache;
pub use resolver::{resolve, Decision, MAX_DEPTH};
pub use rule::{MatchType, QueryStringHandling, RedirectRule, RuleSet};
pub use source::{CmsRuleSource, RuleSource, SourceError, StaticRuleSource};
