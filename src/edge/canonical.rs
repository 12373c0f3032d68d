//! Canonical host and trailing-slash normalization.
//!
//! Both checks are synchronous and run before redirect rules. Both answer
//! with a 308 so the client keeps its HTTP method.

use crate::config::HostConfig;
use crate::edge::RequestTarget;
use crate::routing::matcher::single_leading_slash;

/// Canonical host enforcement settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct HostPolicy {
    canonical: String,
    canonical_hostname: String,
    scheme: String,
    enforce: bool,
}

impl HostPolicy {
    pub fn new(config: &HostConfig) -> Self {
        let canonical = config.canonical_host();
        Self {
            canonical_hostname: hostname_of(&canonical),
            canonical,
            scheme: config.scheme.clone(),
            enforce: config.enforce,
        }
    }

    pub fn canonical_host(&self) -> &str {
        &self.canonical
    }

    /// Location on the canonical host, or `None` when the request is already
    /// there (or carries no host at all).
    pub fn redirect_location(&self, target: &RequestTarget) -> Option<String> {
        if !self.enforce {
            return None;
        }
        let hostname = target.hostname.as_deref()?;
        if hostname == self.canonical_hostname {
            return None;
        }
        Some(format!(
            "{}://{}{}",
            self.scheme,
            self.canonical,
            with_query(&target.path, target.query.as_deref())
        ))
    }
}

/// Location with exactly one trailing slash removed, or `None` for `/` and
/// paths without a trailing slash. The result is always a rooted path on
/// this site.
pub fn trailing_slash_location(target: &RequestTarget) -> Option<String> {
    let path = target.path.as_str();
    if path.len() <= 1 || !path.ends_with('/') {
        return None;
    }
    let stripped = single_leading_slash(&path[..path.len() - 1]);
    Some(with_query(&stripped, target.query.as_deref()))
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    }
}

/// Lower-cased hostname of an authority, without port.
pub fn hostname_of(authority: &str) -> String {
    let authority = authority.trim();
    let host = if authority.starts_with('[') {
        match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        }
    } else {
        authority.split(':').next().unwrap_or(authority)
    };
    host.to_ascii_lowercase()
}
