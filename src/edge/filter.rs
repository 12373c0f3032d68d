//! Path filter deciding which requests the edge router inspects.

use crate::config::FilterConfig;

/// Excludes framework internals and static files from edge handling.
#[derive(Debug, Clone)]
pub struct PathFilter {
    prefixes: Vec<String>,
    extensions: Vec<String>,
}

impl PathFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            prefixes: config
                .excluded_prefixes
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            extensions: config
                .excluded_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// True when the edge router should run for `path`.
    pub fn should_handle(&self, path: &str) -> bool {
        let under_prefix = self.prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        if under_prefix {
            return false;
        }

        let last_segment = path.rsplit('/').next().unwrap_or_default();
        match last_segment.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                !self.extensions.iter().any(|excluded| *excluded == ext)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PathFilter {
        PathFilter::new(&FilterConfig::default())
    }

    #[test]
    fn test_excludes_framework_internals() {
        let f = filter();
        assert!(!f.should_handle("/_next/static/chunks/main.js"));
        assert!(!f.should_handle("/_next"));
        assert!(f.should_handle("/_nextgen"));
    }

    #[test]
    fn test_excludes_static_extensions() {
        let f = filter();
        assert!(!f.should_handle("/logo.png"));
        assert!(!f.should_handle("/images/Hero.JPG"));
        assert!(!f.should_handle("/sitemap.xml"));
        assert!(!f.should_handle("/robots.txt"));
        assert!(!f.should_handle("/favicon.ico"));
    }

    #[test]
    fn test_handles_pages() {
        let f = filter();
        assert!(f.should_handle("/"));
        assert!(f.should_handle("/services/"));
        assert!(f.should_handle("/blog/my-post"));
        assert!(f.should_handle("/docs/v1.2/intro"));
        assert!(f.should_handle("/report.pdf"));
    }
}
