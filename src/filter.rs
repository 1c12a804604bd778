use crate::config::CacheBusting;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for deciding which discovered links are worth capturing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Regex patterns matched against the URL path; a match must exist if any are given
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns matched against the URL path (these take precedence over include patterns)
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Paths ending in a 3-4 character extension are assumed to be assets
fn default_exclude_patterns() -> Vec<String> {
    vec![r"\.\w{3,4}$".to_string()]
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// URL filter that keeps same-host page links and normalizes them
#[derive(Debug)]
pub struct UrlFilter {
    required_host: String,
    cache_busting: CacheBusting,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter scoped to `host`
    pub fn new(
        host: &str,
        cache_busting: CacheBusting,
        config: &UrlFilterConfig,
    ) -> Result<Self, regex::Error> {
        // Compile regex patterns
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            required_host: host.to_string(),
            cache_busting,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a URL should be captured based on all filtering rules
    pub fn should_crawl(&self, url: &Url) -> bool {
        // External links are never captured
        if url.host_str() != Some(self.required_host.as_str()) {
            return false;
        }

        let path = url.path();
        if self.exclude_regexes.iter().any(|regex| regex.is_match(path)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|regex| regex.is_match(path))
    }

    /// Drop the fragment and the cache-busting marker
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut normalized = self.cache_busting.strip(url);
        normalized.set_fragment(None);
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(config: &UrlFilterConfig) -> UrlFilter {
        UrlFilter::new("example.com", CacheBusting::default(), config).unwrap()
    }

    #[test]
    fn test_default_filter() {
        let filter = filter(&UrlFilterConfig::default());

        // Assets are excluded
        let image_url = Url::parse("https://example.com/image.jpg").unwrap();
        assert!(!filter.should_crawl(&image_url));
        let page_url = Url::parse("https://example.com/page.html").unwrap();
        assert!(!filter.should_crawl(&page_url));

        // Extensionless pages are kept, whatever their query
        let page = Url::parse("https://example.com/blog/post/?page=2").unwrap();
        assert!(filter.should_crawl(&page));
        let versioned = Url::parse("https://example.com/v1.2/").unwrap();
        assert!(filter.should_crawl(&versioned));
    }

    #[test]
    fn test_host_restriction() {
        let filter = filter(&UrlFilterConfig::default());

        let other = Url::parse("https://other.com/page").unwrap();
        assert!(!filter.should_crawl(&other));

        let subdomain = Url::parse("https://www.example.com/page").unwrap();
        assert!(!filter.should_crawl(&subdomain));
    }

    #[test]
    fn test_regex_patterns() {
        let config = UrlFilterConfig {
            include_patterns: vec![r"^/docs/".to_string()],
            exclude_patterns: vec![r"/draft/".to_string()],
        };
        let filter = filter(&config);

        let included = Url::parse("https://example.com/docs/page").unwrap();
        assert!(filter.should_crawl(&included));

        let not_included = Url::parse("https://example.com/blog/page").unwrap();
        assert!(!filter.should_crawl(&not_included));

        let excluded = Url::parse("https://example.com/docs/draft/page").unwrap();
        assert!(!filter.should_crawl(&excluded));
    }

    #[test]
    fn test_normalize_url() {
        let filter = filter(&UrlFilterConfig::default());
        let url = Url::parse("https://example.com/a?nocache=&b=1#top").unwrap();
        assert_eq!(filter.normalize_url(&url).as_str(), "https://example.com/a?b=1");
    }

    #[test]
    fn test_invalid_pattern() {
        let config = UrlFilterConfig {
            include_patterns: vec!["(".to_string()],
            exclude_patterns: Vec::new(),
        };
        assert!(UrlFilter::new("example.com", CacheBusting::None, &config).is_err());
    }
}
