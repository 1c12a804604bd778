use crate::clean::{CleanRule, default_clean_rules};
use crate::error::ConfigError;
use crate::filter::UrlFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// How a request URL is altered to get past intermediate caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheBusting {
    /// Leave the URL untouched
    None,
    /// Set query parameter `key` to `value`, replacing any existing value
    Query { key: String, value: String },
    /// Append a literal string to the URL
    Suffix { value: String },
}

impl Default for CacheBusting {
    fn default() -> Self {
        CacheBusting::Query {
            key: "nocache".to_string(),
            value: String::new(),
        }
    }
}

impl CacheBusting {
    /// Returns the URL string actually requested.
    pub fn apply(&self, url: &Url) -> String {
        match self {
            CacheBusting::None => url.to_string(),
            CacheBusting::Query { key, value } => {
                let mut busted = url.clone();
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(name, _)| name != key.as_str())
                    .map(|(name, value)| (name.into_owned(), value.into_owned()))
                    .collect();
                busted
                    .query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair(key, value);
                busted.to_string()
            }
            CacheBusting::Suffix { value } => format!("{url}{value}"),
        }
    }

    /// Removes the cache-busting marker from a URL, if present.
    pub fn strip(&self, url: &Url) -> Url {
        match self {
            CacheBusting::None => url.clone(),
            CacheBusting::Query { key, .. } => {
                if !url.query_pairs().any(|(name, _)| name == key.as_str()) {
                    return url.clone();
                }
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(name, _)| name != key.as_str())
                    .map(|(name, value)| (name.into_owned(), value.into_owned()))
                    .collect();
                let mut stripped = url.clone();
                if kept.is_empty() {
                    stripped.set_query(None);
                } else {
                    stripped.query_pairs_mut().clear().extend_pairs(kept);
                }
                stripped
            }
            CacheBusting::Suffix { value } => url
                .as_str()
                .strip_suffix(value.as_str())
                .and_then(|trimmed| Url::parse(trimmed).ok())
                .unwrap_or_else(|| url.clone()),
        }
    }
}

/// Configuration for the archiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Root directory snapshots are written under
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Scheme used to turn a bare host into a base URL
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Cache-busting applied to every request
    #[serde(default)]
    pub cache_busting: CacheBusting,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Whether redirects are followed (captures record the redirect itself when off)
    #[serde(default)]
    pub follow_redirects: bool,

    /// Skip TLS certificate verification
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// Scope rules for link discovery
    #[serde(default)]
    pub discover: UrlFilterConfig,

    /// Regex rewrites applied by `clean`
    #[serde(default = "default_clean_rules")]
    pub clean_rules: Vec<CleanRule>,
}

/// Default value for output_dir
fn default_output_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_scheme() -> String {
    "https".to_string()
}

/// Desktop Chrome, so sites serve the same markup a visitor gets
pub fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            scheme: default_scheme(),
            cache_busting: CacheBusting::default(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout_seconds(),
            follow_redirects: false,
            accept_invalid_certs: default_accept_invalid_certs(),
            discover: UrlFilterConfig::default(),
            clean_rules: default_clean_rules(),
        }
    }
}

impl ArchiverConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Base URL for a host, e.g. `https://example.com/`
    pub fn base_url(&self, host: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}/", self.scheme, host.trim_end_matches('/')))
    }
}
