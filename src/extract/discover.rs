use super::{html_files, read_page};
use crate::error::ExtractError;
use crate::filter::UrlFilter;
use crate::parsers::html::parse_links;
use crate::utils::url_decode;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use url::Url;

/// Schemes that can appear in `href` but never name a page.
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:"];

/// Finds in-scope links in saved pages that have not been captured yet.
pub struct LinkDiscoverer {
    base: Url,
    filter: UrlFilter,
}

impl LinkDiscoverer {
    pub fn new(base: Url, filter: UrlFilter) -> Self {
        Self { base, filter }
    }

    /// Sorted, de-duplicated same-host page URLs linked from any saved page
    /// under `snapshot_dir` and not already in `scanned`.
    pub fn discover(&self, snapshot_dir: &Path, scanned: &[String]) -> Result<Vec<String>, ExtractError> {
        let mut candidates = BTreeSet::new();
        for path in html_files(snapshot_dir)? {
            let html = read_page(&path)?;
            candidates.extend(parse_links(&html).iter().map(|href| url_decode(href)));
        }

        Ok(self.select(candidates, scanned))
    }

    /// Applies scope, normalization and de-duplication to raw `href` values.
    pub fn select(&self, candidates: impl IntoIterator<Item = String>, scanned: &[String]) -> Vec<String> {
        // captured URLs are percent-encoded, candidates are compared decoded
        let scanned: HashSet<String> = scanned.iter().map(|url| url_decode(url)).collect();
        let mut found = BTreeSet::new();

        for candidate in candidates {
            let lowered = candidate.trim_start().to_ascii_lowercase();
            if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
                continue;
            }

            let href = match self.base.join(candidate.trim()) {
                Ok(href) => href,
                Err(e) => {
                    ::log::error!("invalid url - {}: {}", candidate, e);
                    continue;
                }
            };

            if !self.filter.should_crawl(&href) {
                continue;
            }

            let normalized = url_decode(self.filter.normalize_url(&href).as_str());
            if scanned.contains(&normalized) {
                continue;
            }
            found.insert(normalized);
        }

        found.into_iter().collect()
    }
}
