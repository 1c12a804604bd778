//! State shared by shell commands: the active host and snapshot plus the URL
//! lists commands hand to each other.

use crate::clean::{self, Cleaner};
use crate::config::ArchiverConfig;
use crate::error::ShellError;
use crate::extract::{LinkDiscoverer, SeoExtractor};
use crate::filter::UrlFilter;
use crate::robots::{self, RobotsTxt};
use crate::sitemap::{self, SitemapEntry, SitemapResolver};
use crate::snapshot::{SnapshotEngine, SnapshotRecord};
use crate::transport::{FetchClient, Transport};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_SITEMAP: &str = "sitemap.xml";

/// The host and snapshot commands currently operate on.
pub struct ActiveSnapshot<T> {
    /// Host part of `base`, which also names the domain directory
    pub host: String,
    pub base: Url,
    pub name: String,
    pub dir: PathBuf,
    engine: SnapshotEngine<T>,
    resolver: SitemapResolver<T>,
}

pub struct Session<T> {
    config: ArchiverConfig,
    client: FetchClient<T>,
    active: Option<ActiveSnapshot<T>>,
    scanned_urls: Vec<String>,
    stashed_urls: Vec<String>,
    stashed_sitemaps: Vec<String>,
}

impl<T: Transport + Clone> Session<T> {
    pub fn new(config: ArchiverConfig, client: FetchClient<T>) -> Self {
        Self {
            config,
            client,
            active: None,
            scanned_urls: Vec::new(),
            stashed_urls: Vec::new(),
            stashed_sitemaps: vec![DEFAULT_SITEMAP.to_string()],
        }
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    pub fn active(&self) -> Option<&ActiveSnapshot<T>> {
        self.active.as_ref()
    }

    pub fn stashed_urls(&self) -> &[String] {
        &self.stashed_urls
    }

    pub fn scanned_urls(&self) -> &[String] {
        &self.scanned_urls
    }

    pub fn stashed_sitemaps(&self) -> &[String] {
        &self.stashed_sitemaps
    }

    /// Starts a new snapshot of `host`. The snapshot directory must not exist
    /// yet; nothing changes when it does.
    pub fn open_host(&mut self, host: &str, name: &str) -> Result<&ActiveSnapshot<T>, ShellError> {
        if name.is_empty() {
            return Err(ShellError::SnapshotNameRequired);
        }
        let invalid_host = |source| ShellError::InvalidHost {
            host: host.to_string(),
            source,
        };
        let base = self.config.base_url(host).map_err(invalid_host)?;
        // captures are filed under the URL's host: lowercased, without port
        let domain = base
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| invalid_host(url::ParseError::EmptyHost))?;

        let dir = self.snapshot_dir(&domain, name);
        if dir.exists() {
            return Err(ShellError::SnapshotExists);
        }

        self.scanned_urls.clear();
        self.stashed_urls.clear();
        self.stashed_sitemaps = vec![DEFAULT_SITEMAP.to_string()];
        Ok(self.activate(&domain, base, name, dir))
    }

    /// Switches to an existing snapshot of the current host.
    pub fn select(&mut self, name: &str) -> Result<&ActiveSnapshot<T>, ShellError> {
        let (host, base) = match &self.active {
            Some(active) => (active.host.clone(), active.base.clone()),
            None => return Err(ShellError::NoHost),
        };
        if name.is_empty() {
            return Err(ShellError::SnapshotNameRequired);
        }

        let dir = self.snapshot_dir(&host, name);
        if !dir.is_dir() {
            return Err(ShellError::SnapshotMissing);
        }

        Ok(self.activate(&host, base, name, dir))
    }

    /// Fetches robots.txt and stashes the sitemaps it lists.
    pub async fn robots(&mut self) -> Result<RobotsTxt, ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        let robots = robots::fetch_robots(&self.client, &active.base, &active.dir).await?;
        if !robots.sitemaps.is_empty() {
            self.stashed_sitemaps = robots.sitemaps.clone();
        }
        Ok(robots)
    }

    /// Resolves `paths` (or the stashed sitemaps) and stashes the sorted,
    /// de-duplicated page URLs. Returns the entries newest first. A failure
    /// leaves the previous stash in place.
    pub async fn sitemap(&mut self, paths: Vec<String>) -> Result<Vec<SitemapEntry>, ShellError> {
        let active = self.active.as_mut().ok_or(ShellError::NoHost)?;
        let paths = if paths.is_empty() {
            self.stashed_sitemaps.clone()
        } else {
            paths
        };

        let mut links = active.resolver.analyze(&active.base, &paths).await?;
        links.sort();
        links.dedup();

        self.stashed_sitemaps = paths;
        self.stashed_urls = links;
        Ok(sitemap::sorted_by_lastmod(active.resolver.entries()))
    }

    /// Captures `urls` (resolved against the base URL) or, without arguments,
    /// the stashed URLs.
    pub async fn snapshot(&mut self, urls: Vec<String>) -> Result<Vec<SnapshotRecord>, ShellError> {
        let active = self.active.as_mut().ok_or(ShellError::NoHost)?;

        if !urls.is_empty() {
            self.stashed_urls = urls
                .iter()
                .map(|url| join(&active.base, url))
                .collect::<Result<_, _>>()?;
        }

        let records = active.engine.take_snapshots(&self.stashed_urls).await;
        self.scanned_urls.extend(self.stashed_urls.iter().cloned());
        Ok(records)
    }

    /// Stashes links found in saved pages that have not been captured yet.
    pub fn discover(&mut self) -> Result<&[String], ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        let filter = UrlFilter::new(
            &active.host,
            self.client.cache_busting().clone(),
            &self.config.discover,
        )?;

        let discoverer = LinkDiscoverer::new(active.base.clone(), filter);
        self.stashed_urls = discoverer.discover(&active.dir, &self.scanned_urls)?;
        Ok(&self.stashed_urls)
    }

    /// Writes `seo.txt` for the active snapshot.
    pub fn extract_seo(&self) -> Result<PathBuf, ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        let extractor = SeoExtractor::new(self.client.cache_busting().clone());
        Ok(extractor.write_report(&active.dir)?)
    }

    pub fn clean(&self) -> Result<usize, ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        let cleaner = Cleaner::new(&self.config.clean_rules)?;
        Ok(cleaner.clean_dir(&active.dir)?)
    }

    pub fn restore_backup(&self) -> Result<usize, ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        Ok(clean::restore_backups(&active.dir)?)
    }

    /// Deletes the whole output directory.
    pub fn clear(&self) -> Result<(), ShellError> {
        Ok(clean::remove_dir(&self.config.output_dir)?)
    }

    /// Stashes one URL per non-empty line of `file`, resolved against the
    /// base URL.
    pub fn import(&mut self, file: &Path) -> Result<&[String], ShellError> {
        let active = self.active.as_ref().ok_or(ShellError::NoHost)?;
        let contents = fs::read_to_string(file).map_err(|source| ShellError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        self.stashed_urls = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| join(&active.base, line))
            .collect::<Result<_, _>>()?;
        Ok(&self.stashed_urls)
    }

    fn snapshot_dir(&self, host: &str, name: &str) -> PathBuf {
        self.config.output_dir.join(host).join(name)
    }

    fn activate(&mut self, host: &str, base: Url, name: &str, dir: PathBuf) -> &ActiveSnapshot<T> {
        let output_dir = &self.config.output_dir;
        self.active.insert(ActiveSnapshot {
            host: host.to_string(),
            base,
            name: name.to_string(),
            dir,
            engine: SnapshotEngine::new(self.client.clone(), output_dir.clone(), name),
            resolver: SitemapResolver::new(self.client.clone(), output_dir.clone(), name),
        })
    }
}

fn join(base: &Url, url: &str) -> Result<String, ShellError> {
    base.join(url)
        .map(String::from)
        .map_err(|source| ShellError::InvalidUrl {
            url: url.to_string(),
            source,
        })
}
