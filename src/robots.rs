use crate::codec;
use crate::error::{RobotsError, TransportError};
use crate::transport::{FetchClient, Transport};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use url::Url;

static SITEMAP_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^sitemap:[ \t]*(\S.*?)[ \t]*\r?$").expect("valid sitemap directive regex"));

/// A captured robots.txt and the sitemaps it advertises.
#[derive(Debug, Clone)]
pub struct RobotsTxt {
    pub body: String,
    pub sitemaps: Vec<String>,
}

/// `Sitemap:` directive values in document order.
pub fn sitemap_directives(body: &str) -> Vec<String> {
    SITEMAP_DIRECTIVE
        .captures_iter(body)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// Downloads `{base}/robots.txt` and saves it as `{snapshot_dir}/robots.txt`.
pub async fn fetch_robots<T: Transport>(
    client: &FetchClient<T>,
    base: &Url,
    snapshot_dir: &Path,
) -> Result<RobotsTxt, RobotsError> {
    let url = base
        .join("/robots.txt")
        .map_err(|source| TransportError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;

    let request = client.request(url.as_str())?;
    let response = client.send(&request).await?;

    if response.status != 200 {
        return Err(RobotsError::FetchFailed {
            url: url.to_string(),
            status: response.status,
        });
    }

    let body = codec::decompress(&response.body, &response.headers.line("content-encoding"))?;

    fs::create_dir_all(snapshot_dir).map_err(|source| RobotsError::Io {
        path: snapshot_dir.to_path_buf(),
        source,
    })?;
    let path = snapshot_dir.join("robots.txt");
    fs::write(&path, &body).map_err(|source| RobotsError::Io { path, source })?;

    let body = String::from_utf8_lossy(&body).into_owned();
    let sitemaps = sitemap_directives(&body);
    ::log::debug!("robots.txt lists {} sitemaps", sitemaps.len());

    Ok(RobotsTxt { body, sitemaps })
}
