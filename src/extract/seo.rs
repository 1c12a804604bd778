use super::{html_files, read_page};
use crate::config::CacheBusting;
use crate::error::ExtractError;
use crate::parsers::html::HtmlDocument;
use crate::snapshot::Sidecar;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Placeholder for tags a page does not have.
pub const MISSING: &str = "N/A";

/// SEO-relevant head metadata of one saved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeoRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub robots: String,
    /// Blank for the default `index,follow`
    pub robots_short: String,
    pub canonical: String,
}

impl SeoRecord {
    pub fn from_html(url: String, html: &str) -> Self {
        let doc = HtmlDocument::parse(html);
        let or_missing = |value: Option<String>| value.unwrap_or_else(|| MISSING.to_string());

        let robots = or_missing(doc.first_attr(r#"meta[name="robots"]"#, "content"));
        Self {
            url,
            title: or_missing(doc.first_text("title")),
            description: or_missing(doc.first_attr(r#"meta[name="description"]"#, "content")),
            robots_short: robots_summary(&robots),
            robots,
            canonical: or_missing(doc.first_attr(r#"link[rel="canonical"]"#, "href")),
        }
    }
}

/// `index`/`noindex` and `follow`/`nofollow`, or blank for `index,follow`.
pub fn robots_summary(robots: &str) -> String {
    let robots = robots.to_ascii_lowercase();
    let index = if robots.contains("noindex") { "noindex" } else { "index" };
    let follow = if robots.contains("nofollow") { "nofollow" } else { "follow" };

    match (index, follow) {
        ("index", "follow") => String::new(),
        _ => format!("{index},{follow}"),
    }
}

/// Builds the `seo.txt` report of a snapshot directory.
pub struct SeoExtractor {
    cache_busting: CacheBusting,
}

impl SeoExtractor {
    pub fn new(cache_busting: CacheBusting) -> Self {
        Self { cache_busting }
    }

    /// One record per non-empty HTML file, in path order.
    pub fn extract(&self, snapshot_dir: &Path) -> Result<Vec<SeoRecord>, ExtractError> {
        let mut records = Vec::new();
        for path in html_files(snapshot_dir)? {
            let html = read_page(&path)?;
            records.push(SeoRecord::from_html(self.page_url(&path), &html));
        }
        Ok(records)
    }

    /// Extracts and writes `{snapshot_dir}/seo.txt`, returning its path.
    pub fn write_report(&self, snapshot_dir: &Path) -> Result<PathBuf, ExtractError> {
        let records = self.extract(snapshot_dir)?;
        let path = snapshot_dir.join("seo.txt");
        fs::write(&path, format_report(&records)).map_err(|source| ExtractError::Io {
            path: path.clone(),
            source,
        })?;
        ::log::debug!("Wrote {} SEO records to {}", records.len(), path.display());
        Ok(path)
    }

    /// The captured URL, read from the page's sidecar without cache busting.
    fn page_url(&self, html_path: &Path) -> String {
        let sidecar_path = html_path.with_extension("json");
        match Sidecar::from_file(&sidecar_path) {
            Ok(sidecar) => match Url::parse(&sidecar.request.url) {
                Ok(url) => self.cache_busting.strip(&url).to_string(),
                Err(_) => sidecar.request.url,
            },
            Err(e) => {
                ::log::warn!("{}", e);
                MISSING.to_string()
            }
        }
    }
}

pub fn format_report(records: &[SeoRecord]) -> String {
    let mut report = String::new();
    for record in records {
        report.push_str(&format!("url: {}\n", record.url));
        report.push_str(&format!("canonical: {}\n", record.canonical));
        report.push_str(&format!("title: {}\n", record.title));
        report.push_str(&format!("description: {}\n", record.description));
        report.push_str(&format!("robots-short: {}\n", record.robots_short));
        report.push_str(&"-".repeat(80));
        report.push('\n');
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDECAR: &str = r#"{
        "request": {"method": "GET", "url": "https://example.com/about/?nocache=", "headers": {}},
        "response": {"status": 200, "headers": {}, "contentFile": "02-about.html"}
    }"#;

    #[test]
    fn test_robots_summary() {
        assert_eq!(robots_summary("index, follow"), "");
        assert_eq!(robots_summary(MISSING), "");
        assert_eq!(robots_summary("noindex, follow"), "noindex,follow");
        assert_eq!(robots_summary("index,nofollow"), "index,nofollow");
        assert_eq!(robots_summary("noindex,nofollow"), "noindex,nofollow");
        assert_eq!(robots_summary("NOINDEX, NOFOLLOW"), "noindex,nofollow");
        assert_eq!(robots_summary("Index, NoFollow"), "index,nofollow");
    }

    #[test]
    fn test_record_defaults_to_missing() {
        let record = SeoRecord::from_html("u".to_string(), "<html><body>hi</body></html>");
        assert_eq!(record.title, MISSING);
        assert_eq!(record.description, MISSING);
        assert_eq!(record.robots, MISSING);
        assert_eq!(record.canonical, MISSING);
        assert_eq!(record.robots_short, "");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("02-about.json"), SIDECAR).unwrap();
        fs::write(
            dir.path().join("02-about.html"),
            r#"<html><head><title>About</title>
            <meta name="description" content="About us">
            <meta name="robots" content="noindex, follow">
            <link rel="canonical" href="https://example.com/about/">
            </head></html>"#,
        )
        .unwrap();
        fs::write(dir.path().join("03-empty.html"), "").unwrap();

        let path = SeoExtractor::new(CacheBusting::default())
            .write_report(dir.path())
            .unwrap();

        let report = fs::read_to_string(path).unwrap();
        let expected = format!(
            "url: https://example.com/about/\ncanonical: https://example.com/about/\ntitle: About\ndescription: About us\nrobots-short: noindex,follow\n{}\n",
            "-".repeat(80)
        );
        assert_eq!(report, expected);
    }
}
