//! Sitemap resolution.
//!
//! A root `sitemap.xml` is either a `<sitemapindex>` pointing at leaf
//! `<urlset>` documents, or a `<urlset>` itself. Indices are followed one
//! level deep. Every document fetched is saved next to the page captures,
//! and any failed fetch aborts the whole resolution.

use crate::codec;
use crate::error::SitemapError;
use crate::naming::PathNamer;
use crate::transport::{FetchClient, Transport};
use crate::utils::{is_gzip, url_decode};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use std::cmp::Ordering;
use std::fs;
use std::path::PathBuf;
use url::Url;

const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` of a leaf sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

/// Resolves sitemaps into a flat list of page URLs.
pub struct SitemapResolver<T> {
    client: FetchClient<T>,
    namer: PathNamer,
    snapshot_name: String,
    entries: Vec<SitemapEntry>,
}

impl<T: Transport> SitemapResolver<T> {
    pub fn new(
        client: FetchClient<T>,
        output_dir: impl Into<PathBuf>,
        snapshot_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namer: PathNamer::new(output_dir),
            snapshot_name: snapshot_name.into(),
            entries: Vec::new(),
        }
    }

    /// Resolves each sitemap path against `base` and returns every page URL in
    /// discovery order. On error nothing from this call is kept.
    pub async fn analyze(
        &mut self,
        base: &Url,
        paths: &[String],
    ) -> Result<Vec<String>, SitemapError> {
        self.namer.reset();
        let mut entries = Vec::new();

        for path in paths {
            if !path.ends_with(".xml") {
                return Err(SitemapError::InvalidSitemapExtension(path.clone()));
            }

            let url = join(base, path)?;
            let document = self.fetch(&url).await?;
            let parsed = parse_document(&document)?;

            if parsed.sitemaps.is_empty() {
                ::log::debug!("{} is a leaf sitemap", url);
                entries.extend(into_entries(parsed.urls)?);
                continue;
            }

            ::log::info!("{} lists {} sitemaps", url, parsed.sitemaps.len());
            for child in &parsed.sitemaps {
                let child_url = join(base, child)?;
                let document = self.fetch(&child_url).await?;
                entries.extend(into_entries(parse_document(&document)?.urls)?);
            }
        }

        self.entries = entries;
        Ok(self.links())
    }

    /// Page URLs from the last successful `analyze`, in discovery order.
    pub fn links(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.loc.clone()).collect()
    }

    pub fn entries(&self) -> &[SitemapEntry] {
        &self.entries
    }

    /// Fetches, decodes and saves one sitemap document.
    async fn fetch(&mut self, url: &Url) -> Result<Vec<u8>, SitemapError> {
        let request = self.client.request(url.as_str())?;
        let response = self.client.send(&request).await?;

        if response.status != 200 {
            return Err(SitemapError::SitemapFetchFailed {
                url: url.to_string(),
                status: response.status,
            });
        }

        let mut body = codec::decompress(&response.body, &response.headers.line("content-encoding"))?;
        if is_gzip(&body) {
            // *.xml.gz children are served as plain gzip files
            body = codec::decompress(&body, "gzip")?;
        }

        let domain = url.host_str().unwrap_or_default();
        let url_path = url.path();
        let stem = url_path.strip_suffix(".xml").unwrap_or(url_path);
        let path = self.namer.next_path(domain, &self.snapshot_name, stem, "xml");

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| SitemapError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &body).map_err(|source| SitemapError::Io {
            path: path.clone(),
            source,
        })?;
        ::log::debug!("Saved sitemap {} to {}", url, path.display());

        Ok(body)
    }
}

fn join(base: &Url, path: &str) -> Result<Url, SitemapError> {
    base.join(path).map_err(|source| SitemapError::InvalidUrl {
        url: path.to_string(),
        source,
    })
}

/// Returns a copy sorted most recent first. Entries without `lastmod` go
/// last; the sort is stable so equal entries keep discovery order.
pub fn sorted_by_lastmod(entries: &[SitemapEntry]) -> Vec<SitemapEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| match (&a.lastmod, &b.lastmod) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

/// One display line per entry: the date padded to 18 columns, then the URL.
pub fn format_entries(entries: &[SitemapEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let date = entry
                .lastmod
                .map(|lastmod| lastmod.format("%B %-d, %Y").to_string())
                .unwrap_or_default();
            format!("{date:<18}  {}", entry.loc)
        })
        .collect()
}

/// Parses a W3C datetime as found in `<lastmod>`.
pub fn parse_lastmod(value: &str) -> Result<DateTime<Utc>, SitemapError> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed.and_utc());
        }
    }

    let padded = match value.len() {
        4 => format!("{value}-01-01"),
        7 => format!("{value}-01"),
        _ => value.to_string(),
    };
    NaiveDate::parse_from_str(&padded, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| SitemapError::InvalidDate(value.to_string()))
}

#[derive(Debug, Default)]
struct RawEntry {
    loc: Option<String>,
    lastmod: Option<String>,
}

#[derive(Debug, Default)]
struct ParsedDocument {
    /// `<sitemapindex><sitemap><loc>` values
    sitemaps: Vec<String>,
    /// `<urlset><url>` children
    urls: Vec<RawEntry>,
}

fn into_entries(raw: Vec<RawEntry>) -> Result<Vec<SitemapEntry>, SitemapError> {
    let mut entries = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(loc) = entry.loc else {
            ::log::warn!("Skipping sitemap <url> without <loc>");
            continue;
        };
        let lastmod = entry.lastmod.as_deref().map(parse_lastmod).transpose()?;
        entries.push(SitemapEntry {
            loc: url_decode(&loc),
            lastmod,
        });
    }
    Ok(entries)
}

/// Walks the document keeping the path of sitemap-namespace element names.
/// Elements outside the namespace never match.
fn parse_document(bytes: &[u8]) -> Result<ParsedDocument, SitemapError> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Option<Vec<u8>>> = Vec::new();
    let mut parsed = ParsedDocument::default();
    let mut current = RawEntry::default();
    let mut text: Option<String> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let in_ns = matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == SITEMAP_NS);

        match event {
            Event::Start(e) => {
                let name = in_ns.then(|| e.local_name().as_ref().to_vec());
                stack.push(name);
                match path_of(&stack).as_slice() {
                    [b"sitemapindex", b"sitemap"] | [b"urlset", b"url"] => {
                        current = RawEntry::default();
                    }
                    [b"sitemapindex", b"sitemap", b"loc"]
                    | [b"urlset", b"url", b"loc" | b"lastmod"] => text = Some(String::new()),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if let Some(buffer) = text.as_mut() {
                    buffer.push_str(&e.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::CData(e) => {
                if let Some(buffer) = text.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                match path_of(&stack).as_slice() {
                    [b"sitemapindex", b"sitemap", b"loc"] | [b"urlset", b"url", b"loc"] => {
                        current.loc = text.take().map(|value| value.trim().to_string());
                    }
                    [b"urlset", b"url", b"lastmod"] => {
                        current.lastmod = text.take().map(|value| value.trim().to_string());
                    }
                    [b"sitemapindex", b"sitemap"] => {
                        if let Some(loc) = current.loc.take().filter(|loc| !loc.is_empty()) {
                            parsed.sitemaps.push(loc);
                        }
                    }
                    [b"urlset", b"url"] => parsed.urls.push(std::mem::take(&mut current)),
                    _ => {}
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parsed)
}

/// The element path as byte slices, with out-of-namespace elements as `""`.
fn path_of(stack: &[Option<Vec<u8>>]) -> Vec<&[u8]> {
    stack
        .iter()
        .map(|name| name.as_deref().unwrap_or(b""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{self, MockTransport};
    use chrono::TimeZone;

    const XML: &[(&str, &str)] = &[("Content-Type", "application/xml")];

    fn urlset(entries: &[(&str, Option<&str>)]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
        );
        for (loc, lastmod) in entries {
            xml.push_str(&format!("<url><loc>{loc}</loc>"));
            if let Some(lastmod) = lastmod {
                xml.push_str(&format!("<lastmod>{lastmod}</lastmod>"));
            }
            xml.push_str("</url>");
        }
        xml.push_str("</urlset>");
        xml
    }

    fn index(children: &[&str]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
        );
        for child in children {
            xml.push_str(&format!("<sitemap><loc>{child}</loc></sitemap>"));
        }
        xml.push_str("</sitemapindex>");
        xml
    }

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn resolver(transport: &MockTransport, dir: &std::path::Path) -> SitemapResolver<MockTransport> {
        SitemapResolver::new(mock::client(transport.clone()), dir, "snap")
    }

    #[tokio::test]
    async fn test_index_resolves_children_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond(
            "https://example.com/sitemap.xml",
            200,
            XML,
            index(&[
                "https://example.com/post-sitemap.xml",
                "https://example.com/page-sitemap.xml",
            ]),
        );
        transport.respond(
            "https://example.com/post-sitemap.xml",
            200,
            XML,
            urlset(&[
                ("https://example.com/p1", Some("2024-01-01")),
                ("https://example.com/p2", None),
                ("https://example.com/p3", Some("2024-03-01T10:00:00+00:00")),
            ]),
        );
        transport.respond(
            "https://example.com/page-sitemap.xml",
            200,
            XML,
            urlset(&[("https://example.com/a", None), ("https://example.com/b", None)]),
        );

        let mut resolver = resolver(&transport, dir.path());
        let links = resolver
            .analyze(&base(), &["sitemap.xml".to_string()])
            .await
            .unwrap();

        let expected = [
            "https://example.com/p1",
            "https://example.com/p2",
            "https://example.com/p3",
            "https://example.com/a",
            "https://example.com/b",
        ];
        assert_eq!(links, expected);
        assert_eq!(resolver.links(), expected);

        let snap_dir = dir.path().join("example.com/snap");
        assert!(snap_dir.join("01-sitemap.xml").exists());
        assert!(snap_dir.join("02-post-sitemap.xml").exists());
        assert!(snap_dir.join("03-page-sitemap.xml").exists());
    }

    #[tokio::test]
    async fn test_root_urlset_is_its_own_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond(
            "https://example.com/sitemap.xml",
            200,
            XML,
            urlset(&[("https://example.com/caf%C3%A9", Some("2023-05-06"))]),
        );

        let mut resolver = resolver(&transport, dir.path());
        let links = resolver
            .analyze(&base(), &["sitemap.xml".to_string()])
            .await
            .unwrap();

        assert_eq!(links, ["https://example.com/café"]);
        assert_eq!(
            resolver.entries()[0].lastmod,
            Some(Utc.with_ymd_and_hms(2023, 5, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_child_aborts_everything() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond(
            "https://example.com/sitemap.xml",
            200,
            XML,
            index(&["https://example.com/missing.xml", "https://example.com/ok.xml"]),
        );
        transport.respond(
            "https://example.com/ok.xml",
            200,
            XML,
            urlset(&[("https://example.com/a", None)]),
        );

        let mut resolver = resolver(&transport, dir.path());
        let err = resolver
            .analyze(&base(), &["sitemap.xml".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SitemapError::SitemapFetchFailed { ref url, status: 404 } if url == "https://example.com/missing.xml"
        ));
        assert!(resolver.links().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_xml_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver(&MockTransport::new(), dir.path());
        let err = resolver
            .analyze(&base(), &["sitemap.txt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SitemapError::InvalidSitemapExtension(ref path) if path == "sitemap.txt"));
    }

    #[tokio::test]
    async fn test_unparseable_lastmod_fails() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        transport.respond(
            "https://example.com/sitemap.xml",
            200,
            XML,
            urlset(&[("https://example.com/a", Some("last tuesday"))]),
        );

        let mut resolver = resolver(&transport, dir.path());
        let err = resolver
            .analyze(&base(), &["sitemap.xml".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SitemapError::InvalidDate(ref value) if value == "last tuesday"));
    }

    #[test]
    fn test_foreign_namespace_is_ignored() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9" xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
            <url><loc> https://example.com/a </loc><image:image><image:loc>https://example.com/a.png</image:loc></image:image></url>
        </urlset>"#;
        let parsed = parse_document(xml.as_bytes()).unwrap();
        assert!(parsed.sitemaps.is_empty());
        assert_eq!(parsed.urls.len(), 1);
        assert_eq!(parsed.urls[0].loc.as_deref(), Some("https://example.com/a"));

        let unqualified = "<urlset><url><loc>https://example.com/a</loc></url></urlset>";
        assert!(parse_document(unqualified.as_bytes()).unwrap().urls.is_empty());
    }

    #[test]
    fn test_sorted_by_lastmod_is_stable() {
        let at = |day| Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        let entry = |loc: &str, lastmod| SitemapEntry {
            loc: loc.to_string(),
            lastmod,
        };
        let entries = vec![
            entry("u1", None),
            entry("d1", at(1)),
            entry("u2", None),
            entry("d3", at(3)),
            entry("d2", at(2)),
            entry("u3", None),
        ];

        let sorted: Vec<String> = sorted_by_lastmod(&entries)
            .into_iter()
            .map(|entry| entry.loc)
            .collect();
        assert_eq!(sorted, ["d3", "d2", "d1", "u1", "u2", "u3"]);
        assert_eq!(entries[0].loc, "u1");
    }

    #[test]
    fn test_parse_lastmod_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap();
        assert_eq!(parse_lastmod("2024-02-03").unwrap(), midnight);
        assert_eq!(parse_lastmod("2024-02-03T00:00:00Z").unwrap(), midnight);
        assert_eq!(parse_lastmod("2024-02-03T01:00:00+01:00").unwrap(), midnight);
        assert_eq!(parse_lastmod("2024-02-03T01:00+01:00").unwrap(), midnight);
        assert_eq!(parse_lastmod("2024-02-03 00:00:00").unwrap(), midnight);
        assert_eq!(
            parse_lastmod("2024-02").unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_lastmod("").is_err());
        assert!(parse_lastmod("03/02/2024").is_err());
    }

    #[test]
    fn test_format_entries() {
        let entries = [
            SitemapEntry {
                loc: "https://example.com/a".to_string(),
                lastmod: Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
            },
            SitemapEntry {
                loc: "https://example.com/b".to_string(),
                lastmod: None,
            },
        ];
        let lines = format_entries(&entries);
        assert_eq!(lines[0], "January 5, 2024     https://example.com/a");
        assert_eq!(lines[1], format!("{}  https://example.com/b", " ".repeat(18)));
    }
}
