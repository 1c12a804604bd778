//! Sequential page capture.
//!
//! Every URL is fetched, decoded and written as a pair of files before the
//! next one starts: a pretty-printed JSON sidecar with the request and
//! response metadata, and the decoded body under the same base name.

use crate::codec;
use crate::error::{ExtractError, SnapshotError, TransportError};
use crate::naming::PathNamer;
use crate::transport::{FetchClient, Headers, Transport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// A successful capture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCapture {
    pub url: String,
    /// Path of the JSON sidecar
    pub filename: PathBuf,
    pub status: u16,
    pub request_headers: Headers,
    pub response_headers: Headers,
}

/// Outcome of capturing one URL: either a capture or the reason it failed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SnapshotRecord {
    Taken(SnapshotCapture),
    Failed { url: String, error: String },
}

impl SnapshotRecord {
    pub fn url(&self) -> &str {
        match self {
            SnapshotRecord::Taken(capture) => &capture.url,
            SnapshotRecord::Failed { url, .. } => url,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SnapshotRecord::Taken(_) => None,
            SnapshotRecord::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_taken(&self) -> bool {
        matches!(self, SnapshotRecord::Taken(_))
    }
}

/// On-disk sidecar written next to every captured body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub request: SidecarRequest,
    pub response: SidecarResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarResponse {
    pub status: u16,
    pub headers: Headers,
    #[serde(rename = "contentFile")]
    pub content_file: String,
}

impl Sidecar {
    pub fn from_file(path: &Path) -> Result<Self, ExtractError> {
        let contents = fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&contents).map_err(|source| ExtractError::Sidecar {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Captures pages into `{output}/{domain}/{snapshot}/`.
pub struct SnapshotEngine<T> {
    client: FetchClient<T>,
    namer: PathNamer,
    snapshot_name: String,
}

impl<T: Transport> SnapshotEngine<T> {
    pub fn new(
        client: FetchClient<T>,
        output_dir: impl Into<PathBuf>,
        snapshot_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namer: PathNamer::new(output_dir),
            snapshot_name: snapshot_name.into(),
        }
    }

    pub fn snapshot_name(&self) -> &str {
        &self.snapshot_name
    }

    /// Captures every URL in order. Never fails as a whole: each URL yields
    /// its own record. File numbering restarts with every call.
    pub async fn take_snapshots(&mut self, urls: &[String]) -> Vec<SnapshotRecord> {
        self.namer.reset();

        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            let record = match self.take_snapshot(url).await {
                Ok(capture) => {
                    ::log::debug!("Captured {} into {}", url, capture.filename.display());
                    SnapshotRecord::Taken(capture)
                }
                Err(e) => {
                    ::log::warn!("Snapshot failed for {}: {}", url, e);
                    SnapshotRecord::Failed {
                        url: url.clone(),
                        error: e.to_string(),
                    }
                }
            };
            records.push(record);
        }

        records
    }

    async fn take_snapshot(&mut self, url: &str) -> Result<SnapshotCapture, SnapshotError> {
        let request = self.client.request(url)?;
        let response = self.client.send(&request).await?;

        if response.status != 200 {
            return Err(SnapshotError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let extension = codec::extension_for(&response.headers.line("content-type"));
        let body = codec::decompress(&response.body, &response.headers.line("content-encoding"))?;

        let target = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let domain = target.host_str().unwrap_or_default();
        let sidecar_path = self
            .namer
            .next_path(domain, &self.snapshot_name, target.path(), "json");
        let content_path = sidecar_path.with_extension(extension);
        let content_file = content_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sidecar = Sidecar {
            request: SidecarRequest {
                method: request.method.clone(),
                url: request.url.clone(),
                headers: request.headers.clone(),
            },
            response: SidecarResponse {
                status: response.status,
                headers: response.headers.clone(),
                content_file,
            },
        };

        if let Some(dir) = sidecar_path.parent() {
            fs::create_dir_all(dir).map_err(|source| SnapshotError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        write_file(&sidecar_path, serde_json::to_string_pretty(&sidecar)?.as_bytes())?;
        write_file(&content_path, &body)?;

        Ok(SnapshotCapture {
            url: url.to_string(),
            filename: sidecar_path,
            status: response.status,
            request_headers: request.headers,
            response_headers: response.headers,
        })
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SnapshotError> {
    fs::write(path, contents).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}
