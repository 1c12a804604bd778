//! Error types for every stage of the archiving pipeline.
//!
//! Per-URL failures in a snapshot batch are turned into data by the engine;
//! everything else propagates to the shell, which logs it and keeps running.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while undoing a `Content-Encoding`.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The encoding token is not one we know how to reverse.
    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),

    /// The encoding is known but support was not compiled in.
    #[error("Decompression for `{0}` is not available in this build")]
    UnavailableCodec(String),

    /// The body did not decode under the declared encoding.
    #[error("Failed to decode {encoding} body: {source}")]
    Decompress {
        encoding: String,
        #[source]
        source: io::Error,
    },
}

/// Failures of the outbound HTTP layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid header `{0}`")]
    InvalidHeader(String),

    #[error("HTTP client initialization error: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// Failures while capturing a single URL.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Anything other than `200 OK`. Displays as `"{url} - {status}"`.
    #[error("{url} - {status}")]
    HttpStatus { url: String, status: u16 },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode sidecar: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures that abort a whole sitemap resolution.
#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("Sitemap path must end in .xml: {0}")]
    InvalidSitemapExtension(String),

    #[error("Failed to fetch {url}: HTTP {status}")]
    SitemapFetchFailed { url: String, status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Unrecognized lastmod date `{0}`")]
    InvalidDate(String),

    #[error("Invalid sitemap url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures while capturing robots.txt.
#[derive(Error, Debug)]
pub enum RobotsError {
    #[error("download robots.txt {url} - {status}")]
    FetchFailed { url: String, status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures while reading a saved snapshot tree back.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read sidecar {path}: {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures of the clean / restore file rewrites.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Invalid clean rule `{name}`: {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Failed to rewrite {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures loading the archiver configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures surfaced by shell commands.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("set host first")]
    NoHost,

    #[error("snapshot name already exists")]
    SnapshotExists,

    #[error("snapshot dir does not exist")]
    SnapshotMissing,

    #[error("snapshot dir required")]
    SnapshotNameRequired,

    /// Unparseable command line, rendered by clap with its usage.
    #[error("{0}")]
    Command(#[from] clap::Error),

    #[error("Invalid host `{host}`: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read input: {0}")]
    Input(#[source] io::Error),

    #[error("Invalid discover pattern: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error(transparent)]
    Robots(#[from] RobotsError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
