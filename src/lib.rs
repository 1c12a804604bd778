//! Website snapshot archiver: captures pages with their HTTP metadata,
//! resolves sitemaps, and post-processes the saved tree.

pub mod clean;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod naming;
pub mod parsers;
pub mod robots;
pub mod shell;
pub mod sitemap;
pub mod snapshot;
pub mod transport;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ArchiverConfig, CacheBusting};
pub use sitemap::{SitemapEntry, SitemapResolver};
pub use snapshot::{SnapshotCapture, SnapshotEngine, SnapshotRecord};
pub use transport::{FetchClient, HttpTransport, Transport};
