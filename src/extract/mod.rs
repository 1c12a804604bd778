//! Readers over a saved snapshot tree.

pub mod discover;
pub mod seo;

pub use discover::LinkDiscoverer;
pub use seo::{SeoExtractor, SeoRecord};

use crate::error::ExtractError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every file under `dir` with the given extension, in sorted path order.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| ExtractError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Non-empty `.html` files under `dir`.
pub fn html_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut files = files_with_extension(dir, "html")?;
    files.retain(|path| path.metadata().is_ok_and(|meta| meta.len() > 0));
    Ok(files)
}

/// Reads a saved page, replacing invalid UTF-8.
pub(crate) fn read_page(path: &Path) -> Result<String, ExtractError> {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_html_files_sorted_and_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snap = dir.path().join("example.com/snap");
        fs::create_dir_all(&snap).unwrap();
        fs::write(snap.join("02-b.html"), "<p>b</p>").unwrap();
        fs::write(snap.join("01-a.html"), "<p>a</p>").unwrap();
        fs::write(snap.join("03-empty.html"), "").unwrap();
        fs::write(snap.join("01-a.json"), "{}").unwrap();

        let files = html_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["01-a.html", "02-b.html"]);

        assert_eq!(files_with_extension(dir.path(), "json").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(files_with_extension(&dir.path().join("missing"), "html").is_err());
    }
}
