use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Flattens a URL path into a single file-name segment.
///
/// Leading and trailing slashes are dropped, an empty path becomes `index`,
/// and inner slashes become underscores.
pub fn path_name(url_path: &str) -> String {
    let trimmed = url_path.trim_matches('/');

    if trimmed.is_empty() {
        return "index".to_string();
    }

    trimmed.replace('/', "_")
}

/// Hands out numbered, collision-free file paths inside a snapshot directory.
///
/// Numbering is kept per `"{domain}/{snapshot}"` so several hosts captured
/// into one snapshot never share a sequence.
#[derive(Debug)]
pub struct PathNamer {
    output_dir: PathBuf,
    indices: HashMap<String, u32>,
}

impl PathNamer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            indices: HashMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Forget every counter; the next path for any domain is numbered `01` again.
    pub fn reset(&mut self) {
        self.indices.clear();
    }

    /// Returns `{output}/{domain}/{snapshot}/{NN}-{flattened path}.{extension}`.
    pub fn next_path(
        &mut self,
        domain: &str,
        snapshot_name: &str,
        url_path: &str,
        extension: &str,
    ) -> PathBuf {
        let path = path_name(url_path);
        let counter = self
            .indices
            .entry(format!("{domain}/{snapshot_name}"))
            .or_insert(1);
        let index = *counter;
        *counter += 1;

        self.output_dir
            .join(domain)
            .join(snapshot_name)
            .join(format!("{index:02}-{path}.{extension}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_name() {
        assert_eq!(path_name(""), "index");
        assert_eq!(path_name("/"), "index");
        assert_eq!(path_name("/a/b/"), "a_b");
        assert_eq!(path_name("blog/2024/post"), "blog_2024_post");
    }

    #[test]
    fn test_indices_increase_per_domain() {
        let mut namer = PathNamer::new("out");

        let first = namer.next_path("example.com", "snap", "/", "json");
        let second = namer.next_path("example.com", "snap", "/about/", "json");
        let other = namer.next_path("other.org", "snap", "/about", "json");

        assert_eq!(first, PathBuf::from("out/example.com/snap/01-index.json"));
        assert_eq!(second, PathBuf::from("out/example.com/snap/02-about.json"));
        assert_eq!(other, PathBuf::from("out/other.org/snap/01-about.json"));
    }

    #[test]
    fn test_padding_grows_past_two_digits() {
        let mut namer = PathNamer::new("out");
        let names: Vec<String> = (0..11)
            .map(|_| {
                let path = namer.next_path("example.com", "snap", "/page", "html");
                path.file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();

        assert_eq!(names[0], "01-page.html");
        assert_eq!(names[8], "09-page.html");
        assert_eq!(names[9], "10-page.html");
        assert_eq!(names[10], "11-page.html");
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut namer = PathNamer::new("out");
        namer.next_path("example.com", "snap", "/a", "json");
        namer.reset();

        let path = namer.next_path("example.com", "snap", "/b", "json");
        assert!(path.ends_with("01-b.json"));
    }
}
