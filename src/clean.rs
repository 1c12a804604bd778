//! Regex rewrites that normalize generated markup so two snapshots diff
//! cleanly, plus the `.bak` backups that make them reversible.

use crate::error::CleanError;
use crate::extract::files_with_extension;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named search/replace pair. `replace` may reference groups as `$1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRule {
    pub name: String,
    pub search: String,
    pub replace: String,
}

impl CleanRule {
    fn new(name: &str, search: &str, replace: &str) -> Self {
        Self {
            name: name.to_string(),
            search: search.to_string(),
            replace: replace.to_string(),
        }
    }
}

/// Rules for timestamps, nonces and tokens that change on every page load
pub fn default_clean_rules() -> Vec<CleanRule> {
    vec![
        CleanRule::new(
            "clean-cache-enabler",
            r"<!-- Cache Enabler by KeyCDN @ .*? -->",
            "<!-- Cache Enabler by KeyCDN ... -->",
        ),
        CleanRule::new(
            "clean-seo-framework",
            r"<!-- / The SEO Framework by Sybre Waaijer \| \d{1,2}\.\d{1,2}ms meta \| \d{1,2}\.\d{1,2}ms boot -->",
            "<!-- / The SEO Framework by Sybre Waaijer | 0.0ms meta | 0.0ms boot -->",
        ),
        CleanRule::new(
            "clean-wp-postratings",
            r#"data-nonce="(\w{10})""#,
            r#"data-nonce="0000000000""#,
        ),
        CleanRule::new(
            "clean-csrf-token",
            r#"<meta name="csrf-token" content=".*?">"#,
            r#"<meta name="csrf-token" content="token">"#,
        ),
        CleanRule::new(
            "clean-gravatar",
            r"https://secure.gravatar.com/avatar/(\w{32,64})",
            "https://secure.gravatar.com/avatar/00000000000000000000000000000000",
        ),
        CleanRule::new(
            "classicpress-cache-busting",
            r"\?ver=((cp_[a-z0-9]{8})|(\d{10}))?",
            "?ver=redacted",
        ),
    ]
}

/// Compiled clean rules.
#[derive(Debug)]
pub struct Cleaner {
    rules: Vec<(String, Regex, String)>,
}

impl Cleaner {
    pub fn new(rules: &[CleanRule]) -> Result<Self, CleanError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.search)
                    .map(|regex| (rule.name.clone(), regex, rule.replace.clone()))
                    .map_err(|source| CleanError::InvalidRule {
                        name: rule.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Applies every rule in order.
    pub fn apply(&self, content: &str) -> String {
        let mut updated = content.to_string();
        for (name, regex, replace) in &self.rules {
            let replaced = regex.replace_all(&updated, replace.as_str());
            if replaced != updated {
                ::log::trace!("Rule {} matched", name);
                updated = replaced.into_owned();
            }
        }
        updated
    }

    /// Rewrites every `.html` file under `dir` the rules change. The first
    /// rewrite of a file keeps the original as `<file>.bak`. Returns how many
    /// files changed.
    pub fn clean_dir(&self, dir: &Path) -> Result<usize, CleanError> {
        let mut changed = 0;

        for path in files_with_extension(dir, "html")? {
            let original = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            let updated = self.apply(&original);
            if updated == original {
                continue;
            }

            let backup = backup_path(&path);
            if !backup.exists() {
                fs::copy(&path, &backup).map_err(|source| io_error(&backup, source))?;
            }
            fs::write(&path, updated).map_err(|source| io_error(&path, source))?;
            ::log::debug!("Cleaned {}", path.display());
            changed += 1;
        }

        Ok(changed)
    }
}

/// Moves every `<file>.bak` under `dir` back over `<file>`. Returns how many
/// files were restored.
pub fn restore_backups(dir: &Path) -> Result<usize, CleanError> {
    let backups = files_with_extension(dir, "bak")?;
    for backup in &backups {
        let restored = backup.with_extension("");
        fs::rename(backup, &restored).map_err(|source| io_error(&restored, source))?;
    }
    Ok(backups.len())
}

/// Removes `dir` and everything under it. Missing directories are fine.
pub fn remove_dir(dir: &Path) -> Result<(), CleanError> {
    if !dir.is_dir() {
        return Ok(());
    }
    fs::remove_dir_all(dir).map_err(|source| io_error(dir, source))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

fn io_error(path: &Path, source: std::io::Error) -> CleanError {
    CleanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_compile_and_apply() {
        let cleaner = Cleaner::new(&default_clean_rules()).unwrap();
        let page = concat!(
            "<!-- Cache Enabler by KeyCDN @ Tue, 07 May 2024 10:00:00 GMT (https-index.html) -->\n",
            r#"<meta name="csrf-token" content="abc123">"#,
            "\n",
            r#"<script src="/app.js?ver=1715076000"></script>"#,
            "\n",
            r#"<span data-nonce="a1b2c3d4e5"></span>"#,
        );

        assert_eq!(
            cleaner.apply(page),
            concat!(
                "<!-- Cache Enabler by KeyCDN ... -->\n",
                r#"<meta name="csrf-token" content="token">"#,
                "\n",
                r#"<script src="/app.js?ver=redacted"></script>"#,
                "\n",
                r#"<span data-nonce="0000000000"></span>"#,
            )
        );
    }

    #[test]
    fn test_invalid_rule() {
        let err = Cleaner::new(&[CleanRule::new("broken", "(", "")]).unwrap_err();
        assert!(matches!(err, CleanError::InvalidRule { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_clean_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("01-index.html");
        let untouched = dir.path().join("02-about.html");
        fs::write(&page, r#"<meta name="csrf-token" content="first">"#).unwrap();
        fs::write(&untouched, "<p>static</p>").unwrap();

        let cleaner = Cleaner::new(&default_clean_rules()).unwrap();
        assert_eq!(cleaner.clean_dir(dir.path()).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            r#"<meta name="csrf-token" content="token">"#
        );
        assert!(!dir.path().join("02-about.html.bak").exists());

        // a second pass finds nothing left to change and keeps the first backup
        assert_eq!(cleaner.clean_dir(dir.path()).unwrap(), 0);

        assert_eq!(restore_backups(dir.path()).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            r#"<meta name="csrf-token" content="first">"#
        );
        assert!(!dir.path().join("01-index.html.bak").exists());
    }

    #[test]
    fn test_remove_dir() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = dir.path().join("snapshots");
        fs::create_dir_all(snapshots.join("example.com/snap")).unwrap();
        fs::write(snapshots.join("example.com/snap/01-index.html"), "x").unwrap();

        remove_dir(&snapshots).unwrap();
        assert!(!snapshots.exists());
        remove_dir(&snapshots).unwrap();
    }
}
