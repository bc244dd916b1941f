//! Working-tree predicates for required-file, required-term and
//! forbidden-file checks.
//!
//! Patterns are regular expressions (configured patterns carry `(?i)` for
//! case-insensitive matching). A pattern that fails to compile degrades to
//! "not found" and is logged; it never aborts a scan. Walk or read errors
//! also yield "not found" rather than guessing.

use std::fs;
use std::path::Path;
use log::{debug, warn};
use regex::Regex;
use walkdir::WalkDir;

/// True when any regular file under `root` has a base name matching
/// `pattern`. Stops at the first match.
pub fn file_name_matches(root: &Path, pattern: &str) -> bool {
    let regex = match compile(pattern) {
        Some(regex) => regex,
        None => return false,
    };
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Aborting file walk under {}: {}", root.display(), err);
                return false;
            }
        };
        if entry.file_type().is_file() && regex.is_match(&entry.file_name().to_string_lossy()) {
            return true;
        }
    }
    false
}

/// True when any regular file under `root` has content matching
/// `pattern`. Files are read whole and matched as lossy UTF-8; the walk
/// stops at the first match.
pub fn content_matches(root: &Path, pattern: &str) -> bool {
    let regex = match compile(pattern) {
        Some(regex) => regex,
        None => return false,
    };
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Aborting content walk under {}: {}", root.display(), err);
                return false;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let content = match fs::read(entry.path()) {
            Ok(content) => content,
            Err(err) => {
                debug!("Aborting content walk at {}: {}", entry.path().display(), err);
                return false;
            }
        };
        if regex.is_match(&String::from_utf8_lossy(&content)) {
            return true;
        }
    }
    false
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!("Skipping malformed pattern '{}': {}", pattern, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("services/api")).unwrap();
        let mut f = File::create(dir.path().join("Dockerfile")).unwrap();
        writeln!(f, "FROM alpine:3.18").unwrap();
        let mut f = File::create(dir.path().join("services/api/settings.yaml")).unwrap();
        writeln!(f, "swagger: enabled").unwrap();
        dir
    }

    #[test]
    fn test_file_name_match_is_recursive_and_case_insensitive() {
        let dir = fixture();
        assert!(file_name_matches(dir.path(), "(?i)dockerfile$"));
        assert!(file_name_matches(dir.path(), "(?i)settings\\.yaml$"));
        assert!(!file_name_matches(dir.path(), "(?i)sonar-project\\.properties$"));
    }

    #[test]
    fn test_content_match_finds_term_in_nested_file() {
        let dir = fixture();
        assert!(content_matches(dir.path(), "(?i)SWAGGER"));
        assert!(!content_matches(dir.path(), "(?i)vaumt"));
    }

    #[test]
    fn test_malformed_pattern_degrades_to_false() {
        let dir = fixture();
        assert!(!file_name_matches(dir.path(), "(?i)[unclosed"));
        assert!(!content_matches(dir.path(), "(?i)[unclosed"));
    }
}
