//! Local archival: tar.gz of a repository tree.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{bail, Context, Result};
use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use walkdir::WalkDir;

/// Archive `source` into `<dest>/<label>_<timestamp>.tar.gz` and return
/// the archive path. The archive root entry is named after the label so
/// extraction yields one directory.
pub fn archive_tree(source: &Path, dest: &Path, label: &str) -> Result<PathBuf> {
    if !source.exists() {
        bail!("source path does not exist: {}", source.display());
    }

    let file_count = WalkDir::new(source)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .count();
    info!(
        "Archiving {} ({} files) into {}",
        source.display(),
        file_count,
        dest.display()
    );

    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create destination directory: {}", dest.display()))?;

    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let archive_path = dest.join(format!("{label}_{stamp}.tar.gz"));

    let started = Instant::now();
    let file = File::create(&archive_path)
        .with_context(|| format!("Failed to create archive: {}", archive_path.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(label, source)
        .with_context(|| format!("Failed to archive {}", source.display()))?;
    let encoder = builder
        .into_inner()
        .context("Failed to finalize archive")?;
    encoder.finish().context("Failed to flush archive")?;

    info!(
        "Archive written to {} in {:.1}s",
        archive_path.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_archive_tree_creates_timestamped_archive() {
        let source = TempDir::new().unwrap();
        fs::create_dir(source.path().join("repo")).unwrap();
        fs::write(source.path().join("repo/README.md"), "hello").unwrap();
        let dest = TempDir::new().unwrap();

        let path = archive_tree(source.path(), dest.path(), "acme").unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("acme_"));
        assert!(name.ends_with(".tar.gz"));
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_archive_missing_source_fails() {
        let dest = TempDir::new().unwrap();
        let result = archive_tree(Path::new("/definitely/not/here"), dest.path(), "acme");
        assert!(result.is_err());
    }
}
