use anyhow::{bail, Result};
use async_trait::async_trait;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::models::SourceFile;
use crate::traits::SourceConnector;

/// Reads transcript files from a local directory tree.
pub struct FilesystemConnector {
    root: PathBuf,
    include_globs: Vec<String>,
    follow_symlinks: bool,
}

impl FilesystemConnector {
    pub fn new(root: impl Into<PathBuf>, config: &IngestConfig) -> Self {
        Self {
            root: root.into(),
            include_globs: config.include_globs.clone(),
            follow_symlinks: config.follow_symlinks,
        }
    }
}

#[async_trait]
impl SourceConnector for FilesystemConnector {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn scan(&self) -> Result<Vec<SourceFile>> {
        let root = self.root.clone();
        let include_globs = self.include_globs.clone();
        let follow_symlinks = self.follow_symlinks;
        tokio::task::spawn_blocking(move || scan_directory(&root, &include_globs, follow_symlinks))
            .await?
    }
}

pub fn scan_directory(
    root: &Path,
    include_globs: &[String],
    follow_symlinks: bool,
) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        bail!("Source directory does not exist: {}", root.display());
    }

    let include_set = build_globset(include_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        // Hidden files and directories
        if relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };

        // Unreadable files are still reported so ingest can reject them
        let (body, read_error) = match std::fs::read_to_string(path) {
            Ok(body) => (body, None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable source file");
                (String::new(), Some(e.to_string()))
            }
        };

        files.push(SourceFile {
            filename,
            path: Some(path.to_path_buf()),
            body,
            read_error,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        // `*` stays within one path segment; `**` crosses directories
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scans_matching_files_sorted() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(root.join("b20200102.json"), "{}").unwrap();
        fs::write(root.join("a20200101.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();
        fs::write(root.join(".hidden20200103.json"), "{}").unwrap();

        let files = scan_directory(root, &["*.json".to_string()], false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a20200101.json", "b20200102.json"]);
    }

    #[test]
    fn nested_files_need_recursive_glob() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("2019");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("x20190101.json"), "{}").unwrap();

        let flat = scan_directory(tmp.path(), &["*.json".to_string()], false).unwrap();
        assert!(flat.is_empty());

        let deep = scan_directory(tmp.path(), &["**/*.json".to_string()], false).unwrap();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].filename, "x20190101.json");
    }

    #[test]
    fn unreadable_file_is_kept_with_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad20200101.json"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(tmp.path().join("good20200102.json"), "{}").unwrap();

        let files = scan_directory(tmp.path(), &["*.json".to_string()], false).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "bad20200101.json");
        assert!(files[0].read_error.is_some());
        assert!(files[1].read_error.is_none());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(scan_directory(&missing, &["*.json".to_string()], false).is_err());
    }
}
