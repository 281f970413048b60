//! Disk index: size + extension catalog of every file under the search directory.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::ScannerConfig;
use crate::core::errors::Result;
use crate::core::paths::resolve_absolute_path;
use crate::scanner::walker::{DirectoryWalker, WalkerConfig};

/// A regular file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiskFile {
    pub absolute_path: PathBuf,
    pub size: u64,
    /// Final dot-suffix of the file name including the dot (`".mkv"`), or
    /// empty when the name has none. Case-sensitive.
    pub extension: String,
}

impl DiskFile {
    #[must_use]
    pub fn new(absolute_path: PathBuf, size: u64) -> Self {
        let extension = extension_of(&absolute_path);
        Self {
            absolute_path,
            size,
            extension,
        }
    }

    /// Final path component, lossily decoded.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size and extension both equal; the only notion of "same file" the
    /// matcher relies on.
    #[must_use]
    pub fn looks_like(&self, size: u64, extension: &str) -> bool {
        self.size == size && self.extension == extension
    }
}

/// Extension of the last component of `path`, with leading dot.
///
/// Mirrors the usual `splitext` rules: `"a.tar.gz"` → `".gz"`, `".bashrc"` → `""`,
/// `"notes."` → `"."`.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Queryable catalog of scanned files.
#[derive(Debug, Clone, Default)]
pub struct DiskIndex {
    root: PathBuf,
    files: Vec<DiskFile>,
    by_shape: HashMap<(u64, String), Vec<usize>>,
}

impl DiskIndex {
    /// Scan `root` recursively and index every regular file.
    pub fn build(root: &Path, config: &ScannerConfig) -> Result<Self> {
        let root = resolve_absolute_path(root);
        let walker = DirectoryWalker::new(WalkerConfig {
            root: root.clone(),
            follow_symlinks: config.follow_symlinks,
            parallelism: config.parallelism,
        });
        let files = walker.walk()?;
        Ok(Self::from_files(root, files))
    }

    /// Index an already-collected file list. Order is normalized to path order.
    #[must_use]
    pub fn from_files(root: PathBuf, mut files: Vec<DiskFile>) -> Self {
        files.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
        let mut by_shape: HashMap<(u64, String), Vec<usize>> = HashMap::new();
        for (idx, file) in files.iter().enumerate() {
            by_shape
                .entry((file.size, file.extension.clone()))
                .or_default()
                .push(idx);
        }
        Self {
            root,
            files,
            by_shape,
        }
    }

    /// All indexed files with exactly this size and extension, in path order.
    #[must_use]
    pub fn query(&self, size: u64, extension: &str) -> Vec<DiskFile> {
        self.by_shape
            .get(&(size, extension.to_string()))
            .map(|indices| indices.iter().map(|&i| self.files[i].clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
