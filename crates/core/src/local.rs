//! Read-only descriptor of one local file

use crate::hash;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A local file being considered for upload.
///
/// Size and mtime are read once at construction; the fingerprint is computed
/// lazily and memoized, since most decisions resolve on size or mtime alone.
#[derive(Debug)]
pub struct LocalFile {
    leaf: String,
    path: PathBuf,
    size: u64,
    mtime: i64,
    fingerprint: OnceCell<Option<String>>,
}

impl LocalFile {
    /// Describe the file `dir/leaf`, reading its metadata.
    pub fn from_path(dir: &Path, leaf: &str) -> std::io::Result<Self> {
        let path = dir.join(leaf);
        let meta = std::fs::metadata(&path)?;
        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Self::new(leaf, path, meta.len(), mtime))
    }

    /// Build a descriptor from already-known metadata.
    pub fn new(leaf: &str, path: PathBuf, size: u64, mtime: i64) -> Self {
        Self {
            leaf: leaf.to_string(),
            path,
            size,
            mtime,
            fingerprint: OnceCell::new(),
        }
    }

    /// Leaf name within its directory.
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    /// Full path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time, unix seconds.
    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    /// Path-seeded content fingerprint, `None` when the file is unreadable.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint
            .get_or_init(|| hash::fingerprint_file(&self.path))
            .as_deref()
    }
}
