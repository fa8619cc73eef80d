//! Filesystem-backed transport
//!
//! Publishes into a directory on a locally reachable filesystem (a mounted
//! remote, a staging tree, or a test fixture), emulating the FTP-style
//! behaviours the publisher relies on: forward-slash paths, a session
//! working directory, and a permission error when a size probe hits a
//! directory.

use sitesync_core::{Transport, TransportError};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Transport rooted at a local directory.
///
/// The remote path `/` maps to the root directory; the working directory is
/// tracked as components relative to it and never escapes the root.
pub struct LocalTransport {
    root: PathBuf,
    cwd: Vec<String>,
}

impl LocalTransport {
    /// Create a transport rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            cwd: Vec::new(),
        })
    }

    /// Root directory this transport publishes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cwd_path(&self) -> PathBuf {
        let mut path = self.root.clone();
        for comp in &self.cwd {
            path.push(comp);
        }
        path
    }
}

impl Transport for LocalTransport {
    fn change_dir(&mut self, path: &str) -> sitesync_core::transport::Result<()> {
        let mut cwd = if path.starts_with('/') {
            Vec::new()
        } else {
            self.cwd.clone()
        };
        for comp in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if comp == ".." {
                cwd.pop();
            } else {
                cwd.push(comp.to_string());
            }
        }

        let mut target = self.root.clone();
        for comp in &cwd {
            target.push(comp);
        }
        if !target.is_dir() {
            return Err(TransportError::NotFound(path.to_string()));
        }

        self.cwd = cwd;
        Ok(())
    }

    fn current_dir(&self) -> sitesync_core::transport::Result<String> {
        Ok(format!("/{}", self.cwd.join("/")))
    }

    fn list_names(&mut self) -> sitesync_core::transport::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.cwd_path())? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn file_size(&mut self, leaf: &str) -> sitesync_core::transport::Result<u64> {
        let path = self.cwd_path().join(leaf);
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransportError::NotFound(leaf.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if meta.is_dir() {
            // Mirror the FTP behaviour: a size probe on a directory is
            // refused, which callers read as the directory signal.
            return Err(TransportError::PermissionDenied(format!(
                "{leaf}: not a plain file"
            )));
        }
        Ok(meta.len())
    }

    fn make_dir(&mut self, leaf: &str) -> sitesync_core::transport::Result<()> {
        std::fs::create_dir(self.cwd_path().join(leaf))?;
        Ok(())
    }

    fn store(&mut self, leaf: &str, data: &mut dyn Read) -> sitesync_core::transport::Result<()> {
        let path = self.cwd_path().join(leaf);
        let mut file = std::fs::File::create(&path)?;
        std::io::copy(data, &mut file)?;
        Ok(())
    }
}
