//! In-memory transport for tests and dry runs

use sitesync_core::{Transport, TransportError};
use std::collections::BTreeMap;
use std::io::Read;

/// Counters for transport calls, useful for asserting that a warm cache
/// avoids remote traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallStats {
    pub lists: u64,
    pub size_probes: u64,
    pub mkdirs: u64,
    pub stores: u64,
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir(BTreeMap<String, Node>),
}

impl Node {
    fn dir() -> Self {
        Node::Dir(BTreeMap::new())
    }
}

/// Transport over an in-memory directory tree.
///
/// Behaves like the filesystem transport, including the permission error on
/// a directory size probe, but keeps everything in memory and counts calls.
pub struct MemoryTransport {
    root: Node,
    cwd: Vec<String>,
    stats: CallStats,
}

impl MemoryTransport {
    /// Create an empty in-memory target.
    pub fn new() -> Self {
        Self {
            root: Node::dir(),
            cwd: Vec::new(),
            stats: CallStats::default(),
        }
    }

    /// Call counters accumulated so far.
    pub fn stats(&self) -> CallStats {
        self.stats
    }

    /// Reset the call counters.
    pub fn reset_stats(&mut self) {
        self.stats = CallStats::default();
    }

    /// Pre-populate a file at an absolute forward-slash path, creating
    /// parent directories.
    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        let comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let (leaf, dirs) = match comps.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut node = &mut self.root;
        for comp in dirs {
            let Node::Dir(entries) = node else {
                return;
            };
            node = entries
                .entry((*comp).to_string())
                .or_insert_with(Node::dir);
        }
        if let Node::Dir(entries) = node {
            entries.insert((*leaf).to_string(), Node::File(content.to_vec()));
        }
    }

    /// Bytes of the file at an absolute path, if present.
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        let comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let mut node = &self.root;
        for comp in &comps {
            let Node::Dir(entries) = node else {
                return None;
            };
            node = entries.get(*comp)?;
        }
        match node {
            Node::File(bytes) => Some(bytes),
            Node::Dir(_) => None,
        }
    }

    fn node_at(&self, comps: &[String]) -> Option<&Node> {
        let mut node = &self.root;
        for comp in comps {
            let Node::Dir(entries) = node else {
                return None;
            };
            node = entries.get(comp)?;
        }
        Some(node)
    }

    fn cwd_entries_mut(&mut self) -> sitesync_core::transport::Result<&mut BTreeMap<String, Node>> {
        let mut node = &mut self.root;
        for comp in &self.cwd {
            let Node::Dir(entries) = node else {
                return Err(TransportError::Protocol(format!(
                    "{comp} is not a directory"
                )));
            };
            node = entries
                .get_mut(comp)
                .ok_or_else(|| TransportError::NotFound(comp.clone()))?;
        }
        match node {
            Node::Dir(entries) => Ok(entries),
            Node::File(_) => Err(TransportError::Protocol(
                "working directory is a file".to_string(),
            )),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
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

        match self.node_at(&cwd) {
            Some(Node::Dir(_)) => {
                self.cwd = cwd;
                Ok(())
            }
            _ => Err(TransportError::NotFound(path.to_string())),
        }
    }

    fn current_dir(&self) -> sitesync_core::transport::Result<String> {
        Ok(format!("/{}", self.cwd.join("/")))
    }

    fn list_names(&mut self) -> sitesync_core::transport::Result<Vec<String>> {
        self.stats.lists += 1;
        let entries = self.cwd_entries_mut()?;
        Ok(entries.keys().cloned().collect())
    }

    fn file_size(&mut self, leaf: &str) -> sitesync_core::transport::Result<u64> {
        self.stats.size_probes += 1;
        let entries = self.cwd_entries_mut()?;
        match entries.get(leaf) {
            Some(Node::File(bytes)) => Ok(bytes.len() as u64),
            Some(Node::Dir(_)) => Err(TransportError::PermissionDenied(format!(
                "{leaf}: not a plain file"
            ))),
            None => Err(TransportError::NotFound(leaf.to_string())),
        }
    }

    fn make_dir(&mut self, leaf: &str) -> sitesync_core::transport::Result<()> {
        self.stats.mkdirs += 1;
        let entries = self.cwd_entries_mut()?;
        if entries.contains_key(leaf) {
            return Err(TransportError::Protocol(format!("{leaf} already exists")));
        }
        entries.insert(leaf.to_string(), Node::dir());
        Ok(())
    }

    fn store(&mut self, leaf: &str, data: &mut dyn Read) -> sitesync_core::transport::Result<()> {
        self.stats.stores += 1;
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        let entries = self.cwd_entries_mut()?;
        entries.insert(leaf.to_string(), Node::File(bytes));
        Ok(())
    }
}
