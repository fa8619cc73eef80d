//! Live and cached strategies for learning remote directory state

use anyhow::{Context, Result};
use sitesync_cache::SnapshotCache;
use sitesync_core::{
    fingerprint_file, Fingerprint, LiveSnapshot, RemoteEntry, ResolvedFingerprint,
    ResolvedSnapshot, Transport, TransportError,
};
use std::path::Path;

/// Where the publisher learns what a remote directory currently holds.
pub enum SnapshotSource<'a> {
    /// Query the transport every time a directory is entered.
    Live,
    /// Reuse persisted snapshots, populating them from a live query the
    /// first time a directory is seen.
    Cached(&'a mut SnapshotCache),
}

impl SnapshotSource<'_> {
    /// Snapshot of `remote_dir`, which must be the transport's current
    /// directory. `local_dir` is the local tree mirroring it, used to
    /// resolve assumed-correct fingerprints on a cache miss.
    ///
    /// After this returns in cached mode, the snapshot is fully resolved
    /// and the cache holds a copy; a later run reuses it without any
    /// transport traffic.
    pub fn contents(
        &mut self,
        transport: &mut dyn Transport,
        remote_dir: &str,
        local_dir: &Path,
    ) -> Result<LiveSnapshot> {
        match self {
            SnapshotSource::Live => live_contents(transport, remote_dir),
            SnapshotSource::Cached(cache) => {
                if let Some(snapshot) = cache.get(remote_dir) {
                    return Ok(snapshot.clone().into());
                }

                tracing::info!(dir = remote_dir, "populating snapshot cache");
                let live = live_contents(transport, remote_dir)?;
                let resolved = resolve(live, remote_dir, local_dir);
                cache.insert(remote_dir, resolved.clone());
                Ok(resolved.into())
            }
        }
    }

    /// Hand a (possibly upload-mutated) snapshot back to the source.
    ///
    /// The cached strategy stores it under `remote_dir` so decisions later
    /// in the run, and later runs, see the post-upload state; the live
    /// strategy drops it.
    pub fn commit(&mut self, remote_dir: &str, snapshot: LiveSnapshot) -> Result<()> {
        match self {
            SnapshotSource::Live => Ok(()),
            SnapshotSource::Cached(cache) => {
                let resolved: ResolvedSnapshot = snapshot
                    .try_into()
                    .context("snapshot left the publisher with unresolved fingerprints")?;
                cache.insert(remote_dir, resolved);
                Ok(())
            }
        }
    }
}

/// List the current remote directory, probing each leaf's size.
///
/// A permission-denied size probe marks the leaf as a directory; that is
/// the only type signal FTP-style listings give us. Fingerprints are left
/// as `AssumedCorrect`: computing a remote hash would mean transferring
/// the file.
fn live_contents(transport: &mut dyn Transport, remote_dir: &str) -> Result<LiveSnapshot> {
    let names = transport
        .list_names()
        .with_context(|| format!("failed to list remote directory {remote_dir}"))?;

    let mut snapshot = LiveSnapshot::new();
    for leaf in names {
        match transport.file_size(&leaf) {
            Ok(size) => snapshot.insert(
                leaf,
                RemoteEntry::File {
                    size,
                    fingerprint: Fingerprint::AssumedCorrect,
                },
            ),
            Err(TransportError::PermissionDenied(_)) => {
                snapshot.insert(leaf, RemoteEntry::Directory);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to query sizes in {remote_dir}"));
            }
        }
    }
    Ok(snapshot)
}

/// Replace every assumed-correct fingerprint with the local counterpart's
/// digest, so the snapshot becomes safe to persist.
///
/// A remote file without a hashable local counterpart is downgraded to an
/// unknown fingerprint and reported; it will be treated as changed until a
/// local copy appears.
fn resolve(live: LiveSnapshot, remote_dir: &str, local_dir: &Path) -> ResolvedSnapshot {
    let mut resolved = ResolvedSnapshot::new();
    for (leaf, entry) in live.into_entries() {
        let entry = match entry {
            RemoteEntry::Directory => RemoteEntry::Directory,
            RemoteEntry::File { size, fingerprint } => {
                let fingerprint = match fingerprint {
                    Fingerprint::Unknown => ResolvedFingerprint::Unknown,
                    Fingerprint::Digest(digest) => ResolvedFingerprint::Digest(digest),
                    Fingerprint::AssumedCorrect => {
                        let local_path = local_dir.join(&leaf);
                        match fingerprint_file(&local_path) {
                            Some(digest) => ResolvedFingerprint::Digest(digest),
                            None => {
                                tracing::warn!(
                                    remote = %format!("{remote_dir}/{leaf}"),
                                    tried = %local_path.display(),
                                    "remote file exists but local counterpart cannot be hashed"
                                );
                                ResolvedFingerprint::Unknown
                            }
                        }
                    }
                };
                RemoteEntry::File { size, fingerprint }
            }
        };
        resolved.insert(leaf, entry);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubTransport {
        names: Vec<String>,
        dirs: Vec<String>,
        sizes: Vec<(String, u64)>,
        lists: u64,
    }

    impl StubTransport {
        fn new(files: &[(&str, u64)], dirs: &[&str]) -> Self {
            let mut names: Vec<String> = files
                .iter()
                .map(|(n, _)| (*n).to_string())
                .chain(dirs.iter().map(|d| (*d).to_string()))
                .collect();
            names.sort();
            Self {
                names,
                dirs: dirs.iter().map(|d| (*d).to_string()).collect(),
                sizes: files.iter().map(|(n, s)| ((*n).to_string(), *s)).collect(),
                lists: 0,
            }
        }
    }

    impl Transport for StubTransport {
        fn change_dir(&mut self, _path: &str) -> sitesync_core::transport::Result<()> {
            Ok(())
        }

        fn current_dir(&self) -> sitesync_core::transport::Result<String> {
            Ok("/".to_string())
        }

        fn list_names(&mut self) -> sitesync_core::transport::Result<Vec<String>> {
            self.lists += 1;
            Ok(self.names.clone())
        }

        fn file_size(&mut self, leaf: &str) -> sitesync_core::transport::Result<u64> {
            if self.dirs.iter().any(|d| d == leaf) {
                return Err(TransportError::PermissionDenied(leaf.to_string()));
            }
            self.sizes
                .iter()
                .find(|(n, _)| n == leaf)
                .map(|(_, s)| *s)
                .ok_or_else(|| TransportError::NotFound(leaf.to_string()))
        }

        fn make_dir(&mut self, _leaf: &str) -> sitesync_core::transport::Result<()> {
            Ok(())
        }

        fn store(
            &mut self,
            _leaf: &str,
            _data: &mut dyn std::io::Read,
        ) -> sitesync_core::transport::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn live_maps_denied_size_probes_to_directories() {
        let mut transport = StubTransport::new(&[("a.txt", 5)], &["img"]);
        let local = tempfile::tempdir().unwrap();

        let snapshot = SnapshotSource::Live
            .contents(&mut transport, "/", local.path())
            .unwrap();

        assert_eq!(snapshot.get("img"), Some(&RemoteEntry::Directory));
        assert_eq!(
            snapshot.get("a.txt"),
            Some(&RemoteEntry::File {
                size: 5,
                fingerprint: Fingerprint::AssumedCorrect,
            })
        );
    }

    #[test]
    fn cached_resolves_against_local_files_and_reuses_the_cache() {
        let mut transport = StubTransport::new(&[("a.txt", 5), ("orphan.dat", 9)], &[]);
        let local = tempfile::tempdir().unwrap();
        std::fs::write(local.path().join("a.txt"), b"hello").unwrap();

        let mut cache = SnapshotCache::open(local.path().join("cache.json")).unwrap();
        let mut source = SnapshotSource::Cached(&mut cache);

        let snapshot = source
            .contents(&mut transport, "/site", local.path())
            .unwrap();

        let expected = fingerprint_file(&local.path().join("a.txt")).unwrap();
        assert_eq!(
            snapshot.get("a.txt"),
            Some(&RemoteEntry::File {
                size: 5,
                fingerprint: Fingerprint::Digest(expected),
            })
        );
        // No local counterpart: downgraded, not fatal.
        assert_eq!(
            snapshot.get("orphan.dat"),
            Some(&RemoteEntry::File {
                size: 9,
                fingerprint: Fingerprint::Unknown,
            })
        );
        assert_eq!(transport.lists, 1);

        // Second visit answers from the cache without listing again.
        let again = source
            .contents(&mut transport, "/site", local.path())
            .unwrap();
        assert_eq!(again, snapshot);
        assert_eq!(transport.lists, 1);
    }

    #[test]
    fn commit_updates_the_cached_snapshot() {
        let mut transport = StubTransport::new(&[], &[]);
        let local = tempfile::tempdir().unwrap();

        let mut cache = SnapshotCache::open(local.path().join("cache.json")).unwrap();
        let mut source = SnapshotSource::Cached(&mut cache);

        let mut snapshot = source
            .contents(&mut transport, "/site", local.path())
            .unwrap();
        snapshot.insert(
            "new.txt",
            RemoteEntry::File {
                size: 3,
                fingerprint: Fingerprint::Digest("abc".into()),
            },
        );
        source.commit("/site", snapshot).unwrap();

        let stored = cache.get("/site").unwrap();
        assert_eq!(
            stored.get("new.txt"),
            Some(&RemoteEntry::File {
                size: 3,
                fingerprint: ResolvedFingerprint::Digest("abc".into()),
            })
        );
    }
}
