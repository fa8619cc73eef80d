//! Persistent cache of resolved remote directory snapshots

use sitesync_core::{RemoteEntry, ResolvedFingerprint, ResolvedSnapshot};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Wire form of one entry: `[size, fingerprint]`.
///
/// This is the on-disk format of every existing cache file and must
/// round-trip exactly: size `-1` marks a directory (paired with an empty
/// fingerprint string), `"?"` marks an unknown fingerprint.
type WireEntry = (i64, String);

type WireDocument = BTreeMap<String, BTreeMap<String, WireEntry>>;

const DIRECTORY_SIZE: i64 = -1;
const UNKNOWN_FINGERPRINT: &str = "?";

/// Cache failure modes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading the cache file failed for a reason other than absence.
    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing the cache file failed.
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The cache file is not the expected JSON document.
    #[error("malformed cache file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serializing the document for a save failed.
    #[error("failed to serialize cache file {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A stored size is negative but not the directory sentinel.
    #[error("bad size {size} for cached entry {leaf:?} (only -1 marks a directory)")]
    BadSize { leaf: String, size: i64 },
}

/// Mapping from remote directory path (forward-slash form) to its resolved
/// snapshot, backed by a JSON file.
///
/// The value type is `ResolvedSnapshot`: a snapshot with an assumed-correct
/// fingerprint cannot be inserted, by construction.
pub struct SnapshotCache {
    path: PathBuf,
    dirs: BTreeMap<String, ResolvedSnapshot>,
}

impl SnapshotCache {
    /// Open the cache file at `path`, starting empty when it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no cache file yet, starting empty");
                return Ok(Self {
                    path,
                    dirs: BTreeMap::new(),
                });
            }
            Err(source) => return Err(CacheError::Read { path, source }),
        };

        let document: WireDocument =
            serde_json::from_str(&text).map_err(|source| CacheError::Malformed {
                path: path.clone(),
                source,
            })?;

        let mut dirs = BTreeMap::new();
        for (dir, entries) in document {
            dirs.insert(dir, snapshot_from_wire(entries)?);
        }

        tracing::debug!(path = %path.display(), dirs = dirs.len(), "loaded snapshot cache");
        Ok(Self { path, dirs })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remote directory paths present in the cache, sorted.
    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    /// Snapshot for a remote directory, if cached.
    pub fn get(&self, remote_dir: &str) -> Option<&ResolvedSnapshot> {
        self.dirs.get(remote_dir)
    }

    /// Insert or replace the snapshot for a remote directory.
    pub fn insert(&mut self, remote_dir: impl Into<String>, snapshot: ResolvedSnapshot) {
        self.dirs.insert(remote_dir.into(), snapshot);
    }

    /// Number of cached directories.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Check whether the cache holds no directories.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Write the cache back to its file.
    ///
    /// The document is serialized with sorted keys and 2-space indentation
    /// so that saves are deterministic and diffs stay readable.
    pub fn save(&self) -> Result<(), CacheError> {
        let mut document = WireDocument::new();
        for (dir, snapshot) in &self.dirs {
            document.insert(dir.clone(), snapshot_to_wire(snapshot));
        }

        let mut text = serde_json::to_string_pretty(&document).map_err(|source| {
            CacheError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        text.push('\n');

        std::fs::write(&self.path, text).map_err(|source| CacheError::Write {
            path: self.path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.path.display(), dirs = self.dirs.len(), "saved snapshot cache");
        Ok(())
    }
}

fn snapshot_to_wire(snapshot: &ResolvedSnapshot) -> BTreeMap<String, WireEntry> {
    snapshot
        .iter()
        .map(|(leaf, entry)| {
            let wire = match entry {
                RemoteEntry::Directory => (DIRECTORY_SIZE, String::new()),
                RemoteEntry::File { size, fingerprint } => {
                    let fingerprint = match fingerprint {
                        ResolvedFingerprint::Unknown => UNKNOWN_FINGERPRINT.to_string(),
                        ResolvedFingerprint::Digest(digest) => digest.clone(),
                    };
                    (*size as i64, fingerprint)
                }
            };
            (leaf.to_string(), wire)
        })
        .collect()
}

fn snapshot_from_wire(
    entries: BTreeMap<String, WireEntry>,
) -> Result<ResolvedSnapshot, CacheError> {
    let mut snapshot = ResolvedSnapshot::new();
    for (leaf, (size, fingerprint)) in entries {
        let entry = match size {
            DIRECTORY_SIZE => RemoteEntry::Directory,
            size if size >= 0 => {
                let fingerprint = if fingerprint == UNKNOWN_FINGERPRINT {
                    ResolvedFingerprint::Unknown
                } else {
                    ResolvedFingerprint::Digest(fingerprint)
                };
                RemoteEntry::File {
                    size: size as u64,
                    fingerprint,
                }
            }
            size => return Err(CacheError::BadSize { leaf, size }),
        };
        snapshot.insert(leaf, entry);
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_entry(size: u64, digest: &str) -> RemoteEntry<ResolvedFingerprint> {
        RemoteEntry::File {
            size,
            fingerprint: ResolvedFingerprint::Digest(digest.to_string()),
        }
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::open(dir.path().join("cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn round_trips_a_directory_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = SnapshotCache::open(&path).unwrap();
        let mut snapshot = ResolvedSnapshot::new();
        snapshot.insert("x.txt", digest_entry(10, "abc123"));
        cache.insert("a/b", snapshot);
        cache.save().unwrap();

        let reloaded = SnapshotCache::open(&path).unwrap();
        let snapshot = reloaded.get("a/b").unwrap();
        assert_eq!(snapshot.get("x.txt"), Some(&digest_entry(10, "abc123")));
        assert_eq!(snapshot.get("other.txt"), None);
        assert_eq!(reloaded.get("c/d"), None);
    }

    #[test]
    fn round_trips_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = SnapshotCache::open(&path).unwrap();
        let mut snapshot = ResolvedSnapshot::new();
        snapshot.insert("img", RemoteEntry::Directory);
        snapshot.insert(
            "orphan.dat",
            RemoteEntry::File {
                size: 77,
                fingerprint: ResolvedFingerprint::Unknown,
            },
        );
        cache.insert("site", snapshot.clone());
        cache.save().unwrap();

        let reloaded = SnapshotCache::open(&path).unwrap();
        assert_eq!(reloaded.get("site"), Some(&snapshot));

        // The wire document uses the historical sentinels.
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("-1"));
        assert!(text.contains("\"?\""));
    }

    #[test]
    fn save_load_save_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = SnapshotCache::open(&path).unwrap();
        let mut snapshot = ResolvedSnapshot::new();
        snapshot.insert("x.txt", digest_entry(10, "abc123"));
        snapshot.insert("sub", RemoteEntry::Directory);
        cache.insert("a/b", snapshot);
        cache.save().unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        SnapshotCache::open(&path).unwrap().save().unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dirs_lists_cached_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SnapshotCache::open(dir.path().join("cache.json")).unwrap();
        assert_eq!(cache.dirs().count(), 0);

        cache.insert("site/img", ResolvedSnapshot::new());
        cache.insert("site", ResolvedSnapshot::new());
        cache.insert("archive", ResolvedSnapshot::new());

        assert_eq!(
            cache.dirs().collect::<Vec<_>>(),
            vec!["archive", "site", "site/img"]
        );
    }

    #[test]
    fn save_and_read_errors_name_their_side() {
        let source = serde_json::from_str::<WireDocument>("not json").unwrap_err();
        let err = CacheError::Serialize {
            path: PathBuf::from("cache.json"),
            source,
        };
        assert!(err.to_string().contains("serialize"));

        let source = serde_json::from_str::<WireDocument>("not json").unwrap_err();
        let err = CacheError::Malformed {
            path: PathBuf::from("cache.json"),
            source,
        };
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn rejects_negative_non_sentinel_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"a": {"x.txt": [-2, "abc"]}}"#).unwrap();

        let err = match SnapshotCache::open(&path) {
            Ok(_) => panic!("expected BadSize"),
            Err(err) => err,
        };
        match err {
            CacheError::BadSize { leaf, size } => {
                assert_eq!(leaf, "x.txt");
                assert_eq!(size, -2);
            }
            other => panic!("expected BadSize, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SnapshotCache::open(&path),
            Err(CacheError::Malformed { .. })
        ));
    }
}
