//! In-memory model of one remote directory's entries

use std::collections::BTreeMap;

/// Fingerprint of a remote file as known to a live or working snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// The file exists remotely and is presumed unchanged; verifying it
    /// would require transferring its content.
    AssumedCorrect,
    /// The file exists remotely but has no local counterpart to hash.
    Unknown,
    /// Concrete hex digest.
    Digest(String),
}

/// Fingerprint as stored in the persistent cache.
///
/// `AssumedCorrect` is only meaningful within a single live query and would
/// be meaningless after a reload, so the cache value type does not admit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFingerprint {
    /// The file exists remotely but has no local counterpart to hash.
    Unknown,
    /// Concrete hex digest.
    Digest(String),
}

impl From<ResolvedFingerprint> for Fingerprint {
    fn from(resolved: ResolvedFingerprint) -> Self {
        match resolved {
            ResolvedFingerprint::Unknown => Fingerprint::Unknown,
            ResolvedFingerprint::Digest(digest) => Fingerprint::Digest(digest),
        }
    }
}

/// Error converting a working snapshot that still carries `AssumedCorrect`
/// entries into a cacheable one. Reaching this is a programming error: the
/// cached strategy resolves every entry before a snapshot can be committed.
#[derive(Debug, thiserror::Error)]
#[error("entry {leaf:?} still has an unresolved fingerprint")]
pub struct UnresolvedEntry {
    /// Leaf name of the offending entry.
    pub leaf: String,
}

/// One entry in a remote directory listing.
///
/// The directory marker is a variant rather than a magic size, which makes a
/// "same-size match against a directory" unrepresentable; it serializes with
/// the size sentinel `-1` for cache-file compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry<F> {
    /// The entry is a subdirectory (detected from a permission-denied size
    /// probe on FTP-style servers).
    Directory,
    /// A plain file with its byte size and fingerprint.
    File { size: u64, fingerprint: F },
}

/// Known state of one remote directory: leaf name to entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot<F = Fingerprint> {
    entries: BTreeMap<String, RemoteEntry<F>>,
}

/// Snapshot as produced by a live query or mutated during a run.
pub type LiveSnapshot = RemoteSnapshot<Fingerprint>;

/// Snapshot with every fingerprint resolved, safe to persist.
pub type ResolvedSnapshot = RemoteSnapshot<ResolvedFingerprint>;

impl<F> RemoteSnapshot<F> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Look up an entry by leaf name.
    pub fn get(&self, leaf: &str) -> Option<&RemoteEntry<F>> {
        self.entries.get(leaf)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, leaf: impl Into<String>, entry: RemoteEntry<F>) {
        self.entries.insert(leaf.into(), entry);
    }

    /// Leaf names present in the snapshot, sorted.
    pub fn leaf_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(leaf, entry)` pairs, sorted by leaf.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemoteEntry<F>)> {
        self.entries.iter().map(|(leaf, entry)| (leaf.as_str(), entry))
    }

    /// Consume the snapshot, yielding its entry map.
    pub fn into_entries(self) -> BTreeMap<String, RemoteEntry<F>> {
        self.entries
    }

    /// Build a snapshot from an entry map.
    pub fn from_entries(entries: BTreeMap<String, RemoteEntry<F>>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Default for RemoteSnapshot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ResolvedSnapshot> for LiveSnapshot {
    fn from(resolved: ResolvedSnapshot) -> Self {
        let entries = resolved
            .into_entries()
            .into_iter()
            .map(|(leaf, entry)| {
                let entry = match entry {
                    RemoteEntry::Directory => RemoteEntry::Directory,
                    RemoteEntry::File { size, fingerprint } => RemoteEntry::File {
                        size,
                        fingerprint: fingerprint.into(),
                    },
                };
                (leaf, entry)
            })
            .collect();
        Self::from_entries(entries)
    }
}

impl TryFrom<LiveSnapshot> for ResolvedSnapshot {
    type Error = UnresolvedEntry;

    fn try_from(live: LiveSnapshot) -> Result<Self, Self::Error> {
        let mut entries = BTreeMap::new();
        for (leaf, entry) in live.into_entries() {
            let entry = match entry {
                RemoteEntry::Directory => RemoteEntry::Directory,
                RemoteEntry::File { size, fingerprint } => {
                    let fingerprint = match fingerprint {
                        Fingerprint::Unknown => ResolvedFingerprint::Unknown,
                        Fingerprint::Digest(digest) => ResolvedFingerprint::Digest(digest),
                        Fingerprint::AssumedCorrect => {
                            debug_assert!(false, "unresolved fingerprint for {leaf:?}");
                            return Err(UnresolvedEntry { leaf });
                        }
                    };
                    RemoteEntry::File { size, fingerprint }
                }
            };
            entries.insert(leaf, entry);
        }
        Ok(Self::from_entries(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut snapshot = LiveSnapshot::new();
        assert!(snapshot.is_empty());

        snapshot.insert(
            "index.html",
            RemoteEntry::File {
                size: 500,
                fingerprint: Fingerprint::AssumedCorrect,
            },
        );
        snapshot.insert("img", RemoteEntry::Directory);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("img"), Some(&RemoteEntry::Directory));
        assert_eq!(snapshot.get("missing.txt"), None);
        assert_eq!(
            snapshot.leaf_names().collect::<Vec<_>>(),
            vec!["img", "index.html"]
        );
    }

    #[test]
    fn resolved_snapshot_converts_to_live_and_back() {
        let mut resolved = ResolvedSnapshot::new();
        resolved.insert(
            "a.txt",
            RemoteEntry::File {
                size: 10,
                fingerprint: ResolvedFingerprint::Digest("abc123".into()),
            },
        );
        resolved.insert(
            "b.txt",
            RemoteEntry::File {
                size: 20,
                fingerprint: ResolvedFingerprint::Unknown,
            },
        );
        resolved.insert("sub", RemoteEntry::Directory);

        let live: LiveSnapshot = resolved.clone().into();
        let back: ResolvedSnapshot = live.try_into().unwrap();
        assert_eq!(back, resolved);
    }

    #[test]
    fn assumed_correct_cannot_become_resolved() {
        let mut live = LiveSnapshot::new();
        live.insert(
            "a.txt",
            RemoteEntry::File {
                size: 10,
                fingerprint: Fingerprint::AssumedCorrect,
            },
        );

        let result = std::panic::catch_unwind(|| ResolvedSnapshot::try_from(live));
        match result {
            // Debug builds assert; release builds surface the error.
            Err(_) => {}
            Ok(converted) => {
                let err = converted.unwrap_err();
                assert_eq!(err.leaf, "a.txt");
            }
        }
    }
}
