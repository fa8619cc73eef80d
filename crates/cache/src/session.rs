//! Scoped cache session that saves on exit

use crate::cache::{CacheError, SnapshotCache};

/// Owns a `SnapshotCache` for the duration of a publishing run.
///
/// Dropping the session saves the cache best-effort (a failure is logged,
/// not propagated, since `Drop` cannot return one); call [`close`] on the
/// happy path to surface save errors. Either way, every exit path from the
/// owning scope writes the cache back.
///
/// [`close`]: CacheSession::close
pub struct CacheSession {
    cache: Option<SnapshotCache>,
}

impl CacheSession {
    /// Open the cache file at `path` and scope it to this session.
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, CacheError> {
        Ok(Self {
            cache: Some(SnapshotCache::open(path)?),
        })
    }

    /// Shared access to the cache.
    pub fn cache(&self) -> &SnapshotCache {
        // The Option is only vacated by close/drop, which consume the session.
        self.cache.as_ref().expect("cache session already closed")
    }

    /// Mutable access to the cache.
    pub fn cache_mut(&mut self) -> &mut SnapshotCache {
        self.cache.as_mut().expect("cache session already closed")
    }

    /// Save and consume the session, propagating any save error.
    pub fn close(mut self) -> Result<(), CacheError> {
        match self.cache.take() {
            Some(cache) => cache.save(),
            None => Ok(()),
        }
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.take() {
            if let Err(err) = cache.save() {
                tracing::error!(error = %err, "failed to save snapshot cache on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesync_core::{RemoteEntry, ResolvedFingerprint, ResolvedSnapshot};

    fn sample_snapshot() -> ResolvedSnapshot {
        let mut snapshot = ResolvedSnapshot::new();
        snapshot.insert(
            "x.txt",
            RemoteEntry::File {
                size: 10,
                fingerprint: ResolvedFingerprint::Digest("abc123".into()),
            },
        );
        snapshot
    }

    #[test]
    fn close_saves_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut session = CacheSession::open(&path).unwrap();
        session.cache_mut().insert("a/b", sample_snapshot());
        session.close().unwrap();

        let reloaded = SnapshotCache::open(&path).unwrap();
        assert_eq!(reloaded.get("a/b"), Some(&sample_snapshot()));
    }

    #[test]
    fn drop_saves_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let mut session = CacheSession::open(&path).unwrap();
            session.cache_mut().insert("a/b", sample_snapshot());
            // No close: the guard saves on the way out.
        }

        let reloaded = SnapshotCache::open(&path).unwrap();
        assert_eq!(reloaded.get("a/b"), Some(&sample_snapshot()));
    }
}
