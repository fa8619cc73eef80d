//! Upload/skip decision logic

use crate::local::LocalFile;
use crate::policy::Submit;
use crate::snapshot::{Fingerprint, LiveSnapshot, RemoteEntry};

/// Decide whether `local` must be stored on the remote side.
///
/// Evaluation order, first match wins:
/// 1. `ALL_FILES` policies always store.
/// 2. `CHANGED_TODAY` stores files whose mtime is at or past `cutoff`.
/// 3. `MISSING_OR_CHANGED` stores files that are absent remotely or stored
///    with a different size. On a size match, an `AssumedCorrect` remote
///    fingerprint is trusted (skip without hashing), an `Unknown` one forces
///    a store, and a concrete digest is compared against the local
///    fingerprint; a local file that cannot be hashed counts as different.
/// 4. Otherwise skip.
///
/// `cutoff` is the start of the current calendar day, computed once per
/// session by the caller so every decision in a run shares one boundary.
pub fn should_store(
    snapshot: &LiveSnapshot,
    policy: Submit,
    local: &LocalFile,
    cutoff: i64,
) -> bool {
    if policy.contains(Submit::ALL_FILES) {
        return true;
    }

    if policy.contains(Submit::CHANGED_TODAY) && local.mtime() >= cutoff {
        return true;
    }

    if policy.contains(Submit::MISSING_OR_CHANGED) {
        return match snapshot.get(local.leaf()) {
            Some(RemoteEntry::File { size, fingerprint }) if *size == local.size() => {
                // Sizes match; the fingerprint settles it. A directory
                // entry cannot take this branch: it has no size to match.
                match fingerprint {
                    Fingerprint::AssumedCorrect => false,
                    Fingerprint::Unknown => true,
                    Fingerprint::Digest(remote) => {
                        local.fingerprint() != Some(remote.as_str())
                    }
                }
            }
            // Missing remotely, a size mismatch, or a directory standing
            // where a file should be.
            _ => true,
        };
    }

    false
}
