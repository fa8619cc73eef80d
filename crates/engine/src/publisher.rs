//! Recursive tree walk that drives decisions and uploads

use crate::source::SnapshotSource;
use anyhow::{Context, Result};
use chrono::Local;
use sitesync_core::{
    fingerprint_file, should_store, Fingerprint, LiveSnapshot, LocalFile, RemoteEntry, Submit,
    Transport,
};
use std::path::{Path, PathBuf};

/// Per-call options for [`Publisher::sync_dir`].
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only publish files ending with one of these extensions (e.g. ".png").
    pub extensions: Option<Vec<String>>,
    /// Remote directory to publish into; defaults to the local directory
    /// path. Assumed to be a subdirectory of the current remote directory.
    pub remote_name: Option<String>,
    /// Override the session policy for this call (and its recursion).
    pub submit: Option<Submit>,
    /// Descend into non-hidden subdirectories.
    pub recurse: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Local paths that were uploaded.
    pub uploaded: Vec<PathBuf>,
    /// Files inspected and left alone.
    pub skipped: usize,
}

impl SyncReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: SyncReport) {
        self.uploaded.extend(other.uploaded);
        self.skipped += other.skipped;
    }
}

/// Drives the publish: walks the local tree, asks the snapshot source what
/// the remote side looks like, decides per file, and uploads.
///
/// Owns the transport session for the whole run; everything is synchronous
/// and single-threaded because FTP-style sessions cannot be shared.
pub struct Publisher<'a, T: Transport> {
    transport: T,
    source: SnapshotSource<'a>,
    submit: Submit,
    verbose: bool,
    cutoff: i64,
}

impl<'a, T: Transport> Publisher<'a, T> {
    /// Start a session: change into `init_dir` and fix the "changed today"
    /// cutoff at the current day's local midnight, so a run that crosses
    /// midnight keeps a single boundary.
    pub fn new(
        mut transport: T,
        init_dir: &str,
        submit: Submit,
        verbose: bool,
        source: SnapshotSource<'a>,
    ) -> Result<Self> {
        transport
            .change_dir(init_dir)
            .with_context(|| format!("failed to change to remote directory {init_dir}"))?;
        Ok(Self {
            transport,
            source,
            submit,
            verbose,
            cutoff: midnight_cutoff(),
        })
    }

    /// Midnight cutoff used for `CHANGED_TODAY` decisions, unix seconds.
    pub fn cutoff(&self) -> i64 {
        self.cutoff
    }

    /// Give the transport back when the session is over.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Synchronise one local directory (and optionally its subtree) with
    /// the corresponding remote directory.
    pub fn sync_dir(&mut self, local_dir: &Path, opts: &SyncOptions) -> Result<SyncReport> {
        let submit = opts.submit.unwrap_or(self.submit);
        let remote_name = opts
            .remote_name
            .clone()
            .unwrap_or_else(|| local_dir.to_string_lossy().replace('\\', "/"));

        let old_cwd = if remote_name.is_empty() {
            None
        } else {
            let old = self.transport.current_dir()?;
            if remote_name != "."
                && !self
                    .transport
                    .list_names()
                    .with_context(|| format!("failed to list remote directory {old}"))?
                    .contains(&remote_name)
            {
                tracing::info!(cwd = %old, dir = %remote_name, "creating remote directory");
                self.transport
                    .make_dir(&remote_name)
                    .with_context(|| format!("failed to create remote directory {remote_name}"))?;
            }
            self.transport
                .change_dir(&remote_name)
                .with_context(|| format!("failed to change to remote directory {remote_name}"))?;
            Some(old)
        };

        let (mut files, mut subdirs) = list_local(local_dir)?;
        if let Some(extensions) = &opts.extensions {
            files.retain(|leaf| extensions.iter().any(|ext| leaf.ends_with(ext.as_str())));
        }
        files.sort();
        subdirs.sort();

        let remote_dir = self.transport.current_dir()?;
        let mut snapshot = self
            .source
            .contents(&mut self.transport, &remote_dir, local_dir)?;

        if self.verbose {
            tracing::info!(dir = %local_dir.display(), files = ?files, "processing directory");
        }

        let mut report = SyncReport::default();
        for leaf in &files {
            let local = LocalFile::from_path(local_dir, leaf)
                .with_context(|| format!("failed to stat {}", local_dir.join(leaf).display()))?;
            if should_store(&snapshot, submit, &local, self.cutoff) {
                self.upload(&local, &mut snapshot)?;
                report.uploaded.push(local.path().to_path_buf());
            } else {
                report.skipped += 1;
            }
        }

        self.source.commit(&remote_dir, snapshot)?;

        if opts.recurse {
            for sub in &subdirs {
                if sub.starts_with('.') {
                    tracing::debug!(dir = %sub, "skipping hidden subdirectory");
                    continue;
                }
                let child_opts = SyncOptions {
                    extensions: opts.extensions.clone(),
                    remote_name: Some(sub.clone()),
                    submit: Some(submit),
                    recurse: true,
                };
                let child = self.sync_dir(&local_dir.join(sub), &child_opts)?;
                report.merge(child);
            }
        }

        if let Some(old) = old_cwd {
            self.transport
                .change_dir(&old)
                .with_context(|| format!("failed to return to remote directory {old}"))?;
        }

        Ok(report)
    }

    /// Upload one file and refresh its in-memory snapshot entry so the rest
    /// of the run sees the new state.
    ///
    /// The remote side may change between the decision and this write-back;
    /// that window is an accepted limitation of the design, not something
    /// this code defends against.
    fn upload(&mut self, local: &LocalFile, snapshot: &mut LiveSnapshot) -> Result<()> {
        tracing::info!(file = %local.path().display(), "uploading");

        let mut reader = std::fs::File::open(local.path())
            .with_context(|| format!("failed to open {}", local.path().display()))?;
        self.transport
            .store(local.leaf(), &mut reader)
            .with_context(|| format!("failed to store {}", local.leaf()))?;

        let size = std::fs::metadata(local.path())
            .with_context(|| format!("failed to stat {}", local.path().display()))?
            .len();
        let fingerprint = match fingerprint_file(local.path()) {
            Some(digest) => Fingerprint::Digest(digest),
            None => Fingerprint::Unknown,
        };
        snapshot.insert(
            local.leaf(),
            RemoteEntry::File { size, fingerprint },
        );
        Ok(())
    }
}

/// Split a local directory listing into file and subdirectory leaf names.
fn list_local(local_dir: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    let entries = std::fs::read_dir(local_dir)
        .with_context(|| format!("failed to read local directory {}", local_dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read local directory {}", local_dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;
        if file_type.is_file() {
            files.push(name);
        } else if file_type.is_dir() {
            subdirs.push(name);
        }
    }
    Ok((files, subdirs))
}

/// Start of the current calendar day at local midnight, unix seconds.
fn midnight_cutoff() -> i64 {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map_or(0, |midnight| midnight.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_is_at_most_now_and_within_a_day() {
        let cutoff = midnight_cutoff();
        let now = Local::now().timestamp();
        assert!(cutoff <= now);
        assert!(now - cutoff < 86_400 + 3_600); // slack for DST days
    }
}
