//! Transport abstraction over an FTP-like remote target

use std::io::Read;

/// Errors surfaced by a transport backend.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server refused the operation. For a size probe this doubles as
    /// the "entry is a directory" signal on FTP-style servers.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The remote entry does not exist.
    #[error("no such remote entry: {0}")]
    NotFound(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other protocol-level failure.
    #[error("{0}")]
    Protocol(String),
}

/// Transport result type.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Narrow interface over a remote file store.
///
/// Any protocol that can list a directory, report a file's size, and store
/// bytes satisfies this shape; the publisher is otherwise protocol-agnostic.
/// Implementations hold a single session whose working directory the
/// publisher drives; nothing here is safe for concurrent use.
pub trait Transport {
    /// Change the remote working directory. `path` uses forward slashes and
    /// may be absolute or relative to the current directory.
    fn change_dir(&mut self, path: &str) -> Result<()>;

    /// Current remote working directory, forward-slash form, leading `/`.
    fn current_dir(&self) -> Result<String>;

    /// Leaf names in the current remote directory.
    fn list_names(&mut self) -> Result<Vec<String>>;

    /// Size in bytes of a leaf in the current directory.
    ///
    /// FTP-style servers answer a size probe on a directory with a
    /// permission error; callers rely on that as the directory signal.
    fn file_size(&mut self, leaf: &str) -> Result<u64>;

    /// Create a subdirectory of the current directory.
    fn make_dir(&mut self, leaf: &str) -> Result<()>;

    /// Store bytes under the given leaf in the current directory,
    /// overwriting any existing file.
    fn store(&mut self, leaf: &str, data: &mut dyn Read) -> Result<()>;
}
