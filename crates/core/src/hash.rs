//! Path-seeded MD5 fingerprints for change detection

use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

/// Compute the content fingerprint of a local file.
///
/// The digest is seeded with the path string before the file content, so two
/// files with identical bytes at different paths fingerprint differently.
/// The seeding is a compatibility invariant: every digest in a persisted
/// snapshot cache was computed as `md5(path_bytes || content)`, and changing
/// the scheme would silently invalidate all existing cache files.
///
/// Returns `None` when the file cannot be read (missing, permission denied).
/// Callers must treat an absent fingerprint as "different from anything",
/// never as an error.
pub fn fingerprint_file(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    fingerprint_seeded(&path.to_string_lossy(), file).ok()
}

/// Digest `seed` followed by everything `reader` yields, hex-encoded.
pub fn fingerprint_seeded<R: Read>(seed: &str, mut reader: R) -> std::io::Result<String> {
    let mut hasher = Md5::new();
    hasher.update(seed.as_bytes());

    let mut buf = [0u8; 16 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
