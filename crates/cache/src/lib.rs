//! sitesync-cache: durable knowledge of remote state across runs
//!
//! A `SnapshotCache` maps remote directory paths to fully resolved
//! snapshots and round-trips through a JSON file. `CacheSession` scopes a
//! cache to a publishing run and guarantees a save on exit.

pub mod cache;
pub mod session;

pub use cache::{CacheError, SnapshotCache};
pub use session::CacheSession;
