//! sitesync-engine: publishing orchestration
//!
//! Drives the recursive tree walk, learns remote state through a live or
//! cached snapshot source, and performs uploads through a transport.

pub mod publisher;
pub mod source;

pub use publisher::{Publisher, SyncOptions, SyncReport};
pub use source::SnapshotSource;
