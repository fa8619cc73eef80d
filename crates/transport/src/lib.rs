//! sitesync-transport: concrete transport backends
//!
//! Implementations of the core `Transport` trait: a filesystem-backed
//! target for mounted remotes, staging trees, and tests, and an in-memory
//! target for tests and dry runs.

pub mod local;
pub mod memory;

pub use local::LocalTransport;
pub use memory::{CallStats, MemoryTransport};
