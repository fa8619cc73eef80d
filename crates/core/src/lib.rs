//! sitesync-core: change detection primitives for incremental publishing
//!
//! Provides content fingerprinting, the remote snapshot model, submission
//! policy flags, and the upload/skip decision logic.

pub mod decider;
pub mod hash;
pub mod local;
pub mod policy;
pub mod snapshot;
pub mod transport;

pub use decider::should_store;
pub use hash::{fingerprint_file, fingerprint_seeded};
pub use local::LocalFile;
pub use policy::Submit;
pub use snapshot::{
    Fingerprint, LiveSnapshot, RemoteEntry, RemoteSnapshot, ResolvedFingerprint, ResolvedSnapshot,
    UnresolvedEntry,
};
pub use transport::{Transport, TransportError};
