//! Persistence layer (key/value preferences).

pub mod kv;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, PrefValue, WriteBatch};

/// Well-known keys.
pub mod keys {
    /// Encoded destination list
    pub const DESTINATIONS: &str = "destinations";
    /// Suffix of an achievement's integer progress key
    pub const PROGRESS_SUFFIX: &str = "_p";
}
