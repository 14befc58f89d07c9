//! Schema manager configuration: a plain `serde`-derived struct with a
//! `Default` impl and fields a deployment may want to override.

use serde_derive::{Deserialize, Serialize};

/// Initial capacity of the codec's growable blob buffer.
pub const DEFAULT_BUFFER_INITIAL_CAPACITY: usize = 4 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// First tuple element of the persistent key prefix. Defaults to
    /// `"sm/"`; exposed here only so tests can exercise a private
    /// namespace without colliding with each other.
    pub namespace: String,

    /// Hard cap, in bytes, on a single per-schema serialized blob. Zero
    /// means unlimited. Doubling growth starts at
    /// `DEFAULT_BUFFER_INITIAL_CAPACITY`.
    pub blob_cap_bytes: usize,

    /// Whether `start()` should tolerate a store with no keys under the
    /// catalog prefix at all, bootstrapping to generation 0.
    pub allow_empty_bootstrap: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            namespace: "sm/".to_string(),
            blob_cap_bytes: 0,
            allow_empty_bootstrap: true,
        }
    }
}

impl ManagerConfig {
    pub fn with_blob_cap_bytes(mut self, cap: usize) -> Self {
        self.blob_cap_bytes = cap;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}
