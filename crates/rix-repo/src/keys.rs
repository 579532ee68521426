//! Key layout.
//!
//! ```text
//! <ns>:<id>                  primary blob of one reading
//! <ns>                       membership index (every stored key, score 0)
//! <ns>:created               creation-time index (score = created)
//! <ns>:device:name:<owner>   per-device index (score = created)
//! ```

/// Default namespace for reading keys.
pub const DEFAULT_NAMESPACE: &str = "reading";

const CREATED_SEGMENT: &str = "created";
const OWNER_SEGMENT: &str = "device:name";

/// Maps reading ids and owner names onto store keys. Pure and total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Primary key of the blob for reading `id`.
    pub fn stored_key(&self, id: &str) -> String {
        format!("{}:{id}", self.namespace)
    }

    /// Sorted set holding every stored key.
    pub fn membership_index(&self) -> String {
        self.namespace.clone()
    }

    /// Sorted set of stored keys scored by creation time.
    pub fn created_index(&self) -> String {
        format!("{}:{CREATED_SEGMENT}", self.namespace)
    }

    /// Sorted set of one owner's stored keys scored by creation time.
    pub fn owner_index(&self, owner: &str) -> String {
        format!("{}:{OWNER_SEGMENT}:{owner}", self.namespace)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
