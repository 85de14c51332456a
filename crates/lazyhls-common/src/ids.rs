//! Task identifiers.
//!
//! A [`TaskId`] is derived from the source path by hashing, so the same file
//! always maps to the same identifier and the identifier is safe to embed in
//! URLs. It is never decoded back into a path.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Number of hex characters kept from the path digest.
const ID_LEN: usize = 32;

/// Unique identifier for a streaming task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Derive the identifier for a source path.
    ///
    /// Hashes the raw path bytes, so paths that are not valid UTF-8 still
    /// get distinct identifiers.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.as_os_str().as_encoded_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(ID_LEN);
        Self(hex)
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
