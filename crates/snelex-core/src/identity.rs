//! # Document Identifiers
//!
//! Records are named by the host framework ("CN-00001",
//! "new-job-card-1"). The newtype keeps names from being confused with
//! ordinary field text in function signatures.

use serde::{Deserialize, Serialize};

/// Name of a stored (or not yet stored) document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Wrap a document name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Access the inner name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
