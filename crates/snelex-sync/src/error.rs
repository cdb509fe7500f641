//! Synchronization errors.

use snelex_core::{DocType, LifecycleError, LookupError};
use thiserror::Error;

/// Errors raised by the synchronization engine.
///
/// Same-value rejections are not errors; they are reported as violations
/// in the [`SyncOutcome`](crate::SyncOutcome).
#[derive(Error, Debug)]
pub enum SyncError {
    /// A rule's lookup failed; nothing from this call was applied.
    #[error("rule '{rule}' could not complete its lookup: {source}")]
    Lookup {
        /// Rule whose lookup failed.
        rule: String,
        /// Collaborator failure.
        source: LookupError,
    },

    /// The document is not editable.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A rule was requested by a name the form does not define.
    #[error("{doc_type} has no field rule named '{name}'")]
    UnknownRule {
        /// Document type searched.
        doc_type: DocType,
        /// Requested rule name.
        name: String,
    },
}
