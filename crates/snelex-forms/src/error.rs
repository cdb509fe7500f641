//! Form host errors.

use snelex_core::{DocType, LifecycleError, LookupError, Violations};
use snelex_guard::GuardError;
use snelex_sync::SyncError;
use thiserror::Error;

/// Errors raised by the form host.
#[derive(Error, Debug)]
pub enum FormError {
    /// Field synchronization failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The transition guard refused the transition.
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// An action was refused with user-correctable messages.
    #[error("action rejected: {0}")]
    Rejected(Violations),

    /// The rule book has nothing configured for the requested action.
    #[error("{doc_type} has no {what} configured")]
    NotConfigured {
        /// Document type of the form.
        doc_type: DocType,
        /// What was looked for.
        what: String,
    },
}

impl FormError {
    /// User-facing violations, from either the guard or an action.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Guard(err) => err.violations(),
            Self::Rejected(violations) => Some(violations),
            _ => None,
        }
    }
}
