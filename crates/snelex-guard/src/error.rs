//! Guard errors.

use snelex_core::{LifecycleError, Violations};
use thiserror::Error;

/// Why a transition was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    /// The lifecycle has no such edge, or the document is not in the
    /// stated source state. No rule was evaluated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// One or more rules failed. The document stays in its current state.
    #[error("transition rejected: {0}")]
    Rejected(Violations),
}

impl GuardError {
    /// The violations of a rejected transition.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Rejected(violations) => Some(violations),
            Self::Lifecycle(_) => None,
        }
    }
}
