//! # Error Types
//!
//! Errors shared across the workspace. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - A lookup that finds nothing is `Ok(None)`, not an error. `LookupError`
//!   means the collaborator itself could not answer.
//! - Rule failures a user can fix are `Violation`s, not errors.

use thiserror::Error;

/// Failure of an external directory, store, or factory call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The collaborator could not be reached or refused to answer.
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        /// Which collaborator failed (e.g. "entity directory").
        collaborator: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The collaborator refused to create a record.
    #[error("creation rejected: {reason}")]
    CreationRejected {
        /// Human-readable reason.
        reason: String,
    },
}

impl LookupError {
    /// Shorthand for an unavailable collaborator.
    pub fn unavailable(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_display() {
        let err = LookupError::unavailable("entity directory", "connection refused");
        assert_eq!(
            err.to_string(),
            "entity directory unavailable: connection refused"
        );
    }
}
