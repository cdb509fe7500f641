//! # Document Lifecycle
//!
//! Every form document follows the same three-state lifecycle:
//!
//! ```text
//! Draft ──▶ Submitted ──▶ Cancelled (terminal)
//! ```
//!
//! Only a Draft is editable. A Submitted document may only be cancelled;
//! fields written by post-transition effects are applied as part of the
//! transition itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::temporal::Timestamp;

// ─── Document Status ─────────────────────────────────────────────────

/// The lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocStatus {
    /// Being edited; not yet committed.
    #[default]
    Draft,
    /// Committed; immutable except for cancellation.
    Submitted,
    /// Withdrawn after submission (terminal).
    Cancelled,
}

impl DocStatus {
    /// The host framework's numeric `docstatus` (0, 1, 2).
    pub fn code(&self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Submitted => 1,
            Self::Cancelled => 2,
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether fields may be edited in this state.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    pub fn can_transition_to(&self, to: DocStatus) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Submitted) | (Self::Submitted, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for DocStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by lifecycle misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The lifecycle has no edge between these states.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: DocStatus,
        /// Attempted target state.
        to: DocStatus,
    },

    /// The caller's view of the current state is stale.
    #[error("document {name} is {actual}, not {expected}")]
    StateMismatch {
        /// Document name.
        name: String,
        /// State the caller expected.
        expected: DocStatus,
        /// State the document is actually in.
        actual: DocStatus,
    },

    /// Field edit attempted on a non-draft document.
    #[error("document {name} is {state} and cannot be edited")]
    NotEditable {
        /// Document name.
        name: String,
        /// Current state.
        state: DocStatus,
    },
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a committed lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from_state: DocStatus,
    /// State after the transition.
    pub to_state: DocStatus,
    /// When the transition was committed.
    pub timestamp: Timestamp,
    /// Reason supplied by the caller.
    pub reason: String,
}
