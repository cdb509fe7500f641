//! # snelex-guard — Transition Guard
//!
//! Decides whether a document may move from one lifecycle state to
//! another. The guard only reads; committing the transition and applying
//! its effects is the host's job.
//!
//! ## Rule Families
//!
//! Evaluated in this order, with every violation collected:
//!
//! 1. Mandatory fields.
//! 2. At-least-one-of groups.
//! 3. Conditional-mandatory fields.
//! 4. Upstream state of referenced documents.
//!
//! An upstream reference that cannot be resolved yields a single
//! `unresolvable_reference` violation and stops the remaining upstream
//! rules; earlier families are still reported.

pub mod error;
pub mod guard;

pub use error::GuardError;
pub use guard::TransitionGuard;
