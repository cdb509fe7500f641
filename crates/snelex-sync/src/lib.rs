//! # snelex-sync — Field Synchronization Engine
//!
//! Keeps derived fields consistent with the fields they depend on. The
//! host applies a user edit to the document held by an [`EditSession`] and
//! calls [`SyncEngine::on_field_changed`]; the engine looks up the rules
//! triggered by that field in its dispatch table and applies them in
//! declaration order.
//!
//! ## Guarantees
//!
//! - **Atomic per call.** Rules run against a staged copy of the session.
//!   If any directory or store call fails, the session is left exactly as
//!   it was and the error is returned.
//! - **Idempotent.** Re-running a trigger with the same value leaves the
//!   document unchanged.
//! - **Unknown triggers are no-ops.**
//! - **Not-found is not an error.** A reference that resolves to nothing
//!   clears the fields derived from it.

pub mod engine;
pub mod error;
pub mod session;

pub use engine::{resolve_default, SyncEngine, SyncOutcome};
pub use error::SyncError;
pub use session::{EditSession, RelatedEntityReference};
