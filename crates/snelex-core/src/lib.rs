//! # snelex-core — Foundational Types for the Freight Forms
//!
//! Defines the document model that every other crate in the workspace
//! operates on, plus the interfaces of the external collaborators the
//! form logic consults. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Canonical field storage.** A [`Document`] never stores an empty
//!    text value: clearing a field removes it. "Absent" and "empty" are one
//!    state, which keeps rule application idempotent and makes document
//!    equality meaningful.
//!
//! 2. **Single `DocType` enum.** Consignment Note, Job Card, Manifest,
//!    Shipper and the directory-backed Customer are one closed set, matched
//!    exhaustively everywhere.
//!
//! 3. **Violations are values.** User-correctable failures are
//!    [`Violation`]s collected into [`Violations`], never Rust errors.
//!    Rust errors are reserved for collaborator failures and lifecycle
//!    misuse.
//!
//! 4. **Read-only lookups.** [`EntityDirectory`] and [`DocumentStore`] take
//!    `&self` and return `Ok(None)` for "not found". Only
//!    [`DocumentFactory`] creates records.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `snelex-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod doctype;
pub mod document;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod lookup;
pub mod memory;
pub mod temporal;
pub mod violation;

pub use doctype::DocType;
pub use document::{Document, FieldValue, Row};
pub use error::LookupError;
pub use identity::DocumentId;
pub use lifecycle::{DocStatus, LifecycleError, TransitionRecord};
pub use lookup::{
    DocumentFactory, DocumentStore, EntityDirectory, EntityKind, EntitySnapshot, Filter,
    SnapshotAttr,
};
pub use memory::{DirectoryEntry, InMemoryDirectory, InMemoryStore};
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
pub use violation::{Violation, ViolationKind, Violations};
