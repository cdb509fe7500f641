//! # Edit Sessions
//!
//! An [`EditSession`] owns the document being edited and the party
//! snapshots resolved while editing it. Snapshots are keyed by the
//! referencing field, live only as long as the session, and are dropped as
//! soon as the reference is cleared or re-pointed.

use std::collections::HashMap;

use snelex_core::{Document, EntityKind, EntitySnapshot};

/// A resolved party reference held by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedEntityReference {
    /// Directory kind.
    pub kind: EntityKind,
    /// Party id as written in the referencing field.
    pub id: String,
    /// Resolved details.
    pub snapshot: EntitySnapshot,
}

/// One document under edit, with its session-scoped reference cache.
#[derive(Debug, Clone)]
pub struct EditSession {
    doc: Document,
    references: HashMap<String, RelatedEntityReference>,
}

impl EditSession {
    /// Open a session on `doc`.
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            references: HashMap::new(),
        }
    }

    /// The document under edit.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Mutable access for the host (user edits, committed transitions).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Close the session, keeping the document.
    pub fn into_document(self) -> Document {
        self.doc
    }

    /// The reference currently resolved for `field`, if any.
    pub fn reference(&self, field: &str) -> Option<&RelatedEntityReference> {
        self.references.get(field)
    }

    /// A cached snapshot for `field`, only if it was resolved for the same
    /// kind and id.
    pub(crate) fn cached(&self, field: &str, kind: EntityKind, id: &str) -> Option<&EntitySnapshot> {
        self.references
            .get(field)
            .filter(|r| r.kind == kind && r.id == id)
            .map(|r| &r.snapshot)
    }

    pub(crate) fn remember(&mut self, field: &str, reference: RelatedEntityReference) {
        self.references.insert(field.to_string(), reference);
    }

    pub(crate) fn forget(&mut self, field: &str) {
        self.references.remove(field);
    }
}
