//! In-memory collaborators.
//!
//! Back the CLI replay and the test suites. Both types are cheaply
//! cloneable via `Arc`; all clones share the same data. Each can be put
//! offline to exercise the collaborator-failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::doctype::DocType;
use crate::document::{Document, FieldValue};
use crate::error::LookupError;
use crate::identity::DocumentId;
use crate::lookup::{
    DocumentFactory, DocumentStore, EntityDirectory, EntityKind, EntitySnapshot, Filter,
};

// ─── Directory ───────────────────────────────────────────────────────

/// A directory record as written in fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Party kind.
    pub kind: EntityKind,
    /// Party id.
    pub id: String,
    /// Resolved details.
    #[serde(flatten)]
    pub snapshot: EntitySnapshot,
}

#[derive(Default)]
struct DirectoryInner {
    entries: RwLock<HashMap<(EntityKind, String), EntitySnapshot>>,
    offline: AtomicBool,
}

/// Entity directory held in memory.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<DirectoryInner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from fixture entries.
    pub fn from_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let directory = Self::new();
        for entry in entries {
            directory.insert(entry.kind, &entry.id, entry.snapshot);
        }
        directory
    }

    /// Add or replace a party.
    pub fn insert(&self, kind: EntityKind, id: &str, snapshot: EntitySnapshot) {
        self.inner
            .entries
            .write()
            .insert((kind, id.to_string()), snapshot);
    }

    /// Simulate an unreachable directory.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InMemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDirectory")
            .field("entries", &self.inner.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl EntityDirectory for InMemoryDirectory {
    fn resolve_entity(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<EntitySnapshot>, LookupError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(LookupError::unavailable("entity directory", "offline"));
        }
        Ok(self
            .inner
            .entries
            .read()
            .get(&(kind, id.to_string()))
            .cloned())
    }
}

// ─── Store ───────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreInner {
    documents: RwLock<BTreeMap<(DocType, DocumentId), Document>>,
    series: RwLock<HashMap<DocType, u32>>,
    offline: AtomicBool,
}

/// Document store and factory held in memory.
///
/// New records are named from a per-type naming series (`JC-00001`, ...).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from fixture documents.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for doc in documents {
            store.insert(doc);
        }
        store
    }

    /// Add or replace a document.
    pub fn insert(&self, doc: Document) {
        self.inner
            .documents
            .write()
            .insert((doc.doc_type, doc.name.clone()), doc);
    }

    /// Direct read, bypassing the offline switch.
    pub fn snapshot(&self, doc_type: DocType, id: &DocumentId) -> Option<Document> {
        self.inner
            .documents
            .read()
            .get(&(doc_type, id.clone()))
            .cloned()
    }

    /// Number of stored documents of `doc_type`.
    pub fn count(&self, doc_type: DocType) -> usize {
        self.inner
            .documents
            .read()
            .keys()
            .filter(|(t, _)| *t == doc_type)
            .count()
    }

    /// Simulate an unreachable store.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), LookupError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(LookupError::unavailable("document store", "offline"));
        }
        Ok(())
    }

    fn next_name(&self, doc_type: DocType) -> DocumentId {
        let mut series = self.inner.series.write();
        let documents = self.inner.documents.read();
        let counter = series.entry(doc_type).or_insert(0);
        loop {
            *counter += 1;
            let name = DocumentId(format!("{}-{:05}", doc_type.naming_prefix(), counter));
            if !documents.contains_key(&(doc_type, name.clone())) {
                return name;
            }
        }
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("documents", &self.inner.documents.read().len())
            .finish_non_exhaustive()
    }
}

impl DocumentStore for InMemoryStore {
    fn get_document(
        &self,
        doc_type: DocType,
        id: &DocumentId,
    ) -> Result<Option<Document>, LookupError> {
        self.ensure_online()?;
        Ok(self.snapshot(doc_type, id))
    }

    fn get_document_field(
        &self,
        doc_type: DocType,
        filters: &[Filter],
        field: &str,
    ) -> Result<Option<FieldValue>, LookupError> {
        let first = self.list_documents(doc_type, filters)?.into_iter().next();
        Ok(first.and_then(|doc| match field {
            "name" => Some(FieldValue::from(&doc.name)),
            "docstatus" => Some(FieldValue::from(i32::from(doc.status.code()))),
            other => doc.get(other).cloned(),
        }))
    }

    fn list_documents(
        &self,
        doc_type: DocType,
        filters: &[Filter],
    ) -> Result<Vec<Document>, LookupError> {
        self.ensure_online()?;
        Ok(self
            .inner
            .documents
            .read()
            .iter()
            .filter(|((t, _), doc)| *t == doc_type && filters.iter().all(|f| f.matches(doc)))
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

impl DocumentFactory for InMemoryStore {
    fn create_document(&self, mut draft: Document) -> Result<DocumentId, LookupError> {
        self.ensure_online()?;
        let name = self.next_name(draft.doc_type);
        draft.name = name.clone();
        tracing::debug!(doc_type = %draft.doc_type, name = %name, "stored document");
        self.insert(draft);
        Ok(name)
    }

    fn create_linked_document(
        &self,
        source_type: DocType,
        source_id: &DocumentId,
        mut draft: Document,
    ) -> Result<DocumentId, LookupError> {
        self.ensure_online()?;
        if self.snapshot(source_type, source_id).is_none() {
            return Err(LookupError::CreationRejected {
                reason: format!("{source_type} {source_id} does not exist"),
            });
        }
        let name = self.next_name(draft.doc_type);
        draft.name = name.clone();
        tracing::debug!(doc_type = %draft.doc_type, name = %name, source = %source_id, "stored linked document");
        self.insert(draft);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DocStatus;

    fn make_store() -> InMemoryStore {
        InMemoryStore::from_documents([
            Document::new(DocType::ConsignmentNote, "CN-00001")
                .with("consignment_to", "Port B")
                .with_status(DocStatus::Submitted),
            Document::new(DocType::ConsignmentNote, "CN-00002").with("consignment_to", "Port C"),
            Document::new(DocType::Customer, "CUST-00001").with("supplier", "SUP-1"),
        ])
    }

    #[test]
    fn test_directory_resolves_and_misses() {
        let directory = InMemoryDirectory::from_entries([DirectoryEntry {
            kind: EntityKind::Customer,
            id: "Globex".into(),
            snapshot: EntitySnapshot {
                display_name: "Globex Corp".into(),
                ..Default::default()
            },
        }]);
        let hit = directory.resolve_entity(EntityKind::Customer, "Globex").unwrap();
        assert_eq!(hit.unwrap().display_name, "Globex Corp");
        let miss = directory.resolve_entity(EntityKind::Supplier, "Globex").unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_directory_offline() {
        let directory = InMemoryDirectory::new();
        directory.set_offline(true);
        assert!(directory.resolve_entity(EntityKind::Customer, "x").is_err());
    }

    #[test]
    fn test_get_document_field_by_filter() {
        let store = make_store();
        let name = store
            .get_document_field(DocType::Customer, &[Filter::equals("supplier", "SUP-1")], "name")
            .unwrap();
        assert_eq!(name, Some(FieldValue::from("CUST-00001")));
        let none = store
            .get_document_field(DocType::Customer, &[Filter::equals("supplier", "SUP-2")], "name")
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_list_documents_filters() {
        let store = make_store();
        let submitted = store
            .list_documents(DocType::ConsignmentNote, &[Filter::equals("docstatus", 1)])
            .unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].name.as_str(), "CN-00001");
    }

    #[test]
    fn test_create_linked_document_assigns_series_name() {
        let store = make_store();
        let draft = Document::new(DocType::JobCard, "new-job-card-1");
        let name = store
            .create_linked_document(DocType::ConsignmentNote, &"CN-00001".into(), draft)
            .unwrap();
        assert_eq!(name.as_str(), "JC-00001");
        assert_eq!(store.count(DocType::JobCard), 1);
    }

    #[test]
    fn test_create_linked_document_requires_source() {
        let store = make_store();
        let draft = Document::new(DocType::JobCard, "new-job-card-1");
        let err = store
            .create_linked_document(DocType::ConsignmentNote, &"CN-99999".into(), draft)
            .unwrap_err();
        assert!(matches!(err, LookupError::CreationRejected { .. }));
    }

    #[test]
    fn test_create_document_assigns_series_name() {
        let store = make_store();
        let draft = Document::new(DocType::Customer, "new-CUST").with("customer_name", "SHP-1");
        let name = store.create_document(draft).unwrap();
        assert_eq!(name.as_str(), "CUST-00002");
        let stored = store.snapshot(DocType::Customer, &name).unwrap();
        assert_eq!(stored.text("customer_name"), "SHP-1");

        store.set_offline(true);
        let err = store
            .create_document(Document::new(DocType::Customer, "new-CUST"))
            .unwrap_err();
        assert!(matches!(err, LookupError::Unavailable { .. }));
    }

    #[test]
    fn test_store_offline() {
        let store = make_store();
        store.set_offline(true);
        assert!(store
            .get_document(DocType::ConsignmentNote, &"CN-00001".into())
            .is_err());
    }
}
