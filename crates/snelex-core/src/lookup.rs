//! # External Collaborators
//!
//! The form logic never owns storage. It reads party details from an
//! [`EntityDirectory`], reads other records from a [`DocumentStore`], and
//! asks a [`DocumentFactory`] to create new records.
//!
//! ## Contract
//!
//! - "Not found" is `Ok(None)`; callers clear dependent fields.
//! - `Err(LookupError)` means the collaborator could not answer; callers
//!   must leave the document untouched for that operation.
//! - Directory and store calls are read-only.

use serde::{Deserialize, Serialize};

use crate::doctype::DocType;
use crate::document::{Document, FieldValue};
use crate::error::LookupError;
use crate::identity::DocumentId;

// ─── Entity Directory ────────────────────────────────────────────────

/// Kind of party record held by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Supplier acting as shipper.
    Supplier,
    /// Customer (consignee or bill-to party).
    Customer,
    /// Postal address record.
    Address,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Supplier => "Supplier",
            Self::Customer => "Customer",
            Self::Address => "Address",
        };
        f.write_str(s)
    }
}

/// Resolved contact details of a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySnapshot {
    /// Display name.
    pub display_name: String,
    /// Rendered postal address.
    pub address: String,
    /// Phone number.
    pub phone: String,
    /// Fax number.
    pub fax: String,
    /// Email address.
    pub email: String,
}

/// One attribute of an [`EntitySnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotAttr {
    /// [`EntitySnapshot::display_name`].
    DisplayName,
    /// [`EntitySnapshot::address`].
    Address,
    /// [`EntitySnapshot::phone`].
    Phone,
    /// [`EntitySnapshot::fax`].
    Fax,
    /// [`EntitySnapshot::email`].
    Email,
}

impl EntitySnapshot {
    /// Read one attribute.
    pub fn attr(&self, attr: SnapshotAttr) -> &str {
        match attr {
            SnapshotAttr::DisplayName => &self.display_name,
            SnapshotAttr::Address => &self.address,
            SnapshotAttr::Phone => &self.phone,
            SnapshotAttr::Fax => &self.fax,
            SnapshotAttr::Email => &self.email,
        }
    }
}

/// Read-only directory of parties.
pub trait EntityDirectory: Send + Sync {
    /// Resolve a party by kind and id.
    fn resolve_entity(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<EntitySnapshot>, LookupError>;
}

// ─── Document Store ──────────────────────────────────────────────────

/// An equality filter on a stored document.
///
/// The pseudo-fields `name` and `docstatus` match the document's name and
/// numeric lifecycle code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field to compare.
    pub field: String,
    /// Required value.
    pub value: FieldValue,
}

impl Filter {
    /// `field == value`.
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether `doc` satisfies the filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self.field.as_str() {
            "name" => self.value.as_text() == Some(doc.name.as_str()),
            "docstatus" => self.value.as_number() == Some(f64::from(doc.status.code())),
            field => match doc.get(field) {
                Some(value) => value.same_as(&self.value),
                None => self.value.is_blank(),
            },
        }
    }
}

/// Read-only access to stored documents.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by type and name.
    fn get_document(
        &self,
        doc_type: DocType,
        id: &DocumentId,
    ) -> Result<Option<Document>, LookupError>;

    /// Read `field` from the first document of `doc_type` matching every
    /// filter. The pseudo-field `name` returns the document name.
    fn get_document_field(
        &self,
        doc_type: DocType,
        filters: &[Filter],
        field: &str,
    ) -> Result<Option<FieldValue>, LookupError>;

    /// All documents of `doc_type` matching every filter, in name order.
    fn list_documents(
        &self,
        doc_type: DocType,
        filters: &[Filter],
    ) -> Result<Vec<Document>, LookupError>;
}

/// Creates records on behalf of the forms.
pub trait DocumentFactory: Send + Sync {
    /// Store `draft` as a new `draft.doc_type` record and return its
    /// assigned name.
    fn create_document(&self, draft: Document) -> Result<DocumentId, LookupError>;

    /// Store `draft` as a new `draft.doc_type` record derived from
    /// `source_id` and return its assigned name.
    fn create_linked_document(
        &self,
        source_type: DocType,
        source_id: &DocumentId,
        draft: Document,
    ) -> Result<DocumentId, LookupError>;
}
