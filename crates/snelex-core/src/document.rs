//! # Documents and Field Values
//!
//! A [`Document`] is a named, typed bag of field values plus child tables,
//! a set of dynamically required fields, and its lifecycle state.
//!
//! ## Canonical Storage
//!
//! Setting a field to an empty text value removes the field. Readers never
//! have to distinguish "absent" from "empty", and two documents that show
//! the same data compare equal.
//!
//! References to other records are stored as text holding the target's
//! name; which fields are references is declared by the rule book.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::doctype::DocType;
use crate::identity::DocumentId;
use crate::lifecycle::{DocStatus, LifecycleError, TransitionRecord};
use crate::temporal::Timestamp;

// ─── Field Value ─────────────────────────────────────────────────────

/// The value of a single document field.
///
/// Deserialization is untagged and tries number, then ISO date, then text,
/// so `3`, `"2025-01-02"` and `"Warehouse A"` map to the obvious variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric quantity or measure.
    Number(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Free text, select option, or a reference to another record.
    Text(String),
}

impl FieldValue {
    /// Empty text.
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Whether the value is empty text.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Whether the value counts as "filled in" for presence checks:
    /// non-empty text, a non-zero number, or any date.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::Date(_) => true,
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// The text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric content. Text that parses as a number is accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Date(_) => None,
        }
    }

    /// The date content. Text holding an ISO date is accepted.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            Self::Number(_) => None,
        }
    }

    /// Loose equality used by store filters: equal values, or values that
    /// render to the same text (`Date(2025-01-02)` and `"2025-01-02"`).
    pub fn same_as(&self, other: &FieldValue) -> bool {
        self == other || self.to_string() == other.to_string()
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<&DocumentId> for FieldValue {
    fn from(id: &DocumentId) -> Self {
        Self::Text(id.as_str().to_string())
    }
}

/// One row of a child table.
pub type Row = BTreeMap<String, FieldValue>;

// ─── Document ────────────────────────────────────────────────────────

/// A form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Record name.
    pub name: DocumentId,
    /// Record type.
    pub doc_type: DocType,
    /// Lifecycle state.
    #[serde(default)]
    pub status: DocStatus,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tables: BTreeMap<String, Vec<Row>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    required: BTreeSet<String>,
    /// Ordered log of committed transitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionRecord>,
}

impl Document {
    /// A new draft document with no fields.
    pub fn new(doc_type: DocType, name: impl Into<DocumentId>) -> Self {
        Self {
            name: name.into(),
            doc_type,
            status: DocStatus::Draft,
            fields: BTreeMap::new(),
            tables: BTreeMap::new(),
            required: BTreeSet::new(),
            transitions: Vec::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Builder-style status assignment.
    pub fn with_status(mut self, status: DocStatus) -> Self {
        self.status = status;
        self
    }

    /// The raw value of a field, if set.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The text of a field; `""` when absent or not text.
    pub fn text(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(FieldValue::as_text)
            .unwrap_or("")
    }

    /// The numeric value of a field; zero when absent or non-numeric.
    pub fn number(&self, field: &str) -> f64 {
        self.fields
            .get(field)
            .and_then(FieldValue::as_number)
            .unwrap_or(0.0)
    }

    /// Whether the field is absent (empty text is never stored).
    pub fn is_blank(&self, field: &str) -> bool {
        !self.fields.contains_key(field)
    }

    /// Whether the field holds a truthy value (see [`FieldValue::is_truthy`]).
    pub fn is_truthy(&self, field: &str) -> bool {
        self.fields.get(field).is_some_and(FieldValue::is_truthy)
    }

    /// Set a field. Empty text clears it. Returns whether the stored value
    /// changed.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> bool {
        let value = value.into();
        if value.is_blank() {
            return self.clear(field);
        }
        match self.fields.get(field) {
            Some(existing) if *existing == value => false,
            _ => {
                self.fields.insert(field.to_string(), value);
                true
            }
        }
    }

    /// Clear a field. Returns whether it was set.
    pub fn clear(&mut self, field: &str) -> bool {
        self.fields.remove(field).is_some()
    }

    /// Iterate set fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Rows of a child table; empty when the table was never set.
    pub fn table(&self, name: &str) -> &[Row] {
        self.tables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a child table.
    pub fn set_table(&mut self, name: &str, rows: Vec<Row>) {
        if rows.is_empty() {
            self.tables.remove(name);
        } else {
            self.tables.insert(name.to_string(), rows);
        }
    }

    /// Whether the host should currently treat `field` as required.
    pub fn is_required(&self, field: &str) -> bool {
        self.required.contains(field)
    }

    /// Mark or unmark `field` as required. Returns whether the flag changed.
    pub fn set_required(&mut self, field: &str, required: bool) -> bool {
        if required {
            self.required.insert(field.to_string())
        } else {
            self.required.remove(field)
        }
    }

    /// Currently required fields, in name order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    /// Fail unless the document is editable.
    pub fn ensure_editable(&self) -> Result<(), LifecycleError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(LifecycleError::NotEditable {
                name: self.name.to_string(),
                state: self.status,
            })
        }
    }

    /// Commit a lifecycle transition and record it.
    ///
    /// Validation of business rules is the caller's job; this only enforces
    /// the lifecycle graph.
    pub fn transition(
        &mut self,
        to: DocStatus,
        reason: &str,
        at: Timestamp,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.transitions.push(TransitionRecord {
            from_state: self.status,
            to_state: to,
            timestamp: at,
            reason: reason.to_string(),
        });
        self.status = to;
        Ok(())
    }
}
