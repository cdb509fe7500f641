//! # Transition Rules
//!
//! The rules gating one lifecycle transition of one form, grouped by
//! family. The guard evaluates the families in field order: mandatory,
//! at-least-one-of, conditional, upstream. Effects are applied by the host
//! after the transition is committed.

use serde::{Deserialize, Serialize};
use snelex_core::{DocStatus, DocType, FieldValue};

/// Rules for one `(from, to)` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRules {
    /// State the document must be in.
    pub from: DocStatus,
    /// State requested.
    pub to: DocStatus,
    /// Fields that must be set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory: Vec<MandatoryField>,
    /// Groups of which at least one field must be set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub at_least_one_of: Vec<FieldGroup>,
    /// Fields required by another field's value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional: Vec<ConditionalRule>,
    /// Referenced documents that must be in a given state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstream: Vec<UpstreamRule>,
    /// Field writes applied once the transition is committed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl TransitionRules {
    /// Empty rules for a transition.
    pub fn new(from: DocStatus, to: DocStatus) -> Self {
        Self {
            from,
            to,
            mandatory: Vec::new(),
            at_least_one_of: Vec::new(),
            conditional: Vec::new(),
            upstream: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Whether these rules govern `from -> to`.
    pub fn applies_to(&self, from: DocStatus, to: DocStatus) -> bool {
        self.from == from && self.to == to
    }
}

/// A mandatory field and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandatoryField {
    /// Field name.
    pub field: String,
    /// Label shown to the user.
    pub label: String,
}

/// A group of fields of which at least one must be set (non-zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    /// Member fields.
    pub fields: Vec<String>,
    /// Violation message.
    pub message: String,
}

/// `require` must be set when `when` equals `equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    /// Field inspected.
    pub when: String,
    /// Value that makes `require` mandatory.
    pub equals: FieldValue,
    /// Field that becomes mandatory.
    pub require: String,
    /// Violation message.
    pub message: String,
}

/// The document referenced by `link` must be in `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRule {
    /// Link field holding the referenced document's name.
    pub link: String,
    /// Type of the referenced document.
    pub doc_type: DocType,
    /// Required state of the referenced document.
    pub state: DocStatus,
    /// Violation message.
    pub message: String,
}

/// A field write applied after a committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Field written.
    pub field: String,
    /// Value written.
    pub value: FieldValue,
    /// Only write when the field currently holds this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_if: Option<FieldValue>,
}
