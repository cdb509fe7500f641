//! # Field Synchronization Rules
//!
//! A [`FieldRule`] names the trigger fields that activate it and a
//! [`Derivation`] describing what to write. Rules of one form run in
//! declaration order, so a rule can read fields written by an earlier rule
//! in the same dispatch (the payment branch reads the shipper details the
//! shipper rule has just copied).
//!
//! Every derivation is a function of the document and the directory/store
//! contents only, so re-applying a rule with the same input is a no-op.

use serde::{Deserialize, Serialize};
use snelex_core::{DocType, EntityKind, FieldValue, SnapshotAttr};

/// A declarative field-synchronization rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Rule name, unique within a form; used in logs and refresh lists.
    pub name: String,
    /// Fields whose change activates the rule.
    pub triggers: Vec<String>,
    /// What the rule writes.
    pub derivation: Derivation,
}

impl FieldRule {
    /// Whether `field` activates this rule.
    pub fn is_triggered_by(&self, field: &str) -> bool {
        self.triggers.iter().any(|t| t == field)
    }

    /// Every field this rule may write.
    pub fn targets(&self) -> Vec<&str> {
        match &self.derivation {
            Derivation::CopyFromEntity { targets, .. } => {
                targets.iter().map(|t| t.field.as_str()).collect()
            }
            Derivation::Sum { target, .. } => vec![target.as_str()],
            Derivation::DistinctFrom { .. } => self.triggers.iter().map(String::as_str).collect(),
            Derivation::ExclusiveBranch {
                reference_field,
                party_fields,
                ..
            } => std::iter::once(reference_field.as_str())
                .chain(party_fields.iter().map(String::as_str))
                .collect(),
            Derivation::CopyFromDocument {
                projection,
                overlay,
                ..
            } => projection
                .iter()
                .chain(overlay.iter())
                .map(|m| m.to.as_str())
                .collect(),
            Derivation::DefaultWhen { target, .. } => vec![target.as_str()],
        }
    }
}

/// How a rule computes its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// Resolve the trigger value as a directory id and copy snapshot
    /// attributes into the targets. An empty trigger or an unknown id
    /// clears the targets.
    CopyFromEntity {
        /// Directory kind the trigger refers to.
        entity: EntityKind,
        /// Attribute → field mapping. One attribute may feed several fields.
        targets: Vec<AttrTarget>,
    },

    /// Write the sum of `sources` into `target`; absent or non-numeric
    /// sources count as zero.
    Sum {
        /// Fields to add up.
        sources: Vec<String>,
        /// Field receiving the total.
        target: String,
    },

    /// Reject a trigger value equal to the paired field's value: the
    /// trigger is cleared and `message` is surfaced.
    DistinctFrom {
        /// Field that must hold a different value.
        paired: String,
        /// Violation message.
        message: String,
    },

    /// Exactly one branch of `selector` is active. The active branch's
    /// required flag is set and every other branch's flag is unset; the
    /// party fields are derived from the branch source or cleared.
    ExclusiveBranch {
        /// Select field choosing the branch.
        selector: String,
        /// Field holding the billed party's record name.
        reference_field: String,
        /// Fields holding the billed party's details.
        party_fields: Vec<String>,
        /// Known branches. A selector value with no branch clears the
        /// party fields and requires nothing.
        branches: Vec<Branch>,
    },

    /// Resolve the trigger value as a `doc_type` record in the store and
    /// copy a projection of its fields. An empty trigger clears the
    /// projection targets.
    CopyFromDocument {
        /// Type of the referenced record.
        doc_type: DocType,
        /// Copied unconditionally; cleared with the reference.
        projection: Vec<FieldMap>,
        /// Copied only when the source value is set; never cleared.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        overlay: Vec<FieldMap>,
    },

    /// When the trigger equals `equals` and `target` is unset, write
    /// `value` into `target`.
    DefaultWhen {
        /// Trigger value that activates the default.
        equals: FieldValue,
        /// Field receiving the default.
        target: String,
        /// Default to write.
        value: DefaultValue,
    },
}

/// One snapshot attribute copied into one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrTarget {
    /// Attribute to read.
    pub attr: SnapshotAttr,
    /// Field to write.
    pub field: String,
}

/// One field copied into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    /// Source field.
    pub from: String,
    /// Target field.
    pub to: String,
}

/// One option of an exclusive branch selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Selector value activating this branch.
    pub value: String,
    /// Field flagged as required while this branch is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    /// Where the billed party comes from; `None` leaves the party fields
    /// empty for manual entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BranchSource>,
}

/// Source of the billed party for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSource {
    /// Link field naming the source party. A change of this field while
    /// the branch is active re-derives the party.
    pub link: String,
    /// How the reference field is filled.
    pub reference: PartyReference,
    /// Source detail field → party field.
    pub copy: Vec<FieldMap>,
}

/// How a branch fills the billed-party reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartyReference {
    /// Use the link field's value as is.
    Direct,
    /// Use the name of the first `doc_type` record whose `match_field`
    /// equals the link value; empty when there is none.
    Lookup {
        /// Record type to search.
        doc_type: DocType,
        /// Field compared with the link value.
        match_field: String,
    },
}

/// A default written by refresh or by [`Derivation::DefaultWhen`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// The clock's current date.
    Today,
    /// A constant.
    Fixed(FieldValue),
}
