//! # snelex-rules — Declarative Rule Books
//!
//! Every behavior of the forms is data: which fields trigger which
//! derivations, which defaults apply on refresh, which rules gate a
//! lifecycle transition, and how the linked-document and pull actions are
//! wired, and which companion records a save creates. A [`RuleBook`] holds one [`FormRules`] per document type and is
//! injected into the engine, the guard, and the host at construction time.
//!
//! ## Sources
//!
//! - [`RuleBook::freight()`] — the built-in rules for Consignment Note,
//!   Job Card, Manifest and Shipper.
//! - [`RuleBook::from_yaml_str()`] / [`RuleBook::from_yaml_path()`] — a
//!   rule book written in YAML, with the same shape as the serialized
//!   built-in book.
//!
//! [`RuleBook::validate()`] reports every structural problem at once.

pub mod builtin;
pub mod error;
pub mod field;
pub mod form;
pub mod transition;

pub use error::RulesError;
pub use field::{
    AttrTarget, Branch, BranchSource, DefaultValue, Derivation, FieldMap, FieldRule,
    PartyReference,
};
pub use form::{
    CompanionRule, DefaultRule, EntityCopy, FormRules, LinkRule, PullRule, RefreshRules, RuleBook,
};
pub use transition::{
    ConditionalRule, Effect, FieldGroup, MandatoryField, TransitionRules, UpstreamRule,
};
