//! # Rule Books
//!
//! [`FormRules`] gathers everything one document type does; [`RuleBook`]
//! holds the forms of an application and is the unit of configuration.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snelex_core::{DocStatus, DocType, EntityKind};

use crate::error::RulesError;
use crate::field::{AttrTarget, DefaultValue, Derivation, FieldMap, FieldRule};
use crate::transition::TransitionRules;

/// A default applied when a field is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRule {
    /// Field receiving the default.
    pub field: String,
    /// Default to write.
    pub value: DefaultValue,
}

/// Behavior of the post-load `refresh` hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshRules {
    /// Defaults written only when the field is unset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<DefaultRule>,
    /// Field rules (by name) re-run on every refresh.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recompute: Vec<String>,
}

/// Wiring of the "pick a source document" and "create from source"
/// actions for a form that references a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRule {
    /// Link field on this form.
    pub field: String,
    /// Type of the source document.
    pub source: DocType,
    /// State the source must be in to create from it.
    pub source_state: DocStatus,
    /// Defaults of a document created from a source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<DefaultRule>,
    /// Message when a document already references the source; `{existing}`
    /// is replaced by that document's name.
    pub duplicate_message: String,
    /// Message when the source is not in `source_state`.
    pub state_message: String,
}

/// Wiring of an action that fills a child table from matching documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRule {
    /// Action name, as the host invokes it.
    pub name: String,
    /// Child table replaced by the action.
    pub table: String,
    /// Type of the documents pulled.
    pub source: DocType,
    /// Fields of this form that must be set before pulling.
    pub inputs: Vec<String>,
    /// Message when an input is missing.
    pub missing_message: String,
    /// This form's field → source field compared for equality.
    pub matches: Vec<FieldMap>,
    /// Source field → row column. `name` is the source's record name.
    pub columns: Vec<FieldMap>,
}

/// A record that must exist for every saved document of a form, found by
/// the document's name in `name_field` and created when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionRule {
    /// Type of the companion record.
    pub doc_type: DocType,
    /// Companion field holding the document's name.
    pub name_field: String,
    /// Constants written into a new companion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<DefaultRule>,
    /// Party details copied into a new companion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_entity: Option<EntityCopy>,
}

/// Snapshot attributes of the party named by `link`, copied into a new
/// record. Empty attributes are not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCopy {
    /// Field of the saved document naming the party.
    pub link: String,
    /// Directory kind of the party.
    pub entity: EntityKind,
    /// Attribute → companion field.
    pub targets: Vec<AttrTarget>,
}

/// All rules of one document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRules {
    /// Document type governed.
    pub doc_type: DocType,
    /// Field synchronization rules, in application order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldRule>,
    /// Refresh hook.
    #[serde(default)]
    pub refresh: RefreshRules,
    /// Transition gates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionRules>,
    /// Source-document link action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkRule>,
    /// Child-table pull actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pulls: Vec<PullRule>,
    /// Records ensured on save.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companions: Vec<CompanionRule>,
}

impl FormRules {
    /// Empty rules for `doc_type`.
    pub fn new(doc_type: DocType) -> Self {
        Self {
            doc_type,
            fields: Vec::new(),
            refresh: RefreshRules::default(),
            transitions: Vec::new(),
            link: None,
            pulls: Vec::new(),
            companions: Vec::new(),
        }
    }

    /// Field rules activated by `field`, in declaration order.
    pub fn rules_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldRule> + 'a {
        self.fields.iter().filter(move |r| r.is_triggered_by(field))
    }

    /// A field rule by name.
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|r| r.name == name)
    }

    /// Rules gating `from -> to`.
    pub fn transition(&self, from: DocStatus, to: DocStatus) -> Option<&TransitionRules> {
        self.transitions.iter().find(|t| t.applies_to(from, to))
    }

    /// A pull action by name.
    pub fn pull(&self, name: &str) -> Option<&PullRule> {
        self.pulls.iter().find(|p| p.name == name)
    }

    fn check(&self, problems: &mut Vec<String>) {
        let form = self.doc_type;
        let mut names = HashSet::new();
        for rule in &self.fields {
            if rule.name.is_empty() {
                problems.push(format!("{form}: field rule with empty name"));
            } else if !names.insert(rule.name.as_str()) {
                problems.push(format!("{form}: duplicate field rule '{}'", rule.name));
            }
            if rule.triggers.is_empty() {
                problems.push(format!("{form}: rule '{}' has no triggers", rule.name));
            }
            // A distinct-from rule clears its own trigger on rejection.
            if !matches!(rule.derivation, Derivation::DistinctFrom { .. }) {
                let own: Vec<&str> = rule
                    .targets()
                    .into_iter()
                    .filter(|t| rule.is_triggered_by(t))
                    .collect();
                if !own.is_empty() {
                    problems.push(format!(
                        "{form}: rule '{}' writes its own trigger '{}'",
                        rule.name,
                        own.join("', '")
                    ));
                }
            }
            check_derivation(form, rule, problems);
        }

        for name in &self.refresh.recompute {
            if self.rule(name).is_none() {
                problems.push(format!("{form}: refresh recomputes unknown rule '{name}'"));
            }
        }

        let mut seen = HashSet::new();
        for t in &self.transitions {
            if !t.from.can_transition_to(t.to) {
                problems.push(format!(
                    "{form}: lifecycle has no transition {} -> {}",
                    t.from, t.to
                ));
            }
            if !seen.insert((t.from, t.to)) {
                problems.push(format!(
                    "{form}: duplicate rules for {} -> {}",
                    t.from, t.to
                ));
            }
            let mut mandatory = HashSet::new();
            for m in &t.mandatory {
                if !mandatory.insert(m.field.as_str()) {
                    problems.push(format!("{form}: duplicate mandatory field '{}'", m.field));
                }
            }
            for group in &t.at_least_one_of {
                if group.fields.is_empty() {
                    problems.push(format!("{form}: empty at-least-one-of group"));
                }
            }
        }

        for companion in &self.companions {
            if companion.doc_type == form {
                problems.push(format!("{form}: companion of its own type"));
            }
            if companion.name_field.is_empty() {
                problems.push(format!(
                    "{form}: companion {} has no name field",
                    companion.doc_type
                ));
            }
        }

        for pull in &self.pulls {
            if pull.inputs.is_empty() || pull.matches.is_empty() {
                problems.push(format!(
                    "{form}: pull '{}' needs inputs and match fields",
                    pull.name
                ));
            }
        }
    }
}

fn check_derivation(form: DocType, rule: &FieldRule, problems: &mut Vec<String>) {
    let name = &rule.name;
    match &rule.derivation {
        Derivation::CopyFromEntity { targets, .. } => {
            if targets.is_empty() {
                problems.push(format!("{form}: rule '{name}' copies nothing"));
            }
        }
        Derivation::Sum { sources, target } => {
            if sources.is_empty() {
                problems.push(format!("{form}: rule '{name}' sums no fields"));
            }
            if sources.contains(target) && !rule.is_triggered_by(target) {
                problems.push(format!("{form}: rule '{name}' feeds its own total '{target}'"));
            }
        }
        Derivation::DistinctFrom { paired, .. } => {
            if rule.is_triggered_by(paired) {
                problems.push(format!("{form}: rule '{name}' pairs '{paired}' with itself"));
            }
        }
        Derivation::ExclusiveBranch {
            selector, branches, ..
        } => {
            if !rule.is_triggered_by(selector) {
                problems.push(format!(
                    "{form}: rule '{name}' is not triggered by its selector '{selector}'"
                ));
            }
            let mut values = HashSet::new();
            for branch in branches {
                if !values.insert(branch.value.as_str()) {
                    problems.push(format!(
                        "{form}: rule '{name}' has duplicate branch '{}'",
                        branch.value
                    ));
                }
                if let Some(source) = &branch.source {
                    if !rule.is_triggered_by(&source.link) {
                        problems.push(format!(
                            "{form}: rule '{name}' is not triggered by branch source '{}'",
                            source.link
                        ));
                    }
                }
            }
        }
        Derivation::CopyFromDocument { projection, .. } => {
            if projection.is_empty() {
                problems.push(format!("{form}: rule '{name}' projects nothing"));
            }
        }
        Derivation::DefaultWhen { .. } => {}
    }
}

/// The complete configuration of an application's forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    /// One entry per document type.
    pub forms: Vec<FormRules>,
}

impl RuleBook {
    /// Rules of `doc_type`, if configured.
    pub fn form(&self, doc_type: DocType) -> Option<&FormRules> {
        self.forms.iter().find(|f| f.doc_type == doc_type)
    }

    /// Parse a rule book from YAML. The result is not validated.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RulesError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read, parse, and validate a rule book file.
    pub fn from_yaml_path(path: &Path) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let book = Self::from_yaml_str(&text)?;
        book.validate()?;
        tracing::debug!(path = %path.display(), forms = book.forms.len(), "loaded rule book");
        Ok(book)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, RulesError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check structural consistency, reporting every problem found.
    pub fn validate(&self) -> Result<(), RulesError> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for form in &self.forms {
            if !seen.insert(form.doc_type) {
                problems.push(format!("{}: configured more than once", form.doc_type));
            }
            form.check(&mut problems);
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(RulesError::Invalid { problems })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Derivation, FieldRule};
    use crate::transition::MandatoryField;

    fn sum_rule(name: &str, target: &str) -> FieldRule {
        FieldRule {
            name: name.into(),
            triggers: vec!["a".into()],
            derivation: Derivation::Sum {
                sources: vec!["a".into()],
                target: target.into(),
            },
        }
    }

    #[test]
    fn test_empty_book_is_valid() {
        assert!(RuleBook::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let mut form = FormRules::new(DocType::ConsignmentNote);
        form.fields.push(sum_rule("total", "total"));
        form.fields.push(sum_rule("total", "a"));
        form.refresh.recompute.push("missing".into());
        let mut t = TransitionRules::new(DocStatus::Draft, DocStatus::Cancelled);
        t.mandatory.push(MandatoryField {
            field: "x".into(),
            label: "X".into(),
        });
        t.mandatory.push(MandatoryField {
            field: "x".into(),
            label: "X".into(),
        });
        form.transitions.push(t);
        let book = RuleBook {
            forms: vec![form, FormRules::new(DocType::ConsignmentNote)],
        };

        let err = book.validate().unwrap_err();
        let RulesError::Invalid { problems } = err else {
            panic!("expected Invalid");
        };
        // duplicate name, second rule sums "a" into "a", unknown recompute,
        // Draft -> Cancelled, duplicate mandatory field, duplicate form
        assert_eq!(problems.len(), 6, "{problems:?}");
        assert!(problems.iter().any(|p| p.contains("duplicate field rule 'total'")));
        assert!(problems.iter().any(|p| p.contains("configured more than once")));
    }

    #[test]
    fn test_rule_writing_its_trigger_is_reported() {
        let mut form = FormRules::new(DocType::JobCard);
        form.fields.push(FieldRule {
            name: "completed".into(),
            triggers: vec!["job_status".into()],
            derivation: Derivation::DefaultWhen {
                equals: "Completed".into(),
                target: "job_status".into(),
                value: DefaultValue::Today,
            },
        });
        form.companions.push(CompanionRule {
            doc_type: DocType::JobCard,
            name_field: String::new(),
            defaults: Vec::new(),
            from_entity: None,
        });
        let book = RuleBook { forms: vec![form] };
        let RulesError::Invalid { problems } = book.validate().unwrap_err() else {
            panic!("expected Invalid");
        };
        assert_eq!(
            problems,
            vec![
                "Job Card: rule 'completed' writes its own trigger 'job_status'",
                "Job Card: companion of its own type",
                "Job Card: companion Job Card has no name field",
            ]
        );
    }

    #[test]
    fn test_rules_for_preserves_declaration_order() {
        let mut form = FormRules::new(DocType::ConsignmentNote);
        form.fields.push(sum_rule("first", "t1"));
        form.fields.push(sum_rule("second", "t2"));
        let names: Vec<_> = form.rules_for("a").map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(form.rules_for("zzz").count(), 0);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = RuleBook::from_yaml_str("forms: 12").unwrap_err();
        assert!(matches!(err, RulesError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuleBook::from_yaml_path(Path::new("/nonexistent/rules.yaml")).unwrap_err();
        assert!(matches!(err, RulesError::Io { .. }));
    }
}
