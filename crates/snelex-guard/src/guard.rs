//! # Transition Guard
//!
//! Evaluates the [`TransitionRules`] of a form against a document.

use std::sync::Arc;

use snelex_core::{
    DocStatus, Document, DocumentStore, Filter, LifecycleError, Violation, ViolationKind,
    Violations,
};
use snelex_rules::{RuleBook, TransitionRules, UpstreamRule};

use crate::error::GuardError;

/// Validates lifecycle transitions against the rule book.
pub struct TransitionGuard {
    rules: Arc<RuleBook>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for TransitionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionGuard")
            .field("forms", &self.rules.forms.len())
            .finish_non_exhaustive()
    }
}

impl TransitionGuard {
    pub fn new(rules: Arc<RuleBook>, store: Arc<dyn DocumentStore>) -> Self {
        Self { rules, store }
    }

    /// Check whether `doc` may move from `from` to `to`.
    ///
    /// Lifecycle problems are reported before any rule runs. A transition
    /// without declared rules passes once the lifecycle allows it.
    pub fn validate_transition(
        &self,
        doc: &Document,
        from: DocStatus,
        to: DocStatus,
    ) -> Result<(), GuardError> {
        if !from.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition { from, to }.into());
        }
        if doc.status != from {
            return Err(LifecycleError::StateMismatch {
                name: doc.name.to_string(),
                expected: from,
                actual: doc.status,
            }
            .into());
        }

        let Some(rules) = self
            .rules
            .form(doc.doc_type)
            .and_then(|form| form.transition(from, to))
        else {
            return Ok(());
        };

        let violations = self.evaluate(doc, rules);
        if violations.is_empty() {
            tracing::debug!(doc_type = %doc.doc_type, name = %doc.name, %from, %to, "transition allowed");
            Ok(())
        } else {
            tracing::debug!(
                doc_type = %doc.doc_type,
                name = %doc.name,
                %from,
                %to,
                count = violations.len(),
                "transition rejected"
            );
            Err(GuardError::Rejected(violations))
        }
    }

    /// Run every rule family and collect the violations in order.
    pub fn evaluate(&self, doc: &Document, rules: &TransitionRules) -> Violations {
        let mut violations = Violations::new();

        for m in &rules.mandatory {
            if doc.is_blank(&m.field) {
                let message = if rules.to == DocStatus::Submitted {
                    format!("{} is mandatory for submission", m.label)
                } else {
                    format!("{} is mandatory", m.label)
                };
                violations.push(Violation::on_field(
                    ViolationKind::MissingField,
                    m.field.clone(),
                    message,
                ));
            }
        }

        for group in &rules.at_least_one_of {
            if !group.fields.iter().any(|f| doc.is_truthy(f)) {
                violations.push(Violation::general(
                    ViolationKind::AtLeastOneOf,
                    group.message.clone(),
                ));
            }
        }

        for rule in &rules.conditional {
            let applies = doc.get(&rule.when).is_some_and(|v| v.same_as(&rule.equals));
            if applies && doc.is_blank(&rule.require) {
                violations.push(Violation::on_field(
                    ViolationKind::ConditionalMandatory,
                    rule.require.clone(),
                    rule.message.clone(),
                ));
            }
        }

        for rule in &rules.upstream {
            match self.check_upstream(doc, rule) {
                Upstream::Satisfied => {}
                Upstream::WrongState => violations.push(Violation::on_field(
                    ViolationKind::UpstreamState,
                    rule.link.clone(),
                    rule.message.clone(),
                )),
                Upstream::Unresolvable(message) => {
                    violations.push(Violation::on_field(
                        ViolationKind::UnresolvableReference,
                        rule.link.clone(),
                        message,
                    ));
                    break;
                }
            }
        }

        violations
    }

    fn check_upstream(&self, doc: &Document, rule: &UpstreamRule) -> Upstream {
        // A missing link is the mandatory family's concern.
        let Some(link) = doc.get(&rule.link).map(ToString::to_string) else {
            return Upstream::Satisfied;
        };
        let link = link.as_str();
        let status = self.store.get_document_field(
            rule.doc_type,
            &[Filter::equals("name", link)],
            "docstatus",
        );
        match status {
            Ok(Some(code)) => {
                if code.as_number() == Some(f64::from(rule.state.code())) {
                    Upstream::Satisfied
                } else {
                    Upstream::WrongState
                }
            }
            Ok(None) => {
                tracing::warn!(doc_type = %rule.doc_type, link, "upstream reference not found");
                Upstream::Unresolvable(format!("{} {link} could not be found", rule.doc_type))
            }
            Err(err) => {
                tracing::warn!(doc_type = %rule.doc_type, link, error = %err, "upstream lookup failed");
                Upstream::Unresolvable(format!(
                    "{} {link} could not be resolved: {err}",
                    rule.doc_type
                ))
            }
        }
    }
}

enum Upstream {
    Satisfied,
    WrongState,
    Unresolvable(String),
}
