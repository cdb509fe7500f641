//! # Form Host
//!
//! Wires the engine and the guard to one rule book and its collaborators,
//! and commits lifecycle transitions.
//!
//! ## Transitions
//!
//! `submit` and `cancel` ask the guard first. On success the document's
//! state is moved, the transition is recorded with the clock's timestamp,
//! and the transition's effects are written. On rejection the document is
//! left exactly as it was.

use std::sync::Arc;

use snelex_core::{
    Clock, DocStatus, DocType, Document, DocumentFactory, DocumentStore, EntityDirectory,
    FieldValue,
};
use snelex_guard::TransitionGuard;
use snelex_rules::{FormRules, RuleBook};
use snelex_sync::{resolve_default, EditSession, SyncEngine, SyncOutcome};

use crate::error::FormError;

/// The event surface of the freight forms.
pub struct FormHost {
    pub(crate) rules: Arc<RuleBook>,
    pub(crate) engine: SyncEngine,
    pub(crate) guard: TransitionGuard,
    pub(crate) directory: Arc<dyn EntityDirectory>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) factory: Arc<dyn DocumentFactory>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FormHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormHost")
            .field("engine", &self.engine)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl FormHost {
    /// Build a host over `rules` and its collaborators.
    pub fn new(
        rules: Arc<RuleBook>,
        directory: Arc<dyn EntityDirectory>,
        store: Arc<dyn DocumentStore>,
        factory: Arc<dyn DocumentFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = SyncEngine::new(
            Arc::clone(&rules),
            Arc::clone(&directory),
            Arc::clone(&store),
            Arc::clone(&clock),
        );
        let guard = TransitionGuard::new(Arc::clone(&rules), Arc::clone(&store));
        Self {
            rules,
            engine,
            guard,
            directory,
            store,
            factory,
            clock,
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn guard(&self) -> &TransitionGuard {
        &self.guard
    }

    pub(crate) fn form(&self, doc_type: DocType) -> Result<&FormRules, FormError> {
        self.rules
            .form(doc_type)
            .ok_or_else(|| FormError::NotConfigured {
                doc_type,
                what: "form rules".into(),
            })
    }

    /// Open a session on `doc` and run the refresh rules.
    pub fn open(&self, doc: Document) -> Result<(EditSession, SyncOutcome), FormError> {
        let mut session = EditSession::new(doc);
        let outcome = self.refresh(&mut session)?;
        Ok((session, outcome))
    }

    /// Apply a user edit.
    pub fn field_changed(
        &self,
        session: &mut EditSession,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<SyncOutcome, FormError> {
        Ok(self.engine.set_field(session, field, value)?)
    }

    /// Fill unset defaults and recompute derived totals.
    ///
    /// Defaults never overwrite a value the user entered. Non-draft
    /// documents are left untouched.
    pub fn refresh(&self, session: &mut EditSession) -> Result<SyncOutcome, FormError> {
        if !session.document().status.is_editable() {
            return Ok(SyncOutcome::default());
        }
        let Some(form) = self.rules.form(session.document().doc_type) else {
            return Ok(SyncOutcome::default());
        };

        let mut outcome = SyncOutcome::default();
        for default in &form.refresh.defaults {
            if !session.document().is_blank(&default.field) {
                continue;
            }
            let value = resolve_default(&default.value, self.clock.as_ref());
            merge(&mut outcome, self.engine.set_field(session, &default.field, value)?);
        }
        for name in &form.refresh.recompute {
            merge(&mut outcome, self.engine.recompute(session, name)?);
        }
        Ok(outcome)
    }

    /// Validate a draft for submission without committing anything.
    pub fn before_submit(&self, session: &EditSession) -> Result<(), FormError> {
        self.guard
            .validate_transition(session.document(), DocStatus::Draft, DocStatus::Submitted)?;
        Ok(())
    }

    /// Submit the document.
    pub fn submit(&self, session: &mut EditSession) -> Result<(), FormError> {
        self.commit(session, DocStatus::Draft, DocStatus::Submitted, "submitted")
    }

    /// Cancel a submitted document.
    pub fn cancel(&self, session: &mut EditSession) -> Result<(), FormError> {
        self.commit(session, DocStatus::Submitted, DocStatus::Cancelled, "cancelled")
    }

    fn commit(
        &self,
        session: &mut EditSession,
        from: DocStatus,
        to: DocStatus,
        reason: &str,
    ) -> Result<(), FormError> {
        self.guard.validate_transition(session.document(), from, to)?;

        let effects = self
            .rules
            .form(session.document().doc_type)
            .and_then(|form| form.transition(from, to))
            .map(|rules| rules.effects.as_slice())
            .unwrap_or_default();

        let doc = session.document_mut();
        doc.transition(to, reason, self.clock.now())?;
        for effect in effects {
            let applies = match &effect.only_if {
                Some(expected) => doc.get(&effect.field).is_some_and(|v| v.same_as(expected)),
                None => true,
            };
            if applies {
                doc.set(&effect.field, effect.value.clone());
            }
        }

        tracing::info!(
            doc_type = %doc.doc_type,
            name = %doc.name,
            %from,
            %to,
            "transition committed"
        );
        Ok(())
    }
}

fn merge(total: &mut SyncOutcome, next: SyncOutcome) {
    total.changed.extend(next.changed);
    total.changed.sort();
    total.changed.dedup();
    total.violations.extend(next.violations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use snelex_core::{FixedClock, InMemoryDirectory, InMemoryStore};

    fn make_host(store: &InMemoryStore) -> FormHost {
        FormHost::new(
            Arc::new(RuleBook::freight()),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())),
        )
    }

    fn ready_note() -> Document {
        Document::new(DocType::ConsignmentNote, "CN-00010")
            .with("consignment_date", "2025-06-01")
            .with("consignment_from", "Warehouse A")
            .with("consignment_to", "Port B")
            .with("payment_by", "Third Party")
            .with("number_of_pallets", 2)
    }

    #[test]
    fn test_open_applies_job_card_defaults() {
        let host = make_host(&InMemoryStore::new());
        let (session, outcome) = host
            .open(Document::new(DocType::JobCard, "new-job-card-1"))
            .unwrap();
        let doc = session.document();
        assert_eq!(
            doc.get("job_date").and_then(FieldValue::as_date),
            NaiveDate::from_ymd_opt(2025, 6, 2)
        );
        assert_eq!(doc.text("job_status"), "Open");
        assert_eq!(doc.text("advance_status"), "Open");
        assert_eq!(outcome.changed, vec!["advance_status", "job_date", "job_status"]);
    }

    #[test]
    fn test_refresh_keeps_user_values() {
        let host = make_host(&InMemoryStore::new());
        let doc = Document::new(DocType::JobCard, "new-job-card-1").with("job_status", "On Hold");
        let (session, _) = host.open(doc).unwrap();
        assert_eq!(session.document().text("job_status"), "On Hold");
    }

    #[test]
    fn test_refresh_recomputes_total() {
        let host = make_host(&InMemoryStore::new());
        let doc = ready_note().with("number_of_bags", 5);
        let (session, _) = host.open(doc).unwrap();
        assert_eq!(session.document().number("total_no_of_pieces"), 7.0);
    }

    #[test]
    fn test_submit_records_transition_and_effects() {
        let host = make_host(&InMemoryStore::new());
        let mut session = EditSession::new(ready_note());
        host.before_submit(&session).unwrap();
        host.submit(&mut session).unwrap();
        let doc = session.document();
        assert_eq!(doc.status, DocStatus::Submitted);
        assert_eq!(doc.text("status"), "Submitted");
        assert_eq!(doc.transitions.len(), 1);
        assert_eq!(doc.transitions[0].reason, "submitted");

        host.cancel(&mut session).unwrap();
        assert_eq!(session.document().status, DocStatus::Cancelled);
        assert_eq!(session.document().text("status"), "Cancelled");
    }

    #[test]
    fn test_rejected_submit_leaves_document_untouched() {
        let host = make_host(&InMemoryStore::new());
        let mut session = EditSession::new(ready_note().with("consignment_to", ""));
        let before = session.document().clone();
        let err = host.submit(&mut session).unwrap_err();
        assert_eq!(
            err.violations().map(|v| v.messages()),
            Some(vec!["Consignment To is mandatory for submission"])
        );
        assert_eq!(session.document(), &before);
    }

    #[test]
    fn test_cancel_requires_submitted_document() {
        let host = make_host(&InMemoryStore::new());
        let mut session = EditSession::new(ready_note());
        let err = host.cancel(&mut session).unwrap_err();
        assert!(matches!(err, FormError::Guard(_)));
        assert_eq!(session.document().status, DocStatus::Draft);
    }

    #[test]
    fn test_refresh_skips_submitted_documents() {
        let host = make_host(&InMemoryStore::new());
        let doc = Document::new(DocType::JobCard, "JC-00001").with_status(DocStatus::Submitted);
        let (session, outcome) = host.open(doc).unwrap();
        assert!(outcome.is_noop());
        assert!(session.document().is_blank("job_status"));
    }
}
