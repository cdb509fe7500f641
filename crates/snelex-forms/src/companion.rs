//! # Companion Records
//!
//! Saving a document makes sure its companion records exist: a Shipper is
//! always billable as a Customer of the same name. Existing companions are
//! never touched.

use snelex_core::{Document, DocumentId, EntitySnapshot, Filter};
use snelex_rules::{CompanionRule, EntityCopy};
use snelex_sync::{resolve_default, EditSession};

use crate::error::FormError;
use crate::host::FormHost;

impl FormHost {
    /// Save hook: create every missing companion of the document under
    /// edit.
    ///
    /// Returns the names of the records created, in rule order.
    pub fn save(&self, session: &EditSession) -> Result<Vec<DocumentId>, FormError> {
        let doc = session.document();
        let Some(form) = self.rules.form(doc.doc_type) else {
            return Ok(Vec::new());
        };

        let mut created = Vec::new();
        for rule in &form.companions {
            let existing = self.store.get_document_field(
                rule.doc_type,
                &[Filter::equals(rule.name_field.as_str(), doc.name.as_str())],
                "name",
            )?;
            if existing.is_some() {
                continue;
            }
            let draft = self.companion_draft(session, rule)?;
            let name = self.factory.create_document(draft)?;
            tracing::info!(
                doc_type = %doc.doc_type,
                name = %doc.name,
                companion = %rule.doc_type,
                created = %name,
                "created companion record"
            );
            created.push(name);
        }
        Ok(created)
    }

    fn companion_draft(
        &self,
        session: &EditSession,
        rule: &CompanionRule,
    ) -> Result<Document, FormError> {
        let doc = session.document();
        let prefix = rule.doc_type.naming_prefix();
        let mut draft = Document::new(rule.doc_type, format!("new-{prefix}"))
            .with(&rule.name_field, doc.name.as_str());
        for default in &rule.defaults {
            draft.set(
                &default.field,
                resolve_default(&default.value, self.clock.as_ref()),
            );
        }
        if let Some(copy) = &rule.from_entity {
            if let Some(snapshot) = self.party(session, copy)? {
                for target in &copy.targets {
                    draft.set(&target.field, snapshot.attr(target.attr));
                }
            }
        }
        Ok(draft)
    }

    /// The party named by `copy.link`, from the session's cache when it was
    /// resolved while editing.
    fn party(
        &self,
        session: &EditSession,
        copy: &EntityCopy,
    ) -> Result<Option<EntitySnapshot>, FormError> {
        let Some(id) = session.document().get(&copy.link).map(ToString::to_string) else {
            return Ok(None);
        };
        if let Some(cached) = session
            .reference(&copy.link)
            .filter(|r| r.kind == copy.entity && r.id == id)
        {
            return Ok(Some(cached.snapshot.clone()));
        }
        Ok(self.directory.resolve_entity(copy.entity, &id)?)
    }
}
