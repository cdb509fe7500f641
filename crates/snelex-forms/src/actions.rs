//! # Form Actions
//!
//! Linked-document actions and child-table pulls.
//!
//! A form with a [`LinkRule`] is derived from a source document (a Job
//! Card from a Consignment Note). At most one target may reference a
//! given source; both the selection and the creation path enforce it.

use snelex_core::{
    DocType, Document, DocumentId, FieldValue, Filter, Row, Violation, ViolationKind, Violations,
};
use snelex_rules::LinkRule;
use snelex_sync::{resolve_default, EditSession, SyncOutcome};

use crate::error::FormError;
use crate::host::FormHost;

/// Result of selecting a source document for a linked form.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// The source was linked and its details synchronized.
    Linked(SyncOutcome),
    /// Another document already references the source; nothing changed.
    DuplicateExists {
        /// The document holding the reference.
        existing: DocumentId,
        /// Message to show.
        message: String,
    },
}

fn rejected(kind: ViolationKind, message: impl Into<String>) -> FormError {
    FormError::Rejected(Violations::from(vec![Violation::general(kind, message)]))
}

impl FormHost {
    fn link_rule(&self, doc_type: DocType) -> Result<&LinkRule, FormError> {
        self.form(doc_type)?
            .link
            .as_ref()
            .ok_or_else(|| FormError::NotConfigured {
                doc_type,
                what: "source link".into(),
            })
    }

    /// The first `target` document other than `except` that references
    /// `source`.
    fn existing_target(
        &self,
        target: DocType,
        rule: &LinkRule,
        source: &str,
        except: Option<&DocumentId>,
    ) -> Result<Option<DocumentId>, FormError> {
        let found = self
            .store
            .list_documents(target, &[Filter::equals(rule.field.as_str(), source)])?;
        Ok(found
            .into_iter()
            .map(|doc| doc.name)
            .find(|name| Some(name) != except))
    }

    /// Link `candidate` as the source of the document under edit.
    ///
    /// Refuses with [`LinkOutcome::DuplicateExists`] when another document
    /// already references the candidate.
    pub fn select_source(
        &self,
        session: &mut EditSession,
        candidate: &str,
    ) -> Result<LinkOutcome, FormError> {
        let doc_type = session.document().doc_type;
        let rule = self.link_rule(doc_type)?;
        let own = session.document().name.clone();
        if let Some(existing) = self.existing_target(doc_type, rule, candidate, Some(&own))? {
            let message = rule
                .duplicate_message
                .replace("{existing}", existing.as_str());
            tracing::warn!(doc_type = %doc_type, source = candidate, existing = %existing, "source already linked");
            return Ok(LinkOutcome::DuplicateExists { existing, message });
        }
        let outcome = self.engine.set_field(session, &rule.field, candidate)?;
        Ok(LinkOutcome::Linked(outcome))
    }

    /// Create a new `target` document from the source document `source`.
    ///
    /// The source must be in the link's required state and must not be
    /// referenced yet. The draft gets the link's defaults and the
    /// synchronized source details before it is handed to the factory.
    pub fn create_from_source(
        &self,
        target: DocType,
        source: &DocumentId,
    ) -> Result<DocumentId, FormError> {
        let rule = self.link_rule(target)?;

        let Some(source_doc) = self.store.get_document(rule.source, source)? else {
            return Err(rejected(
                ViolationKind::UnresolvableReference,
                format!("{} {source} could not be found", rule.source),
            ));
        };
        if source_doc.status != rule.source_state {
            return Err(rejected(ViolationKind::UpstreamState, rule.state_message.clone()));
        }
        if let Some(existing) = self.existing_target(target, rule, source.as_str(), None)? {
            return Err(rejected(
                ViolationKind::DuplicateLink,
                rule.duplicate_message.replace("{existing}", existing.as_str()),
            ));
        }

        let mut draft = Document::new(target, format!("new-{}", target.naming_prefix()));
        for default in &rule.defaults {
            draft.set(
                &default.field,
                resolve_default(&default.value, self.clock.as_ref()),
            );
        }
        let mut session = EditSession::new(draft);
        self.engine.set_field(&mut session, &rule.field, source)?;

        let name = self
            .factory
            .create_linked_document(rule.source, source, session.into_document())?;
        tracing::info!(doc_type = %target, name = %name, source = %source, "created linked document");
        Ok(name)
    }

    /// Run the pull action `name`: replace its child table with one row per
    /// matching source document. When nothing matches the table is kept.
    ///
    /// Returns the number of rows written.
    pub fn pull(&self, session: &mut EditSession, name: &str) -> Result<usize, FormError> {
        let doc_type = session.document().doc_type;
        session.document().ensure_editable()?;
        let rule = self
            .form(doc_type)?
            .pull(name)
            .ok_or_else(|| FormError::NotConfigured {
                doc_type,
                what: format!("pull action '{name}'"),
            })?;

        let doc = session.document();
        if rule.inputs.iter().any(|field| doc.is_blank(field)) {
            return Err(rejected(ViolationKind::MissingInput, rule.missing_message.clone()));
        }

        let filters: Vec<Filter> = rule
            .matches
            .iter()
            .filter_map(|m| {
                doc.get(&m.from)
                    .map(|value| Filter::equals(m.to.as_str(), value.clone()))
            })
            .collect();
        let sources = self.store.list_documents(rule.source, &filters)?;

        let rows: Vec<Row> = sources
            .iter()
            .map(|source| {
                rule.columns
                    .iter()
                    .filter_map(|column| {
                        let value = match column.from.as_str() {
                            "name" => Some(FieldValue::from(&source.name)),
                            field => source.get(field).cloned(),
                        };
                        value.map(|v| (column.to.clone(), v))
                    })
                    .collect()
            })
            .collect();

        let count = rows.len();
        if count == 0 {
            tracing::info!(doc_type = %doc_type, action = name, "nothing to pull; table kept");
            return Ok(0);
        }
        session.document_mut().set_table(&rule.table, rows);
        tracing::info!(doc_type = %doc_type, action = name, rows = count, "pulled child rows");
        Ok(count)
    }
}
