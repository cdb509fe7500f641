//! # Synchronization Engine
//!
//! Dispatches field-change events to the rules of the document's form and
//! applies their derivations.
//!
//! ## Dispatch
//!
//! The dispatch table maps `(doc type, trigger field)` to the indices of
//! the rules that field activates, in declaration order. It is built once
//! from the injected [`RuleBook`]; there is no implicit registration.
//!
//! ## Staging
//!
//! Each call clones the session, applies every triggered rule to the
//! clone, and swaps it in only when all rules succeeded. A failed lookup
//! therefore never leaves a rule group half applied.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use snelex_core::{
    Clock, DocType, Document, DocumentId, DocumentStore, EntityDirectory, FieldValue, Filter,
    LookupError, Violation, ViolationKind, Violations,
};
use snelex_rules::{
    BranchSource, DefaultValue, Derivation, FieldRule, PartyReference, RuleBook,
};

use crate::error::SyncError;
use crate::session::{EditSession, RelatedEntityReference};

/// Result of one synchronization call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    /// Fields whose stored value changed, in name order. Includes the
    /// trigger when a rule reverted it.
    pub changed: Vec<String>,
    /// Messages to surface (same-value rejections).
    pub violations: Violations,
}

impl SyncOutcome {
    /// Whether the call changed nothing and reported nothing.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.violations.is_empty()
    }
}

/// Evaluate a default against `clock`.
pub fn resolve_default(value: &DefaultValue, clock: &dyn Clock) -> FieldValue {
    match value {
        DefaultValue::Today => FieldValue::Date(clock.today()),
        DefaultValue::Fixed(v) => v.clone(),
    }
}

/// The field synchronization engine.
pub struct SyncEngine {
    rules: Arc<RuleBook>,
    dispatch: HashMap<(DocType, String), Vec<usize>>,
    directory: Arc<dyn EntityDirectory>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("triggers", &self.dispatch.len())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Build an engine over `rules` and its collaborators.
    pub fn new(
        rules: Arc<RuleBook>,
        directory: Arc<dyn EntityDirectory>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut dispatch: HashMap<(DocType, String), Vec<usize>> = HashMap::new();
        for form in &rules.forms {
            for (index, rule) in form.fields.iter().enumerate() {
                for trigger in &rule.triggers {
                    let entry = dispatch.entry((form.doc_type, trigger.clone())).or_default();
                    if !entry.contains(&index) {
                        entry.push(index);
                    }
                }
            }
        }
        Self {
            rules,
            dispatch,
            directory,
            store,
            clock,
        }
    }

    /// The rule book the engine dispatches from.
    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Whether `field` triggers any rule of `doc_type`.
    pub fn is_trigger(&self, doc_type: DocType, field: &str) -> bool {
        self.dispatch.contains_key(&(doc_type, field.to_string()))
    }

    /// Apply a user edit and synchronize its dependents.
    ///
    /// The edit itself stays applied even if synchronization fails.
    pub fn set_field(
        &self,
        session: &mut EditSession,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<SyncOutcome, SyncError> {
        session.document().ensure_editable()?;
        let before = session.document().get(field).cloned();
        session.document_mut().set(field, value);
        let mut outcome = self.on_field_changed(session, field)?;
        if before.as_ref() != session.document().get(field)
            && !outcome.changed.iter().any(|c| c == field)
        {
            outcome.changed.push(field.to_string());
            outcome.changed.sort();
        }
        Ok(outcome)
    }

    /// Synchronize the dependents of `field`, whose new value is already
    /// in the session's document.
    pub fn on_field_changed(
        &self,
        session: &mut EditSession,
        field: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let doc_type = session.document().doc_type;
        let Some(indices) = self.dispatch.get(&(doc_type, field.to_string())) else {
            return Ok(SyncOutcome::default());
        };
        session.document().ensure_editable()?;
        let Some(form) = self.rules.form(doc_type) else {
            return Ok(SyncOutcome::default());
        };
        let rules: Vec<&FieldRule> = indices.iter().filter_map(|i| form.fields.get(*i)).collect();
        self.run(session, field, &rules)
    }

    /// Run one rule by name, as if its first trigger had changed.
    pub fn recompute(
        &self,
        session: &mut EditSession,
        rule_name: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let doc_type = session.document().doc_type;
        let rule = self
            .rules
            .form(doc_type)
            .and_then(|form| form.rule(rule_name))
            .ok_or_else(|| SyncError::UnknownRule {
                doc_type,
                name: rule_name.to_string(),
            })?;
        session.document().ensure_editable()?;
        let trigger = rule.triggers.first().map(String::as_str).unwrap_or_default();
        self.run(session, trigger, &[rule])
    }

    fn run(
        &self,
        session: &mut EditSession,
        trigger: &str,
        rules: &[&FieldRule],
    ) -> Result<SyncOutcome, SyncError> {
        let mut staged = session.clone();
        let mut violations = Violations::new();
        for rule in rules {
            tracing::debug!(
                doc_type = %staged.document().doc_type,
                trigger,
                rule = %rule.name,
                "applying field rule"
            );
            if let Err(source) = self.apply(rule, trigger, &mut staged, &mut violations) {
                tracing::warn!(
                    rule = %rule.name,
                    trigger,
                    error = %source,
                    "field rule lookup failed; discarding staged changes"
                );
                return Err(SyncError::Lookup {
                    rule: rule.name.clone(),
                    source,
                });
            }
        }
        let changed = changed_fields(session.document(), staged.document());
        *session = staged;
        Ok(SyncOutcome {
            changed,
            violations,
        })
    }

    fn apply(
        &self,
        rule: &FieldRule,
        trigger: &str,
        session: &mut EditSession,
        violations: &mut Violations,
    ) -> Result<(), LookupError> {
        let trigger_value = session.document().get(trigger).map(ToString::to_string);

        match &rule.derivation {
            Derivation::CopyFromEntity { entity, targets } => {
                let Some(id) = trigger_value else {
                    session.forget(trigger);
                    clear_all(session.document_mut(), targets.iter().map(|t| t.field.as_str()));
                    return Ok(());
                };
                let snapshot = match session.cached(trigger, *entity, &id).cloned() {
                    Some(snapshot) => Some(snapshot),
                    None => self.directory.resolve_entity(*entity, &id)?,
                };
                match snapshot {
                    Some(snapshot) => {
                        let doc = session.document_mut();
                        for target in targets {
                            doc.set(&target.field, snapshot.attr(target.attr));
                        }
                        session.remember(
                            trigger,
                            RelatedEntityReference {
                                kind: *entity,
                                id,
                                snapshot,
                            },
                        );
                    }
                    None => {
                        tracing::debug!(kind = %entity, id = %id, "reference not found; clearing details");
                        session.forget(trigger);
                        clear_all(session.document_mut(), targets.iter().map(|t| t.field.as_str()));
                    }
                }
            }

            Derivation::Sum { sources, target } => {
                let doc = session.document_mut();
                let total: f64 = sources.iter().map(|s| doc.number(s)).sum();
                doc.set(target, total);
            }

            Derivation::DistinctFrom { paired, message } => {
                let doc = session.document_mut();
                let same = matches!(
                    (doc.get(trigger), doc.get(paired)),
                    (Some(value), Some(other)) if value == other
                );
                if same {
                    tracing::warn!(field = trigger, paired = %paired, "rejected value equal to paired field");
                    doc.clear(trigger);
                    violations.push(Violation::on_field(
                        ViolationKind::DistinctValues,
                        trigger,
                        message.clone(),
                    ));
                }
            }

            Derivation::ExclusiveBranch {
                selector,
                reference_field,
                party_fields,
                branches,
            } => {
                let selected = session.document().text(selector).to_string();
                let active = branches.iter().find(|b| b.value == selected);
                let source = active.and_then(|b| b.source.as_ref());

                // A source-field change only matters to the branch it feeds.
                if trigger != selector && !source.is_some_and(|s| s.link == trigger) {
                    return Ok(());
                }

                let doc = session.document_mut();
                for branch in branches {
                    if let Some(required) = &branch.required {
                        let is_active = active.is_some_and(|a| a.value == branch.value);
                        doc.set_required(required, is_active);
                    }
                }

                match source {
                    Some(source) if !doc.is_blank(&source.link) => {
                        let reference = self.party_reference(source, doc)?;
                        doc.set(reference_field, reference);
                        for copy in &source.copy {
                            copy_field(doc, &copy.from, &copy.to);
                        }
                    }
                    _ => {
                        doc.clear(reference_field);
                        clear_all(doc, party_fields.iter().map(String::as_str));
                    }
                }
                // The branch owns the reference now; a snapshot resolved
                // from a direct entry no longer describes it.
                session.forget(reference_field);
            }

            Derivation::CopyFromDocument {
                doc_type,
                projection,
                overlay,
            } => {
                let targets = projection.iter().map(|m| m.to.as_str());
                let Some(name) = trigger_value else {
                    clear_all(session.document_mut(), targets);
                    return Ok(());
                };
                let doc = session.document_mut();
                match self.store.get_document(*doc_type, &DocumentId::new(name.clone()))? {
                    Some(source) => {
                        for m in projection {
                            match source.get(&m.from) {
                                Some(value) => doc.set(&m.to, value.clone()),
                                None => doc.clear(&m.to),
                            };
                        }
                        for m in overlay {
                            if let Some(value) = source.get(&m.from) {
                                doc.set(&m.to, value.clone());
                            }
                        }
                    }
                    None => {
                        tracing::debug!(doc_type = %doc_type, name = %name, "referenced document not found; clearing projection");
                        clear_all(doc, targets);
                    }
                }
            }

            Derivation::DefaultWhen {
                equals,
                target,
                value,
            } => {
                let doc = session.document_mut();
                if doc.get(trigger).is_some_and(|v| v.same_as(equals)) && doc.is_blank(target) {
                    doc.set(target, resolve_default(value, self.clock.as_ref()));
                }
            }
        }
        Ok(())
    }

    fn party_reference(&self, source: &BranchSource, doc: &Document) -> Result<String, LookupError> {
        let link = doc.get(&source.link).map(ToString::to_string).unwrap_or_default();
        match &source.reference {
            PartyReference::Direct => Ok(link),
            PartyReference::Lookup {
                doc_type,
                match_field,
            } => {
                let name = self.store.get_document_field(
                    *doc_type,
                    &[Filter::equals(match_field.as_str(), link)],
                    "name",
                )?;
                Ok(name.map(|v| v.to_string()).unwrap_or_default())
            }
        }
    }
}

fn clear_all<'a>(doc: &mut Document, fields: impl IntoIterator<Item = &'a str>) {
    for field in fields {
        doc.clear(field);
    }
}

fn copy_field(doc: &mut Document, from: &str, to: &str) {
    match doc.get(from).cloned() {
        Some(value) => doc.set(to, value),
        None => doc.clear(to),
    };
}

fn changed_fields(before: &Document, after: &Document) -> Vec<String> {
    let names: BTreeSet<&str> = before
        .fields()
        .map(|(name, _)| name)
        .chain(after.fields().map(|(name, _)| name))
        .collect();
    names
        .into_iter()
        .filter(|name| before.get(name) != after.get(name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use snelex_core::{
        DocStatus, EntityKind, EntitySnapshot, FixedClock, InMemoryDirectory, InMemoryStore,
    };

    struct Fixture {
        engine: SyncEngine,
        directory: InMemoryDirectory,
        store: InMemoryStore,
    }

    fn snapshot(name: &str, phone: &str) -> EntitySnapshot {
        EntitySnapshot {
            display_name: name.into(),
            address: format!("{name} HQ"),
            phone: phone.into(),
            fax: format!("{phone}-F"),
            email: format!("ops@{}.test", name.to_lowercase().replace(' ', "")),
        }
    }

    fn make_fixture() -> Fixture {
        let directory = InMemoryDirectory::new();
        directory.insert(EntityKind::Supplier, "SUP-1", snapshot("Acme Supplies", "555-0101"));
        directory.insert(EntityKind::Supplier, "SUP-2", snapshot("Orbit Traders", "555-0102"));
        directory.insert(EntityKind::Customer, "Globex", snapshot("Globex Corp", "555-0200"));
        directory.insert(EntityKind::Customer, "Initech", snapshot("Initech", "555-0300"));
        directory.insert(EntityKind::Address, "ADDR-1", snapshot("Dock 4", "0"));

        let store = InMemoryStore::from_documents([
            Document::new(DocType::Customer, "CUST-00007").with("supplier", "SUP-1"),
            Document::new(DocType::ConsignmentNote, "CN-00001")
                .with_status(DocStatus::Submitted)
                .with("consignment_from", "Warehouse A")
                .with("consignment_to", "Port B")
                .with("payment_by", "Receiver")
                .with("tracking_no", "TRK-991")
                .with("shipper_display_name", "Acme Supplies")
                .with("shipper_phone", "555-0101")
                .with("consignee_display_name", "Globex Corp")
                .with("consignee_email", "ops@globexcorp.test")
                .with("total_no_of_pieces", 10)
                .with("total_weight_lbs", 412.5)
                .with("number_of_cartons", 3)
                .with("description", "Machine parts"),
        ]);

        let clock = FixedClock::on(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let engine = SyncEngine::new(
            Arc::new(RuleBook::freight()),
            Arc::new(directory.clone()),
            Arc::new(store.clone()),
            Arc::new(clock),
        );
        Fixture {
            engine,
            directory,
            store,
        }
    }

    fn note_session() -> EditSession {
        EditSession::new(Document::new(DocType::ConsignmentNote, "new-consignment-note-1"))
    }

    fn job_card_session() -> EditSession {
        EditSession::new(Document::new(DocType::JobCard, "new-job-card-1"))
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    #[test]
    fn test_unknown_field_is_noop() {
        let f = make_fixture();
        let mut s = note_session();
        s.document_mut().set("remarks", "fragile");
        let before = s.document().clone();
        let outcome = f.engine.on_field_changed(&mut s, "remarks").unwrap();
        assert!(outcome.is_noop());
        assert_eq!(s.document(), &before);
        assert!(!f.engine.is_trigger(DocType::ConsignmentNote, "remarks"));
    }

    #[test]
    fn test_submitted_document_rejects_edits() {
        let f = make_fixture();
        let mut s = EditSession::new(
            Document::new(DocType::ConsignmentNote, "CN-1").with_status(DocStatus::Submitted),
        );
        let err = f.engine.set_field(&mut s, "number_of_bags", 2).unwrap_err();
        assert!(matches!(err, SyncError::Lifecycle(_)));
        assert!(s.document().is_blank("number_of_bags"));
    }

    // ── Sum ──────────────────────────────────────────────────────────

    #[test]
    fn test_total_pieces_sum() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "number_of_cartons", 3).unwrap();
        f.engine.set_field(&mut s, "number_of_bundles", 0).unwrap();
        f.engine.set_field(&mut s, "number_of_pieces", 5).unwrap();
        let outcome = f.engine.set_field(&mut s, "number_of_pallets", 2).unwrap();
        assert_eq!(s.document().number("total_no_of_pieces"), 10.0);
        assert_eq!(outcome.changed, vec!["number_of_pallets", "total_no_of_pieces"]);

        f.engine.set_field(&mut s, "number_of_pallets", 4).unwrap();
        assert_eq!(s.document().number("total_no_of_pieces"), 12.0);
    }

    #[test]
    fn test_total_pieces_counts_cleared_fields_as_zero() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "number_of_bags", 7).unwrap();
        f.engine.set_field(&mut s, "number_of_bags", "").unwrap();
        assert_eq!(s.document().get("total_no_of_pieces"), Some(&FieldValue::Number(0.0)));
    }

    // ── Same-value rejection ─────────────────────────────────────────

    #[test]
    fn test_same_location_rejected() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "consignment_from", "Warehouse A").unwrap();
        let outcome = f.engine.set_field(&mut s, "consignment_to", "Warehouse A").unwrap();
        assert!(s.document().is_blank("consignment_to"));
        assert_eq!(outcome.violations.len(), 1);
        let violation = outcome.violations.iter().next().unwrap();
        assert_eq!(violation.kind, ViolationKind::DistinctValues);
        assert_eq!(violation.field.as_deref(), Some("consignment_to"));

        let outcome = f.engine.set_field(&mut s, "consignment_to", "Warehouse B").unwrap();
        assert!(outcome.violations.is_empty());
        assert_eq!(s.document().text("consignment_to"), "Warehouse B");
        assert_eq!(s.document().text("consignment_from"), "Warehouse A");
    }

    #[test]
    fn test_same_location_rejected_from_either_side() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "consignment_to", "Port B").unwrap();
        let outcome = f.engine.set_field(&mut s, "consignment_from", "Port B").unwrap();
        assert!(s.document().is_blank("consignment_from"));
        assert_eq!(outcome.violations.len(), 1);
    }

    // ── Entity copy ──────────────────────────────────────────────────

    #[test]
    fn test_shipper_details_copied_and_cleared() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        assert_eq!(s.document().text("shipper_display_name"), "Acme Supplies");
        assert_eq!(s.document().text("shipper_fax"), "555-0101-F");
        assert!(s.reference("shipper").is_some());

        f.engine.set_field(&mut s, "shipper", "").unwrap();
        assert!(s.document().is_blank("shipper_display_name"));
        assert!(s.document().is_blank("shipper_email"));
        assert!(s.reference("shipper").is_none());
    }

    #[test]
    fn test_unknown_entity_clears_targets() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "consignee_customer", "Globex").unwrap();
        assert_eq!(s.document().text("delivery_contact_person"), "Globex Corp");
        let outcome = f.engine.set_field(&mut s, "consignee_customer", "Nobody").unwrap();
        assert!(outcome.violations.is_empty());
        assert!(s.document().is_blank("consignee_display_name"));
        assert!(s.document().is_blank("delivery_address"));
        assert_eq!(s.document().text("consignee_customer"), "Nobody");
    }

    #[test]
    fn test_cached_snapshot_survives_directory_outage() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        f.directory.set_offline(true);
        f.engine.on_field_changed(&mut s, "shipper").unwrap();
        assert_eq!(s.document().text("shipper_display_name"), "Acme Supplies");
    }

    #[test]
    fn test_failed_lookup_leaves_session_untouched() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        f.directory.set_offline(true);
        s.document_mut().set("shipper", "SUP-2");
        let before = s.document().clone();
        let err = f.engine.on_field_changed(&mut s, "shipper").unwrap_err();
        assert!(matches!(err, SyncError::Lookup { ref rule, .. } if rule == "shipper_details"));
        assert_eq!(s.document(), &before);
        assert_eq!(s.document().text("shipper_display_name"), "Acme Supplies");
        assert_eq!(s.reference("shipper").map(|r| r.id.as_str()), Some("SUP-1"));
    }

    // ── Payment branch ───────────────────────────────────────────────

    #[test]
    fn test_payment_by_shipper() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        f.engine.set_field(&mut s, "payment_by", "Shipper").unwrap();
        let doc = s.document();
        assert!(doc.is_required("shipper"));
        assert!(!doc.is_required("consignee_customer"));
        assert_eq!(doc.text("invoiced_to"), "CUST-00007");
        assert_eq!(doc.text("invoiced_to_display_name"), "Acme Supplies");
        assert_eq!(doc.text("invoiced_to_address"), "Acme Supplies HQ");
        assert_eq!(doc.text("invoiced_to_phone"), "555-0101");
    }

    #[test]
    fn test_payment_by_shipper_without_linked_customer() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-2").unwrap();
        f.engine.set_field(&mut s, "payment_by", "Shipper").unwrap();
        assert!(s.document().is_blank("invoiced_to"));
        assert_eq!(s.document().text("invoiced_to_display_name"), "Orbit Traders");
    }

    #[test]
    fn test_payment_by_receiver_then_third_party() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        f.engine.set_field(&mut s, "consignee_customer", "Globex").unwrap();
        f.engine.set_field(&mut s, "payment_by", "Receiver").unwrap();
        assert!(s.document().is_required("consignee_customer"));
        assert!(!s.document().is_required("shipper"));
        assert_eq!(s.document().text("invoiced_to"), "Globex");
        assert_eq!(s.document().text("invoiced_to_email"), "ops@globexcorp.test");

        f.engine.set_field(&mut s, "payment_by", "Third Party").unwrap();
        let doc = s.document();
        assert!(!doc.is_required("shipper"));
        assert!(!doc.is_required("consignee_customer"));
        assert!(doc.is_blank("invoiced_to"));
        for field in snelex_rules::builtin::INVOICED_TO_FIELDS {
            assert!(doc.is_blank(field), "{field} not cleared");
        }
    }

    #[test]
    fn test_active_branch_follows_source_change() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "consignee_customer", "Globex").unwrap();
        f.engine.set_field(&mut s, "payment_by", "Receiver").unwrap();
        f.engine.set_field(&mut s, "consignee_customer", "Initech").unwrap();
        assert_eq!(s.document().text("invoiced_to"), "Initech");
        assert_eq!(s.document().text("invoiced_to_display_name"), "Initech");

        // Shipper changes do not touch a Receiver-billed note.
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        assert_eq!(s.document().text("invoiced_to"), "Initech");
    }

    #[test]
    fn test_third_party_keeps_manual_invoiced_to() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "payment_by", "Third Party").unwrap();
        f.engine.set_field(&mut s, "invoiced_to", "Initech").unwrap();
        assert_eq!(s.document().text("invoiced_to_display_name"), "Initech");
        f.engine.set_field(&mut s, "shipper", "SUP-1").unwrap();
        assert_eq!(s.document().text("invoiced_to"), "Initech");
        assert_eq!(s.document().text("invoiced_to_display_name"), "Initech");
    }

    #[test]
    fn test_branch_switch_drops_cached_reference() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "payment_by", "Third Party").unwrap();
        f.engine.set_field(&mut s, "invoiced_to", "Initech").unwrap();
        assert!(s.reference("invoiced_to").is_some());

        f.engine.set_field(&mut s, "payment_by", "Receiver").unwrap();
        assert!(s.reference("invoiced_to").is_none());
        f.engine.set_field(&mut s, "payment_by", "Third Party").unwrap();
        assert!(s.document().is_blank("invoiced_to"));
        assert!(s.reference("invoiced_to").is_none());

        // Re-entering the id resolves it afresh.
        f.directory.set_offline(true);
        let err = f.engine.set_field(&mut s, "invoiced_to", "Initech").unwrap_err();
        assert!(matches!(err, SyncError::Lookup { .. }));
    }

    #[test]
    fn test_branch_without_source_value_clears_party() {
        let f = make_fixture();
        let mut s = note_session();
        f.engine.set_field(&mut s, "payment_by", "Shipper").unwrap();
        assert!(s.document().is_required("shipper"));
        assert!(s.document().is_blank("invoiced_to_display_name"));
    }

    // ── Cross-document copy ──────────────────────────────────────────

    #[test]
    fn test_job_card_copies_consignment_note() {
        let f = make_fixture();
        let mut s = job_card_session();
        f.engine.set_field(&mut s, "consignment_note", "CN-00001").unwrap();
        let doc = s.document();
        assert_eq!(doc.text("consignment_from"), "Warehouse A");
        assert_eq!(doc.text("tracking_no"), "TRK-991");
        assert_eq!(doc.text("shipper_name"), "Acme Supplies");
        assert_eq!(doc.text("shipper_contact"), "Acme Supplies");
        assert_eq!(doc.text("consignee_contact"), "Globex Corp");
        assert_eq!(doc.number("total_pieces"), 10.0);
        assert_eq!(doc.number("total_weight"), 412.5);
        assert_eq!(doc.text("job_description"), "Machine parts");
        assert!(doc.is_blank("number_of_bundles"));
    }

    #[test]
    fn test_clearing_job_card_reference_clears_projection() {
        let f = make_fixture();
        let mut s = job_card_session();
        f.engine.set_field(&mut s, "consignment_note", "CN-00001").unwrap();
        f.engine.set_field(&mut s, "consignment_note", "").unwrap();
        let doc = s.document();
        for (_, target) in snelex_rules::builtin::JOB_CARD_PROJECTION {
            assert!(doc.is_blank(target), "{target} not cleared");
        }
        assert_eq!(doc.text("job_description"), "Machine parts");
    }

    #[test]
    fn test_job_card_store_outage_is_atomic() {
        let f = make_fixture();
        let mut s = job_card_session();
        f.store.set_offline(true);
        let err = f.engine.set_field(&mut s, "consignment_note", "CN-00001").unwrap_err();
        assert!(matches!(err, SyncError::Lookup { .. }));
        assert_eq!(s.document().text("consignment_note"), "CN-00001");
        assert!(s.document().is_blank("consignment_from"));
    }

    // ── Conditional default ──────────────────────────────────────────

    #[test]
    fn test_completed_job_gets_delivery_date_once() {
        let f = make_fixture();
        let mut s = job_card_session();
        f.engine.set_field(&mut s, "job_status", "In Progress").unwrap();
        assert!(s.document().is_blank("actual_delivery_date"));
        f.engine.set_field(&mut s, "job_status", "Completed").unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(
            s.document().get("actual_delivery_date").and_then(FieldValue::as_date),
            Some(expected)
        );

        let earlier = NaiveDate::from_ymd_opt(2025, 5, 30).unwrap();
        s.document_mut().set("actual_delivery_date", earlier);
        f.engine.on_field_changed(&mut s, "job_status").unwrap();
        assert_eq!(
            s.document().get("actual_delivery_date").and_then(FieldValue::as_date),
            Some(earlier)
        );
    }

    // ── Recompute ────────────────────────────────────────────────────

    #[test]
    fn test_recompute_by_rule_name() {
        let f = make_fixture();
        let mut s = note_session();
        s.document_mut().set("number_of_bags", 4);
        f.engine.recompute(&mut s, "total_pieces").unwrap();
        assert_eq!(s.document().number("total_no_of_pieces"), 4.0);
        assert!(matches!(
            f.engine.recompute(&mut s, "nope"),
            Err(SyncError::UnknownRule { .. })
        ));
    }

    #[test]
    fn test_shipper_address_display() {
        let f = make_fixture();
        let mut s = EditSession::new(Document::new(DocType::Shipper, "SHP-00001"));
        f.engine.set_field(&mut s, "address", "ADDR-1").unwrap();
        assert_eq!(s.document().text("primary_address"), "Dock 4 HQ");
        f.engine.set_field(&mut s, "address", "").unwrap();
        assert!(s.document().is_blank("primary_address"));
    }

    // ── Idempotence ──────────────────────────────────────────────────

    fn edit_strategy() -> impl Strategy<Value = (&'static str, FieldValue)> {
        let quantity = prop::sample::select(snelex_rules::builtin::QUANTITY_FIELDS.to_vec())
            .prop_flat_map(|field| (Just(field), (0i32..50).prop_map(FieldValue::from)));
        let party = prop_oneof![
            Just(("shipper", FieldValue::from("SUP-1"))),
            Just(("shipper", FieldValue::from("SUP-2"))),
            Just(("shipper", FieldValue::from(""))),
            Just(("consignee_customer", FieldValue::from("Globex"))),
            Just(("consignee_customer", FieldValue::from("Nobody"))),
            Just(("payment_by", FieldValue::from("Shipper"))),
            Just(("payment_by", FieldValue::from("Receiver"))),
            Just(("payment_by", FieldValue::from("Third Party"))),
            Just(("consignment_from", FieldValue::from("Warehouse A"))),
            Just(("consignment_to", FieldValue::from("Warehouse A"))),
            Just(("consignment_to", FieldValue::from("Port B"))),
        ];
        prop_oneof![quantity, party]
    }

    proptest! {
        #[test]
        fn prop_on_field_changed_is_idempotent(edits in prop::collection::vec(edit_strategy(), 1..12)) {
            let f = make_fixture();
            let mut s = note_session();
            for (field, value) in edits {
                f.engine.set_field(&mut s, field, value).unwrap();
                let once = s.document().clone();
                let again = f.engine.on_field_changed(&mut s, field).unwrap();
                prop_assert_eq!(s.document(), &once);
                prop_assert!(again.changed.is_empty());
            }
        }

        #[test]
        fn prop_total_matches_quantities(values in prop::collection::vec(0i32..1000, 5)) {
            let f = make_fixture();
            let mut s = note_session();
            for (field, value) in snelex_rules::builtin::QUANTITY_FIELDS.iter().zip(&values) {
                f.engine.set_field(&mut s, field, *value).unwrap();
            }
            let expected: i32 = values.iter().sum();
            prop_assert_eq!(s.document().number("total_no_of_pieces"), f64::from(expected));
        }
    }
}
