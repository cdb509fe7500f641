//! # Replay Subcommand
//!
//! Runs a scripted edit session against fixture data.
//!
//! A fixture is a YAML file holding the directory entries and stored
//! documents the session can see, the document to open, and the steps to
//! apply to it:
//!
//! ```yaml
//! today: 2025-06-02
//! directory:
//!   - { kind: Supplier, id: SUP-1, display_name: Acme Supplies }
//! documents:
//!   - name: CN-00001
//!     doc_type: Consignment Note
//!     status: Submitted
//!     fields: { consignment_to: Port B }
//! session:
//!   document: { name: new-job-card-1, doc_type: Job Card }
//!   steps:
//!     - { action: select_source, source: CN-00001 }
//!     - { action: set, field: job_status, value: Completed }
//!     - { action: submit }
//! ```
//!
//! A step that fails is reported and the session carries on, as a user
//! would after seeing the message.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::{Deserialize, Serialize};

use snelex_core::{
    Clock, DirectoryEntry, Document, DocumentId, FieldValue, FixedClock, InMemoryDirectory,
    InMemoryStore, SystemClock, Violation, ViolationKind,
};
use snelex_forms::{FormError, FormHost, LinkOutcome};
use snelex_rules::RuleBook;
use snelex_sync::{EditSession, SyncOutcome};

use crate::load_rules;

/// Arguments for the `snelex replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Fixture file (YAML).
    pub fixture: PathBuf,

    /// Rule book to use; the built-in freight rules when omitted.
    #[arg(long, env = "SNELEX_RULES")]
    pub rules: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

// ─── Fixture ─────────────────────────────────────────────────────────

/// A replay fixture.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    /// Date the clock is frozen at; wall-clock time when omitted.
    #[serde(default)]
    pub today: Option<NaiveDate>,
    #[serde(default)]
    pub directory: Vec<DirectoryEntry>,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub session: SessionScript,
}

/// The document under edit and the steps applied to it.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionScript {
    pub document: Document,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted form event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Edit a field. An empty string clears it.
    Set { field: String, value: FieldValue },
    Refresh,
    /// Save the document, creating missing companion records.
    Save,
    Submit,
    Cancel,
    /// Run a pull action by name.
    Pull { name: String },
    /// Link a source document.
    SelectSource { source: String },
    /// Create a new document of the session's type from a source.
    CreateFromSource { source: String },
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Refresh => "refresh",
            Self::Save => "save",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::Pull { .. } => "pull",
            Self::SelectSource { .. } => "select_source",
            Self::CreateFromSource { .. } => "create_from_source",
        }
    }
}

// ─── Report ──────────────────────────────────────────────────────────

/// Result of one step.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    /// Whether the step completed without messages or errors.
    pub fn is_clean(&self) -> bool {
        self.messages.is_empty() && self.error.is_none()
    }

    fn record(&mut self, outcome: SyncOutcome) {
        self.changed = outcome.changed;
        self.messages = outcome.violations.into_vec();
    }

    fn fail(&mut self, err: FormError) {
        match err.violations() {
            Some(violations) => self.messages = violations.iter().cloned().collect(),
            None => self.error = Some(err.to_string()),
        }
    }
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// The document as the session left it.
    pub document: Document,
    pub steps: Vec<StepReport>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(StepReport::is_clean)
    }
}

// ─── Replay ──────────────────────────────────────────────────────────

/// Run `fixture` against `rules`.
pub fn replay(fixture: &Fixture, rules: RuleBook) -> ReplayReport {
    let directory = InMemoryDirectory::from_entries(fixture.directory.iter().cloned());
    let store = InMemoryStore::from_documents(fixture.documents.iter().cloned());
    let clock: Arc<dyn Clock> = match fixture.today {
        Some(date) => Arc::new(FixedClock::on(date)),
        None => Arc::new(SystemClock),
    };
    let host = FormHost::new(
        Arc::new(rules),
        Arc::new(directory),
        Arc::new(store.clone()),
        Arc::new(store),
        clock,
    );

    let doc = fixture.session.document.clone();
    let doc_type = doc.doc_type;
    let (mut session, _) = match host.open(doc.clone()) {
        Ok(opened) => opened,
        Err(err) => {
            tracing::warn!(error = %err, "refresh on open failed");
            (EditSession::new(doc), SyncOutcome::default())
        }
    };

    let mut reports = Vec::with_capacity(fixture.session.steps.len());
    for (index, step) in fixture.session.steps.iter().enumerate() {
        let mut report = StepReport {
            step: index + 1,
            action: step.label().to_string(),
            ..Default::default()
        };
        tracing::debug!(step = index + 1, action = step.label(), "replaying step");

        let result = match step {
            Step::Set { field, value } => host
                .field_changed(&mut session, field, value.clone())
                .map(|outcome| report.record(outcome)),
            Step::Refresh => host.refresh(&mut session).map(|outcome| report.record(outcome)),
            Step::Submit => host.submit(&mut session),
            Step::Cancel => host.cancel(&mut session),
            Step::Pull { name } => host.pull(&mut session, name).map(|_| ()),
            Step::SelectSource { source } => {
                host.select_source(&mut session, source).map(|outcome| match outcome {
                    LinkOutcome::Linked(outcome) => report.record(outcome),
                    LinkOutcome::DuplicateExists { message, .. } => {
                        report.messages =
                            vec![Violation::general(ViolationKind::DuplicateLink, message)];
                    }
                })
            }
            Step::CreateFromSource { source } => host
                .create_from_source(doc_type, &DocumentId::new(source.as_str()))
                .map(|name| report.created = vec![name]),
            Step::Save => host.save(&session).map(|names| report.created = names),
        };
        if let Err(err) = result {
            report.fail(err);
        }
        reports.push(report);
    }

    ReplayReport {
        document: session.into_document(),
        steps: reports,
    }
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let content = std::fs::read_to_string(&args.fixture)
        .with_context(|| format!("reading fixture: {}", args.fixture.display()))?;
    let fixture: Fixture = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid YAML in {}", args.fixture.display()))?;
    let rules = load_rules(args.rules.as_deref())?;

    let report = replay(&fixture, rules);
    let json = if args.compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
    .context("serializing replay report")?;
    println!("{json}");

    Ok(if report.is_clean() { 0 } else { 1 })
}
