//! Replay and rules subcommands against fixture files.

use std::io::Write;

use snelex_cli::replay::{replay, Fixture};
use snelex_cli::rules::{run_rules, RulesArgs, RulesCommand};
use snelex_core::{DocStatus, FieldValue, ViolationKind};
use snelex_rules::RuleBook;

fn load_fixture(yaml: &str) -> Fixture {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn replay_consignment_flow() {
    let fixture = load_fixture(include_str!("fixtures/consignment_flow.yaml"));
    let report = replay(&fixture, RuleBook::freight());
    assert!(!report.is_clean());

    let same_location = &report.steps[2];
    assert_eq!(same_location.messages.len(), 1);
    assert_eq!(same_location.messages[0].kind, ViolationKind::DistinctValues);

    let first_submit = &report.steps[7];
    assert_eq!(first_submit.action, "submit");
    let kinds: Vec<_> = first_submit.messages.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![ViolationKind::AtLeastOneOf]);

    assert!(report.steps[10].is_clean());
    let doc = &report.document;
    assert_eq!(doc.status, DocStatus::Submitted);
    assert_eq!(doc.text("status"), "Submitted");
    assert_eq!(doc.text("consignment_to"), "Port B");
    assert_eq!(doc.text("invoiced_to"), "CUST-00007");
    assert_eq!(doc.text("invoiced_to_display_name"), "Acme Supplies");
    assert_eq!(doc.number("total_no_of_pieces"), 5.0);
    assert_eq!(
        doc.get("consignment_date").and_then(FieldValue::as_date),
        chrono::NaiveDate::from_ymd_opt(2025, 6, 2)
    );
}

#[test]
fn replay_job_card_flow() {
    let fixture = load_fixture(include_str!("fixtures/job_card_flow.yaml"));
    let report = replay(&fixture, RuleBook::freight());

    let duplicate = &report.steps[0];
    assert_eq!(duplicate.messages.len(), 1);
    assert_eq!(duplicate.messages[0].kind, ViolationKind::DuplicateLink);
    assert_eq!(
        duplicate.messages[0].message,
        "Job Card JC-00001 already exists for this Consignment Note"
    );

    assert!(report.steps[1].is_clean());
    assert!(report.steps[3].is_clean());

    // Edits after submission fail.
    assert!(report.steps[4].error.is_some());

    let doc = &report.document;
    assert_eq!(doc.status, DocStatus::Submitted);
    assert_eq!(doc.text("tracking_no"), "TRK-991");
    assert_eq!(doc.text("job_description"), "Machine parts");
    assert_eq!(doc.text("job_status"), "Completed");
    assert!(doc.get("actual_delivery_date").is_some());
    assert!(doc.is_blank("remarks"));
}

#[test]
fn replay_shipper_save_creates_customer_once() {
    let fixture = load_fixture(
        r#"
today: 2025-06-02
directory:
  - { kind: Address, id: ADDR-1, address: "Dock 4, Port B", phone: 555-0400 }
session:
  document: { name: Acme Freight, doc_type: Shipper }
  steps:
    - { action: set, field: address, value: ADDR-1 }
    - { action: save }
    - { action: save }
"#,
    );
    let report = replay(&fixture, RuleBook::freight());
    assert!(report.is_clean());
    assert_eq!(report.document.text("primary_address"), "Dock 4, Port B");
    assert_eq!(report.steps[1].action, "save");
    assert_eq!(
        report.steps[1].created.iter().map(|n| n.as_str()).collect::<Vec<_>>(),
        vec!["CUST-00001"]
    );
    assert!(report.steps[2].created.is_empty());
}

#[test]
fn report_serializes_to_json() {
    let fixture = load_fixture(include_str!("fixtures/job_card_flow.yaml"));
    let report = replay(&fixture, RuleBook::freight());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["document"]["doc_type"], "Job Card");
    assert_eq!(json["steps"][0]["action"], "select_source");
    assert!(json["steps"][1].get("error").is_none());
}

#[test]
fn rules_check_accepts_dumped_book() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let yaml = RuleBook::freight().to_yaml().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let args = RulesArgs {
        command: RulesCommand::Check {
            rules: file.path().to_path_buf(),
        },
    };
    assert_eq!(run_rules(&args).unwrap(), 0);
}

#[test]
fn rules_check_reports_invalid_book() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"
forms:
  - doc_type: Consignment Note
    fields:
      - name: total
        triggers: []
        derivation: { kind: sum, sources: [number_of_bags], target: total_no_of_pieces }
"#,
    )
    .unwrap();
    let args = RulesArgs {
        command: RulesCommand::Check {
            rules: file.path().to_path_buf(),
        },
    };
    assert_eq!(run_rules(&args).unwrap(), 1);
}

#[test]
fn rules_check_missing_file_is_error() {
    let args = RulesArgs {
        command: RulesCommand::Check {
            rules: "/nonexistent/book.yaml".into(),
        },
    };
    assert!(run_rules(&args).is_err());
}
