//! # Built-in Freight Rules
//!
//! The rule book of the freight-forwarding forms: Consignment Note,
//! Job Card, Manifest and Shipper.

use snelex_core::{DocStatus, DocType, EntityKind, FieldValue, SnapshotAttr};

use crate::field::{
    AttrTarget, Branch, BranchSource, DefaultValue, Derivation, FieldMap, FieldRule,
    PartyReference,
};
use crate::form::{
    CompanionRule, DefaultRule, EntityCopy, FormRules, LinkRule, PullRule, RefreshRules, RuleBook,
};
use crate::transition::{
    ConditionalRule, Effect, FieldGroup, MandatoryField, TransitionRules, UpstreamRule,
};

/// Shipment quantity fields of a Consignment Note.
pub const QUANTITY_FIELDS: [&str; 5] = [
    "number_of_cartons",
    "number_of_bundles",
    "number_of_pieces",
    "number_of_pallets",
    "number_of_bags",
];

/// Billed-party detail fields of a Consignment Note.
pub const INVOICED_TO_FIELDS: [&str; 6] = [
    "invoiced_to_display_name",
    "invoiced_to_address",
    "invoiced_to_phone",
    "invoiced_to_fax",
    "invoiced_to_email",
    "invoiced_to_web",
];

/// Consignment Note fields copied into a Job Card (source, target).
pub const JOB_CARD_PROJECTION: [(&str, &str); 16] = [
    ("consignment_from", "consignment_from"),
    ("consignment_to", "consignment_to"),
    ("payment_by", "payment_by"),
    ("tracking_no", "tracking_no"),
    ("shipper_display_name", "shipper_name"),
    ("shipper_display_name", "shipper_contact"),
    ("shipper_phone", "shipper_phone"),
    ("shipper_email", "shipper_email"),
    ("consignee_display_name", "consignee_name"),
    ("consignee_display_name", "consignee_contact"),
    ("consignee_phone", "consignee_phone"),
    ("consignee_email", "consignee_email"),
    ("total_no_of_pieces", "total_pieces"),
    ("total_weight_lbs", "total_weight"),
    ("number_of_cartons", "number_of_cartons"),
    ("number_of_bundles", "number_of_bundles"),
];

const SAME_LOCATION: &str = "Consignment From and Consignment To cannot be the same location";

fn map(from: &str, to: &str) -> FieldMap {
    FieldMap {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn attr(attr: SnapshotAttr, field: &str) -> AttrTarget {
    AttrTarget {
        attr,
        field: field.to_string(),
    }
}

fn mandatory(field: &str, label: &str) -> MandatoryField {
    MandatoryField {
        field: field.to_string(),
        label: label.to_string(),
    }
}

fn fixed(field: &str, value: &str) -> DefaultRule {
    DefaultRule {
        field: field.to_string(),
        value: DefaultValue::Fixed(FieldValue::from(value)),
    }
}

fn today(field: &str) -> DefaultRule {
    DefaultRule {
        field: field.to_string(),
        value: DefaultValue::Today,
    }
}

fn set(field: &str, value: &str) -> Effect {
    Effect {
        field: field.to_string(),
        value: FieldValue::from(value),
        only_if: None,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Contact fields `<prefix>_display_name` … `<prefix>_email` from a snapshot.
fn contact_targets(prefix: &str) -> Vec<AttrTarget> {
    vec![
        attr(SnapshotAttr::DisplayName, &format!("{prefix}_display_name")),
        attr(SnapshotAttr::Address, &format!("{prefix}_address")),
        attr(SnapshotAttr::Phone, &format!("{prefix}_phone")),
        attr(SnapshotAttr::Fax, &format!("{prefix}_fax")),
        attr(SnapshotAttr::Email, &format!("{prefix}_email")),
    ]
}

/// `<prefix>_*` → `invoiced_to_*` for the detail fields.
fn invoiced_to_copy(prefix: &str) -> Vec<FieldMap> {
    ["display_name", "address", "phone", "fax", "email", "web"]
        .iter()
        .map(|suffix| map(&format!("{prefix}_{suffix}"), &format!("invoiced_to_{suffix}")))
        .collect()
}

fn consignment_note() -> FormRules {
    let mut consignee = contact_targets("consignee");
    consignee.extend([
        attr(SnapshotAttr::DisplayName, "delivery_contact_person"),
        attr(SnapshotAttr::DisplayName, "name1"),
        attr(SnapshotAttr::Address, "delivery_address"),
        attr(SnapshotAttr::Phone, "delivery_phone"),
        attr(SnapshotAttr::Email, "delivery_email"),
        attr(SnapshotAttr::Fax, "delivery_fax"),
    ]);

    let fields = vec![
        FieldRule {
            name: "shipper_details".into(),
            triggers: strings(&["shipper"]),
            derivation: Derivation::CopyFromEntity {
                entity: EntityKind::Supplier,
                targets: contact_targets("shipper"),
            },
        },
        FieldRule {
            name: "consignee_details".into(),
            triggers: strings(&["consignee_customer"]),
            derivation: Derivation::CopyFromEntity {
                entity: EntityKind::Customer,
                targets: consignee,
            },
        },
        FieldRule {
            name: "invoiced_to_details".into(),
            triggers: strings(&["invoiced_to"]),
            derivation: Derivation::CopyFromEntity {
                entity: EntityKind::Customer,
                targets: contact_targets("invoiced_to"),
            },
        },
        FieldRule {
            name: "distinct_from_location".into(),
            triggers: strings(&["consignment_from"]),
            derivation: Derivation::DistinctFrom {
                paired: "consignment_to".into(),
                message: SAME_LOCATION.into(),
            },
        },
        FieldRule {
            name: "distinct_to_location".into(),
            triggers: strings(&["consignment_to"]),
            derivation: Derivation::DistinctFrom {
                paired: "consignment_from".into(),
                message: SAME_LOCATION.into(),
            },
        },
        FieldRule {
            name: "payment_by".into(),
            triggers: strings(&["payment_by", "shipper", "consignee_customer"]),
            derivation: Derivation::ExclusiveBranch {
                selector: "payment_by".into(),
                reference_field: "invoiced_to".into(),
                party_fields: strings(&INVOICED_TO_FIELDS),
                branches: vec![
                    Branch {
                        value: "Shipper".into(),
                        required: Some("shipper".into()),
                        source: Some(BranchSource {
                            link: "shipper".into(),
                            reference: PartyReference::Lookup {
                                doc_type: DocType::Customer,
                                match_field: "supplier".into(),
                            },
                            copy: invoiced_to_copy("shipper"),
                        }),
                    },
                    Branch {
                        value: "Receiver".into(),
                        required: Some("consignee_customer".into()),
                        source: Some(BranchSource {
                            link: "consignee_customer".into(),
                            reference: PartyReference::Direct,
                            copy: invoiced_to_copy("consignee"),
                        }),
                    },
                    Branch {
                        value: "Third Party".into(),
                        required: None,
                        source: None,
                    },
                ],
            },
        },
        FieldRule {
            name: "total_pieces".into(),
            triggers: strings(&QUANTITY_FIELDS),
            derivation: Derivation::Sum {
                sources: strings(&QUANTITY_FIELDS),
                target: "total_no_of_pieces".into(),
            },
        },
    ];

    let mut submit = TransitionRules::new(DocStatus::Draft, DocStatus::Submitted);
    submit.mandatory = vec![
        mandatory("consignment_date", "Consignment Date"),
        mandatory("consignment_from", "Consignment From"),
        mandatory("consignment_to", "Consignment To"),
        mandatory("payment_by", "Payment By"),
    ];
    submit.at_least_one_of = vec![FieldGroup {
        fields: strings(&QUANTITY_FIELDS),
        message: "At least one shipment detail (Cartons, Bundles, Pieces, Pallets, or Bags) is required"
            .into(),
    }];
    submit.conditional = vec![
        ConditionalRule {
            when: "payment_by".into(),
            equals: "Shipper".into(),
            require: "shipper".into(),
            message: "Shipper (Supplier) is required when Payment By is Shipper".into(),
        },
        ConditionalRule {
            when: "payment_by".into(),
            equals: "Receiver".into(),
            require: "consignee_customer".into(),
            message: "Consignee (Customer) is required when Payment By is Receiver".into(),
        },
    ];
    submit.effects = vec![set("status", "Submitted")];

    let mut cancel = TransitionRules::new(DocStatus::Submitted, DocStatus::Cancelled);
    cancel.effects = vec![set("status", "Cancelled")];

    FormRules {
        doc_type: DocType::ConsignmentNote,
        fields,
        refresh: RefreshRules {
            defaults: Vec::new(),
            recompute: strings(&["total_pieces"]),
        },
        transitions: vec![submit, cancel],
        link: None,
        pulls: Vec::new(),
        companions: Vec::new(),
    }
}

fn job_card() -> FormRules {
    let fields = vec![
        FieldRule {
            name: "consignment_note_details".into(),
            triggers: strings(&["consignment_note"]),
            derivation: Derivation::CopyFromDocument {
                doc_type: DocType::ConsignmentNote,
                projection: JOB_CARD_PROJECTION
                    .iter()
                    .map(|(from, to)| map(from, to))
                    .collect(),
                overlay: vec![map("description", "job_description")],
            },
        },
        FieldRule {
            name: "delivery_date_on_completion".into(),
            triggers: strings(&["job_status"]),
            derivation: Derivation::DefaultWhen {
                equals: "Completed".into(),
                target: "actual_delivery_date".into(),
                value: DefaultValue::Today,
            },
        },
    ];

    let defaults = vec![
        today("job_date"),
        fixed("job_status", "Open"),
        fixed("advance_status", "Open"),
    ];

    let mut submit = TransitionRules::new(DocStatus::Draft, DocStatus::Submitted);
    submit.mandatory = vec![
        mandatory("job_date", "Job Date"),
        mandatory("consignment_note", "Consignment Note"),
        mandatory("job_status", "Job Status"),
    ];
    submit.upstream = vec![UpstreamRule {
        link: "consignment_note".into(),
        doc_type: DocType::ConsignmentNote,
        state: DocStatus::Submitted,
        message: "Job Card can only be created from submitted Consignment Notes".into(),
    }];
    submit.effects = vec![Effect {
        field: "job_status".into(),
        value: "In Progress".into(),
        only_if: Some("Open".into()),
    }];

    let mut cancel = TransitionRules::new(DocStatus::Submitted, DocStatus::Cancelled);
    cancel.effects = vec![set("job_status", "Cancelled")];

    FormRules {
        doc_type: DocType::JobCard,
        fields,
        refresh: RefreshRules {
            defaults: defaults.clone(),
            recompute: Vec::new(),
        },
        transitions: vec![submit, cancel],
        link: Some(LinkRule {
            field: "consignment_note".into(),
            source: DocType::ConsignmentNote,
            source_state: DocStatus::Submitted,
            defaults,
            duplicate_message: "Job Card {existing} already exists for this Consignment Note"
                .into(),
            state_message: "Job Card can only be created from submitted Consignment Notes"
                .into(),
        }),
        pulls: Vec::new(),
        companions: Vec::new(),
    }
}

fn manifest() -> FormRules {
    let mut form = FormRules::new(DocType::Manifest);
    form.pulls.push(PullRule {
        name: "get_consignment_details".into(),
        table: "consignment_details".into(),
        source: DocType::ConsignmentNote,
        inputs: strings(&["manifest_date", "location"]),
        missing_message: "Select the Manifest Date and Location".into(),
        matches: vec![
            map("manifest_date", "consignment_date"),
            map("location", "consignment_to"),
        ],
        columns: vec![
            map("name", "consignment_number"),
            map("consignment_date", "consignment_date"),
            map("consignee_customer", "consignee"),
            map("shipper", "shipper"),
            map("remarks", "remarks"),
        ],
    });
    form
}

fn shipper() -> FormRules {
    let mut form = FormRules::new(DocType::Shipper);
    form.fields.push(FieldRule {
        name: "primary_address".into(),
        triggers: strings(&["address"]),
        derivation: Derivation::CopyFromEntity {
            entity: EntityKind::Address,
            targets: vec![attr(SnapshotAttr::Address, "primary_address")],
        },
    });
    // Every shipper can be billed as a customer.
    form.companions.push(CompanionRule {
        doc_type: DocType::Customer,
        name_field: "customer_name".into(),
        defaults: vec![fixed("customer_type", "Individual")],
        from_entity: Some(EntityCopy {
            link: "address".into(),
            entity: EntityKind::Address,
            targets: vec![attr(SnapshotAttr::Phone, "mobile_no")],
        }),
    });
    form
}

impl RuleBook {
    /// The built-in freight-forwarding rule book.
    pub fn freight() -> Self {
        Self {
            forms: vec![consignment_note(), job_card(), manifest(), shipper()],
        }
    }
}
