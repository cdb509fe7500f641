//! # Document Types
//!
//! The closed set of record types the forms operate on. Serialized with
//! their display names ("Consignment Note") so rule books and fixtures
//! read like the host framework's doctype names.

use serde::{Deserialize, Serialize};

/// A record type known to the forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocType {
    /// Shipment contract between shipper and consignee.
    #[serde(rename = "Consignment Note")]
    ConsignmentNote,
    /// Operational job raised from a submitted Consignment Note.
    #[serde(rename = "Job Card")]
    JobCard,
    /// Dispatch list of Consignment Notes for a date and location.
    #[serde(rename = "Manifest")]
    Manifest,
    /// Shipper master record.
    #[serde(rename = "Shipper")]
    Shipper,
    /// Customer master record (directory-backed, read only here).
    #[serde(rename = "Customer")]
    Customer,
}

impl DocType {
    /// All document types, in declaration order.
    pub const ALL: [DocType; 5] = [
        Self::ConsignmentNote,
        Self::JobCard,
        Self::Manifest,
        Self::Shipper,
        Self::Customer,
    ];

    /// Display name, as used by the host framework.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsignmentNote => "Consignment Note",
            Self::JobCard => "Job Card",
            Self::Manifest => "Manifest",
            Self::Shipper => "Shipper",
            Self::Customer => "Customer",
        }
    }

    /// Prefix of the naming series for new records of this type.
    pub fn naming_prefix(&self) -> &'static str {
        match self {
            Self::ConsignmentNote => "CN",
            Self::JobCard => "JC",
            Self::Manifest => "MF",
            Self::Shipper => "SHP",
            Self::Customer => "CUST",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
