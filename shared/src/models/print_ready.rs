//! Print-Ready Fields Model

use serde::{Deserialize, Serialize};

/// Pre-composed receipt broken into final string slots
///
/// Layout composition already happened upstream; rendering only substitutes
/// these strings into the receipt skeleton.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PrintReadyFields {
    pub ticket_no: String,
    pub date: String,
    pub time: String,
    /// Header block (table, customer, etc.)
    pub entities: String,
    pub orders: String,
    pub discounts: String,
    pub ticket_total: String,
    pub payment_details: String,
}
