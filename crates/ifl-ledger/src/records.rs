use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ifl_types::{Invoice, PayoutEntry, RiskTier};

/// Input for listing a new invoice.
///
/// Values are taken as given: the engine coerces a non-finite or negative
/// face value to zero instead of rejecting it (a deliberate permissiveness
/// of the simulation; typed fields already rule out malformed risk tiers
/// and dates).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub buyer: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub maturity: NaiveDate,
    pub risk: RiskTier,
    pub file_names: Vec<String>,
}

/// Input for registering an attesting organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAttester {
    pub org_name: String,
    pub contact: String,
    /// Posted bond; zero or negative falls back to the policy minimum.
    pub bond_hbar: f64,
}

/// Result of an investment: the updated invoice plus the amount actually
/// credited after advance-cap truncation.
#[derive(Clone, Debug, PartialEq)]
pub struct Investment {
    pub invoice: Invoice,
    /// Major USD units credited toward funding; less than the requested
    /// amount when the advance cap truncated the investment.
    pub credited_usd: f64,
}

/// Result of an attester signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Attestation {
    pub invoice: Invoice,
    /// Set when this signature auto-registered the attester at the policy
    /// minimum bond because no registration existed.
    pub implicitly_registered: bool,
}

/// Result of settling an invoice.
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement {
    pub invoice: Invoice,
    /// Pro-rata investor payouts, rounded per account to whole cents.
    pub payouts: Vec<PayoutEntry>,
    /// The exporter's bond, returned in full; no slashing is applied.
    pub refund_hbar: f64,
}
