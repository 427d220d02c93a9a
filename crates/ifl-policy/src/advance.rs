//! Advance-rate evaluation from listing evidence.
//!
//! The advance rate is computed once at listing time from the buyer risk
//! tier and the names of the uploaded documents, and is immutable
//! thereafter. Evaluation is a pure function of the policy table.

use ifl_types::RiskTier;

use crate::policy::AdvanceRatePolicy;

/// Exact file name that counts as purchase-order evidence.
const PURCHASE_ORDER_NAME: &str = "po.pdf";

impl AdvanceRatePolicy {
    /// Evaluate the advance rate for a listing.
    ///
    /// Starting from the default rate, each matched evidence class adds its
    /// bonus with the running total clamped to 1.0, and the result is
    /// finally clamped to the risk tier's cap:
    ///
    /// 1. `has_po` if any document is named exactly `po.pdf`;
    /// 2. `has_bol_or_gr` if any document name contains `bol` or `gr`
    ///    (case-insensitive).
    pub fn evaluate(&self, risk: RiskTier, file_names: &[String]) -> f64 {
        let mut rate = self.default;
        if has_purchase_order(file_names) {
            rate = (rate + self.by_evidence.has_po).min(1.0);
        }
        if has_shipping_evidence(file_names) {
            rate = (rate + self.by_evidence.has_bol_or_gr).min(1.0);
        }
        rate.min(self.cap_for(risk))
    }
}

fn has_purchase_order(file_names: &[String]) -> bool {
    file_names.iter().any(|name| name == PURCHASE_ORDER_NAME)
}

fn has_shipping_evidence(file_names: &[String]) -> bool {
    file_names.iter().any(|name| {
        let lower = name.to_lowercase();
        lower.contains("bol") || lower.contains("gr")
    })
}
