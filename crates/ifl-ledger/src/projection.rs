use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ifl_types::{cents_to_usd, round2, AccountId, InvoiceId};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Flat estimated-return rate applied to every position. A demo
/// simplification: not derived from any invoice's actual yield.
pub const EST_RETURN_RATE: f64 = 0.025;

/// One invoice the account holds a position in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: InvoiceId,
    /// Credited contribution in major USD units.
    pub value: f64,
    pub est_return: f64,
    pub maturity: NaiveDate,
}

/// An investor's holdings across all invoices.
///
/// `payouts_today`, `irr`, `delinquency`, and `defaults` are placeholder
/// zeros: the simulation does not compute them from state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub positions: Vec<Position>,
    pub payouts_today: f64,
    pub irr: f64,
    pub delinquency: f64,
    pub defaults: f64,
    pub invested: f64,
    pub est_return_total: f64,
}

/// Deterministic read-only projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    /// Aggregate one account's positions from ledger state.
    pub fn portfolio<R: LedgerReader>(
        reader: &R,
        account: &AccountId,
    ) -> Result<Portfolio, LedgerError> {
        let mut positions = Vec::new();
        let mut invested = 0.0;
        let mut est_return_total = 0.0;

        for invoice in reader.invoices()? {
            let cents = invoice.contributed_cents_by(account);
            if cents > 0 {
                let value = cents_to_usd(cents);
                let est_return = round2(value * EST_RETURN_RATE);
                invested += value;
                est_return_total += est_return;
                positions.push(Position {
                    id: invoice.id.clone(),
                    value,
                    est_return,
                    maturity: invoice.maturity,
                });
            }
        }

        Ok(Portfolio {
            positions,
            payouts_today: 0.0,
            irr: 0.0,
            delinquency: 0.0,
            defaults: 0.0,
            invested: round2(invested),
            est_return_total: round2(est_return_total),
        })
    }
}
