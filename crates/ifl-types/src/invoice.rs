use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{AccountId, FileId, InvoiceId, TokenId, TopicId};
use crate::money::cents_to_usd;

/// Fraction of face value at which a listing counts as funded.
pub const FUNDING_THRESHOLD: f64 = 0.2;

/// Buyer risk classification assigned at listing time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        };
        f.write_str(s)
    }
}

impl FromStr for RiskTier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            other => Err(TypeError::UnknownRiskTier(other.to_string())),
        }
    }
}

/// Lifecycle status of a listing.
///
/// Transitions only ever move forward: `LISTED → FUNDED → ACKED → CLOSED`,
/// with `ACKED` reachable straight from `LISTED` on an early buyer
/// acknowledgment. `CLOSED` is terminal. A payment is recorded as a `PAID`
/// event, not a persisted status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Listed,
    Funded,
    Acked,
    Closed,
}

impl InvoiceStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Listed => 0,
            Self::Funded => 1,
            Self::Acked => 2,
            Self::Closed => 3,
        }
    }

    /// Advance to `next` if that is a forward transition.
    ///
    /// Returns `true` if the status changed. A request to move backwards
    /// (e.g. a funding re-check after acknowledgment) is ignored.
    pub fn advance_to(&mut self, next: InvoiceStatus) -> bool {
        if next.rank() > self.rank() {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Listed => "LISTED",
            Self::Funded => "FUNDED",
            Self::Acked => "ACKED",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// One credited investor contribution, in minor units of the
/// fractional-claim token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub account: AccountId,
    /// Minor units (two decimals) actually credited toward funding.
    pub amount: i64,
}

/// An export invoice listed for funding.
///
/// `id`, `nft_id`, `ft_id`, `file_ids`, `topic_id`, and `advance_rate` are
/// assigned at creation and never change. `funded_usd` is monotonically
/// non-decreasing and capped at [`Invoice::advance_cap_usd`]; `investors`
/// is append-only and its minor-unit total always equals `funded_usd`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub buyer: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
    pub maturity: NaiveDate,
    pub risk: RiskTier,
    pub nft_id: TokenId,
    pub ft_id: TokenId,
    pub file_ids: Vec<FileId>,
    pub topic_id: TopicId,
    pub status: InvoiceStatus,
    #[serde(rename = "fundedUSD")]
    pub funded_usd: f64,
    pub advance_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bond_hbar: Option<f64>,
    pub investors: Vec<Contribution>,
}

impl Invoice {
    /// The most that may ever be funded against this invoice, in whole USD.
    pub fn advance_cap_usd(&self) -> f64 {
        (self.amount_usd * self.advance_rate).floor()
    }

    /// Funding level at which the listing becomes `FUNDED`, in whole USD.
    pub fn funding_threshold_usd(&self) -> f64 {
        (self.amount_usd * FUNDING_THRESHOLD).floor()
    }

    /// Total minor units credited by one account across all contributions.
    pub fn contributed_cents_by(&self, account: &AccountId) -> i64 {
        self.investors
            .iter()
            .filter(|c| c.account == *account)
            .map(|c| c.amount)
            .sum()
    }

    /// Total credited contributions in major USD units.
    pub fn contributed_usd(&self) -> f64 {
        cents_to_usd(self.investors.iter().map(|c| c.amount).sum())
    }

    pub fn is_closed(&self) -> bool {
        self.status == InvoiceStatus::Closed
    }
}
