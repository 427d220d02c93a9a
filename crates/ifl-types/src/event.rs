use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::{AccountId, InvoiceId, TokenId, TopicId};
use crate::invoice::RiskTier;

/// A logistics or acknowledgment checkpoint attested on an invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Milestone {
    BuyerAck,
    Pickup,
    Delivery,
    CustomsCleared,
    GoodsReceipt,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BuyerAck => "BUYER_ACK",
            Self::Pickup => "PICKUP",
            Self::Delivery => "DELIVERY",
            Self::CustomsCleared => "CUSTOMS_CLEARED",
            Self::GoodsReceipt => "GOODS_RECEIPT",
        };
        f.write_str(s)
    }
}

impl FromStr for Milestone {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUYER_ACK" => Ok(Self::BuyerAck),
            "PICKUP" => Ok(Self::Pickup),
            "DELIVERY" => Ok(Self::Delivery),
            "CUSTOMS_CLEARED" => Ok(Self::CustomsCleared),
            "GOODS_RECEIPT" => Ok(Self::GoodsReceipt),
            other => Err(TypeError::UnknownMilestone(other.to_string())),
        }
    }
}

/// Who acknowledged an invoice: the buyer directly, or an attester signing
/// the `BUYER_ACK` milestone on the buyer's behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "via")]
pub enum AckSource {
    Buyer { by: AccountId },
    Attester { account: AccountId },
}

/// Per-collector amounts of one fixed transfer fee, in HBAR.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCollectors {
    pub treasury: f64,
    pub insurance_pool: f64,
    pub community: f64,
}

/// One investor's settlement line in a payout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub account: AccountId,
    pub usd: f64,
}

/// Classification of audit-trail events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Listed,
    BondPosted,
    FeeDeducted,
    Invested,
    Milestone,
    BuyerAck,
    Paid,
    Payout,
    BondRefund,
    Closed,
    AttesterRegistered,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Listed => "LISTED",
            Self::BondPosted => "BOND_POSTED",
            Self::FeeDeducted => "HTS_FEE_DEDUCTED",
            Self::Invested => "INVESTED",
            Self::Milestone => "MILESTONE",
            Self::BuyerAck => "BUYER_ACK",
            Self::Paid => "PAID",
            Self::Payout => "PAYOUT",
            Self::BondRefund => "BOND_REFUND",
            Self::Closed => "CLOSED",
            Self::AttesterRegistered => "ATTESTER_REGISTERED",
        };
        f.write_str(s)
    }
}

/// Payload of one audit-trail event.
///
/// The serde tag is the wire-visible event type string, so a serialized
/// log entry reads `{"type": "LISTED", "invoiceId": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "LISTED", rename_all = "camelCase")]
    Listed {
        invoice_id: InvoiceId,
        risk: RiskTier,
        bond_hbar: f64,
        topic_id: TopicId,
    },

    #[serde(rename = "BOND_POSTED", rename_all = "camelCase")]
    BondPosted {
        invoice_id: InvoiceId,
        bond_hbar: f64,
    },

    /// Fixed per-transfer fee split across the system collectors. A
    /// side-channel of investing; does not touch funding accounting.
    #[serde(rename = "HTS_FEE_DEDUCTED", rename_all = "camelCase")]
    FeeDeducted {
        token_id: TokenId,
        fee_hbar: f64,
        collectors: FeeCollectors,
        memo: String,
    },

    #[serde(rename = "INVESTED", rename_all = "camelCase")]
    Invested {
        invoice_id: InvoiceId,
        investor: AccountId,
        /// Credited amount in major USD units.
        amount: f64,
        #[serde(rename = "fundedUSD")]
        funded_usd: f64,
    },

    #[serde(rename = "MILESTONE", rename_all = "camelCase")]
    Milestone {
        invoice_id: InvoiceId,
        attester: AccountId,
        milestone: Milestone,
    },

    #[serde(rename = "BUYER_ACK", rename_all = "camelCase")]
    BuyerAck {
        invoice_id: InvoiceId,
        source: AckSource,
    },

    #[serde(rename = "PAID", rename_all = "camelCase")]
    Paid {
        invoice_id: InvoiceId,
        buyer_payment_txn: String,
        #[serde(rename = "amountPaidUSD")]
        amount_paid_usd: f64,
    },

    #[serde(rename = "PAYOUT", rename_all = "camelCase")]
    Payout {
        invoice_id: InvoiceId,
        payouts: Vec<PayoutEntry>,
    },

    #[serde(rename = "BOND_REFUND", rename_all = "camelCase")]
    BondRefund {
        invoice_id: InvoiceId,
        refund_hbar: f64,
    },

    #[serde(rename = "CLOSED", rename_all = "camelCase")]
    Closed { invoice_id: InvoiceId },

    #[serde(rename = "ATTESTER_REGISTERED", rename_all = "camelCase")]
    AttesterRegistered {
        attester_id: AccountId,
        org_name: String,
        bond_hbar: f64,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Listed { .. } => EventKind::Listed,
            Self::BondPosted { .. } => EventKind::BondPosted,
            Self::FeeDeducted { .. } => EventKind::FeeDeducted,
            Self::Invested { .. } => EventKind::Invested,
            Self::Milestone { .. } => EventKind::Milestone,
            Self::BuyerAck { .. } => EventKind::BuyerAck,
            Self::Paid { .. } => EventKind::Paid,
            Self::Payout { .. } => EventKind::Payout,
            Self::BondRefund { .. } => EventKind::BondRefund,
            Self::Closed { .. } => EventKind::Closed,
            Self::AttesterRegistered { .. } => EventKind::AttesterRegistered,
        }
    }

    /// The invoice this event pertains to, if any.
    pub fn invoice_id(&self) -> Option<&InvoiceId> {
        match self {
            Self::Listed { invoice_id, .. }
            | Self::BondPosted { invoice_id, .. }
            | Self::Invested { invoice_id, .. }
            | Self::Milestone { invoice_id, .. }
            | Self::BuyerAck { invoice_id, .. }
            | Self::Paid { invoice_id, .. }
            | Self::Payout { invoice_id, .. }
            | Self::BondRefund { invoice_id, .. }
            | Self::Closed { invoice_id } => Some(invoice_id),
            Self::FeeDeducted { .. } | Self::AttesterRegistered { .. } => None,
        }
    }
}

/// One immutable audit-trail record.
///
/// `seq` and `ts` are assigned by the event log at append time; the log is
/// append-only and events are never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn invoice_id(&self) -> Option<&InvoiceId> {
        self.payload.invoice_id()
    }
}
