//! Foundation types for the Invoice Factoring Ledger (IFL).
//!
//! This crate provides the identifiers, domain records, and audit-event
//! types used throughout the IFL system. Every other IFL crate depends on
//! `ifl-types`.
//!
//! # Key Types
//!
//! - [`AccountId`], [`TokenId`], [`FileId`], [`TopicId`] — ledger entity
//!   identifiers rendered in `0.0.<num>` form
//! - [`InvoiceId`] — short listing identifier (`INV-XXXX`)
//! - [`Invoice`] — an export invoice listed for funding, with its status
//!   machine and contribution records
//! - [`LedgerEvent`] / [`EventPayload`] — append-only audit trail records
//! - [`Milestone`] — logistics / acknowledgment checkpoint kinds

pub mod error;
pub mod event;
pub mod id;
pub mod invoice;
pub mod money;

pub use error::TypeError;
pub use event::{
    AckSource, EventKind, EventPayload, FeeCollectors, LedgerEvent, Milestone, PayoutEntry,
};
pub use id::{AccountId, FileId, InvoiceId, TokenId, TopicId};
pub use invoice::{Contribution, Invoice, InvoiceStatus, RiskTier, FUNDING_THRESHOLD};
pub use money::{cents_to_usd, round2, usd_to_cents};
