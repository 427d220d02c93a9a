//! Marketplace policy table for the Invoice Factoring Ledger (IFL).
//!
//! The policy table is process-wide immutable configuration: it is loaded
//! once at startup (built-in defaults, optionally overridden from a TOML
//! file) and never mutated at runtime. It covers:
//!
//! - Exporter bond sizing ([`BondPolicy`])
//! - Slashing tiers ([`SlashingPolicy`]) — configured inputs for a future
//!   settlement rule; payout currently refunds bonds in full
//! - Advance-rate defaults, evidence bonuses, and per-risk caps
//!   ([`AdvanceRatePolicy`]), including the evaluation algorithm
//! - The fixed transfer fee and its collector split ([`FeesPolicy`])
//! - Attester bonding minimums ([`AttesterPolicy`])

pub mod advance;
pub mod error;
pub mod policy;

pub use error::PolicyError;
pub use policy::{
    AdvanceRatePolicy, AttesterPolicy, BondPolicy, EvidenceBonuses, FeesPolicy, FeeSplit,
    LateTier, PolicyTable, RiskCaps, SlashingPolicy,
};
