use std::path::Path;

use serde::{Deserialize, Serialize};

use ifl_types::{FeeCollectors, RiskTier};

use crate::error::PolicyError;

/// Exporter bond sizing rule.
///
/// The quoted bond for a listing is `base + percent_of_invoice * face value`,
/// clamped to `[min_hbar, max_hbar]`. The engine records whatever bond the
/// exporter posts; this rule is what listing surfaces quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondPolicy {
    pub percent_of_invoice: f64,
    pub base_hbar: f64,
    pub min_hbar: f64,
    pub max_hbar: f64,
}

impl Default for BondPolicy {
    fn default() -> Self {
        Self {
            percent_of_invoice: 0.01,
            base_hbar: 100.0,
            min_hbar: 50.0,
            max_hbar: 5_000.0,
        }
    }
}

impl BondPolicy {
    /// Quoted bond for an invoice of the given face value.
    pub fn required_bond(&self, amount_usd: f64) -> f64 {
        let raw = self.base_hbar + self.percent_of_invoice * amount_usd;
        raw.clamp(self.min_hbar, self.max_hbar)
    }
}

/// One late-payment slashing tier: applies when days late fall in
/// `(gt, lte]` (an open bound is unbounded on that side).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LateTier {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lte: Option<u32>,
    pub slash: f64,
}

/// Bond-forfeiture fractions per violation.
///
/// These tiers are configured inputs for a settlement rule that the
/// simulation does not yet apply: payout refunds the posted bond in full.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingPolicy {
    pub fraud: f64,
    pub no_buyer_ack: f64,
    pub late_payment: Vec<LateTier>,
}

impl Default for SlashingPolicy {
    fn default() -> Self {
        Self {
            fraud: 1.0,
            no_buyer_ack: 0.5,
            late_payment: vec![
                LateTier { gt: None, lte: Some(30), slash: 0.10 },
                LateTier { gt: Some(30), lte: None, slash: 0.25 },
            ],
        }
    }
}

/// Advance-rate bonuses granted per class of uploaded evidence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceBonuses {
    /// A purchase order (`po.pdf`) is attached.
    pub has_po: f64,
    /// A bill of lading or goods receipt is attached.
    pub has_bol_or_gr: f64,
    /// The buyer has acknowledged the invoice (reserved; listing-time
    /// evaluation only sees uploaded documents).
    pub buyer_ack: f64,
}

impl Default for EvidenceBonuses {
    fn default() -> Self {
        Self {
            has_po: 0.05,
            has_bol_or_gr: 0.05,
            buyer_ack: 0.05,
        }
    }
}

/// Hard advance-rate ceiling per buyer risk tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskCaps {
    pub green: f64,
    pub yellow: f64,
    pub red: f64,
}

impl Default for RiskCaps {
    fn default() -> Self {
        Self {
            green: 0.90,
            yellow: 0.80,
            red: 0.65,
        }
    }
}

/// Fraction of face value fundable before maturity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvanceRatePolicy {
    pub default: f64,
    pub by_evidence: EvidenceBonuses,
    pub caps_by_risk: RiskCaps,
}

impl Default for AdvanceRatePolicy {
    fn default() -> Self {
        Self {
            default: 0.75,
            by_evidence: EvidenceBonuses::default(),
            caps_by_risk: RiskCaps::default(),
        }
    }
}

impl AdvanceRatePolicy {
    pub fn cap_for(&self, risk: RiskTier) -> f64 {
        match risk {
            RiskTier::Green => self.caps_by_risk.green,
            RiskTier::Yellow => self.caps_by_risk.yellow,
            RiskTier::Red => self.caps_by_risk.red,
        }
    }
}

/// Collector split ratios for the fixed transfer fee. Expected to sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSplit {
    pub treasury: f64,
    pub insurance_pool: f64,
    pub community: f64,
}

impl Default for FeeSplit {
    fn default() -> Self {
        Self {
            treasury: 0.5,
            insurance_pool: 0.3,
            community: 0.2,
        }
    }
}

/// Transfer fee amount and platform take.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesPolicy {
    /// Fixed fee charged per fractional-claim transfer, in HBAR.
    pub hts_custom_fixed_fee_hbar: f64,
    pub platform_pct: f64,
    pub fee_split: FeeSplit,
}

impl Default for FeesPolicy {
    fn default() -> Self {
        Self {
            hts_custom_fixed_fee_hbar: 1.0,
            platform_pct: 0.01,
            fee_split: FeeSplit::default(),
        }
    }
}

impl FeesPolicy {
    /// Split one fixed transfer fee across the system collectors.
    pub fn split_fee(&self) -> FeeCollectors {
        let fee = self.hts_custom_fixed_fee_hbar;
        FeeCollectors {
            treasury: fee * self.fee_split.treasury,
            insurance_pool: fee * self.fee_split.insurance_pool,
            community: fee * self.fee_split.community,
        }
    }
}

/// Attester registration and misbehavior rules.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttesterPolicy {
    pub min_bond_hbar: f64,
    pub slash_on_bad_sign: f64,
    pub min_attesters_for_high_risk: u32,
}

impl Default for AttesterPolicy {
    fn default() -> Self {
        Self {
            min_bond_hbar: 500.0,
            slash_on_bad_sign: 0.2,
            min_attesters_for_high_risk: 2,
        }
    }
}

/// The complete marketplace policy table.
///
/// Loaded once at process start and read-only for the lifetime of the
/// process. A TOML override file may replace any subset of sections; the
/// built-in defaults fill the rest.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTable {
    pub bond: BondPolicy,
    pub slashing: SlashingPolicy,
    pub advance_rate: AdvanceRatePolicy,
    pub fees: FeesPolicy,
    pub attester: AttesterPolicy,
}

impl PolicyTable {
    /// Parse a policy table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a policy table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
