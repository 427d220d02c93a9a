//! Minor-unit (cent) conversions and the two-decimal rounding rule.
//!
//! Contributions are tracked in minor units of the fractional-claim token
//! (two decimals); funded progress, payouts, and portfolio values are major
//! USD units rounded with [`round2`].

/// Convert minor units (cents) to major USD units.
pub fn cents_to_usd(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Convert major USD units to minor units, rounding to the nearest cent.
pub fn usd_to_cents(usd: f64) -> i64 {
    (usd * 100.0).round() as i64
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(cents_to_usd(100_000), 1000.0);
        assert_eq!(usd_to_cents(1000.0), 100_000);
        assert_eq!(usd_to_cents(cents_to_usd(12_345)), 12_345);
    }

    #[test]
    fn round2_truncates_sub_cent_amounts() {
        assert_eq!(round2(599.999), 600.0);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(123.4), 123.4);
    }
}
