//! Fixed-precision helpers shared by the rules.
//!
//! Civilian scoring accumulates in whole thousandths of a point so cap comparisons are exact;
//! 0.132 + 0.060 + 0.048 must land on the 0.24 cap, not a hair above it.

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub(crate) fn to_thousandths(points: f64) -> i64 {
    (points * 1000.0).round() as i64
}

pub(crate) fn from_thousandths(thousandths: i64) -> f64 {
    thousandths as f64 / 1000.0
}

/// Share of the weighted overall evaluation a dimension score represents.
pub(crate) fn weighted_share(points: f64, max_points: f64, weight_percent: f64) -> f64 {
    if max_points <= 0.0 {
        return 0.0;
    }
    round_to(points / max_points * weight_percent, 2)
}
