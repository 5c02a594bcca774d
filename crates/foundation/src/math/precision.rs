//! Precision policies.
//!
//! - A deterministic float ordering wrapper (`StableF64`) for sorting and keys.
//! - Decimal helpers used to snap grid coordinates onto a fixed number of
//!   fractional digits.

use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

/// Folds `-0.0` into `0.0` and every NaN payload into one canonical NaN, so
/// values that compare equal also share a bit pattern.
pub fn canonical_f64(v: f64) -> f64 {
    match v {
        _ if v.is_nan() => f64::NAN,
        _ if v == 0.0 => 0.0,
        _ => v,
    }
}

/// Deterministic total ordering for floats.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// A float wrapper with a deterministic total ordering and hashing.
///
/// Equality, ordering and hashing all agree because they are derived from
/// the canonical value's bit pattern.
#[derive(Debug, Copy, Clone, Default)]
pub struct StableF64(pub f64);

impl PartialEq for StableF64 {
    fn eq(&self, other: &Self) -> bool {
        stable_total_cmp_f64(self.0, other.0) == Ordering::Equal
    }
}

impl Eq for StableF64 {}

impl PartialOrd for StableF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StableF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        stable_total_cmp_f64(self.0, other.0)
    }
}

impl Hash for StableF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        canonical_f64(self.0).to_bits().hash(state);
    }
}

/// Number of digits after the decimal point in the shortest round-trip
/// representation of `v` (`0.001` -> 3, `0.25` -> 2, `1.0` -> 0).
pub fn decimal_places(v: f64) -> u32 {
    if !v.is_finite() {
        return 0;
    }
    // `Display` for f64 never uses exponent notation.
    let text = format!("{}", v.abs());
    match text.split_once('.') {
        Some((_, fraction)) => fraction.len() as u32,
        None => 0,
    }
}

/// Rounds half away from zero to `places` fractional digits.
pub fn round_to_places(v: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (v * scale).round() / scale
}
