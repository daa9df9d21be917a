use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::fmt;

/// Loyalty points, fixed-point with 2 decimal places.
///
/// Stored as raw hundredths everywhere (database columns, ledger sums) and
/// rendered as a plain JSON number on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(i64);

impl Points {
    const MULTIPLIER: i64 = 100;  // 10^2

    pub fn from_raw(value: i64) -> Self {
        Points(value)
    }

    pub fn raw_value(&self) -> i64 {
        self.0
    }

    /// Whole points, e.g. `from_units(500)` is 500.00.
    pub fn from_units(units: i64) -> Self {
        Points(units * Self::MULTIPLIER)
    }

    pub fn from_f64(value: f64) -> Self {
        Points((value * Self::MULTIPLIER as f64).round() as i64)
    }

    /// Like `from_f64`, but `None` for NaN, infinities and values whose
    /// hundredths do not fit in an `i64`.
    pub fn try_from_f64(value: f64) -> Option<Self> {
        let max = (i64::MAX / Self::MULTIPLIER) as f64;
        if !value.is_finite() || value.abs() >= max {
            return None;
        }
        Some(Points::from_f64(value))
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Points(0)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_sub(self, other: Points) -> Option<Points> {
        self.0.checked_sub(other.0).map(Points)
    }

    pub fn checked_add(self, other: Points) -> Option<Points> {
        self.0.checked_add(other.0).map(Points)
    }
}

impl Add for Points {
    type Output = Points;
    fn add(self, other: Points) -> Points {
        Points(self.0 + other.0)
    }
}

impl AddAssign for Points {
    fn add_assign(&mut self, other: Points) {
        self.0 += other.0;
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Points {
        iter.fold(Points::zero(), Add::add)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let multiplier = Self::MULTIPLIER as u64;
        write!(f, "{}{}.{:02}", sign, abs / multiplier, abs % multiplier)
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Points::try_from_f64(value).ok_or_else(|| {
            serde::de::Error::custom(format!("points out of range: {}", value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wire_numbers() {
        let whole: Points = serde_json::from_str("500").unwrap();
        let fractional: Points = serde_json::from_str("729.98").unwrap();

        assert_eq!(whole, Points::from_units(500));
        assert_eq!(fractional.raw_value(), 72998);
        assert!(serde_json::from_str::<Points>("\"ten\"").is_err());
    }

    #[test]
    fn rejects_amounts_beyond_fixed_point_range() {
        assert!(serde_json::from_str::<Points>("1e300").is_err());
        assert!(serde_json::from_str::<Points>("-1e300").is_err());
        assert!(serde_json::from_str::<Points>("1e18").is_err());
        assert_eq!(Points::try_from_f64(f64::NAN), None);

        let large: Points = serde_json::from_str("1000000000000").unwrap();
        assert_eq!(large, Points::from_units(1_000_000_000_000));
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Points::from_raw(72998).to_string(), "729.98");
        assert_eq!(Points::from_raw(5).to_string(), "0.05");
        assert_eq!(Points::from_raw(-150).to_string(), "-1.50");
    }

    #[test]
    fn checked_sub_reports_overflow_only() {
        assert_eq!(
            Points::from_units(5).checked_sub(Points::from_units(7)),
            Some(Points::from_units(-2))
        );
        assert_eq!(Points::from_raw(i64::MIN).checked_sub(Points::from_raw(1)), None);
    }
}
