//! crates/adhd_game_core/src/points.rs
//!
//! A fixed-point decimal type for point values.
//!
//! Points cross the API boundary as decimal text ("50", "2.5"). They are kept as a
//! scaled integer with six fractional digits so that no binary floating point ever
//! touches an award.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SCALE_DIGITS: u32 = 6;
const SCALE: i128 = 10i128.pow(SCALE_DIGITS);

/// Errors produced when decimal text cannot be read as [`Points`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePointsError {
    #[error("empty points value")]
    Empty,
    #[error("'{0}' is not a decimal number")]
    Invalid(String),
    #[error("'{0}' is outside the supported range")]
    OutOfRange(String),
}

/// A non-float decimal amount of points with six fractional digits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(i128);

impl Points {
    pub const ZERO: Points = Points(0);

    pub fn from_whole(units: i64) -> Self {
        Self(units as i128 * SCALE)
    }

    /// Converts a finite float, rounding to the nearest representable value.
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // `as` saturates at the i128 bounds.
        Some(Self((value * SCALE as f64).round() as i128))
    }

    /// Strict parse of decimal text.
    pub fn parse(text: &str) -> Result<Self, ParsePointsError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParsePointsError::Empty);
        }
        let invalid = || ParsePointsError::Invalid(trimmed.to_string());
        let out_of_range = || ParsePointsError::OutOfRange(trimmed.to_string());

        let (negative, unsigned) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let whole: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| out_of_range())?
        };

        let mut fraction: i128 = 0;
        for (i, digit) in frac_part.bytes().take(SCALE_DIGITS as usize).enumerate() {
            fraction += i128::from(digit - b'0') * 10i128.pow(SCALE_DIGITS - 1 - i as u32);
        }
        if let Some(next) = frac_part.as_bytes().get(SCALE_DIGITS as usize) {
            if *next >= b'5' {
                fraction += 1;
            }
        }

        let magnitude = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(out_of_range)?;
        Ok(Self(if negative { -magnitude } else { magnitude }))
    }

    /// Parse that never fails: unreadable text becomes zero.
    pub fn parse_lenient(text: &str) -> Self {
        match Self::parse(text) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("Treating points value as 0: {}", e);
                Self::ZERO
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Product of two point values, rounded half away from zero at the internal scale.
    pub fn mul(self, other: Points) -> Points {
        Points(div_round(self.0.saturating_mul(other.0), SCALE))
    }

    /// Quotient by a whole number, rounded half away from zero at the internal scale.
    pub fn div_whole(self, divisor: i64) -> Points {
        if divisor == 0 {
            return Points::ZERO;
        }
        Points(div_round(self.0, i128::from(divisor)))
    }

    /// Rounds half away from zero to `places` decimal places (at most six).
    pub fn round_dp(self, places: u32) -> Points {
        let places = places.min(SCALE_DIGITS);
        let factor = 10i128.pow(SCALE_DIGITS - places);
        Points(div_round(self.0, factor) * factor)
    }

    /// Renders exactly `places` decimals, like a display formatter with fixed precision.
    pub fn to_fixed(self, places: u32) -> String {
        let places = places.min(SCALE_DIGITS);
        let rounded = self.round_dp(places).0;
        let sign = if rounded < 0 { "-" } else { "" };
        let magnitude = rounded.unsigned_abs();
        let whole = magnitude / SCALE as u128;
        if places == 0 {
            return format!("{}{}", sign, whole);
        }
        let frac = (magnitude % SCALE as u128) / 10u128.pow(SCALE_DIGITS - places);
        format!("{}{}.{:0width$}", sign, whole, frac, width = places as usize)
    }
}

fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = (numerator % denominator).abs();
    if remainder >= denominator.abs() - remainder {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let whole = magnitude / SCALE as u128;
        let frac = magnitude % SCALE as u128;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:0width$}", frac, width = SCALE_DIGITS as usize);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Points({})", self)
    }
}

impl FromStr for Points {
    type Err = ParsePointsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct PointsVisitor;

impl<'de> Visitor<'de> for PointsVisitor {
    type Value = Points;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal number as text or a JSON number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Points, E> {
        Points::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Points, E> {
        Ok(Points::from_whole(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Points, E> {
        i64::try_from(v)
            .map(Points::from_whole)
            .map_err(|_| E::custom(format!("{} is outside the supported range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Points, E> {
        Points::from_f64(v).ok_or_else(|| E::custom("points must be finite"))
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PointsVisitor)
    }
}

/// `deserialize_with` helpers for admin-entered configuration, where a malformed
/// numeric field must not make the whole record unreadable.
pub(crate) mod lenient {
    use super::Points;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn from_value(value: Value) -> Option<Points> {
        match value {
            Value::Null => None,
            Value::String(text) => match Points::parse(&text) {
                Ok(points) => Some(points),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable points value: {}", e);
                    None
                }
            },
            // serde_json prints small and large floats in exponent form.
            Value::Number(number) => match Points::parse(&number.to_string()) {
                Ok(points) => Some(points),
                Err(e) => {
                    let points = number.as_f64().and_then(Points::from_f64);
                    if points.is_none() {
                        tracing::warn!("Ignoring unreadable points value: {}", e);
                    }
                    points
                }
            },
            other => {
                tracing::warn!("Ignoring non-numeric points value: {}", other);
                None
            }
        }
    }

    /// Missing, null or unreadable values become zero.
    pub fn points_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Points, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(from_value(value).unwrap_or(Points::ZERO))
    }

    /// Missing, null or unreadable values become `None`.
    pub fn optional_points<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Points>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(from_value(value))
    }
}
