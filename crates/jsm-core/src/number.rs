use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number as JsonNumber;

use crate::CanonicalizeError;

/// A JSON number in the form it was written: a signed or unsigned integer,
/// or a finite double.
///
/// Integers compare exactly, so values beyond 2^53 stay distinct. An integer
/// and a float are equal only when the float holds exactly that integer,
/// making `1` and `1.0` the same scalar for conflict purposes.
#[derive(Clone, Copy, Debug)]
pub struct Number(Repr);

#[derive(Clone, Copy, Debug)]
enum Repr {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Creates a floating-point [`Number`] after validating finiteness.
    ///
    /// ```
    /// # use jsm_core::Number;
    /// let num = Number::new(42.5)?;
    /// assert_eq!(num.get(), 42.5);
    /// assert!(Number::new(f64::NAN).is_err());
    /// # Ok::<(), jsm_core::CanonicalizeError>(())
    /// ```
    pub fn new(value: f64) -> Result<Self, CanonicalizeError> {
        if value.is_finite() {
            Ok(Self(Repr::Float(value)))
        } else {
            Err(CanonicalizeError::NotFinite { value })
        }
    }

    /// Converts a parsed `serde_json` number, keeping integers exact.
    pub fn from_json_number(number: &JsonNumber) -> Result<Self, CanonicalizeError> {
        if let Some(value) = number.as_u64() {
            return Ok(Self::from(value));
        }
        if let Some(value) = number.as_i64() {
            return Ok(Self::from(value));
        }
        match number.as_f64() {
            Some(value) => Self::new(value),
            None => Err(CanonicalizeError::NumberOutOfRange { value: number.to_string() }),
        }
    }

    /// The value as a double. Lossy for integers beyond 2^53.
    #[must_use]
    pub fn get(self) -> f64 {
        match self.0 {
            Repr::Int(value) => value as f64,
            Repr::UInt(value) => value as f64,
            Repr::Float(value) => value,
        }
    }

    /// The exact integer value, when the number was written as an integer.
    #[must_use]
    pub fn as_integer(self) -> Option<i128> {
        match self.0 {
            Repr::Int(value) => Some(i128::from(value)),
            Repr::UInt(value) => Some(i128::from(value)),
            Repr::Float(_) => None,
        }
    }

    /// Whether the number has no fractional part (JSON Schema `integer`).
    #[must_use]
    pub fn is_integer(self) -> bool {
        match self.0 {
            Repr::Int(_) | Repr::UInt(_) => true,
            Repr::Float(value) => value.fract() == 0.0,
        }
    }

    /// Converts into a `serde_json::Number` in the original representation.
    #[must_use]
    pub fn to_json_number(self) -> JsonNumber {
        match self.0 {
            Repr::Int(value) => JsonNumber::from(value),
            Repr::UInt(value) => JsonNumber::from(value),
            // Finite by construction, so from_f64 cannot reject it.
            Repr::Float(value) => {
                JsonNumber::from_f64(value).unwrap_or_else(|| JsonNumber::from(0))
            }
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self(Repr::Int(value))
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Self(Repr::UInt(value))
    }
}

/// Whether `float` holds exactly `integer`.
fn float_is_integer(float: f64, integer: i128) -> bool {
    // `as` saturates, and saturated values lie outside the i64/u64 range.
    float.fract() == 0.0 && float as i128 == integer
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_integer(), other.as_integer()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (Some(integer), None) => float_is_integer(other.get(), integer),
            (None, Some(integer)) => float_is_integer(self.get(), integer),
            (None, None) => self.get() == other.get(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_number())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json_number().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let number = JsonNumber::deserialize(deserializer)?;
        Self::from_json_number(&number).map_err(serde::de::Error::custom)
    }
}
