//! Arbitrary-precision integers for coin and asset quantities.
//!
//! `Int` wraps a `BigInt` so amounts never lose precision, whichever encoding
//! they arrive in. Values that fit in 64 bits serialize as native integers;
//! anything larger falls back to a decimal string so the wire never sees a
//! float. Wider integer literals are read exactly when the text goes through
//! [`crate::codec::json::decode`].

use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DecodeError;

/// An exact signed integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int(BigInt);

impl Int {
    pub fn new(v: i64) -> Self {
        Self(BigInt::from(v))
    }

    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Returns the value as `i64` if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Returns the value as `u64` if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }
}

impl From<i64> for Int {
    fn from(v: i64) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<u64> for Int {
    fn from(v: u64) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<i128> for Int {
    fn from(v: i128) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<u128> for Int {
    fn from(v: u128) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<BigInt> for Int {
    fn from(v: BigInt) -> Self {
        Self(v)
    }
}

impl FromStr for Int {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s.trim())
            .map(Self)
            .map_err(|e| DecodeError::InvalidInteger(format!("{s:?}: {e}")))
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Int {
    type Output = Int;

    fn add(self, rhs: Int) -> Int {
        Int(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Int> for &'a Int {
    type Output = Int;

    fn add(self, rhs: &'a Int) -> Int {
        Int(&self.0 + &rhs.0)
    }
}

impl Sub for Int {
    type Output = Int;

    fn sub(self, rhs: Int) -> Int {
        Int(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Int> for &'a Int {
    type Output = Int;

    fn sub(self, rhs: &'a Int) -> Int {
        Int(&self.0 - &rhs.0)
    }
}

impl Neg for Int {
    type Output = Int;

    fn neg(self) -> Int {
        Int(-self.0)
    }
}

impl Serialize for Int {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(v) = self.0.to_i64() {
            serializer.serialize_i64(v)
        } else if let Some(v) = self.0.to_u64() {
            serializer.serialize_u64(v)
        } else {
            // Readers degrade integers past 64 bits to floats, or reject them
            // inside buffered (untagged) shapes.
            serializer.serialize_str(&self.0.to_string())
        }
    }
}

struct IntVisitor;

impl<'de> Visitor<'de> for IntVisitor {
    type Value = Int;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a decimal integer string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Int, E> {
        Ok(Int::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Int, E> {
        Ok(Int::from(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Int, E> {
        Ok(Int::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Int, E> {
        Ok(Int::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Int, E> {
        // Also what serde_json hands over for integer literals past 64 bits;
        // `codec::json::decode` quotes those so they arrive via `visit_str`.
        Err(E::custom(format!("refusing to read float {v} as an exact integer")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Int, E> {
        Int::from_str(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Int {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IntVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_is_exact_beyond_u64() {
        let a = Int::from(u64::MAX);
        let b = Int::from(u64::MAX);
        let sum = &a + &b;
        assert_eq!(sum.to_string(), "36893488147419103230");
        assert_eq!(&sum - &b, a);
    }

    #[test]
    fn subtraction_goes_negative() {
        let d = Int::new(5) - Int::new(10);
        assert!(d.is_negative());
        assert_eq!(d.to_i64(), Some(-5));
    }

    #[test]
    fn json_native_integer() {
        let v: Int = serde_json::from_str("45000000000000000").unwrap();
        assert_eq!(v.to_u64(), Some(45_000_000_000_000_000));
        assert_eq!(serde_json::to_string(&v).unwrap(), "45000000000000000");
    }

    #[test]
    fn json_decimal_string_for_huge_values() {
        let huge = "340282366920938463463374607431768211456000"; // > u128::MAX
        let v: Int = serde_json::from_str(&format!("\"{huge}\"")).unwrap();
        assert_eq!(v.to_string(), huge);
        assert_eq!(serde_json::to_string(&v).unwrap(), format!("\"{huge}\""));
    }

    #[test]
    fn json_rejects_floats() {
        assert!(serde_json::from_str::<Int>("1.5").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "12ab".parse::<Int>(),
            Err(DecodeError::InvalidInteger(_))
        ));
    }
}
