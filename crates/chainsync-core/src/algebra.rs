//! Exact arithmetic over multi-asset values.
//!
//! Results only ever hold asset keys present in at least one operand, and
//! subtraction may go negative: a deficit is a valid value, not an error.

use std::fmt;
use std::ops::{Add, Sub};

use crate::asset::AssetId;
use crate::num::Int;
use crate::value::Value;

/// Coin-wise sum; assets are the union of both operands' keys.
pub fn add(a: &Value, b: &Value) -> Value {
    let mut result = a.clone();
    result.coins = &a.coins + &b.coins;
    for (asset, amount) in &b.assets {
        let entry = result.assets.entry(asset.clone()).or_default();
        *entry = &*entry + amount;
    }
    result
}

/// Coin-wise difference; assets are the union of both operands' keys.
pub fn subtract(a: &Value, b: &Value) -> Value {
    let mut result = a.clone();
    result.coins = &a.coins - &b.coins;
    for (asset, amount) in &b.assets {
        let entry = result.assets.entry(asset.clone()).or_default();
        *entry = &*entry - amount;
    }
    result
}

/// What `have` lacks to cover `want`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    Coins { have: Int, want: Int },
    Asset { asset: AssetId, have: Int, want: Int },
}

impl Shortfall {
    /// The asset that is short, or `None` when coins are short.
    pub fn asset(&self) -> Option<&AssetId> {
        match self {
            Self::Coins { .. } => None,
            Self::Asset { asset, .. } => Some(asset),
        }
    }

    /// How much more is needed.
    pub fn missing(&self) -> Int {
        match self {
            Self::Coins { have, want } | Self::Asset { have, want, .. } => want - have,
        }
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coins { have, want } => {
                write!(f, "not enough coins to meet demand (have {have}, want {want})")
            }
            Self::Asset { asset, have, want } => {
                write!(f, "not enough {asset} to meet demand (have {have}, want {want})")
            }
        }
    }
}

/// Checks that `have` covers `want`.
///
/// Coins are checked first, then assets in key order; the first shortfall
/// found is reported. An asset missing from `have` counts as zero.
pub fn enough(have: &Value, want: &Value) -> Result<(), Shortfall> {
    if have.coins < want.coins {
        return Err(Shortfall::Coins {
            have: have.coins.clone(),
            want: want.coins.clone(),
        });
    }
    for (asset, wanted) in &want.assets {
        let held = have.asset(asset);
        if &held < wanted {
            return Err(Shortfall::Asset {
                asset: asset.clone(),
                have: held,
                want: wanted.clone(),
            });
        }
    }
    Ok(())
}

impl<'a> Add<&'a Value> for &'a Value {
    type Output = Value;

    fn add(self, rhs: &'a Value) -> Value {
        add(self, rhs)
    }
}

impl<'a> Sub<&'a Value> for &'a Value {
    type Output = Value;

    fn sub(self, rhs: &'a Value) -> Value {
        subtract(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> AssetId {
        AssetId::from_parts("29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6", "4d494e")
    }

    fn y() -> AssetId {
        AssetId::from_parts("f66d78b4a3cb3d37afa0ec36461e51ecbde00f26c8f0a68f94b69880", "")
    }

    #[test]
    fn add_unions_keys() {
        let a = Value::from_coins(10i64).with_asset(x(), 1i64);
        let b = Value::from_coins(5i64).with_asset(x(), 2i64).with_asset(y(), 7i64);
        let sum = add(&a, &b);
        assert_eq!(sum.coins, Int::new(15));
        assert_eq!(sum.asset(&x()), Int::new(3));
        assert_eq!(sum.asset(&y()), Int::new(7));
        assert_eq!(sum.assets.len(), 2);
    }

    #[test]
    fn subtract_allows_deficits() {
        let a = Value::from_coins(3i64).with_asset(x(), 1i64);
        let b = Value::from_coins(5i64).with_asset(y(), 4i64);
        let diff = subtract(&a, &b);
        assert_eq!(diff.coins, Int::new(-2));
        assert_eq!(diff.asset(&x()), Int::new(1));
        assert_eq!(diff.asset(&y()), Int::new(-4));
    }

    #[test]
    fn subtract_undoes_add_with_one_sided_keys() {
        let a = Value::from_coins(100i64).with_asset(x(), 5i64);
        let b = Value::from_coins(7i64).with_asset(y(), 11i64);
        assert_eq!(subtract(&add(&a, &b), &b), a);
        assert_eq!(subtract(&add(&b, &a), &a), b);
        assert_eq!(&(&a + &b) - &b, a);
    }

    #[test]
    fn never_invents_keys() {
        let a = Value::from_coins(1i64).with_asset(x(), 1i64);
        let b = Value::from_coins(1i64);
        let sum = add(&a, &b);
        assert!(sum.assets.keys().all(|k| *k == x()));
        let diff = subtract(&b, &b);
        assert!(diff.assets.is_empty());
    }

    #[test]
    fn enough_reports_short_asset() {
        let have = Value::from_coins(100i64).with_asset(x(), 5i64);
        let want = Value::from_coins(50i64).with_asset(x(), 10i64);
        let shortfall = enough(&have, &want).unwrap_err();
        assert_eq!(shortfall.asset(), Some(&x()));
        assert_eq!(shortfall.missing(), Int::new(5));
        assert!(shortfall.to_string().contains(x().as_str()));
    }

    #[test]
    fn enough_reports_short_coins_first() {
        let have = Value::from_coins(1i64);
        let want = Value::from_coins(2i64).with_asset(x(), 1i64);
        assert!(matches!(enough(&have, &want), Err(Shortfall::Coins { .. })));
    }

    #[test]
    fn enough_treats_missing_asset_as_zero() {
        let have = Value::from_coins(10i64);
        let want = Value::from_coins(1i64).with_asset(y(), 1i64);
        let shortfall = enough(&have, &want).unwrap_err();
        assert_eq!(shortfall.asset(), Some(&y()));

        let want_nothing = Value::from_coins(1i64).with_asset(y(), 0i64);
        assert!(enough(&have, &want_nothing).is_ok());
    }

    #[test]
    fn enough_beyond_i64() {
        let big = Int::from(u64::MAX) + Int::from(u64::MAX);
        let have = Value::from_coins(big.clone());
        let want = Value::from_coins(Int::from(u64::MAX));
        assert!(enough(&have, &want).is_ok());
        assert!(enough(&want, &have).is_err());
    }
}
