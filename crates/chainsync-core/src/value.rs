//! Multi-asset values.
//!
//! A [`Value`] is a coin amount plus a bundle of native assets. The JSON form
//! changed between protocol versions:
//!
//! ```text
//! current: {"ada":{"lovelace":2000000},"<policy>":{"<name>":5}}
//! legacy:  {"coins":2000000,"assets":{"<policy>.<name>":5}}
//! ```
//!
//! Both are accepted when decoding; the current shape is always emitted.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::asset::AssetId;
use crate::num::Int;

const ADA: &str = "ada";
const LOVELACE: &str = "lovelace";

/// Coins plus native assets.
#[derive(Debug, Clone, Default)]
pub struct Value {
    pub coins: Int,
    pub assets: BTreeMap<AssetId, Int>,
}

impl Value {
    /// A value holding only coins.
    pub fn from_coins(coins: impl Into<Int>) -> Self {
        Self {
            coins: coins.into(),
            assets: BTreeMap::new(),
        }
    }

    /// Builder: set the amount for `asset`.
    pub fn with_asset(mut self, asset: impl Into<AssetId>, amount: impl Into<Int>) -> Self {
        self.assets.insert(asset.into(), amount.into());
        self
    }

    /// Amount held for `asset`; zero when absent.
    pub fn asset(&self, asset: &AssetId) -> Int {
        self.assets.get(asset).cloned().unwrap_or_default()
    }

    /// Returns `true` if coins and every asset amount are zero.
    pub fn is_zero(&self) -> bool {
        self.coins.is_zero() && self.assets.values().all(Int::is_zero)
    }
}

impl PartialEq for Value {
    /// A missing asset entry compares equal to a zero entry.
    fn eq(&self, other: &Self) -> bool {
        if self.coins != other.coins {
            return false;
        }
        self.assets
            .keys()
            .chain(other.assets.keys())
            .all(|k| self.asset(k) == other.asset(k))
    }
}

impl Eq for Value {}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut by_policy: BTreeMap<&str, BTreeMap<&str, &Int>> = BTreeMap::new();
        for (asset, amount) in &self.assets {
            by_policy
                .entry(asset.policy_id())
                .or_default()
                .insert(asset.asset_name(), amount);
        }

        // Mint/burn bundles carry no coins; keep them free of a zero ada entry.
        let emit_ada = !self.coins.is_zero() || by_policy.is_empty();

        let mut map = serializer.serialize_map(Some(by_policy.len() + usize::from(emit_ada)))?;
        if emit_ada {
            let mut ada = BTreeMap::new();
            ada.insert(LOVELACE, &self.coins);
            map.serialize_entry(ADA, &ada)?;
        }
        for (policy, names) in &by_policy {
            map.serialize_entry(policy, names)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Legacy {
        coins: Int,
        #[serde(default)]
        assets: BTreeMap<AssetId, Int>,
    },
    Current(BTreeMap<String, BTreeMap<String, Int>>),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ValueRepr::deserialize(deserializer)? {
            ValueRepr::Legacy { coins, assets } => Ok(Value { coins, assets }),
            ValueRepr::Current(mut policies) => {
                let coins = match policies.remove(ADA) {
                    Some(mut ada) => ada.remove(LOVELACE).unwrap_or_default(),
                    None => Int::zero(),
                };
                let assets = policies
                    .into_iter()
                    .flat_map(|(policy, names)| {
                        names.into_iter().map(move |(name, amount)| {
                            (AssetId::from_parts(&policy, &name), amount)
                        })
                    })
                    .collect();
                Ok(Value { coins, assets })
            }
        }
    }
}
