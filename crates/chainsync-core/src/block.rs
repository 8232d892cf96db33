//! Ledger entities carried by next-block results.
//!
//! These are mostly passthrough payloads. Fields this crate never inspects
//! (scripts, metadata, certificates, ...) stay as raw JSON.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;

use crate::asset::AssetId;
use crate::codec::attribute::{AttributeValue, FromAttribute};
use crate::error::DecodeError;
use crate::point::{Point, PointStruct};
use crate::value::Value;

/// A block of any era after the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub era: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ancestor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Nonce>,
    #[serde(default)]
    pub height: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<BlockSize>,
    #[serde(default)]
    pub slot: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Tx>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<BlockIssuer>,
}

impl Block {
    /// The block's position, including its height.
    pub fn point(&self) -> Point {
        Point::Structured(PointStruct::new(self.slot, self.id.clone()).with_block_no(self.height))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proof: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSize {
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub version: ProtocolVersion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockIssuer {
    #[serde(default)]
    pub verification_key: String,
    #[serde(default)]
    pub vrf_verification_key: String,
    #[serde(default)]
    pub operational_certificate: OpCert,
    #[serde(default)]
    pub leader_value: LeaderValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCert {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub kes: Kes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kes {
    #[serde(default)]
    pub period: u64,
    #[serde(default)]
    pub verification_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderValue {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proof: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

/// A transaction. Amounts (fee, mint, withdrawals) use the [`Value`] shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spends: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TxIn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<TxIn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collaterals: Vec<TxIn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_collateral: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_return: Option<TxOut>,
    #[serde(default, skip_serializing_if = "TxOuts::is_empty")]
    pub outputs: TxOuts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<Json>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub withdrawals: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_interval: Option<ValidityInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_integrity_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_extra_signatories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_extra_scripts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposals: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatories: Vec<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Json>,
    #[serde(default, skip_serializing_if = "Datums::is_empty")]
    pub datums: Datums,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemers: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cbor: Option<String>,
}

/// `hash#index` reference to a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(tx_hash: &str, index: u32) -> Self {
        Self(format!("{tx_hash}#{index}"))
    }

    /// The hash part, or `""` when the id has no `#`.
    pub fn tx_hash(&self) -> &str {
        match self.0.find('#') {
            Some(i) if i > 0 => &self.0[..i],
            _ => "",
        }
    }

    /// The output index, if present and numeric.
    pub fn index(&self) -> Option<u32> {
        match self.0.find('#') {
            Some(i) if i > 0 => self.0[i + 1..].parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transaction input. Emitted in the current `{transaction:{id},index}`
/// shape; the legacy `{txId,index}` shape is also read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TxIn {
    pub transaction: TxRef,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    pub id: String,
}

impl TxIn {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            transaction: TxRef { id: tx_hash.into() },
            index,
        }
    }

    pub fn tx_hash(&self) -> &str {
        &self.transaction.id
    }

    pub fn tx_id(&self) -> TxId {
        TxId::new(&self.transaction.id, self.index)
    }
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction.id, self.index)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TxInRepr {
    Current {
        transaction: TxRef,
        index: u32,
    },
    Legacy {
        #[serde(rename = "txId")]
        tx_id: String,
        index: u32,
    },
}

impl<'de> Deserialize<'de> for TxIn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match TxInRepr::deserialize(deserializer)? {
            TxInRepr::Current { transaction, index } => TxIn { transaction, index },
            TxInRepr::Legacy { tx_id, index } => TxIn::new(tx_id, index),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOut {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxOuts(pub Vec<TxOut>);

impl TxOuts {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first output holding any amount entry for `asset`.
    pub fn find_by_asset_id(&self, asset: &AssetId) -> Option<&TxOut> {
        self.0.iter().find(|out| out.value.assets.contains_key(asset))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxOut> {
        self.0.iter()
    }
}

/// Slot bounds of a transaction. Older nodes name the upper bound
/// `invalidHereafter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_before: Option<u64>,
    #[serde(default, alias = "invalidHereafter", skip_serializing_if = "Option::is_none")]
    pub invalid_after: Option<u64>,
}

/// Datum hash to hex-encoded datum.
///
/// Older nodes sent base64 values; those are converted to hex on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Datums(pub BTreeMap<String, String>);

impl Datums {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.0.get(hash).map(String::as_str)
    }

    fn normalize(key: &str, raw: &str) -> Result<String, DecodeError> {
        if hex::decode(raw).is_ok() {
            return Ok(raw.to_string());
        }
        STANDARD
            .decode(raw)
            .map(hex::encode)
            .map_err(|e| DecodeError::InvalidDatum {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

impl<'de> Deserialize<'de> for Datums {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Json>::deserialize(deserializer)?;
        let mut datums = BTreeMap::new();
        for (key, value) in raw {
            let Json::String(s) = value else {
                return Err(serde::de::Error::custom(DecodeError::InvalidDatum {
                    key,
                    reason: format!("expected a string, got {value}"),
                }));
            };
            let hex = Datums::normalize(&key, &s).map_err(serde::de::Error::custom)?;
            datums.insert(key, hex);
        }
        Ok(Datums(datums))
    }
}

/// Stored values are hex strings (`S`) or raw bytes (`B`).
impl FromAttribute for Datums {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        let AttributeValue::M(m) = item else {
            return Err(DecodeError::Attribute("datums must be a map".into()));
        };
        let mut datums = BTreeMap::new();
        for (key, value) in m {
            let hex = match value {
                AttributeValue::S(s) => s.clone(),
                AttributeValue::B(b) => hex::encode(b),
                _ => {
                    return Err(DecodeError::InvalidDatum {
                        key: key.clone(),
                        reason: "expected S or B".into(),
                    })
                }
            };
            datums.insert(key.clone(), hex);
        }
        Ok(Datums(datums))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Int;

    const POLICY: &str = "29d222ce763455e3d7a09a665ce554f00ac89d2e99a1a83d267170c6";

    #[test]
    fn tx_in_both_shapes() {
        let current: TxIn =
            serde_json::from_str(r#"{"transaction":{"id":"abc"},"index":2}"#).unwrap();
        let legacy: TxIn = serde_json::from_str(r#"{"txId":"abc","index":2}"#).unwrap();
        assert_eq!(current, legacy);
        assert_eq!(current.to_string(), "abc#2");
        assert_eq!(
            serde_json::to_string(&legacy).unwrap(),
            r#"{"transaction":{"id":"abc"},"index":2}"#
        );
    }

    #[test]
    fn tx_id_parts() {
        let id = TxIn::new("abc", 7).tx_id();
        assert_eq!(id.as_str(), "abc#7");
        assert_eq!(id.tx_hash(), "abc");
        assert_eq!(id.index(), Some(7));

        let bare: TxId = serde_json::from_str(r#""abc""#).unwrap();
        assert_eq!(bare.tx_hash(), "");
        assert_eq!(bare.index(), None);
    }

    #[test]
    fn datums_convert_base64_to_hex() {
        let datums: Datums =
            serde_json::from_str(r#"{"h1":"d87980","h2":"2HmA"}"#).unwrap();
        assert_eq!(datums.get("h1"), Some("d87980"));
        assert_eq!(datums.get("h2"), Some("d87980"));
    }

    #[test]
    fn datums_reject_non_strings() {
        assert!(serde_json::from_str::<Datums>(r#"{"h1":42}"#).is_err());
        assert!(serde_json::from_str::<Datums>(r#"{"h1":"***"}"#).is_err());
    }

    #[test]
    fn datums_from_attribute() {
        let mut m = BTreeMap::new();
        m.insert("h1".to_string(), AttributeValue::S("d87980".into()));
        m.insert("h2".to_string(), AttributeValue::B(vec![0xd8, 0x79, 0x80]));
        let datums = Datums::from_attribute(&AttributeValue::M(m)).unwrap();
        assert_eq!(datums.get("h2"), Some("d87980"));
    }

    #[test]
    fn validity_interval_alias() {
        let v: ValidityInterval =
            serde_json::from_str(r#"{"invalidBefore":1,"invalidHereafter":9}"#).unwrap();
        assert_eq!(v.invalid_after, Some(9));
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"invalidBefore":1,"invalidAfter":9}"#);
    }

    #[test]
    fn find_output_by_asset() {
        let asset = AssetId::from_parts(POLICY, "4d494e");
        let outs = TxOuts(vec![
            TxOut {
                address: "addr1".into(),
                value: Value::from_coins(1i64),
                ..Default::default()
            },
            TxOut {
                address: "addr2".into(),
                value: Value::from_coins(2i64).with_asset(asset.clone(), 1i64),
                ..Default::default()
            },
        ]);
        assert_eq!(outs.find_by_asset_id(&asset).map(|o| o.address.as_str()), Some("addr2"));
        assert!(outs.find_by_asset_id(&AssetId::from_parts(POLICY, "")).is_none());
    }

    #[test]
    fn block_from_current_json() {
        let json = format!(
            r#"{{
                "type":"praos","era":"babbage","id":"b1","ancestor":"b0","height":10,"slot":100,
                "size":{{"bytes":512}},
                "protocol":{{"version":{{"major":8,"minor":0}}}},
                "transactions":[{{
                    "id":"t1",
                    "inputs":[{{"transaction":{{"id":"t0"}},"index":0}}],
                    "outputs":[{{"address":"addr1","value":{{"ada":{{"lovelace":5}},"{POLICY}":{{"4d494e":1}}}}}}],
                    "fee":{{"ada":{{"lovelace":170000}}}},
                    "validityInterval":{{"invalidAfter":200}}
                }}]
            }}"#
        );
        let block: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block.point(), Point::Structured(PointStruct::new(100, "b1").with_block_no(10)));
        let tx = &block.transactions[0];
        assert_eq!(tx.inputs[0].tx_hash(), "t0");
        assert_eq!(tx.fee.as_ref().map(|f| f.coins.clone()), Some(Int::new(170_000)));
        assert_eq!(tx.outputs.0[0].value.asset(&AssetId::from_parts(POLICY, "4d494e")), Int::new(1));
    }
}
