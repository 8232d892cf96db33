//! JSON-WSP 1.0 shapes spoken by older nodes, and their translation into the
//! current model.
//!
//! Legacy results are externally tagged (`{"IntersectionFound": {...}}`,
//! `{"RollForward": {...}}`), points and tips use `hash` instead of `id`, and
//! blocks are keyed by era. Header fields and the transaction list are
//! translated; Byron bodies, which have no transaction list in that shape,
//! translate to a block without transactions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::block::{Block, Tx, TxIn, TxOut, TxOuts};
use crate::error::DecodeError;
use crate::num::Int;
use crate::point::{Point, PointStruct, Tip};
use crate::response::{
    ChainSyncResult, FindIntersectionResult, Method, NextBlockResult, Response, ResultError,
};
use crate::value::Value;

pub const FIND_INTERSECT: &str = "FindIntersect";
pub const REQUEST_NEXT: &str = "RequestNext";

/// A legacy point: a bare symbol or `{slot, hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyPoint {
    Symbolic(String),
    Structured { slot: u64, hash: String },
}

impl From<LegacyPoint> for Point {
    fn from(p: LegacyPoint) -> Self {
        match p {
            LegacyPoint::Symbolic(s) => Point::Symbolic(s),
            LegacyPoint::Structured { slot, hash } => Point::Structured(PointStruct::new(slot, hash)),
        }
    }
}

/// Legacy points carry no block number; it is dropped.
impl From<&Point> for LegacyPoint {
    fn from(p: &Point) -> Self {
        match p {
            Point::Symbolic(s) => LegacyPoint::Symbolic(s.clone()),
            Point::Structured(p) => LegacyPoint::Structured {
                slot: p.slot,
                hash: p.id.clone(),
            },
        }
    }
}

/// A legacy tip: `{slot, hash, blockNo}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTip {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub block_no: u64,
}

impl From<LegacyTip> for Tip {
    fn from(t: LegacyTip) -> Self {
        Tip::new(t.slot, t.hash, t.block_no)
    }
}

#[derive(Deserialize)]
enum LegacyIntersection {
    IntersectionFound {
        #[serde(alias = "Point")]
        point: LegacyPoint,
        #[serde(alias = "Tip")]
        tip: LegacyTip,
    },
    IntersectionNotFound {
        #[serde(alias = "Tip")]
        tip: LegacyTip,
    },
}

#[derive(Deserialize)]
enum LegacyNext {
    RollForward {
        block: BTreeMap<String, LegacyBlock>,
        tip: LegacyTip,
    },
    RollBackward {
        point: LegacyPoint,
        tip: LegacyTip,
    },
}

/// One era-keyed block. Byron blocks name their hash `hash`.
#[derive(Deserialize)]
struct LegacyBlock {
    #[serde(rename = "headerHash", alias = "hash", default)]
    header_hash: String,
    #[serde(default)]
    header: LegacyHeader,
    #[serde(default)]
    body: Json,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyHeader {
    #[serde(default)]
    slot: u64,
    #[serde(default)]
    block_height: u64,
    #[serde(default)]
    prev_hash: Option<Json>,
}

/// A legacy transaction: `{id, body: {...}, witness, metadata}`.
#[derive(Deserialize)]
struct LegacyTx {
    id: String,
    #[serde(default)]
    body: LegacyTxBody,
    #[serde(default)]
    metadata: Option<Json>,
}

/// Outputs and inputs already read both shapes; fees and withdrawals are
/// bare lovelace amounts.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTxBody {
    #[serde(default)]
    inputs: Vec<TxIn>,
    #[serde(default)]
    collaterals: Vec<TxIn>,
    #[serde(default)]
    references: Vec<TxIn>,
    #[serde(default)]
    outputs: Vec<TxOut>,
    #[serde(default)]
    collateral_return: Option<TxOut>,
    #[serde(default)]
    fee: Option<Int>,
    #[serde(default)]
    total_collateral: Option<Int>,
    #[serde(default)]
    mint: Option<Value>,
    #[serde(default)]
    withdrawals: BTreeMap<String, Int>,
    #[serde(default)]
    required_extra_signatures: Vec<String>,
    #[serde(default)]
    script_integrity_hash: Option<String>,
    #[serde(default)]
    network: Option<Json>,
}

impl From<LegacyTx> for Tx {
    fn from(tx: LegacyTx) -> Self {
        let b = tx.body;
        Tx {
            id: tx.id,
            inputs: b.inputs,
            references: b.references,
            collaterals: b.collaterals,
            total_collateral: b.total_collateral.map(Value::from_coins),
            collateral_return: b.collateral_return,
            outputs: TxOuts(b.outputs),
            withdrawals: b
                .withdrawals
                .into_iter()
                .map(|(account, amount)| (account, Value::from_coins(amount)))
                .collect(),
            fee: b.fee.map(Value::from_coins),
            mint: b.mint,
            network: b.network,
            script_integrity_hash: b.script_integrity_hash,
            required_extra_signatories: b.required_extra_signatures,
            metadata: tx.metadata.filter(|m| !m.is_null()),
            ..Tx::default()
        }
    }
}

fn legacy_transactions(body: Json) -> Result<Vec<Tx>, DecodeError> {
    if !body.is_array() {
        return Ok(Vec::new());
    }
    let txs: Vec<LegacyTx> = serde_json::from_value(body)?;
    Ok(txs.into_iter().map(Tx::from).collect())
}

/// Tip holder inside any legacy result; everything else is skipped.
#[derive(Deserialize)]
pub(crate) struct TipHolder {
    #[serde(default)]
    tip: Option<LegacyTip>,
}

impl TipHolder {
    pub(crate) fn into_tip(self) -> Option<Tip> {
        self.tip.map(Tip::from)
    }
}

fn has_any_key(raw: &Json, keys: &[&str]) -> bool {
    raw.as_object()
        .map(|obj| keys.iter().any(|k| obj.contains_key(*k)))
        .unwrap_or(false)
}

/// Legacy find-intersection result.
///
/// A not-found result becomes an intersection-not-found error whose data is
/// the tip from the not-found payload itself.
pub fn find_intersection_result(raw: &Json) -> Result<Option<FindIntersectionResult>, DecodeError> {
    if !has_any_key(raw, &["IntersectionFound", "IntersectionNotFound"]) {
        return Ok(None);
    }
    let result = match LegacyIntersection::deserialize(raw)? {
        LegacyIntersection::IntersectionFound { point, tip } => FindIntersectionResult {
            intersection: Some(point.into()),
            tip: Some(tip.into()),
            error: None,
            id: None,
        },
        LegacyIntersection::IntersectionNotFound { tip } => {
            let tip = Tip::from(tip);
            FindIntersectionResult {
                intersection: None,
                tip: Some(tip.clone()),
                error: Some(ResultError::intersection_not_found(Some(tip))),
                id: None,
            }
        }
    };
    Ok(Some(result))
}

fn next_block_result(raw: &Json) -> Result<NextBlockResult, DecodeError> {
    Ok(match LegacyNext::deserialize(raw)? {
        LegacyNext::RollBackward { point, tip } => NextBlockResult::Backward {
            tip: tip.into(),
            point: point.into(),
        },
        LegacyNext::RollForward { block, tip } => {
            let (era, b) = block
                .into_iter()
                .next()
                .ok_or_else(|| DecodeError::MissingField { field: "block".into() })?;
            let ancestor = b
                .header
                .prev_hash
                .as_ref()
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_string();
            let transactions = legacy_transactions(b.body)?;
            NextBlockResult::Forward {
                tip: tip.into(),
                block: Block {
                    era,
                    id: b.header_hash,
                    ancestor,
                    height: b.header.block_height,
                    slot: b.header.slot,
                    transactions,
                    ..Block::default()
                },
            }
        }
    })
}

/// Legacy JSON-WSP response envelope, keyed by `methodname`.
pub fn response(raw: &Json) -> Result<Option<Response>, DecodeError> {
    let Some(obj) = raw.as_object() else {
        return Ok(None);
    };
    let Some(name) = obj.get("methodname") else {
        return Ok(None);
    };
    let name = name.as_str().unwrap_or_default();
    let result = obj
        .get("result")
        .filter(|v| !v.is_null())
        .ok_or_else(|| DecodeError::MissingField { field: "result".into() });

    let (method, result) = match name {
        FIND_INTERSECT => (
            Method::FindIntersection,
            ChainSyncResult::FindIntersection(FindIntersectionResult::decode(result?)?),
        ),
        REQUEST_NEXT => (
            Method::NextBlock,
            ChainSyncResult::NextBlock(next_block_result(result?)?),
        ),
        other => return Err(DecodeError::UnknownMethod(other.to_string())),
    };

    Ok(Some(Response {
        jsonrpc: "2.0".to_string(),
        method,
        result,
        error: None,
        id: obj.get("reflection").filter(|v| !v.is_null()).cloned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_conversions() {
        let legacy: LegacyPoint = serde_json::from_value(json!({"slot": 3, "hash": "ab"})).unwrap();
        let point = Point::from(legacy.clone());
        assert_eq!(point, Point::Structured(PointStruct::new(3, "ab")));

        let with_height = Point::Structured(PointStruct::new(3, "ab").with_block_no(9));
        assert_eq!(LegacyPoint::from(&with_height), legacy);
        assert_eq!(
            serde_json::to_value(LegacyPoint::from(&Point::origin())).unwrap(),
            json!("origin")
        );
    }

    #[test]
    fn byron_block_uses_hash() {
        let raw = json!({"RollForward": {
            "block": {"byron": {"hash": "bh", "header": {"slot": 1, "blockHeight": 2, "prevHash": "p"}}},
            "tip": {"slot": 5, "hash": "t", "blockNo": 3}
        }});
        match next_block_result(&raw).unwrap() {
            NextBlockResult::Forward { block, .. } => {
                assert_eq!(block.era, "byron");
                assert_eq!(block.id, "bh");
                assert_eq!(block.ancestor, "p");
            }
            other => panic!("expected forward, got {other:?}"),
        }
    }

    #[test]
    fn legacy_transactions_keep_outputs_and_amounts() {
        let raw = json!({"RollForward": {
            "block": {"alonzo": {
                "headerHash": "h",
                "header": {"slot": 7, "blockHeight": 3},
                "body": [{
                    "id": "tx1",
                    "body": {
                        "inputs": [{"txId": "prev", "index": 1}],
                        "outputs": [{
                            "address": "addr1",
                            "value": {"coins": 18446744073709551617u128.to_string(), "assets": {"aa.58": 2}}
                        }],
                        "fee": 170000,
                        "withdrawals": {"stake1": 5},
                        "mint": {"coins": 0, "assets": {"aa.58": 2}}
                    },
                    "metadata": null
                }]
            }},
            "tip": {"slot": 9, "hash": "t", "blockNo": 4}
        }});
        let NextBlockResult::Forward { block, .. } = next_block_result(&raw).unwrap() else {
            panic!("expected forward");
        };
        assert_eq!(block.transactions.len(), 1);
        let tx = &block.transactions[0];
        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.inputs, vec![TxIn::new("prev", 1)]);
        assert_eq!(tx.fee, Some(Value::from_coins(170_000i64)));
        assert_eq!(tx.withdrawals["stake1"], Value::from_coins(5i64));
        assert_eq!(tx.mint.as_ref().unwrap().asset(&"aa.58".into()), Int::new(2));
        assert!(tx.metadata.is_none());

        let out = &tx.outputs.0[0];
        assert_eq!(out.address, "addr1");
        assert_eq!(out.value.coins.to_string(), "18446744073709551617");
        assert_eq!(out.value.asset(&"aa.58".into()), Int::new(2));
    }

    #[test]
    fn malformed_legacy_transaction_is_an_error() {
        let raw = json!({"RollForward": {
            "block": {"babbage": {"headerHash": "h", "body": [{"body": {}}]}},
            "tip": {"slot": 1, "hash": "t", "blockNo": 1}
        }});
        assert!(matches!(next_block_result(&raw), Err(DecodeError::Json(_))));
    }

    #[test]
    fn empty_block_map_is_an_error() {
        let raw = json!({"RollForward": {"block": {}, "tip": {}}});
        assert!(matches!(
            next_block_result(&raw),
            Err(DecodeError::MissingField { field }) if field == "block"
        ));
    }

    #[test]
    fn broken_legacy_intersection_is_committed() {
        let raw = json!({"IntersectionFound": {"tip": {}}});
        assert!(matches!(find_intersection_result(&raw), Err(DecodeError::Json(_))));
        assert!(find_intersection_result(&json!({"other": 1})).unwrap().is_none());
    }

    #[test]
    fn missing_result() {
        let raw = json!({"methodname": "RequestNext"});
        assert!(matches!(
            response(&raw),
            Err(DecodeError::MissingField { field }) if field == "result"
        ));
    }
}
