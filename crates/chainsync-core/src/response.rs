//! Decoded chain-sync responses.
//!
//! [`Response::decode`] accepts both the current JSON-RPC 2.0 envelope and the
//! legacy JSON-WSP envelope and always yields the current model. Serializing a
//! [`Response`] always emits the current envelope.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

use crate::block::Block;
use crate::codec;
use crate::compat::{self, Attempt};
use crate::error::DecodeError;
use crate::legacy;
use crate::point::{Point, Tip};

/// Error code reported when none of the requested points is on chain.
pub const INTERSECTION_NOT_FOUND_CODE: i64 = 1000;

pub const FIND_INTERSECTION_METHOD: &str = "findIntersection";
pub const NEXT_BLOCK_METHOD: &str = "nextBlock";

/// The chain-sync methods this client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    FindIntersection,
    NextBlock,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindIntersection => FIND_INTERSECTION_METHOD,
            Self::NextBlock => NEXT_BLOCK_METHOD,
        }
    }

    /// Parse a current-shape method name.
    pub fn parse(name: &str) -> Result<Self, DecodeError> {
        match name {
            FIND_INTERSECTION_METHOD => Ok(Self::FindIntersection),
            NEXT_BLOCK_METHOD => Ok(Self::NextBlock),
            other => Err(DecodeError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error object of a response or a find-intersection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
}

impl ResultError {
    pub fn intersection_not_found(tip: Option<Tip>) -> Self {
        Self {
            code: INTERSECTION_NOT_FOUND_CODE,
            message: "Intersection not found".to_string(),
            data: tip.and_then(|t| serde_json::to_value(t).ok()),
        }
    }

    /// The tip reported alongside the error, either as `{"tip": ...}` or as
    /// the bare data object.
    pub fn tip(&self) -> Option<Tip> {
        tip_from_data(self.data.as_ref()?)
    }
}

pub(crate) fn tip_from_data(data: &Json) -> Option<Tip> {
    let candidate = match data.get("tip") {
        Some(tip) => tip,
        None => data,
    };
    if !candidate.is_object() {
        return None;
    }
    serde_json::from_value(candidate.clone()).ok()
}

impl fmt::Display for ResultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code, self.message)
    }
}

/// Result of a find-intersection request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindIntersectionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersection: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<Tip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Json>,
}

impl FindIntersectionResult {
    /// Decode a `result` object of either protocol version.
    pub fn decode(raw: &Json) -> Result<Self, DecodeError> {
        compat::resolve(
            "find-intersection result",
            raw,
            &[
                Attempt::new("current", current_find_intersection),
                Attempt::new("legacy", legacy::find_intersection_result),
            ],
        )
    }

    pub fn is_found(&self) -> bool {
        self.error.is_none() && self.intersection.is_some()
    }
}

/// Accepted only when it parses and carries a tip; otherwise the payload is
/// probably the legacy shape, whose keys the current model ignores.
fn current_find_intersection(raw: &Json) -> Result<Option<FindIntersectionResult>, DecodeError> {
    match FindIntersectionResult::deserialize(raw) {
        Ok(result) if result.tip.is_some() => Ok(Some(result)),
        _ => Ok(None),
    }
}

impl fmt::Display for FindIntersectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.intersection, &self.error) {
            (_, Some(e)) => write!(f, "intersection not found ({e})")?,
            (Some(p), None) => write!(f, "intersection={p}")?,
            (None, None) => f.write_str("intersection=none")?,
        }
        if let Some(tip) = &self.tip {
            write!(f, " tip=[{tip}]")?;
        }
        Ok(())
    }
}

/// Result of a next-block request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum NextBlockResult {
    Forward { tip: Tip, block: Block },
    Backward { tip: Tip, point: Point },
}

impl NextBlockResult {
    pub fn tip(&self) -> &Tip {
        match self {
            Self::Forward { tip, .. } | Self::Backward { tip, .. } => tip,
        }
    }

    /// The position the consumer should now be at.
    pub fn point(&self) -> Point {
        match self {
            Self::Forward { block, .. } => block.point(),
            Self::Backward { point, .. } => point.clone(),
        }
    }
}

impl fmt::Display for NextBlockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward { tip, block } => {
                write!(f, "forward {} txs={} tip=[{tip}]", block.point(), block.transactions.len())
            }
            Self::Backward { tip, point } => write!(f, "backward {point} tip=[{tip}]"),
        }
    }
}

/// The result variant selected by the response's method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChainSyncResult {
    FindIntersection(FindIntersectionResult),
    NextBlock(NextBlockResult),
}

/// A decoded response in the current model.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub jsonrpc: String,
    pub method: Method,
    pub result: ChainSyncResult,
    pub error: Option<ResultError>,
    pub id: Option<Json>,
}

impl Response {
    /// Decode a raw frame of either protocol version.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: Json = codec::json::decode(bytes)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &Json) -> Result<Self, DecodeError> {
        compat::resolve(
            "response",
            raw,
            &[
                Attempt::new("current", current_response),
                Attempt::new("legacy", legacy::response),
            ],
        )
    }

    /// Read only the tip a frame carries, skipping everything else.
    pub fn peek_tip(bytes: &[u8]) -> Option<Tip> {
        let peek: TipPeek = serde_json::from_slice(bytes).ok()?;
        if let Some(tip) = peek.result.and_then(ResultPeek::into_tip) {
            return Some(tip);
        }
        peek.error.and_then(|e| e.data).as_ref().and_then(tip_from_data)
    }

    /// The find-intersection result.
    ///
    /// # Panics
    ///
    /// If this is not a find-intersection response; switch on
    /// [`Response::method`] first.
    pub fn must_find_intersection_result(&self) -> &FindIntersectionResult {
        match &self.result {
            ChainSyncResult::FindIntersection(r) => r,
            ChainSyncResult::NextBlock(_) => panic!(
                "must_find_intersection_result called on a {} response",
                self.method
            ),
        }
    }

    /// The next-block result.
    ///
    /// # Panics
    ///
    /// If this is not a next-block response; switch on [`Response::method`]
    /// first.
    pub fn must_next_block_result(&self) -> &NextBlockResult {
        match &self.result {
            ChainSyncResult::NextBlock(r) => r,
            ChainSyncResult::FindIntersection(_) => panic!(
                "must_next_block_result called on a {} response",
                self.method
            ),
        }
    }

    /// The tip carried by the result, if any.
    pub fn tip(&self) -> Option<&Tip> {
        match &self.result {
            ChainSyncResult::FindIntersection(r) => r.tip.as_ref(),
            ChainSyncResult::NextBlock(r) => Some(r.tip()),
        }
    }
}

fn current_response(raw: &Json) -> Result<Option<Response>, DecodeError> {
    let Some(obj) = raw.as_object() else {
        return Ok(None);
    };
    let Some(method) = obj.get("method") else {
        return Ok(None);
    };
    let method = match method.as_str() {
        Some(name) => Method::parse(name)?,
        None => return Err(DecodeError::UnknownMethod(method.to_string())),
    };

    let jsonrpc = obj
        .get("jsonrpc")
        .and_then(Json::as_str)
        .unwrap_or("2.0")
        .to_string();
    let id = obj.get("id").filter(|v| !v.is_null()).cloned();
    let error = match obj.get("error").filter(|v| !v.is_null()) {
        Some(e) => Some(ResultError::deserialize(e)?),
        None => None,
    };
    let result = obj.get("result").filter(|v| !v.is_null());

    let result = match (method, result) {
        (Method::FindIntersection, Some(r)) => {
            ChainSyncResult::FindIntersection(FindIntersectionResult::decode(r)?)
        }
        (Method::FindIntersection, None) => match &error {
            Some(e) => ChainSyncResult::FindIntersection(FindIntersectionResult {
                intersection: None,
                tip: e.tip(),
                error: Some(e.clone()),
                id: id.clone(),
            }),
            None => return Err(DecodeError::MissingField { field: "result".into() }),
        },
        (Method::NextBlock, Some(r)) => ChainSyncResult::NextBlock(NextBlockResult::deserialize(r)?),
        (Method::NextBlock, None) => {
            return Err(DecodeError::MissingField { field: "result".into() })
        }
    };

    Ok(Some(Response {
        jsonrpc,
        method,
        result,
        error,
        id,
    }))
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 3 + usize::from(self.error.is_some()) + usize::from(self.id.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("jsonrpc", &self.jsonrpc)?;
        map.serialize_entry("method", &self.method)?;
        map.serialize_entry("result", &self.result)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Json::deserialize(deserializer)?;
        Response::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

// Only the fields that can hold a tip; blocks are skipped unparsed.
#[derive(Deserialize)]
struct TipPeek {
    #[serde(default)]
    result: Option<ResultPeek>,
    #[serde(default)]
    error: Option<ErrorPeek>,
}

#[derive(Deserialize)]
struct ResultPeek {
    #[serde(default)]
    tip: Option<Tip>,
    #[serde(rename = "IntersectionFound", default)]
    intersection_found: Option<legacy::TipHolder>,
    #[serde(rename = "IntersectionNotFound", default)]
    intersection_not_found: Option<legacy::TipHolder>,
    #[serde(rename = "RollForward", default)]
    roll_forward: Option<legacy::TipHolder>,
    #[serde(rename = "RollBackward", default)]
    roll_backward: Option<legacy::TipHolder>,
}

impl ResultPeek {
    fn into_tip(self) -> Option<Tip> {
        self.tip.or_else(|| {
            [
                self.intersection_found,
                self.intersection_not_found,
                self.roll_forward,
                self.roll_backward,
            ]
            .into_iter()
            .flatten()
            .find_map(legacy::TipHolder::into_tip)
        })
    }
}

#[derive(Deserialize)]
struct ErrorPeek {
    #[serde(default)]
    data: Option<Json>,
}
