//! Outbound chain-sync requests in both wire shapes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::legacy::{LegacyPoint, FIND_INTERSECT, REQUEST_NEXT};
use crate::point::Point;
use crate::response::{FIND_INTERSECTION_METHOD, NEXT_BLOCK_METHOD};

/// Service name announced in legacy envelopes unless configured otherwise.
pub const DEFAULT_SERVICE_NAME: &str = "ogmios";

/// Which protocol generation to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireShape {
    /// JSON-RPC 2.0.
    #[default]
    Current,
    /// JSON-WSP 1.0.
    Legacy,
}

/// JSON-RPC request ID: a string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Json>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Json>, id: RpcId) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-WSP 1.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWspRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub servicename: String,
    pub methodname: String,
    pub args: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<Json>,
}

impl JsonWspRequest {
    pub fn new(service_name: impl Into<String>, method: impl Into<String>, args: Json) -> Self {
        Self {
            kind: "jsonwsp/request".into(),
            version: "1.0".into(),
            servicename: service_name.into(),
            methodname: method.into(),
            args,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: Json) -> Self {
        self.mirror = Some(mirror);
        self
    }
}

fn points_or_origin(points: &[Point]) -> Vec<Point> {
    if points.is_empty() {
        vec![Point::origin()]
    } else {
        points.to_vec()
    }
}

/// Current find-intersection request. An empty list means the origin.
pub fn find_intersection(points: &[Point]) -> JsonRpcRequest {
    JsonRpcRequest::new(
        FIND_INTERSECTION_METHOD,
        Some(json!({ "points": points_or_origin(points) })),
        RpcId::String("findIntersection".into()),
    )
}

/// Current next-block request.
pub fn next_block() -> JsonRpcRequest {
    JsonRpcRequest::new(NEXT_BLOCK_METHOD, None, RpcId::String("nextBlock".into()))
}

/// Legacy find-intersection request. Block numbers are dropped from points.
pub fn legacy_find_intersect(service_name: &str, points: &[Point]) -> JsonWspRequest {
    let points: Vec<LegacyPoint> = points_or_origin(points).iter().map(LegacyPoint::from).collect();
    JsonWspRequest::new(service_name, FIND_INTERSECT, json!({ "points": points }))
        .with_mirror(json!({ "step": "INIT" }))
}

/// Legacy next-block request.
pub fn legacy_request_next(service_name: &str) -> JsonWspRequest {
    JsonWspRequest::new(service_name, REQUEST_NEXT, json!({}))
}

/// Serialize the find-intersection request for `shape`.
pub fn encode_find_intersection(
    shape: WireShape,
    service_name: &str,
    points: &[Point],
) -> Result<String, serde_json::Error> {
    match shape {
        WireShape::Current => serde_json::to_string(&find_intersection(points)),
        WireShape::Legacy => serde_json::to_string(&legacy_find_intersect(service_name, points)),
    }
}

/// Serialize the next-block request for `shape`.
pub fn encode_next_block(shape: WireShape, service_name: &str) -> Result<String, serde_json::Error> {
    match shape {
        WireShape::Current => serde_json::to_string(&next_block()),
        WireShape::Legacy => serde_json::to_string(&legacy_request_next(service_name)),
    }
}
