//! Attribute-value maps, the typed document format used by key/value stores.
//!
//! Every attribute is a single-key object naming its type:
//!
//! ```text
//! {"S":"origin"}
//! {"M":{"slot":{"N":"12"},"id":{"S":"ab.."},"blockNo":{"N":"3"}}}
//! ```
//!
//! Numbers travel as decimal strings, binary as base64.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::error::DecodeError;
use crate::num::Int;
use crate::point::{Point, PointStruct, Tip};
use crate::value::Value;

/// One typed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "B", with = "b64")]
    B(Vec<u8>),
    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttributeValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::M(_) => "M",
            Self::L(_) => "L",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(true))
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Encode into an attribute.
pub trait ToAttribute {
    fn to_attribute(&self) -> AttributeValue;
}

/// Decode from an attribute.
pub trait FromAttribute: Sized {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError>;
}

/// `None` is stored as `NULL`; `NULL` reads back as `None`.
impl<T: ToAttribute> ToAttribute for Option<T> {
    fn to_attribute(&self) -> AttributeValue {
        match self {
            Some(v) => v.to_attribute(),
            None => AttributeValue::Null(true),
        }
    }
}

impl<T: FromAttribute> FromAttribute for Option<T> {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        if item.is_null() {
            return Ok(None);
        }
        T::from_attribute(item).map(Some)
    }
}

fn unexpected(what: &str, item: &AttributeValue) -> DecodeError {
    DecodeError::Attribute(format!("expected {what}, got {}", item.kind()))
}

fn as_map<'a>(
    what: &str,
    item: &'a AttributeValue,
) -> Result<&'a BTreeMap<String, AttributeValue>, DecodeError> {
    match item {
        AttributeValue::M(m) => Ok(m),
        other => Err(unexpected(what, other)),
    }
}

fn required<'a>(
    m: &'a BTreeMap<String, AttributeValue>,
    field: &str,
) -> Result<&'a AttributeValue, DecodeError> {
    m.get(field).ok_or_else(|| DecodeError::MissingField {
        field: field.to_string(),
    })
}

fn read_u64(item: &AttributeValue) -> Result<u64, DecodeError> {
    match item {
        AttributeValue::N(n) => n
            .trim()
            .parse()
            .map_err(|e| DecodeError::Attribute(format!("bad number {n:?}: {e}"))),
        other => Err(unexpected("N", other)),
    }
}

fn read_string(item: &AttributeValue) -> Result<String, DecodeError> {
    match item {
        AttributeValue::S(s) => Ok(s.clone()),
        other => Err(unexpected("S", other)),
    }
}

fn number(v: u64) -> AttributeValue {
    AttributeValue::N(v.to_string())
}

impl ToAttribute for Int {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::N(self.to_string())
    }
}

impl FromAttribute for Int {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        match item {
            AttributeValue::N(n) => n.parse(),
            other => Err(unexpected("N", other)),
        }
    }
}

impl ToAttribute for PointStruct {
    fn to_attribute(&self) -> AttributeValue {
        let mut m = BTreeMap::new();
        m.insert("slot".to_string(), number(self.slot));
        m.insert("id".to_string(), AttributeValue::S(self.id.clone()));
        if let Some(block_no) = self.block_no {
            m.insert("blockNo".to_string(), number(block_no));
        }
        AttributeValue::M(m)
    }
}

impl FromAttribute for PointStruct {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        let m = as_map("M", item)?;
        let block_no = m.get("blockNo").map(read_u64).transpose()?;
        Ok(PointStruct {
            slot: read_u64(required(m, "slot")?)?,
            id: read_string(required(m, "id")?)?,
            block_no,
        })
    }
}

impl ToAttribute for Point {
    fn to_attribute(&self) -> AttributeValue {
        match self {
            Point::Symbolic(s) => AttributeValue::S(s.clone()),
            Point::Structured(p) => p.to_attribute(),
        }
    }
}

/// `S` is a symbolic point and a non-empty `M` a structured one.
impl FromAttribute for Point {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        match item {
            AttributeValue::S(s) => Ok(Point::Symbolic(s.clone())),
            AttributeValue::M(m) if !m.is_empty() => {
                PointStruct::from_attribute(item).map(Point::Structured)
            }
            other => Err(DecodeError::InvalidPoint(format!(
                "attribute {} is neither a symbol nor a struct",
                other.kind()
            ))),
        }
    }
}

impl ToAttribute for Tip {
    fn to_attribute(&self) -> AttributeValue {
        let mut m = BTreeMap::new();
        m.insert("slot".to_string(), number(self.slot));
        m.insert("id".to_string(), AttributeValue::S(self.id.clone()));
        m.insert("height".to_string(), number(self.height));
        AttributeValue::M(m)
    }
}

impl FromAttribute for Tip {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        let m = as_map("M", item)?;
        Ok(Tip {
            slot: m.get("slot").map(read_u64).transpose()?.unwrap_or_default(),
            id: m.get("id").map(read_string).transpose()?.unwrap_or_default(),
            height: m.get("height").map(read_u64).transpose()?.unwrap_or_default(),
        })
    }
}

/// Stored flat: `{"coins": N, "assets": {"<policy>.<name>": N}}`.
impl ToAttribute for Value {
    fn to_attribute(&self) -> AttributeValue {
        let mut m = BTreeMap::new();
        m.insert("coins".to_string(), self.coins.to_attribute());
        if !self.assets.is_empty() {
            let assets = self
                .assets
                .iter()
                .map(|(id, amount)| (id.to_string(), amount.to_attribute()))
                .collect();
            m.insert("assets".to_string(), AttributeValue::M(assets));
        }
        AttributeValue::M(m)
    }
}

impl FromAttribute for Value {
    fn from_attribute(item: &AttributeValue) -> Result<Self, DecodeError> {
        let m = as_map("M", item)?;
        let coins = match m.get("coins") {
            Some(c) => Int::from_attribute(c)?,
            None => Int::zero(),
        };
        let mut assets = BTreeMap::new();
        if let Some(a) = m.get("assets") {
            for (id, amount) in as_map("M", a)? {
                assets.insert(AssetId::new(id.clone()), Int::from_attribute(amount)?);
            }
        }
        Ok(Value { coins, assets })
    }
}

/// Decode a point attribute, treating an absent or `NULL` item as the zero
/// point.
pub fn decode_point(item: Option<&AttributeValue>) -> Result<Option<Point>, DecodeError> {
    match item {
        None => Ok(None),
        Some(item) => Option::<Point>::from_attribute(item),
    }
}
