//! Compact binary encoding.
//!
//! A point is a one-entry keyed record:
//!
//! ```text
//! {1: "origin"}                              symbolic
//! {2: {"slot": 12, "id": "ab..", "blockNo": 3}}   structured
//! ```
//!
//! An empty payload (or CBOR null) is the zero point and decodes to `None`
//! without error; `None` encodes back to an empty payload.

use ciborium::value::{Integer, Value as Cbor};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;
use crate::point::{Point, PointStruct};

const SYMBOLIC_KEY: u8 = 1;
const STRUCTURED_KEY: u8 = 2;

fn cbor_err(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Cbor(e.to_string())
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(cbor_err)?;
    Ok(buf)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, DecodeError> {
    ciborium::de::from_reader(data).map_err(cbor_err)
}

/// Encode an optional point; `None` yields an empty payload.
pub fn encode_point(point: Option<&Point>) -> Result<Vec<u8>, DecodeError> {
    let Some(point) = point else {
        return Ok(Vec::new());
    };
    let (key, body) = match point {
        Point::Symbolic(s) => (SYMBOLIC_KEY, Cbor::Text(s.clone())),
        Point::Structured(p) => (STRUCTURED_KEY, Cbor::serialized(p).map_err(cbor_err)?),
    };
    encode(&Cbor::Map(vec![(Cbor::Integer(Integer::from(key)), body)]))
}

/// Decode a point record. Empty input and CBOR null decode to `None`.
pub fn decode_point(data: &[u8]) -> Result<Option<Point>, DecodeError> {
    if data.is_empty() {
        return Ok(None);
    }
    let record: Cbor = decode(data)?;
    if record.is_null() {
        return Ok(None);
    }
    let Cbor::Map(entries) = record else {
        return Err(DecodeError::InvalidPoint("expected a keyed record".into()));
    };

    let mut symbolic = None;
    let mut structured = None;
    for (key, value) in entries {
        match key.as_integer().map(i128::from) {
            Some(k) if k == i128::from(SYMBOLIC_KEY) => symbolic = Some(value),
            Some(k) if k == i128::from(STRUCTURED_KEY) => structured = Some(value),
            _ => {}
        }
    }

    match (symbolic, structured) {
        (Some(Cbor::Text(s)), None) => Ok(Some(Point::Symbolic(s))),
        (Some(_), None) => Err(DecodeError::InvalidPoint(
            "symbolic point must be a text string".into(),
        )),
        (None, Some(body)) => {
            let p: PointStruct = body.deserialized().map_err(cbor_err)?;
            Ok(Some(Point::Structured(p)))
        }
        (Some(_), Some(_)) => Err(DecodeError::InvalidPoint(
            "record carries both a symbol and a struct".into(),
        )),
        (None, None) => Err(DecodeError::InvalidPoint(
            "record carries neither a symbol nor a struct".into(),
        )),
    }
}
