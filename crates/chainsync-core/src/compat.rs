//! Ordered shape fallback for payloads that changed between protocol
//! versions.
//!
//! Each attempt inspects a parsed payload and answers one of:
//!
//! - `Ok(None)`: not this shape, try the next attempt;
//! - `Ok(Some(v))`: accepted, stop here;
//! - `Err(e)`: the payload is this shape but broken, stop with `e`.
//!
//! Results are never merged across attempts. When every attempt declines the
//! payload, [`resolve`] fails with [`DecodeError::UnrecognizedShape`].

use serde_json::Value as Json;
use tracing::trace;

use crate::error::DecodeError;

/// A named shape attempt.
pub struct Attempt<T> {
    pub shape: &'static str,
    pub decode: fn(&Json) -> Result<Option<T>, DecodeError>,
}

impl<T> Attempt<T> {
    pub fn new(shape: &'static str, decode: fn(&Json) -> Result<Option<T>, DecodeError>) -> Self {
        Self { shape, decode }
    }
}

/// Run `attempts` in order against `raw`; the first acceptance wins.
pub fn resolve<T>(what: &'static str, raw: &Json, attempts: &[Attempt<T>]) -> Result<T, DecodeError> {
    for Attempt { shape, decode } in attempts {
        match decode(raw) {
            Ok(Some(value)) => {
                trace!(what, shape, "shape accepted");
                return Ok(value);
            }
            Ok(None) => trace!(what, shape, "shape declined"),
            Err(e) => {
                trace!(what, shape, error = %e, "shape rejected");
                return Err(e);
            }
        }
    }
    Err(DecodeError::UnrecognizedShape)
}
