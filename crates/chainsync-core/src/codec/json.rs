//! Structured text encoding.
//!
//! `serde_json` reads integer literals wider than 64 bits as `f64`, losing
//! digits before any visitor sees them. [`decode`] therefore quotes such
//! literals first, and [`Int`](crate::num::Int) reads the decimal string
//! exactly. Decode untrusted frames through this module rather than calling
//! `serde_json` directly.

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, DecodeError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(&quote_wide_integers(data))?)
}

/// Wrap every integer literal outside `i64`/`u64` range in quotes. Strings,
/// floats and in-range integers are left untouched; input without wide
/// literals is returned as is.
pub fn quote_wide_integers(data: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b'-' | b'0'..=b'9' => {
                let start = i;
                i += 1;
                while i < data.len()
                    && matches!(data[i], b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
                {
                    i += 1;
                }
                let token = &data[start..i];
                if is_wide_integer(token) {
                    let buf = out.get_or_insert_with(|| Vec::with_capacity(data.len() + 8));
                    buf.extend_from_slice(&data[copied..start]);
                    buf.push(b'"');
                    buf.extend_from_slice(token);
                    buf.push(b'"');
                    copied = i;
                }
            }
            _ => i += 1,
        }
    }

    match out {
        None => Cow::Borrowed(data),
        Some(mut buf) => {
            buf.extend_from_slice(&data[copied..]);
            Cow::Owned(buf)
        }
    }
}

fn is_wide_integer(token: &[u8]) -> bool {
    let digits = token.strip_prefix(b"-").unwrap_or(token);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    match std::str::from_utf8(token) {
        Ok(text) => text.parse::<i64>().is_err() && text.parse::<u64>().is_err(),
        Err(_) => false,
    }
}
