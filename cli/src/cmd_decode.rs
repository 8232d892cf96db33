//! `chainsync decode`: read a saved payload, print it in the current shape.

use anyhow::{Context, Result};
use chainsync_core::codec::{attribute, cbor, AttributeValue};
use chainsync_core::{Point, Response};

use crate::DecodeFormat;

pub fn run(file: &str, format: DecodeFormat) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("cannot read {file}"))?;
    println!("{}", render(&data, format)?);
    Ok(())
}

fn render(data: &[u8], format: DecodeFormat) -> Result<String> {
    let json = match format {
        DecodeFormat::Json => {
            let response = Response::decode(data).context("not a chain-sync response")?;
            serde_json::to_value(&response)?
        }
        DecodeFormat::CborPoint => point_json(cbor::decode_point(data)?)?,
        DecodeFormat::AttributePoint => {
            let item: AttributeValue =
                serde_json::from_slice(data).context("not an attribute value")?;
            point_json(attribute::decode_point(Some(&item))?)?
        }
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

/// The zero point prints as `null`.
fn point_json(point: Option<Point>) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(point)?)
}
