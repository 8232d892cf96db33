//! Native asset identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a hex-encoded minting policy hash.
pub const POLICY_ID_LEN: usize = 56;

/// Composite asset key `policyID.assetNameHex`.
///
/// An asset with an empty name is represented by the bare policy id, without
/// a trailing dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build an id from a policy and a hex asset name (possibly empty).
    pub fn from_parts(policy_id: &str, asset_name_hex: &str) -> Self {
        if asset_name_hex.is_empty() {
            Self(policy_id.to_string())
        } else {
            Self(format!("{policy_id}.{asset_name_hex}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The policy part of the id; the whole id when there is no name.
    pub fn policy_id(&self) -> &str {
        match self.0.find('.') {
            Some(i) if i > 0 => &self.0[..i],
            _ => &self.0,
        }
    }

    /// The hex asset name, or `""` for a bare policy id.
    pub fn asset_name(&self) -> &str {
        match self.0.find('.') {
            Some(i) if i > 0 => &self.0[i + 1..],
            _ => "",
        }
    }

    /// The asset name decoded from hex, if it is valid UTF-8.
    pub fn asset_name_utf8(&self) -> Option<String> {
        let name = self.asset_name();
        if name.is_empty() {
            return None;
        }
        let bytes = hex::decode(name).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Returns `true` if `policy_id` is a full policy hash this id belongs to.
    pub fn has_policy_id(&self, policy_id: &str) -> bool {
        policy_id.len() == POLICY_ID_LEN && self.0.starts_with(policy_id)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
