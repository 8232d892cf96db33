//! Error types for the transport and the wire decoder.

use thiserror::Error;

/// Errors raised by a streaming session.
///
/// A clean end-of-stream is not an error: sessions report it as `Ok(None)`
/// from `next_frame`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Dial or WebSocket handshake failed.
    #[error("failed to connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    /// The session configuration cannot be used.
    #[error("invalid session config: {0}")]
    Config(String),

    /// Mid-session send/receive failure. Fatal to the session.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The session, or the token it was opened with, was cancelled.
    #[error("session cancelled")]
    Cancelled,

    /// An outbound request could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal task ended abnormally.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if a caller may reasonably reconnect after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::WebSocket(_))
    }

    /// Returns `true` if this error only reports cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors raised while decoding a payload. Local to the decode call; the
/// session that delivered the payload is unaffected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON, or a JSON shape did not fit.
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not valid CBOR.
    #[error("CBOR decode failed: {0}")]
    Cbor(String),

    /// An attribute has the wrong type or is missing a field.
    #[error("attribute decode failed: {0}")]
    Attribute(String),

    /// The envelope names a method this client does not speak.
    #[error("unknown method: '{0}'")]
    UnknownMethod(String),

    /// No envelope or result shape accepted the payload.
    #[error("payload matches neither the current nor the legacy shape")]
    UnrecognizedShape,

    /// A point record is neither symbolic nor structured, or is both.
    #[error("invalid point: {0}")]
    InvalidPoint(String),

    /// An amount is not a decimal integer.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A datum value is not a base64 string.
    #[error("invalid datum {key}: {reason}")]
    InvalidDatum { key: String, reason: String },

    /// A field the shape requires is absent or null.
    #[error("missing required field: {field}")]
    MissingField { field: String },
}

/// Either half of a failed `next_response`.
#[derive(Debug, Error)]
pub enum ChainSyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let conn = TransportError::Connection {
            url: "ws://localhost:1337".into(),
            reason: "refused".into(),
        };
        assert!(conn.is_retryable());
        assert!(TransportError::WebSocket("reset".into()).is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::Config("pipeline must be > 0".into()).is_retryable());
    }

    #[test]
    fn unknown_method_message() {
        let err = DecodeError::UnknownMethod("acquireLedgerState".into());
        assert_eq!(err.to_string(), "unknown method: 'acquireLedgerState'");
    }

    #[test]
    fn decode_messages_name_the_culprit() {
        let datum = DecodeError::InvalidDatum {
            key: "d1".into(),
            reason: "bad base64".into(),
        };
        assert_eq!(datum.to_string(), "invalid datum d1: bad base64");
        let missing = DecodeError::MissingField { field: "result".into() };
        assert_eq!(missing.to_string(), "missing required field: result");
        let wrapped = ChainSyncError::from(DecodeError::UnrecognizedShape);
        assert_eq!(
            wrapped.to_string(),
            "payload matches neither the current nor the legacy shape"
        );
    }
}
