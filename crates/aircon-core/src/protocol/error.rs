//! Error type for well-formed-but-wrong protocol traffic.

use thiserror::Error;

/// Errors raised when a datagram or decrypted pack is syntactically or
/// semantically invalid.
///
/// Cipher failures are *not* represented here; they surface as
/// [`crate::crypto::CipherError`] so callers can tell "could not decrypt"
/// apart from "decrypted, but the content is wrong".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The outer envelope is not JSON or lacks the `pack` field.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope `t` field is not `"pack"`.
    #[error("unexpected envelope type: {0:?}")]
    UnexpectedEnvelope(String),

    /// The decrypted pack is not the JSON shape expected for this exchange.
    #[error("malformed pack: {0}")]
    MalformedPack(String),

    /// The pack `t` field names a different message than the one awaited.
    #[error("unexpected pack type: expected {expected:?}, got {actual:?}")]
    UnexpectedPackType {
        expected: &'static str,
        actual: String,
    },

    /// Parallel column/value arrays differ in length.
    #[error("column/value length mismatch: {columns} columns, {values} values")]
    LengthMismatch { columns: usize, values: usize },

    /// A value is not an integer or string primitive.
    #[error("unsupported value for column {column}: {value}")]
    UnsupportedValue { column: String, value: String },

    /// A field required for this exchange is absent or empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// An outgoing payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encode(String),
}
