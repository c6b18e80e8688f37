//! Seals payloads into envelopes and opens them again.
//!
//! Wire format of every encrypted datagram:
//! ```text
//! {"cid":"app","i":<scope>,"t":"pack","uid":0,"tcid":"<mac>","pack":"<base64(AES-ECB(json))>"}
//! ```
//! Opening is split in two steps so callers can inspect the envelope (for
//! example its `tcid`) before choosing a key for the pack.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::crypto::{self, CipherError, CipherKey};
use crate::protocol::error::ProtocolError;
use crate::protocol::messages::{Envelope, KeyScope, APP_CID, ENVELOPE_TYPE};

/// Failure opening an encrypted pack.
///
/// Keeps the two causes apart: the ciphertext could not be decrypted, or it
/// decrypted into something this exchange does not accept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error(transparent)]
    Decode(#[from] CipherError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Serializes `payload`, encrypts it under `key`, and wraps it in an
/// envelope addressed to `tcid`.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
///
/// # Examples
///
/// ```rust
/// use aircon_core::protocol::{decode_pack, seal_pack, BindRequest, KeyScope};
/// use aircon_core::GENERIC_KEY;
///
/// let bytes = seal_pack(&BindRequest::new("f4911e7aca59"), &GENERIC_KEY, KeyScope::Generic, "f4911e7aca59").unwrap();
/// let back: BindRequest = decode_pack(&bytes, &GENERIC_KEY).unwrap();
/// assert_eq!(back.mac, "f4911e7aca59");
/// ```
pub fn seal_pack<T: Serialize>(
    payload: &T,
    key: &CipherKey,
    scope: KeyScope,
    tcid: &str,
) -> Result<Vec<u8>, ProtocolError> {
    let plain = serde_json::to_vec(payload).map_err(|e| ProtocolError::Encode(e.to_string()))?;

    let envelope = Envelope {
        cid: APP_CID.to_string(),
        i: scope.as_wire(),
        t: ENVELOPE_TYPE.to_string(),
        uid: 0,
        tcid: tcid.to_string(),
        pack: crypto::encrypt(&plain, key),
    };

    serde_json::to_vec(&envelope).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Parses a received datagram as an envelope.
///
/// # Errors
///
/// - [`ProtocolError::MalformedEnvelope`] if it is not JSON or lacks `pack`.
/// - [`ProtocolError::UnexpectedEnvelope`] if `t` is present and not `"pack"`.
pub fn open_envelope(datagram: &[u8]) -> Result<Envelope, ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(datagram)
        .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;

    // Some firmware leaves `t` out of replies; only a wrong value is an error.
    if !envelope.t.is_empty() && envelope.t != ENVELOPE_TYPE {
        return Err(ProtocolError::UnexpectedEnvelope(envelope.t));
    }
    Ok(envelope)
}

/// Decrypts an envelope's pack under `key` and parses it as `T`.
///
/// # Errors
///
/// [`PackError::Decode`] when decryption fails, [`PackError::Protocol`] with
/// [`ProtocolError::MalformedPack`] when the plaintext is not a `T`.
pub fn open_pack<T: DeserializeOwned>(envelope: &Envelope, key: &CipherKey) -> Result<T, PackError> {
    let plain = crypto::decrypt(&envelope.pack, key)?;
    tracing::trace!(len = plain.len(), scope = envelope.i, "decrypted pack");
    let payload = serde_json::from_slice(&plain)
        .map_err(|e| ProtocolError::MalformedPack(e.to_string()))?;
    Ok(payload)
}

/// [`open_envelope`] followed by [`open_pack`].
///
/// # Errors
///
/// Any error from either step.
pub fn decode_pack<T: DeserializeOwned>(datagram: &[u8], key: &CipherKey) -> Result<T, PackError> {
    let envelope = open_envelope(datagram)?;
    open_pack(&envelope, key)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
