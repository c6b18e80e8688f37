//! Bind handshake: trade the generic key for a per-device session key.
//!
//! ```text
//! controller ── {"mac":m,"t":"bind","uid":0}  (generic key, i=1) ──► unit
//! controller ◄── {"t":"bindok","mac":m,"key":"<16 chars>","r":200} ── unit
//! ```
//!
//! Exactly one request is sent per call.  Nothing is cached here; callers
//! that want to reuse a session keep it themselves.

use std::time::Duration;

use aircon_core::protocol::{
    decode_pack, expect_pack_type, pack_type, seal_pack, BindReply, BindRequest, KeyScope,
};
use aircon_core::{DeviceAddress, SessionKey, GENERIC_KEY};
use tracing::{debug, info};

use super::{transport, ClientError};

/// Performs the bind handshake with `address`.
///
/// # Errors
///
/// - [`ClientError::Timeout`] if the unit does not answer within `wait`.
/// - [`ClientError::Decode`] / [`ClientError::Protocol`] if the reply cannot
///   be opened as a bind reply.
/// - [`ClientError::Bind`] if the reply is not a `bindok`, reports a failure
///   status, or carries a key that is not 16 bytes.
/// - [`ClientError::Transport`] on socket failure.
pub async fn bind(address: &DeviceAddress, wait: Duration) -> Result<SessionKey, ClientError> {
    let request = seal_pack(
        &BindRequest::new(&address.mac),
        &GENERIC_KEY,
        KeyScope::Generic,
        &address.mac,
    )?;

    debug!(%address, "sending bind request");
    let datagram = transport::exchange(address.addr, &request, wait).await?;
    let reply: BindReply = decode_pack(&datagram, &GENERIC_KEY)?;

    let key = session_key_from(address, &reply)?;
    info!(%address, "bound");
    Ok(key)
}

/// Validates a decoded bind reply and extracts its session key.
fn session_key_from(address: &DeviceAddress, reply: &BindReply) -> Result<SessionKey, ClientError> {
    let fail = |reason: String| ClientError::Bind {
        mac: address.mac.clone(),
        reason,
    };

    expect_pack_type(&reply.t, pack_type::BIND_OK).map_err(|e| fail(e.to_string()))?;

    if !reply.is_success() {
        return Err(fail(format!(
            "device answered with status {}",
            reply.r.unwrap_or_default()
        )));
    }

    SessionKey::from_wire(&reply.key).map_err(|e| fail(format!("unusable session key: {e}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
