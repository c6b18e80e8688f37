//! Status queries and parameter commands under a session key.
//!
//! Both exchanges are one request and one reply, sealed with the session key
//! (`i = 0` in the envelope):
//!
//! | Call               | Request pack                      | Reply pack                  |
//! |--------------------|-----------------------------------|-----------------------------|
//! | [`get_status`]     | `{"cols":[..],"mac":m,"t":"status"}` | `{"t":"dat","cols","dat"}` |
//! | [`set_parameters`] | `{"opt":[..],"p":[..],"t":"cmd"}`    | `{"t":"res","opt","p"/"val"}` |

use std::time::Duration;

use aircon_core::protocol::{
    decode_pack, expect_pack_type, pack_type, seal_pack, CommandReply, CommandRequest, KeyScope,
    StatusReply, StatusRequest, STATUS_OK,
};
use aircon_core::{DeviceAddress, ParameterMap, ParameterName, SessionKey};
use tracing::{debug, warn};

use super::{transport, ClientError};

/// A bound device: its address plus the key it issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub address: DeviceAddress,
    pub key: SessionKey,
}

impl Session {
    pub fn new(address: DeviceAddress, key: SessionKey) -> Self {
        Self { address, key }
    }
}

/// Outcome of a set command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// `true` when the unit answered with status 200.
    pub success: bool,
    /// Status code reported by the unit.
    pub status: u16,
    /// Values the unit echoed back as applied.  Empty on failure.
    pub applied: ParameterMap,
}

/// Reads every known status column.
///
/// # Errors
///
/// See [`query_columns`].
pub async fn get_status(session: &Session, wait: Duration) -> Result<ParameterMap, ClientError> {
    query_columns(session, &ParameterName::STATUS_COLUMNS, wait).await
}

/// Reads the current value of `columns`.
///
/// # Errors
///
/// - [`ClientError::Timeout`] if the unit does not answer within `wait`.
/// - [`ClientError::Rejected`] if it answers with a non-200 status.
/// - [`ClientError::Protocol`] if the reply is not a `dat` pack or its
///   column and value arrays differ in length.
/// - [`ClientError::Decode`] if the reply does not decrypt.
pub async fn query_columns(
    session: &Session,
    columns: &[ParameterName],
    wait: Duration,
) -> Result<ParameterMap, ClientError> {
    let cols = columns.iter().map(|c| c.as_wire().to_string()).collect();
    let request = StatusRequest::new(&session.address.mac, cols);

    let reply: StatusReply = round_trip(session, &request, wait).await?;
    expect_pack_type(&reply.t, pack_type::STATUS_DATA)?;

    if !reply.is_success() {
        let status = reply.r.unwrap_or_default();
        warn!(address = %session.address, status, "status query rejected");
        return Err(ClientError::Rejected { status });
    }

    let params = reply.parameters()?;
    debug!(address = %session.address, %params, "status received");
    Ok(params)
}

/// Sends `params` as one command.
///
/// A non-200 answer is not an error: it comes back as a
/// [`CommandResponse`] with `success == false`.
///
/// # Errors
///
/// - [`ClientError::Timeout`] if the unit does not answer within `wait`.
/// - [`ClientError::Protocol`] if the reply is not a `res` pack, or a
///   successful reply echoes mismatched arrays.
/// - [`ClientError::Decode`] if the reply does not decrypt.
pub async fn set_parameters(
    session: &Session,
    params: &ParameterMap,
    wait: Duration,
) -> Result<CommandResponse, ClientError> {
    let request = CommandRequest::from_parameters(params);

    let reply: CommandReply = round_trip(session, &request, wait).await?;
    expect_pack_type(&reply.t, pack_type::COMMAND_RESULT)?;

    let status = reply.status_code();
    if status != STATUS_OK {
        warn!(address = %session.address, status, %params, "command rejected");
        return Ok(CommandResponse {
            success: false,
            status,
            applied: ParameterMap::new(),
        });
    }

    let applied = reply.parameters()?;
    debug!(address = %session.address, %applied, "command acknowledged");
    Ok(CommandResponse {
        success: true,
        status,
        applied,
    })
}

/// Seals `request` with the session key, exchanges it, and opens the reply.
async fn round_trip<Req, Rep>(session: &Session, request: &Req, wait: Duration) -> Result<Rep, ClientError>
where
    Req: serde::Serialize,
    Rep: serde::de::DeserializeOwned,
{
    let key = session.key.cipher_key();
    let datagram = seal_pack(request, key, KeyScope::Session, &session.address.mac)?;
    let reply = transport::exchange(session.address.addr, &datagram, wait).await?;
    Ok(decode_pack(&reply, key)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
