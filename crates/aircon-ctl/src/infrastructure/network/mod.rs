//! Network infrastructure: the device protocol over UDP.
//!
//! # Sub-modules
//!
//! - **`transport`** – One request datagram, one reply datagram, bounded by a
//!   deadline.  Shared by binding and control.
//!
//! - **`discovery`** – Broadcasts the scan request and reports each unit that
//!   answers, once per hardware id.
//!
//! - **`binding`** – Exchanges the bind handshake under the generic key and
//!   returns the unit's session key.
//!
//! - **`control`** – Status queries and parameter commands under a session
//!   key.
//!
//! Every service returns [`ClientError`] so a caller can tell a silent unit
//! ([`ClientError::Timeout`]) apart from a unit that answered with something
//! unusable.

use std::net::SocketAddr;
use std::time::Duration;

use aircon_core::{CipherError, PackError, ProtocolError};
use thiserror::Error;

pub mod binding;
pub mod control;
pub mod discovery;
pub mod transport;

pub use binding::bind;
pub use control::{get_status, query_columns, set_parameters, CommandResponse, Session};
pub use discovery::{spawn_discovery, DiscoveredDevice, DiscoveryConfig, DiscoveryService};

/// How long a bind or control request waits for its reply by default.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for the device network services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A socket could not be opened, configured, or used.
    #[error("transport error while {action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// No reply arrived before the deadline.
    #[error("no reply from {addr} within {waited:?}")]
    Timeout { addr: SocketAddr, waited: Duration },

    /// A reply's pack could not be decrypted.
    #[error("could not decrypt reply: {0}")]
    Decode(#[from] CipherError),

    /// A reply decrypted but is not the message this exchange expects.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The unit refused the bind handshake or returned an unusable key.
    #[error("bind with {mac} failed: {reason}")]
    Bind { mac: String, reason: String },

    /// The unit answered a status query with a non-success status code.
    #[error("device rejected request with status {status}")]
    Rejected { status: u16 },
}

impl From<PackError> for ClientError {
    fn from(err: PackError) -> Self {
        match err {
            PackError::Decode(e) => ClientError::Decode(e),
            PackError::Protocol(e) => ClientError::Protocol(e),
        }
    }
}

impl ClientError {
    pub(crate) fn transport(action: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ClientError::Transport { action, source }
    }

    /// Whether the error means the unit never answered.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
