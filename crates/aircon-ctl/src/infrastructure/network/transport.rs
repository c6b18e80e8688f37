//! Single request/reply exchange over UDP.
//!
//! Each exchange binds its own ephemeral socket, sends one datagram to the
//! unit, and waits for the first datagram that comes back *from that unit*
//! until the deadline.  Datagrams from other peers are logged and ignored.
//! There is no retry; a lost request or reply surfaces as
//! [`ClientError::Timeout`].

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

use super::ClientError;

/// Largest payload a UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

/// Binds an ephemeral UDP socket in the same address family as `peer`.
///
/// # Errors
///
/// Returns [`ClientError::Transport`] if the socket cannot be bound.
pub async fn bind_ephemeral(peer: SocketAddr) -> Result<UdpSocket, ClientError> {
    let local: SocketAddr = match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    UdpSocket::bind(local)
        .await
        .map_err(ClientError::transport("binding local socket"))
}

/// Sends `request` to `peer` and returns the first reply from `peer`.
///
/// # Errors
///
/// - [`ClientError::Transport`] if the socket cannot be bound, the send
///   fails, or receiving fails.
/// - [`ClientError::Timeout`] if nothing arrives from `peer` within `wait`.
pub async fn exchange(
    peer: SocketAddr,
    request: &[u8],
    wait: Duration,
) -> Result<Vec<u8>, ClientError> {
    let deadline = Instant::now() + wait;
    let socket = bind_ephemeral(peer).await?;

    socket
        .send_to(request, peer)
        .await
        .map_err(ClientError::transport("sending request"))?;
    trace!(%peer, bytes = request.len(), "request sent");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, src) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(ClientError::Transport { action: "receiving reply", source: e }),
            Err(_) => {
                debug!(%peer, ?wait, "request timed out");
                return Err(ClientError::Timeout { addr: peer, waited: wait });
            }
        };

        if src != peer {
            debug!(%src, %peer, "ignoring datagram from unexpected peer");
            continue;
        }

        trace!(%peer, bytes = len, "reply received");
        buf.truncate(len);
        return Ok(buf);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
