//! UDP broadcast discovery of units on the local network.
//!
//! A discovery run:
//!
//! 1. Binds an ephemeral UDP socket with broadcast enabled.
//! 2. Sends the plaintext scan request `{"t":"scan"}` to the broadcast
//!    address on the device port (7000).
//! 3. Collects replies until the wall-clock deadline.  Each reply is an
//!    envelope whose pack, decrypted with the generic key, is the unit's
//!    [`DiscoveryAnnouncement`].
//! 4. Reports each hardware id at most once per run.
//!
//! Replies that cannot be parsed or decrypted are logged at debug level and
//! skipped; only socket failures end a run early.  The seen-set and the
//! socket belong to one run and are dropped on every exit path.
//!
//! # Callback contract
//!
//! [`DiscoveryService::discover`] calls `on_found` inline on the receive
//! loop.  A slow callback delays reading further replies, so long work
//! should be handed off.  [`spawn_discovery`] does that hand-off with a
//! channel.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use aircon_core::protocol::{decode_pack, DEFAULT_PORT, SCAN_REQUEST};
use aircon_core::{DeviceAddress, DiscoveryAnnouncement, GENERIC_KEY};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace};

use super::transport::{bind_ephemeral, MAX_DATAGRAM};
use super::ClientError;

/// Default time a discovery run listens for replies.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the scan request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Broadcast address and device port, normally `255.255.255.255:7000`.
    pub target: SocketAddr,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, DEFAULT_PORT)),
        }
    }
}

/// A unit that answered a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Source address of the reply paired with the reported mac.
    pub address: DeviceAddress,
    pub announcement: DiscoveryAnnouncement,
}

/// Runs discovery scans against one broadcast target.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryService {
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Scans for `timeout` and calls `on_found` once per newly seen unit.
    ///
    /// Returns the number of distinct units reported.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the socket cannot be bound,
    /// switched to broadcast, or used to send or receive.
    pub async fn discover<F>(&self, timeout: Duration, mut on_found: F) -> Result<usize, ClientError>
    where
        F: FnMut(DiscoveredDevice),
    {
        let deadline = Instant::now() + timeout;
        let target = self.config.target;

        let socket = bind_ephemeral(target).await?;
        socket
            .set_broadcast(true)
            .map_err(ClientError::transport("enabling broadcast"))?;
        socket
            .send_to(SCAN_REQUEST, target)
            .await
            .map_err(ClientError::transport("sending scan request"))?;
        info!(%target, ?timeout, "scan request sent");

        let mut seen: HashSet<String> = HashSet::new();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            let (len, src) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                    // ICMP port-unreachable from an earlier send on some platforms.
                    debug!("ignoring connection reset during discovery: {e}");
                    continue;
                }
                Ok(Err(e)) => {
                    return Err(ClientError::Transport {
                        action: "receiving discovery reply",
                        source: e,
                    })
                }
            };

            if let Some(device) = parse_reply(&buf[..len], src, &mut seen) {
                on_found(device);
            }
        }

        info!(found = seen.len(), "discovery finished");
        Ok(seen.len())
    }

    /// Scans for `timeout` and returns every distinct unit that answered, in
    /// reply order.
    ///
    /// # Errors
    ///
    /// Same as [`discover`](Self::discover).
    pub async fn discover_all(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>, ClientError> {
        let mut found = Vec::new();
        self.discover(timeout, |device| found.push(device)).await?;
        Ok(found)
    }
}

/// Runs a scan on a background task and streams each unit over a channel.
///
/// The receiver yields devices as they answer and closes when the scan ends;
/// the join handle carries the run's final result.
pub fn spawn_discovery(
    service: DiscoveryService,
    timeout: Duration,
) -> (
    mpsc::UnboundedReceiver<DiscoveredDevice>,
    JoinHandle<Result<usize, ClientError>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        service
            .discover(timeout, move |device| {
                // A dropped receiver only means the caller stopped listening.
                let _ = tx.send(device);
            })
            .await
    });

    (rx, handle)
}

/// Decodes one reply and records its mac.  Returns the device only the
/// first time its mac is seen.
fn parse_reply(
    datagram: &[u8],
    src: SocketAddr,
    seen: &mut HashSet<String>,
) -> Option<DiscoveredDevice> {
    let announcement: DiscoveryAnnouncement = match decode_pack(datagram, &GENERIC_KEY) {
        Ok(a) => a,
        Err(e) => {
            debug!(%src, "skipping undecodable discovery reply: {e}");
            return None;
        }
    };

    if announcement.mac.is_empty() {
        debug!(%src, "skipping discovery reply without mac");
        return None;
    }

    if !seen.insert(announcement.mac.clone()) {
        trace!(%src, mac = %announcement.mac, "duplicate discovery reply");
        return None;
    }

    debug!(%src, mac = %announcement.mac, name = %announcement.name, "unit found");
    Some(DiscoveredDevice {
        address: DeviceAddress::new(src, announcement.mac.clone()),
        announcement,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
