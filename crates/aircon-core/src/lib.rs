//! # aircon-core
//!
//! Shared library for the LAN air-conditioner control protocol containing the
//! cipher codec, the wire message model, and the domain types that flow
//! between discovery, binding, and control.
//!
//! It has zero dependencies on OS APIs or network sockets; everything here is
//! pure data transformation and can be tested without a device.
//!
//! # Architecture overview
//!
//! Units on the LAN speak a small JSON-over-UDP protocol:
//!
//! 1. A controller broadcasts a plaintext `{"t":"scan"}`.  Every unit answers
//!    with an envelope whose `pack` field is its identity, encrypted with a
//!    well-known *generic key*.
//! 2. The controller sends a `bind` request (also under the generic key) and
//!    receives a per-device *session key*.
//! 3. All status queries and parameter changes are then encrypted with that
//!    session key.
//!
//! This crate defines:
//!
//! - **`crypto`** – AES-128-ECB with PKCS#7 padding and base64 transport
//!   encoding, plus the key types.
//!
//! - **`protocol`** – The envelope and the typed payloads (discovery reply,
//!   bind request/reply, status and command packs) and the helpers that seal
//!   a payload into an envelope and open it again.
//!
//! - **`domain`** – `DeviceAddress`, `DiscoveryAnnouncement`, `SessionKey`,
//!   and the order-preserving `ParameterMap`.

pub mod crypto;
pub mod domain;
pub mod protocol;

pub use crypto::{CipherError, CipherKey, GENERIC_KEY};
pub use domain::device::{DeviceAddress, DiscoveryAnnouncement, SessionKey};
pub use domain::parameters::{ParameterMap, ParameterName, ParameterValue};
pub use protocol::codec::{open_envelope, seal_pack, PackError};
pub use protocol::error::ProtocolError;
