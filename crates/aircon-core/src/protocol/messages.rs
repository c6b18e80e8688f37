//! Wire message types.
//!
//! Every datagram except the scan request is a JSON [`Envelope`] whose `pack`
//! field carries one of the encrypted payloads below:
//!
//! ```text
//! {"cid":"app","i":1,"t":"pack","uid":0,"tcid":"<mac>","pack":"<base64>"}
//! ```
//!
//! | Exchange  | Request pack `t` | Reply pack `t` | Key          |
//! |-----------|------------------|----------------|--------------|
//! | discovery | (plain `scan`)   | `dev`          | generic      |
//! | bind      | `bind`           | `bindok`       | generic      |
//! | status    | `status`         | `dat`          | session      |
//! | set       | `cmd`            | `res`          | session      |
//!
//! Both directions derive `Serialize` and `Deserialize` so the same types
//! describe a controller and a (simulated) unit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::parameters::ParameterMap;
use crate::protocol::error::ProtocolError;

// ── Protocol constants ────────────────────────────────────────────────────────

/// UDP port units listen on for discovery, bind, and control traffic.
pub const DEFAULT_PORT: u16 = 7000;

/// Plaintext body of the discovery broadcast.
pub const SCAN_REQUEST: &[u8] = br#"{"t":"scan"}"#;

/// Client id a controller puts in the envelope `cid` field.
pub const APP_CID: &str = "app";

/// Envelope `t` value for every encrypted datagram.
pub const ENVELOPE_TYPE: &str = "pack";

/// Status code units report on success.
pub const STATUS_OK: u16 = 200;

/// Pack `t` values.
pub mod pack_type {
    pub const SCAN: &str = "scan";
    pub const DEVICE: &str = "dev";
    pub const BIND: &str = "bind";
    pub const BIND_OK: &str = "bindok";
    pub const STATUS: &str = "status";
    pub const STATUS_DATA: &str = "dat";
    pub const COMMAND: &str = "cmd";
    pub const COMMAND_RESULT: &str = "res";
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Which key encrypted an envelope's pack, as flagged by its `i` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Protocol-published generic key (`i = 1`).
    Generic,
    /// Per-device session key (`i = 0`).
    Session,
}

impl KeyScope {
    pub fn as_wire(self) -> u8 {
        match self {
            KeyScope::Generic => 1,
            KeyScope::Session => 0,
        }
    }
}

/// Outer plaintext JSON wrapper around an encrypted pack.
///
/// Units fill in only some of these fields in replies, so all but `pack`
/// default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub cid: String,
    /// `1` when the pack is under the generic key, `0` under a session key.
    #[serde(default)]
    pub i: u8,
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub uid: i64,
    /// Target controller id: the unit's mac on requests.
    #[serde(default)]
    pub tcid: String,
    /// Base64 ciphertext of the payload JSON.
    pub pack: String,
}

// ── Bind ──────────────────────────────────────────────────────────────────────

/// BIND request pack, sent under the generic key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    pub mac: String,
    pub t: String,
    #[serde(default)]
    pub uid: i64,
}

impl BindRequest {
    pub fn new(mac: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            t: pack_type::BIND.to_string(),
            uid: 0,
        }
    }
}

/// BINDOK reply pack carrying the newly issued session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindReply {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub mac: String,
    /// Sixteen printable characters used verbatim as the AES key.
    #[serde(default)]
    pub key: String,
    /// Status code; units that omit it are treated as successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<u16>,
}

impl BindReply {
    pub fn is_success(&self) -> bool {
        self.r.unwrap_or(STATUS_OK) == STATUS_OK
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

/// STATUS request pack: asks for the current value of each listed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub cols: Vec<String>,
    pub mac: String,
    pub t: String,
}

impl StatusRequest {
    pub fn new(mac: impl Into<String>, cols: Vec<String>) -> Self {
        Self {
            cols,
            mac: mac.into(),
            t: pack_type::STATUS.to_string(),
        }
    }
}

/// DAT reply pack: parallel `cols`/`dat` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<u16>,
    #[serde(default)]
    pub cols: Vec<String>,
    #[serde(default)]
    pub dat: Vec<Value>,
}

impl StatusReply {
    pub fn is_success(&self) -> bool {
        self.r.unwrap_or(STATUS_OK) == STATUS_OK
    }

    /// Zips `cols` with `dat`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LengthMismatch`] when the arrays differ in length.
    pub fn parameters(&self) -> Result<ParameterMap, ProtocolError> {
        ParameterMap::from_columns(&self.cols, &self.dat)
    }
}

// ── Command ───────────────────────────────────────────────────────────────────

/// CMD request pack: set each `opt[i]` to `p[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub opt: Vec<String>,
    pub p: Vec<Value>,
    pub t: String,
}

impl CommandRequest {
    /// Builds a command from a parameter map, keeping its column order.
    pub fn from_parameters(params: &ParameterMap) -> Self {
        let (opt, p) = params.to_columns();
        Self {
            opt,
            p,
            t: pack_type::COMMAND.to_string(),
        }
    }

    /// Zips `opt` with `p` (the receiving unit's view of a command).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LengthMismatch`] when the arrays differ in length.
    pub fn parameters(&self) -> Result<ParameterMap, ProtocolError> {
        ParameterMap::from_columns(&self.opt, &self.p)
    }
}

/// RES reply pack acknowledging a command.
///
/// Firmware echoes the accepted values in `p`, in `val`, or in both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<u16>,
    #[serde(default)]
    pub opt: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Vec<Value>>,
}

impl CommandReply {
    pub fn status_code(&self) -> u16 {
        self.r.unwrap_or(STATUS_OK)
    }

    /// Zips `opt` with the echoed values, preferring `p` over `val`.
    ///
    /// An acknowledgement that echoes nothing yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LengthMismatch`] when the arrays differ in length.
    pub fn parameters(&self) -> Result<ParameterMap, ProtocolError> {
        match self.p.as_ref().or(self.val.as_ref()) {
            Some(values) => ParameterMap::from_columns(&self.opt, values),
            None if self.opt.is_empty() => Ok(ParameterMap::new()),
            None => Err(ProtocolError::LengthMismatch {
                columns: self.opt.len(),
                values: 0,
            }),
        }
    }
}

/// Checks a pack `t` field against the awaited type.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedPackType`] on mismatch.
pub fn expect_pack_type(actual: &str, expected: &'static str) -> Result<(), ProtocolError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ProtocolError::UnexpectedPackType {
            expected,
            actual: actual.to_string(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
