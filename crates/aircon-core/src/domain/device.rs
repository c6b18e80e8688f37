//! Device identity, addressing, and session keys.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::crypto::{CipherError, CipherKey};

/// Network location plus hardware identifier of one unit.
///
/// Created once per discovery reply and never mutated.  The pair is the join
/// key between discovery, binding, and control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Where the unit answers (normally UDP port 7000).
    pub addr: SocketAddr,
    /// MAC-like hardware identifier reported by the unit.
    pub mac: String,
}

impl DeviceAddress {
    pub fn new(addr: SocketAddr, mac: impl Into<String>) -> Self {
        Self {
            addr,
            mac: mac.into(),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.addr, self.mac)
    }
}

/// Identity a unit reports in its decrypted discovery reply.
///
/// Only `mac` is mandatory on the wire; firmware variants omit the rest
/// freely, so every other field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscoveryAnnouncement {
    /// Hardware identifier; the deduplication key during discovery.
    pub mac: String,
    /// User-assigned display name.
    #[serde(default)]
    pub name: String,
    /// Controller id; equals `mac` on stand-alone units, differs behind a hub.
    #[serde(default)]
    pub cid: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub brand: String,
    /// Vendor code.  The misspelling is the wire name.
    #[serde(default, rename = "vender")]
    pub vendor: String,
    /// Firmware version string, e.g. `"V1.1.13"`.
    #[serde(default, rename = "ver")]
    pub firmware_version: String,
    #[serde(default)]
    pub catalog: String,
    #[serde(default)]
    pub series: String,
    /// Model id.
    #[serde(default)]
    pub mid: String,
    /// Brand code.
    #[serde(default)]
    pub bc: String,
    /// Non-zero when the unit is locked against LAN control.
    #[serde(default)]
    pub lock: u8,
}

impl DiscoveryAnnouncement {
    /// Name to show for this unit: the reported name or, if blank, the mac.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.mac
        } else {
            &self.name
        }
    }

    /// Whether the unit reports itself as locked.
    pub fn is_locked(&self) -> bool {
        self.lock != 0
    }
}

/// Per-device key issued by a successful bind.
///
/// Deliberately a distinct type from [`CipherKey`] so that command traffic
/// cannot be built with the generic key.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(CipherKey);

impl SessionKey {
    /// Builds a session key from the `key` string of a bind reply.
    ///
    /// Units issue 16 printable characters that are used directly as AES key
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if the string is not exactly
    /// 16 bytes.
    pub fn from_wire(key: &str) -> Result<Self, CipherError> {
        CipherKey::from_slice(key.as_bytes()).map(Self)
    }

    pub fn from_cipher_key(key: CipherKey) -> Self {
        Self(key)
    }

    /// Key used to seal and open command packs.
    pub fn cipher_key(&self) -> &CipherKey {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announcement_with_only_name_and_mac_parses_with_defaults() {
        // Arrange
        let json = r#"{"name":"Unit1","mac":"AA:BB:CC"}"#;

        // Act
        let ann: DiscoveryAnnouncement = serde_json::from_str(json).expect("parse");

        // Assert
        assert_eq!(ann.name, "Unit1");
        assert_eq!(ann.mac, "AA:BB:CC");
        assert_eq!(ann.model, "");
        assert!(!ann.is_locked());
    }

    #[test]
    fn test_announcement_maps_wire_field_names() {
        let json = r#"{"t":"dev","cid":"f4911e7aca59","bc":"gree","brand":"gree",
            "catalog":"gree","mac":"f4911e7aca59","mid":"10001","model":"gree",
            "name":"1e7aca59","series":"gree","vender":"1","ver":"V1.1.13","lock":1}"#;

        let ann: DiscoveryAnnouncement = serde_json::from_str(json).expect("parse");

        assert_eq!(ann.vendor, "1");
        assert_eq!(ann.firmware_version, "V1.1.13");
        assert_eq!(ann.mid, "10001");
        assert!(ann.is_locked());
    }

    #[test]
    fn test_announcement_without_mac_is_rejected() {
        let result = serde_json::from_str::<DiscoveryAnnouncement>(r#"{"name":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_mac() {
        let ann = DiscoveryAnnouncement {
            mac: "f4911e000001".to_string(),
            name: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(ann.display_name(), "f4911e000001");
    }

    #[test]
    fn test_session_key_from_wire_requires_sixteen_bytes() {
        assert!(SessionKey::from_wire("0123456789abcdef").is_ok());
        assert_eq!(
            SessionKey::from_wire("too-short"),
            Err(CipherError::InvalidKeyLength(9))
        );
    }

    #[test]
    fn test_device_address_display_includes_mac() {
        let addr = DeviceAddress::new("192.0.2.10:7000".parse().unwrap(), "AA:BB:CC");
        assert_eq!(addr.to_string(), "192.0.2.10:7000 (AA:BB:CC)");
    }
}
