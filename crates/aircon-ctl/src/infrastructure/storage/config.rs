//! TOML-based configuration persistence.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\AirconCtl\config.toml`
//! - Linux:    `~/.config/aircon-ctl/config.toml`
//! - macOS:    `~/Library/Application Support/AirconCtl/config.toml`
//!
//! Example:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [network]
//! device_port = 7000
//! broadcast_address = "192.168.1.255"
//! discovery_timeout_ms = 15000
//! request_timeout_ms = 5000
//!
//! [[devices]]
//! name = "Living room"
//! host = "192.168.1.40"
//! mac = "f4911e7aca59"
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section,
//! and a missing key all fall back to the values above.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use aircon_core::protocol::DEFAULT_PORT;
use aircon_core::DeviceAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An address in the config is not an IP address.
    #[error("invalid address {value:?} in config")]
    InvalidAddress { value: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    /// Units remembered by `scan --save`.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Ports, addresses, and timeouts for the device protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// UDP port units listen on.
    #[serde(default = "default_device_port")]
    pub device_port: u16,
    /// Where scan requests are broadcast.
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    /// Bound on each bind, status, or command exchange.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// A remembered unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    /// IP address, or `ip:port` when the unit is not on the default port.
    pub host: String,
    pub mac: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_device_port() -> u16 {
    DEFAULT_PORT
}
fn default_broadcast_address() -> String {
    "255.255.255.255".to_string()
}
fn default_discovery_timeout_ms() -> u64 {
    15_000
}
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            device_port: default_device_port(),
            broadcast_address: default_broadcast_address(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    /// Broadcast address joined with the device port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `broadcast_address` is not
    /// an IP address.
    pub fn broadcast_target(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .broadcast_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress {
                value: self.broadcast_address.clone(),
            })?;
        Ok(SocketAddr::new(ip, self.device_port))
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl DeviceEntry {
    pub fn new(name: impl Into<String>, address: &DeviceAddress) -> Self {
        let host = if address.addr.port() == DEFAULT_PORT {
            address.addr.ip().to_string()
        } else {
            address.addr.to_string()
        };
        Self {
            name: name.into(),
            host,
            mac: address.mac.clone(),
        }
    }

    /// Resolves the entry to a device address, using `default_port` when
    /// `host` carries no port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `host` is neither an IP
    /// address nor `ip:port`.
    pub fn address(&self, default_port: u16) -> Result<DeviceAddress, ConfigError> {
        let addr = if let Ok(addr) = self.host.parse::<SocketAddr>() {
            addr
        } else {
            let ip: IpAddr = self.host.parse().map_err(|_| ConfigError::InvalidAddress {
                value: self.host.clone(),
            })?;
            SocketAddr::new(ip, default_port)
        };
        Ok(DeviceAddress::new(addr, self.mac.clone()))
    }

    /// Whether `selector` names this entry by name (case-insensitive) or mac.
    pub fn matches(&self, selector: &str) -> bool {
        self.name.eq_ignore_ascii_case(selector) || self.mac.eq_ignore_ascii_case(selector)
    }
}

impl AppConfig {
    /// Looks up a remembered unit by name or mac.
    pub fn find_device(&self, selector: &str) -> Option<&DeviceEntry> {
        self.devices.iter().find(|d| d.matches(selector))
    }

    /// Adds `entry`, replacing any entry with the same mac.  Returns `true`
    /// when the entry is new.
    pub fn upsert_device(&mut self, entry: DeviceEntry) -> bool {
        match self.devices.iter_mut().find(|d| d.mac == entry.mac) {
            Some(existing) => {
                *existing = entry;
                false
            }
            None => {
                self.devices.push(entry);
                true
            }
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the default location.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    let path = config_file_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("AirconCtl"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("aircon-ctl"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("AirconCtl")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
