//! aircon-ctl: command-line controller for LAN air conditioners.
//!
//! # Usage
//!
//! ```text
//! aircon-ctl [OPTIONS] <COMMAND>
//!
//! Commands:
//!   scan [--save]         Broadcast a scan and list the units that answer
//!   status                Print every status column of a unit
//!   set NAME=VALUE...     Set raw parameters, e.g. `set Pow=1 SetTem=24`
//!   power on|off          Switch a unit on or off
//!   toggle NAME           Flip an on/off column, e.g. `toggle Lig`
//!   temp CELSIUS          Set the target temperature (16..=30)
//!
//! Options:
//!   -d, --device <NAME|MAC>          Unit to control
//!       --host <IP> --mac <MAC>      Address a unit directly, skipping discovery
//!       --broadcast <IP>             Scan broadcast address
//!       --port <PORT>                Device UDP port
//!       --discovery-timeout-ms <MS>  How long a scan listens
//!       --request-timeout-ms <MS>    Bound on each bind/status/command
//!       --config <PATH>              Config file to use
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                     | Option                   |
//! |------------------------------|--------------------------|
//! | `AIRCON_DEVICE`              | `--device`               |
//! | `AIRCON_BROADCAST`           | `--broadcast`            |
//! | `AIRCON_PORT`                | `--port`                 |
//! | `AIRCON_DISCOVERY_TIMEOUT_MS`| `--discovery-timeout-ms` |
//! | `AIRCON_REQUEST_TIMEOUT_MS`  | `--request-timeout-ms`   |
//! | `AIRCON_CONFIG`              | `--config`               |
//!
//! Options left unset fall back to the config file, then to built-in
//! defaults.
//!
//! # Picking a unit
//!
//! 1. `--host` and `--mac` address a unit directly.
//! 2. Otherwise `--device` is looked up among the units saved by
//!    `scan --save`; without `--device`, a single saved unit is used.
//! 3. Otherwise a scan runs and `--device` is matched against the units that
//!    answer; without `--device`, exactly one unit must answer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aircon_ctl::application::device_controller::{DeviceController, UdpDeviceLink};
use aircon_ctl::application::device_registry::DeviceRegistry;
use aircon_ctl::infrastructure::network::{DiscoveryConfig, DiscoveryService};
use aircon_ctl::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, AppConfig, DeviceEntry,
};
use aircon_core::{ParameterMap, ParameterName, ParameterValue};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Discover and control LAN air conditioners.
#[derive(Debug, Parser)]
#[command(name = "aircon-ctl", version)]
struct Cli {
    /// Unit to control, by saved or reported name, or by mac.
    #[arg(short, long, env = "AIRCON_DEVICE", global = true)]
    device: Option<String>,

    /// IP address of a unit to address directly (requires --mac).
    #[arg(long, requires = "mac", global = true)]
    host: Option<String>,

    /// Hardware id of the unit given by --host.
    #[arg(long, requires = "host", global = true)]
    mac: Option<String>,

    /// Broadcast address for scans.  Use the subnet broadcast (for example
    /// `192.168.1.255`) when the limited broadcast is filtered.
    #[arg(long, env = "AIRCON_BROADCAST", global = true)]
    broadcast: Option<String>,

    /// UDP port the units listen on.
    #[arg(long, env = "AIRCON_PORT", global = true)]
    port: Option<u16>,

    /// How long a scan listens for replies, in milliseconds.
    #[arg(long, env = "AIRCON_DISCOVERY_TIMEOUT_MS", global = true)]
    discovery_timeout_ms: Option<u64>,

    /// How long each bind, status, or command waits for its reply, in
    /// milliseconds.
    #[arg(long, env = "AIRCON_REQUEST_TIMEOUT_MS", global = true)]
    request_timeout_ms: Option<u64>,

    /// Config file to read and, for `scan --save`, write.
    #[arg(long, env = "AIRCON_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Broadcast a scan and list the units that answer.
    Scan {
        /// Remember the units found in the config file.
        #[arg(long)]
        save: bool,
    },
    /// Print every status column of a unit.
    Status,
    /// Set raw parameters by wire name, e.g. `Pow=1 SetTem=24`.
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(ParameterName, ParameterValue)>,
    },
    /// Switch a unit on or off.
    Power {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Flip an on/off column, e.g. `Lig` or `Quiet`.
    Toggle {
        #[arg(value_parser = parse_parameter_name)]
        name: ParameterName,
    },
    /// Set the target temperature in Celsius.
    Temp {
        #[arg(allow_negative_numbers = true)]
        celsius: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Network settings after CLI flags are layered over the config file.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    discovery: DiscoveryConfig,
    discovery_timeout: Duration,
    request_timeout: Duration,
    device_port: u16,
}

impl Cli {
    /// Merges the CLI flags over `config.network`.
    ///
    /// # Errors
    ///
    /// Returns an error if the broadcast address is not an IP address.
    fn settings(&self, config: &AppConfig) -> anyhow::Result<Settings> {
        let mut network = config.network.clone();
        if let Some(addr) = &self.broadcast {
            network.broadcast_address = addr.clone();
        }
        if let Some(port) = self.port {
            network.device_port = port;
        }
        if let Some(ms) = self.discovery_timeout_ms {
            network.discovery_timeout_ms = ms;
        }
        if let Some(ms) = self.request_timeout_ms {
            network.request_timeout_ms = ms;
        }

        let target = network
            .broadcast_target()
            .context("invalid broadcast address")?;

        Ok(Settings {
            discovery: DiscoveryConfig { target },
            discovery_timeout: network.discovery_timeout(),
            request_timeout: network.request_timeout(),
            device_port: network.device_port,
        })
    }

    /// The `--host`/`--mac` pair as a config entry, if both were given.
    fn direct_entry(&self) -> Option<DeviceEntry> {
        match (&self.host, &self.mac) {
            (Some(host), Some(mac)) => Some(DeviceEntry {
                name: mac.clone(),
                host: host.clone(),
                mac: mac.clone(),
            }),
            _ => None,
        }
    }
}

/// Parses a parameter name: a wire name in any letter case, or any other
/// string passed through verbatim.
fn parse_parameter_name(s: &str) -> Result<ParameterName, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("parameter name is empty".to_string());
    }
    let known = ParameterName::STATUS_COLUMNS
        .iter()
        .find(|n| n.as_wire().eq_ignore_ascii_case(s))
        .cloned();
    Ok(known.unwrap_or_else(|| ParameterName::from_wire(s)))
}

/// Parses `NAME=VALUE`.  Integer values become [`ParameterValue::Int`],
/// anything else [`ParameterValue::Text`].
fn parse_assignment(s: &str) -> Result<(ParameterName, ParameterValue), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let name = parse_parameter_name(name)?;
    let value = value.trim();
    let value = value
        .parse::<i64>()
        .map(ParameterValue::Int)
        .unwrap_or_else(|_| ParameterValue::Text(value.to_string()));
    Ok((name, value))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path().context("could not locate the config file")?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = cli.settings(&config)?;
    debug!(?settings, config = %config_path.display(), "settings resolved");

    match &cli.command {
        Command::Scan { save } => {
            let registry = scan(&settings).await?;
            print_registry(&registry);
            if *save {
                save_devices(&mut config, &registry, &config_path)?;
            }
            Ok(())
        }
        command => {
            let mut controller = resolve_device(&cli, &settings, &config).await?;
            run_device_command(&mut controller, command).await
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn scan(settings: &Settings) -> anyhow::Result<DeviceRegistry> {
    let service = DiscoveryService::new(settings.discovery.clone());
    let mut registry = DeviceRegistry::new();

    service
        .discover(settings.discovery_timeout, |device| {
            info!(address = %device.address, name = %device.announcement.display_name(), "found unit");
            registry.record(device);
        })
        .await
        .context("scan failed")?;

    Ok(registry)
}

fn print_registry(registry: &DeviceRegistry) {
    if registry.is_empty() {
        println!("no units answered");
        return;
    }
    for device in registry.list() {
        let ann = &device.announcement;
        let lock = if ann.is_locked() { "  [locked]" } else { "" };
        println!(
            "{:<20} {:<14} {:<21} {}{lock}",
            ann.display_name(),
            device.address.mac,
            device.address.addr,
            ann.firmware_version,
        );
    }
}

fn save_devices(
    config: &mut AppConfig,
    registry: &DeviceRegistry,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let mut added = 0;
    for entry in registry.to_entries() {
        if config.upsert_device(entry) {
            added += 1;
        }
    }
    save_config_to(config, path)
        .with_context(|| format!("failed to save config to {}", path.display()))?;
    println!(
        "saved {} unit(s) ({added} new) to {}",
        registry.len(),
        path.display()
    );
    Ok(())
}

/// Picks the unit a device command applies to.
async fn resolve_device(
    cli: &Cli,
    settings: &Settings,
    config: &AppConfig,
) -> anyhow::Result<DeviceController> {
    let link = Arc::new(UdpDeviceLink::new(settings.request_timeout));

    let saved = match cli.direct_entry() {
        Some(entry) => Some(entry),
        None => match cli.device.as_deref() {
            Some(selector) => config.find_device(selector).cloned(),
            None if config.devices.len() == 1 => config.devices.first().cloned(),
            None => None,
        },
    };

    if let Some(entry) = saved {
        let address = entry
            .address(settings.device_port)
            .with_context(|| format!("bad address for {}", entry.name))?;
        debug!(%address, "using saved unit");
        return Ok(DeviceController::new(entry.name, address, link));
    }

    let registry = scan(settings).await?;
    let device = match cli.device.as_deref() {
        Some(selector) => registry
            .find(selector)
            .with_context(|| format!("no unit named {selector:?} answered the scan"))?,
        None => match registry.list().as_slice() {
            [only] => *only,
            [] => bail!("no units answered the scan"),
            many => bail!(
                "{} units answered; pick one with --device: {}",
                many.len(),
                many.iter()
                    .map(|d| d.announcement.display_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    };

    Ok(DeviceController::new(
        device.announcement.display_name(),
        device.address.clone(),
        link,
    ))
}

async fn run_device_command(controller: &mut DeviceController, command: &Command) -> anyhow::Result<()> {
    let device = controller.name().to_string();
    match command {
        Command::Scan { .. } => bail!("scan does not act on a single unit"),
        Command::Status => {
            let status = controller
                .status()
                .await
                .with_context(|| format!("status of {device} failed"))?;
            for (name, value) in status.iter() {
                println!("{name:<12} {value}");
            }
        }
        Command::Set { assignments } => {
            let params: ParameterMap = assignments.iter().cloned().collect();
            let applied = controller
                .set_values(&params)
                .await
                .with_context(|| format!("set on {device} failed"))?;
            println!("{device}: {applied}");
        }
        Command::Power { state } => {
            let on = *state == Switch::On;
            controller
                .set_power(on)
                .await
                .with_context(|| format!("power on {device} failed"))?;
            println!("{device}: power {}", if on { "on" } else { "off" });
        }
        Command::Toggle { name } => {
            let on = controller
                .toggle(name.clone())
                .await
                .with_context(|| format!("toggle {name} on {device} failed"))?;
            println!("{device}: {name} {}", if on { "on" } else { "off" });
        }
        Command::Temp { celsius } => {
            controller
                .set_temperature(*celsius)
                .await
                .with_context(|| format!("temperature on {device} failed"))?;
            println!("{device}: target {celsius} °C");
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_scan_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["aircon-ctl", "scan"]);

        // Assert
        assert!(matches!(cli.command, Command::Scan { save: false }));
        assert!(cli.device.is_none());
    }

    #[test]
    fn test_cli_scan_save_flag() {
        let cli = Cli::parse_from(["aircon-ctl", "scan", "--save"]);
        assert!(matches!(cli.command, Command::Scan { save: true }));
    }

    #[test]
    fn test_cli_device_flag_after_subcommand() {
        let cli = Cli::parse_from(["aircon-ctl", "status", "--device", "Bedroom"]);
        assert_eq!(cli.device.as_deref(), Some("Bedroom"));
    }

    #[test]
    fn test_cli_power_parses_state() {
        let cli = Cli::parse_from(["aircon-ctl", "power", "off"]);
        assert!(matches!(cli.command, Command::Power { state: Switch::Off }));
    }

    #[test]
    fn test_cli_power_rejects_unknown_state() {
        let result = Cli::try_parse_from(["aircon-ctl", "power", "maybe"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_set_requires_assignment() {
        let result = Cli::try_parse_from(["aircon-ctl", "set"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_set_collects_assignments_in_order() {
        // Arrange / Act
        let cli = Cli::parse_from(["aircon-ctl", "set", "Pow=1", "settem=24"]);

        // Assert
        let Command::Set { assignments } = cli.command else {
            panic!("expected set");
        };
        assert_eq!(
            assignments,
            vec![
                (ParameterName::Power, ParameterValue::Int(1)),
                (ParameterName::SetTemperature, ParameterValue::Int(24)),
            ]
        );
    }

    #[test]
    fn test_cli_toggle_accepts_wire_name_in_any_case() {
        let cli = Cli::parse_from(["aircon-ctl", "toggle", "lig"]);
        assert!(matches!(cli.command, Command::Toggle { name: ParameterName::Light }));
    }

    #[test]
    fn test_cli_host_requires_mac() {
        let result = Cli::try_parse_from(["aircon-ctl", "status", "--host", "192.168.1.40"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_direct_entry_from_host_and_mac() {
        let cli = Cli::parse_from([
            "aircon-ctl",
            "status",
            "--host",
            "192.168.1.40",
            "--mac",
            "f4911e7aca59",
        ]);

        let entry = cli.direct_entry().expect("entry");

        assert_eq!(entry.host, "192.168.1.40");
        assert_eq!(entry.address(7000).unwrap().addr.to_string(), "192.168.1.40:7000");
    }

    #[test]
    fn test_parse_assignment_keeps_text_values() {
        assert_eq!(
            parse_assignment("host=grih.gree.com"),
            Ok((
                ParameterName::Unknown("host".to_string()),
                ParameterValue::Text("grih.gree.com".to_string())
            ))
        );
    }

    #[test]
    fn test_parse_assignment_rejects_missing_equals() {
        assert!(parse_assignment("Pow").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn test_settings_default_from_config() {
        // Arrange
        let cli = Cli::parse_from(["aircon-ctl", "status"]);

        // Act
        let settings = cli.settings(&AppConfig::default()).unwrap();

        // Assert
        assert_eq!(settings.discovery.target.to_string(), "255.255.255.255:7000");
        assert_eq!(settings.discovery_timeout, Duration::from_secs(15));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_settings_flags_override_config() {
        let cli = Cli::parse_from([
            "aircon-ctl",
            "scan",
            "--broadcast",
            "192.168.1.255",
            "--port",
            "7001",
            "--discovery-timeout-ms",
            "500",
        ]);

        let settings = cli.settings(&AppConfig::default()).unwrap();

        assert_eq!(settings.discovery.target.to_string(), "192.168.1.255:7001");
        assert_eq!(settings.discovery_timeout, Duration::from_millis(500));
        assert_eq!(settings.device_port, 7001);
    }

    #[test]
    fn test_settings_invalid_broadcast_is_error() {
        let cli = Cli::parse_from(["aircon-ctl", "scan", "--broadcast", "not.an.ip"]);
        assert!(cli.settings(&AppConfig::default()).is_err());
    }
}
