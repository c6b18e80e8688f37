//! aircon-ctl library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Layers
//!
//! - **`infrastructure::network`** – UDP transport and the three protocol
//!   services: discovery, binding, and control.  Each call owns its socket
//!   and returns a typed `Result`.
//! - **`infrastructure::storage`** – TOML configuration and the list of known
//!   devices.
//! - **`application`** – Per-device controller that caches the session key,
//!   plus an in-memory registry of discovered units.

/// Application layer: device use cases.
pub mod application;

/// Infrastructure layer: network services and config storage.
pub mod infrastructure;
