//! Application layer: use cases for controlling units.
//!
//! - **`device_controller`** – per-unit handle that binds lazily, reuses the
//!   session, and exposes power, temperature, switch, and raw parameter
//!   operations.
//! - **`device_registry`** – mac-keyed registry of units found by discovery.

pub mod device_controller;
pub mod device_registry;
