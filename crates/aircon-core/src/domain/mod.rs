//! Domain types shared by discovery, binding, and control.
//!
//! # Sub-modules
//!
//! - **`device`** – Who a unit is and where it lives: [`device::DeviceAddress`],
//!   [`device::DiscoveryAnnouncement`], and the per-device
//!   [`device::SessionKey`].
//!
//! - **`parameters`** – The typed, order-preserving [`parameters::ParameterMap`]
//!   that replaces free-form string/object maps on the control path.

pub mod device;
pub mod parameters;
