//! In-memory registry of units found by discovery.
//!
//! Keyed by mac.  A unit that answers again from a new address replaces its
//! old entry, so the registry always holds the latest address per unit.

use std::collections::HashMap;

use crate::infrastructure::network::DiscoveredDevice;
use crate::infrastructure::storage::config::DeviceEntry;

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DiscoveredDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a discovered unit.  Returns `true` if its mac was not known.
    pub fn record(&mut self, device: DiscoveredDevice) -> bool {
        self.devices
            .insert(device.address.mac.clone(), device)
            .is_none()
    }

    pub fn get(&self, mac: &str) -> Option<&DiscoveredDevice> {
        self.devices.get(mac)
    }

    /// Finds a unit by display name (case-insensitive) or mac.
    pub fn find(&self, selector: &str) -> Option<&DiscoveredDevice> {
        self.devices.values().find(|d| {
            d.announcement.display_name().eq_ignore_ascii_case(selector)
                || d.address.mac.eq_ignore_ascii_case(selector)
        })
    }

    /// All units sorted by display name, then mac.
    pub fn list(&self) -> Vec<&DiscoveredDevice> {
        let mut devices: Vec<_> = self.devices.values().collect();
        devices.sort_by(|a, b| {
            a.announcement
                .display_name()
                .cmp(b.announcement.display_name())
                .then_with(|| a.address.mac.cmp(&b.address.mac))
        });
        devices
    }

    /// Config entries for every unit, in [`list`](Self::list) order.
    pub fn to_entries(&self) -> Vec<DeviceEntry> {
        self.list()
            .into_iter()
            .map(|d| DeviceEntry::new(d.announcement.display_name(), &d.address))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Extend<DiscoveredDevice> for DeviceRegistry {
    fn extend<I: IntoIterator<Item = DiscoveredDevice>>(&mut self, iter: I) {
        for device in iter {
            self.record(device);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
