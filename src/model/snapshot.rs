use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::Serial;

/// Color as the light reports it: hue in degrees, saturation and brightness
/// in percent, white point in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsbk {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
    pub kelvin: u32,
}

impl Default for Hsbk {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 0.0,
            brightness: 100.0,
            kelvin: 3500,
        }
    }
}

/// One device as seen by a single poll.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub serial: Serial,
    pub label: String,
    pub powered_on: bool,
    pub color: Hsbk,
    /// Empty when the device does not belong to a group.
    pub group: String,
    pub location: String,
    pub product_id: u32,
    pub address: Option<SocketAddr>,
    /// Advanced by the transport only when it has confirmed device state.
    pub last_seen_at: Instant,
}

impl DeviceSnapshot {
    pub fn new(serial: Serial, label: impl Into<String>, last_seen_at: Instant) -> Self {
        Self {
            serial,
            label: label.into(),
            powered_on: false,
            color: Hsbk::default(),
            group: String::new(),
            location: String::new(),
            product_id: 0,
            address: None,
            last_seen_at,
        }
    }

    pub fn info(&self) -> String {
        let ip = self
            .address
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Serial: {}\nIP: {}\nProductID: {}\nGroup: {}\nLocation: {}",
            self.serial, ip, self.product_id, self.group, self.location
        )
    }
}

/// Ordered result of one poll. Serials are unique within a roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    devices: Vec<DeviceSnapshot>,
}

impl Roster {
    pub fn new(devices: Vec<DeviceSnapshot>) -> Self {
        let mut seen = HashSet::with_capacity(devices.len());
        let mut unique = Vec::with_capacity(devices.len());
        for device in devices {
            if seen.insert(device.serial) {
                unique.push(device);
            } else {
                warn!(serial = %device.serial, "Dropping duplicate device from roster");
            }
        }
        Self { devices: unique }
    }

    pub fn devices(&self) -> &[DeviceSnapshot] {
        &self.devices
    }

    pub fn serials(&self) -> impl Iterator<Item = Serial> + '_ {
        self.devices.iter().map(|d| d.serial)
    }

    pub fn get(&self, serial: &Serial) -> Option<&DeviceSnapshot> {
        self.devices.iter().find(|d| d.serial == *serial)
    }

    pub fn contains(&self, serial: &Serial) -> bool {
        self.get(serial).is_some()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl From<Vec<DeviceSnapshot>> for Roster {
    fn from(devices: Vec<DeviceSnapshot>) -> Self {
        Self::new(devices)
    }
}

impl IntoIterator for Roster {
    type Item = DeviceSnapshot;
    type IntoIter = std::vec::IntoIter<DeviceSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{device, serial};

    #[test]
    fn test_roster_drops_duplicate_serials() {
        let now = Instant::now();
        let mut dup = device(1, "Lamp copy", now);
        dup.group = "Kitchen".to_string();
        let roster = Roster::new(vec![device(1, "Lamp", now), device(2, "Strip", now), dup]);

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(&serial(1)).unwrap().label, "Lamp");
        assert_eq!(
            roster.serials().collect::<Vec<_>>(),
            vec![serial(1), serial(2)]
        );
    }

    #[test]
    fn test_info_lists_device_details() {
        let mut d = device(3, "Desk", Instant::now());
        d.group = "Office".to_string();
        d.location = "Home".to_string();
        d.product_id = 91;
        d.address = Some("192.168.1.40:56700".parse().unwrap());

        assert_eq!(
            d.info(),
            "Serial: d073d5000003\nIP: 192.168.1.40\nProductID: 91\nGroup: Office\nLocation: Home"
        );
    }

    #[test]
    fn test_info_without_address() {
        let d = device(4, "Porch", Instant::now());
        assert!(d.info().contains("IP: unknown"));
    }
}
