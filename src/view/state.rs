use std::collections::BTreeMap;
use std::time::Instant;

use crate::color::{Rgba, color_for};
use crate::model::{DeviceSnapshot, Hsbk, Serial};
use crate::transport::DeviceCommand;

/// Bucket name for devices that report no group.
pub const UNGROUPED: &str = "Ungrouped";

/// What the renderer shows for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub serial: Serial,
    pub display_label: String,
    pub display_color: Rgba,
    /// Freshness of the snapshot currently reflected, never moved by local edits.
    pub last_applied: Instant,
    /// Set by a local command, cleared once a newer snapshot is applied.
    pub pending_optimistic: bool,
    pub powered_on: bool,
    pub color: Hsbk,
    pub group: String,
}

impl From<&DeviceSnapshot> for ViewState {
    fn from(device: &DeviceSnapshot) -> Self {
        Self {
            serial: device.serial,
            display_label: device.label.clone(),
            display_color: color_for(device.powered_on, &device.color),
            last_applied: device.last_seen_at,
            pending_optimistic: false,
            powered_on: device.powered_on,
            color: device.color,
            group: device.group.clone(),
        }
    }
}

impl ViewState {
    pub(crate) fn apply_snapshot(&mut self, device: &DeviceSnapshot) {
        *self = Self::from(device);
    }

    pub(crate) fn apply_command(&mut self, command: &DeviceCommand) {
        match command {
            DeviceCommand::SetPower { on } => self.powered_on = *on,
            DeviceCommand::SetColor { edit, .. } => edit.apply_to(&mut self.color),
        }
        self.display_color = color_for(self.powered_on, &self.color);
        self.pending_optimistic = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub name: String,
    pub views: Vec<ViewState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GroupLayout {
    pub(crate) name: String,
    pub(crate) members: Vec<Serial>,
}

pub(crate) fn group_name(group: &str) -> &str {
    if group.is_empty() { UNGROUPED } else { group }
}

/// Buckets devices by group, buckets sorted by name, members in roster order.
pub(crate) fn group_devices(devices: &[DeviceSnapshot]) -> Vec<GroupLayout> {
    let mut groups: BTreeMap<&str, Vec<Serial>> = BTreeMap::new();
    for device in devices {
        groups
            .entry(group_name(&device.group))
            .or_default()
            .push(device.serial);
    }
    groups
        .into_iter()
        .map(|(name, members)| GroupLayout {
            name: name.to_string(),
            members,
        })
        .collect()
}
