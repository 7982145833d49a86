use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::{DeviceSnapshot, Serial};
use crate::observer::ViewObserver;
use crate::reconciler::ChangeSet;
use crate::view::DeviceGroup;

pub fn serial(n: u8) -> Serial {
    Serial::new([0xd0, 0x73, 0xd5, 0x00, 0x00, n])
}

/// A powered-on, ungrouped white light.
pub fn device(n: u8, label: &str, last_seen_at: Instant) -> DeviceSnapshot {
    let mut device = DeviceSnapshot::new(serial(n), label, last_seen_at);
    device.powered_on = true;
    device
}

pub fn grouped(mut device: DeviceSnapshot, group: &str) -> DeviceSnapshot {
    device.group = group.to_string();
    device
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ChangeSet>>,
}

impl RecordingObserver {
    pub fn rebuilds(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ChangeSet::Rebuilt(_)))
            .count()
    }

    pub fn updates(&self) -> Vec<Vec<Serial>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChangeSet::Updated(changed) => Some(changed.clone()),
                ChangeSet::Rebuilt(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ViewObserver for RecordingObserver {
    async fn roster_rebuilt(&self, groups: &[DeviceGroup]) {
        self.events.lock().push(ChangeSet::Rebuilt(groups.to_vec()));
    }

    async fn view_states_updated(&self, changed: &[Serial]) {
        self.events.lock().push(ChangeSet::Updated(changed.to_vec()));
    }
}
