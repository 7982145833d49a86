//! Per-device view cache shared between the poll loop and command dispatch.
//!
//! Every access goes through one store-wide lock. The lock only prevents data
//! races; which write wins is decided by the reconciler's freshness check.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::model::{DeviceSnapshot, Roster, Serial};
use crate::transport::DeviceCommand;
use crate::view::state::{DeviceGroup, GroupLayout, ViewState, group_devices};

#[derive(Debug, Default)]
pub(crate) struct ViewStoreInner {
    /// Last roster handed to the reconciler.
    pub(crate) roster: Roster,
    pub(crate) views: HashMap<Serial, ViewState>,
    pub(crate) layout: Vec<GroupLayout>,
}

impl ViewStoreInner {
    /// Drops every cached view and rebuilds from `roster`.
    pub(crate) fn rebuild(&mut self, roster: Roster) -> Vec<DeviceGroup> {
        self.views = roster
            .devices()
            .iter()
            .map(|d| (d.serial, ViewState::from(d)))
            .collect();
        self.layout = group_devices(roster.devices());
        self.roster = roster;
        self.grouped()
    }

    pub(crate) fn grouped(&self) -> Vec<DeviceGroup> {
        self.layout
            .iter()
            .map(|group| DeviceGroup {
                name: group.name.clone(),
                views: group
                    .members
                    .iter()
                    .filter_map(|serial| self.views.get(serial).cloned())
                    .collect(),
            })
            .collect()
    }
}

/// Cheap to clone; clones share the same cache.
#[derive(Debug, Clone, Default)]
pub struct ViewStore {
    inner: Arc<Mutex<ViewStoreInner>>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, serial: &Serial) -> Option<ViewState> {
        self.inner.lock().views.get(serial).cloned()
    }

    /// Views for `serials`, skipping any that are no longer known.
    pub fn views(&self, serials: &[Serial]) -> Vec<ViewState> {
        let inner = self.inner.lock();
        serials
            .iter()
            .filter_map(|s| inner.views.get(s).cloned())
            .collect()
    }

    pub fn grouped(&self) -> Vec<DeviceGroup> {
        self.inner.lock().grouped()
    }

    pub fn contains(&self, serial: &Serial) -> bool {
        self.inner.lock().views.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().views.is_empty()
    }

    /// Device as last reported by the transport, ignoring local edits.
    pub fn snapshot(&self, serial: &Serial) -> Option<DeviceSnapshot> {
        self.inner.lock().roster.get(serial).cloned()
    }

    /// Serials of the last reconciled roster, in roster order.
    pub fn serials(&self) -> Vec<Serial> {
        self.inner.lock().roster.serials().collect()
    }

    /// Applies a command that the transport accepted ahead of confirmation.
    /// Returns the updated view, or `None` if the device has gone away.
    pub(crate) fn apply_optimistic(
        &self,
        serial: &Serial,
        command: &DeviceCommand,
    ) -> Option<ViewState> {
        let mut inner = self.inner.lock();
        let view = inner.views.get_mut(serial)?;
        view.apply_command(command);
        Some(view.clone())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ViewStoreInner> {
        self.inner.lock()
    }
}
