use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{Roster, Serial};
use crate::view::{DeviceGroup, ViewStore};

/// How two consecutive rosters are compared to detect a membership change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralCheck {
    /// Serials compared index by index: a reordered roster counts as changed.
    #[default]
    Positional,
    /// Serials compared as sets.
    Membership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    Structural,
    Incremental,
}

/// What a reconciliation changed, in a form a UI thread can consume.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSet {
    /// Every view was replaced; the renderer should rebuild from these groups.
    Rebuilt(Vec<DeviceGroup>),
    /// Only these serials have new views.
    Updated(Vec<Serial>),
}

impl ChangeSet {
    pub fn mode(&self) -> ReconcileMode {
        match self {
            ChangeSet::Rebuilt(_) => ReconcileMode::Structural,
            ChangeSet::Updated(_) => ReconcileMode::Incremental,
        }
    }

    /// True for an incremental pass that touched nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, ChangeSet::Updated(changed) if changed.is_empty())
    }
}

pub fn is_structural_change(prev: &Roster, next: &Roster, check: StructuralCheck) -> bool {
    if next.is_empty() || prev.len() != next.len() {
        return true;
    }
    match check {
        StructuralCheck::Positional => prev.serials().zip(next.serials()).any(|(a, b)| a != b),
        StructuralCheck::Membership => {
            let known: HashSet<Serial> = prev.serials().collect();
            next.serials().any(|s| !known.contains(&s))
        }
    }
}

/// Decides each cycle between a full rebuild and in-place updates, and
/// applies the result to the view store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: ViewStore,
    check: StructuralCheck,
}

impl Reconciler {
    pub fn new(store: ViewStore, check: StructuralCheck) -> Self {
        Self { store, check }
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn reconcile(&self, next: Roster) -> ChangeSet {
        let mut inner = self.store.lock();

        if is_structural_change(&inner.roster, &next, self.check) {
            info!(
                previous = inner.roster.len(),
                devices = next.len(),
                "Device roster changed, rebuilding views"
            );
            return ChangeSet::Rebuilt(inner.rebuild(next));
        }

        let mut changed = Vec::new();
        for device in next.devices() {
            let Some(view) = inner.views.get_mut(&device.serial) else {
                continue;
            };
            if device.last_seen_at > view.last_applied {
                if view.pending_optimistic {
                    debug!(serial = %device.serial, "Confirmed state replaces optimistic view");
                }
                view.apply_snapshot(device);
                changed.push(device.serial);
            }
        }
        inner.roster = next;

        if !changed.is_empty() {
            debug!(updated = changed.len(), "Applied fresh device state");
        }
        ChangeSet::Updated(changed)
    }
}
