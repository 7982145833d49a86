//! In-process transport holding a fixed set of fake lights.
//!
//! Commands are acknowledged immediately but only show up in fetched
//! rosters after a configurable number of polls, the way real bulbs report
//! their new state some time after accepting a change.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::watch;
use tracing::debug;

use crate::model::{DeviceSnapshot, Hsbk, Roster, Serial};
use crate::transport::{
    ColorEdit, CommandError, DeviceCommand, DeviceTransport, DiscoveryStatus, TransportError,
};

const DEMO_LABELS: &[&str] = &[
    "Desk", "Ceiling", "Porch", "Strip", "Lamp", "Bedside", "Hallway", "Spot",
];
const DEMO_GROUPS: &[&str] = &["Kitchen", "Living Room", "Office", ""];
/// Product id of a colour bulb, used for every simulated device.
const DEMO_PRODUCT: u32 = 91;

#[derive(Debug)]
struct PendingChange {
    command: DeviceCommand,
    /// Polls left before the change is visible.
    remaining: u32,
}

#[derive(Debug)]
struct SimDevice {
    snapshot: DeviceSnapshot,
    pending: Vec<PendingChange>,
}

impl SimDevice {
    fn confirm(&mut self, command: &DeviceCommand) {
        match command {
            DeviceCommand::SetPower { on } => self.snapshot.powered_on = *on,
            DeviceCommand::SetColor { edit, .. } => edit.apply_to(&mut self.snapshot.color),
        }
        self.touch();
    }

    fn touch(&mut self) {
        let next = self.snapshot.last_seen_at + Duration::from_millis(1);
        self.snapshot.last_seen_at = next.max(Instant::now());
    }
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    reachable: bool,
    confirmation_lag: u32,
    sent: Vec<(Serial, DeviceCommand)>,
}

#[derive(Debug)]
pub struct SimulatedTransport {
    state: Mutex<SimState>,
    discovery: Option<watch::Sender<DiscoveryStatus>>,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                reachable: true,
                ..Default::default()
            }),
            discovery: None,
        }
    }

    /// Transport that reports discovery progress until [`settle_discovery`]
    /// is called.
    ///
    /// [`settle_discovery`]: SimulatedTransport::settle_discovery
    pub fn with_discovery_signal() -> Self {
        let (tx, _) = watch::channel(DiscoveryStatus::Discovering);
        Self {
            discovery: Some(tx),
            ..Self::new()
        }
    }

    /// Transport populated with `count` randomly coloured lights.
    pub fn demo(count: usize) -> Self {
        let transport = Self::new();
        let mut rng = rand::rng();
        for i in 0..count {
            transport.add_device(demo_device(&mut rng, i));
        }
        transport
    }

    /// Adds one randomly coloured light, as if it had just been discovered.
    pub fn add_random_device(&self) -> Serial {
        let index = self.state.lock().devices.len();
        let device = demo_device(&mut rand::rng(), index);
        let serial = device.serial;
        self.add_device(device);
        serial
    }

    pub fn add_device(&self, snapshot: DeviceSnapshot) {
        let mut state = self.state.lock();
        state.devices.retain(|d| d.snapshot.serial != snapshot.serial);
        state.devices.push(SimDevice {
            snapshot,
            pending: Vec::new(),
        });
    }

    pub fn remove_device(&self, serial: &Serial) -> Option<DeviceSnapshot> {
        let mut state = self.state.lock();
        let index = state
            .devices
            .iter()
            .position(|d| d.snapshot.serial == *serial)?;
        Some(state.devices.remove(index).snapshot)
    }

    /// Changes a device as if it had been driven by another controller.
    pub fn update_device(&self, serial: &Serial, change: impl FnOnce(&mut DeviceSnapshot)) -> bool {
        let mut state = self.state.lock();
        match state
            .devices
            .iter_mut()
            .find(|d| d.snapshot.serial == *serial)
        {
            Some(device) => {
                change(&mut device.snapshot);
                device.touch();
                true
            }
            None => false,
        }
    }

    pub fn serials(&self) -> Vec<Serial> {
        self.state
            .lock()
            .devices
            .iter()
            .map(|d| d.snapshot.serial)
            .collect()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn set_confirmation_lag(&self, polls: u32) {
        self.state.lock().confirmation_lag = polls;
    }

    pub fn settle_discovery(&self) {
        if let Some(tx) = &self.discovery {
            tx.send_replace(DiscoveryStatus::Settled);
        }
    }

    /// Commands accepted so far, oldest first.
    pub fn sent(&self) -> Vec<(Serial, DeviceCommand)> {
        self.state.lock().sent.clone()
    }
}

#[async_trait]
impl DeviceTransport for SimulatedTransport {
    async fn fetch_roster(&self) -> Result<Roster, TransportError> {
        let mut state = self.state.lock();
        if !state.reachable {
            return Err(TransportError::Unreachable("simulated network down".into()));
        }
        for device in state.devices.iter_mut() {
            let pending = std::mem::take(&mut device.pending);
            for mut change in pending {
                if change.remaining == 0 {
                    device.confirm(&change.command);
                } else {
                    change.remaining -= 1;
                    device.pending.push(change);
                }
            }
        }
        Ok(Roster::new(
            state.devices.iter().map(|d| d.snapshot.clone()).collect(),
        ))
    }

    async fn send_command(
        &self,
        serial: Serial,
        command: DeviceCommand,
    ) -> Result<(), CommandError> {
        let mut state = self.state.lock();
        if !state.reachable {
            return Err(TransportError::Unreachable(format!("device {serial}")).into());
        }
        let lag = state.confirmation_lag;
        let device = state
            .devices
            .iter_mut()
            .find(|d| d.snapshot.serial == serial)
            .ok_or(CommandError::UnknownDevice(serial))?;
        if lag == 0 {
            device.confirm(&command);
        } else {
            device.pending.push(PendingChange {
                command,
                remaining: lag,
            });
        }
        debug!(%serial, ?command, lag, "Simulated device accepted command");
        state.sent.push((serial, command));
        Ok(())
    }

    fn discovery_status(&self) -> Option<watch::Receiver<DiscoveryStatus>> {
        self.discovery.as_ref().map(|tx| tx.subscribe())
    }
}

fn demo_device(rng: &mut impl Rng, index: usize) -> DeviceSnapshot {
    let mut serial = [0xd0, 0x73, 0xd5, 0, 0, 0];
    rng.fill(&mut serial[3..]);
    let label = DEMO_LABELS
        .choose(rng)
        .copied()
        .unwrap_or("Light")
        .to_string();
    let mut device = DeviceSnapshot::new(
        Serial::new(serial),
        format!("{label} {}", index + 1),
        Instant::now(),
    );
    device.group = DEMO_GROUPS.choose(rng).copied().unwrap_or_default().to_string();
    device.location = "Home".to_string();
    device.product_id = DEMO_PRODUCT;
    device.address = Some(([192, 168, 1, 100 + (index % 100) as u8], 56700).into());
    device.powered_on = rng.random_bool(0.7);
    device.color = if rng.random_bool(0.5) {
        Hsbk {
            hue: f64::from(rng.random_range(0..360u16)),
            saturation: f64::from(rng.random_range(30..=100u8)),
            brightness: f64::from(rng.random_range(20..=100u8)),
            kelvin: 3500,
        }
    } else {
        let (lo, hi) = ColorEdit::KELVIN_RANGE;
        Hsbk {
            saturation: 0.0,
            brightness: f64::from(rng.random_range(20..=100u8)),
            kelvin: rng.random_range(lo / 100..=hi / 100) * 100,
            ..Hsbk::default()
        }
    };
    device
}
