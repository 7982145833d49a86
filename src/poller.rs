use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::observer::{ViewObserver, notify};
use crate::reconciler::{ChangeSet, Reconciler};
use crate::transport::{DeviceTransport, DiscoveryStatus, TransportError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MIN_DEVICES: usize = 1;
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(10);

/// When initial discovery counts as done.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ReadinessOptions {
    /// Fewest devices a probe must see before the roster can be stable.
    #[builder(default = "DEFAULT_MIN_DEVICES")]
    pub min_devices: usize,
    /// How long the device count must stay unchanged.
    #[builder(default = "DEFAULT_QUIESCENCE")]
    pub quiescence: Duration,
    #[builder(default = "DEFAULT_PROBE_INTERVAL")]
    pub probe_interval: Duration,
    /// Upper bound on the whole warm-up; polling starts regardless after it.
    #[builder(default = "DEFAULT_MAX_WAIT")]
    pub max_wait: Duration,
}

impl ReadinessOptions {
    pub fn builder() -> ReadinessOptionsBuilder {
        ReadinessOptionsBuilder::default()
    }
}

impl ReadinessOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.probe_interval.is_some_and(|d| d.is_zero()) {
            return Err("probe interval must be greater than zero".into());
        }
        Ok(())
    }
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            min_devices: DEFAULT_MIN_DEVICES,
            quiescence: DEFAULT_QUIESCENCE,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Polling cadence. The interval should exceed the time devices take to
/// report a change, or optimistic edits get overwritten by stale reads.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct PollerOptions {
    #[builder(default = "DEFAULT_POLL_INTERVAL")]
    pub interval: Duration,
    #[builder(default)]
    pub readiness: ReadinessOptions,
}

impl PollerOptions {
    pub fn builder() -> PollerOptionsBuilder {
        PollerOptionsBuilder::default()
    }
}

impl PollerOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.interval.is_some_and(|d| d.is_zero()) {
            return Err("poll interval must be greater than zero".into());
        }
        Ok(())
    }
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            readiness: ReadinessOptions::default(),
        }
    }
}

/// How the warm-up ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The transport said discovery has settled.
    Signalled,
    /// The roster stopped changing.
    Quiescent { devices: usize },
    TimedOut,
}

pub struct Poller<T: DeviceTransport + ?Sized> {
    transport: Arc<T>,
    reconciler: Reconciler,
    observer: Arc<dyn ViewObserver>,
    options: PollerOptions,
}

impl<T: DeviceTransport + ?Sized + 'static> Poller<T> {
    pub fn new(
        transport: Arc<T>,
        reconciler: Reconciler,
        observer: Arc<dyn ViewObserver>,
        options: PollerOptions,
    ) -> Self {
        Self {
            transport,
            reconciler,
            observer,
            options,
        }
    }

    /// Fetches one roster, reconciles it and tells the observer what changed.
    /// On failure nothing is touched.
    pub async fn poll_once(&self) -> Result<ChangeSet, TransportError> {
        let roster = self.transport.fetch_roster().await?;
        let change = self.reconciler.reconcile(roster);
        notify(self.observer.as_ref(), &change).await;
        Ok(change)
    }

    pub async fn wait_until_ready(&self) -> Readiness {
        let max_wait = self.options.readiness.max_wait;
        let wait = async {
            match self.transport.discovery_status() {
                Some(rx) => self.wait_for_signal(rx).await,
                None => self.wait_for_quiescence().await,
            }
        };
        match tokio::time::timeout(max_wait, wait).await {
            Ok(readiness) => {
                info!(?readiness, "Device discovery ready");
                readiness
            }
            Err(_) => {
                warn!(?max_wait, "Device discovery did not settle, polling anyway");
                Readiness::TimedOut
            }
        }
    }

    async fn wait_for_signal(&self, mut rx: watch::Receiver<DiscoveryStatus>) -> Readiness {
        if rx
            .wait_for(|status| *status == DiscoveryStatus::Settled)
            .await
            .is_ok()
        {
            return Readiness::Signalled;
        }
        debug!("Discovery signal closed, falling back to roster probing");
        self.wait_for_quiescence().await
    }

    async fn wait_for_quiescence(&self) -> Readiness {
        let ReadinessOptions {
            min_devices,
            quiescence,
            probe_interval,
            ..
        } = self.options.readiness;
        let mut last_count = None;
        let mut stable_since = Instant::now();
        loop {
            match self.transport.fetch_roster().await {
                Ok(roster) => {
                    let devices = roster.len();
                    if last_count != Some(devices) {
                        debug!(devices, "Discovered devices changed");
                        last_count = Some(devices);
                        stable_since = Instant::now();
                    }
                    if devices >= min_devices && stable_since.elapsed() >= quiescence {
                        return Readiness::Quiescent { devices };
                    }
                }
                Err(e) => debug!("Discovery probe failed: {e}"),
            }
            tokio::time::sleep(probe_interval).await;
        }
    }

    /// Runs warm-up and then the poll loop on a background task.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        PollerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => return,
            _ = self.wait_until_ready() => {}
        }

        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;
        info!(interval = ?self.options.interval, "Starting device poll loop");

        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            // an in-flight fetch is dropped on shutdown
            let result = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                result = self.poll_once() => result,
            };
            match result {
                Ok(change) => {
                    if failures > 0 {
                        info!(failures, "Device roster fetch recovered");
                        failures = 0;
                    }
                    debug!(mode = ?change.mode(), "Poll cycle complete");
                }
                Err(e) => {
                    failures += 1;
                    warn!(failures, "Failed to fetch device roster, keeping last state: {e}");
                }
            }
        }
        info!("Device poll loop stopped");
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // a dropped sender also means stop
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Dropping the handle also stops the loop.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stops future ticks and waits for the loop to exit.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.task.await {
            warn!("Poll loop ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
