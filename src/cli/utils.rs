use std::sync::Arc;

use anyhow::Context;
use lifx_dash::{
    ChangeSet, ChannelObserver, CommandDispatcher, DeviceGroup, Poller, Reconciler,
    Serial, Settings, SimulatedTransport, ViewObserver, ViewState, ViewStore,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::Params;

/// Simulated lights wired to a poller, ready to spawn.
pub struct Dashboard {
    pub transport: Arc<SimulatedTransport>,
    pub store: ViewStore,
    pub dispatcher: CommandDispatcher<SimulatedTransport>,
    pub poller: Poller<SimulatedTransport>,
    pub changes: UnboundedReceiver<ChangeSet>,
}

pub fn create_dashboard(params: &Params, settings: &Settings) -> anyhow::Result<Dashboard> {
    let options = settings.poller_options().context("Invalid settings")?;

    let transport = Arc::new(SimulatedTransport::demo(params.devices));
    // simulated bulbs confirm a command one poll after accepting it
    transport.set_confirmation_lag(1);

    let store = ViewStore::new();
    let reconciler = Reconciler::new(store.clone(), settings.structural_check);
    let (observer, changes) = ChannelObserver::new();
    let observer: Arc<dyn ViewObserver> = Arc::new(observer);
    let dispatcher =
        CommandDispatcher::new(transport.clone(), store.clone(), Some(observer.clone()));
    let poller = Poller::new(transport.clone(), reconciler, observer, options);

    Ok(Dashboard {
        transport,
        store,
        dispatcher,
        poller,
        changes,
    })
}

/// Light addressed by a one-shot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Position in display order, counting from 1.
    Index(usize),
    Serial(Serial),
}

impl Target {
    pub fn from_args(index: Option<usize>, serial: Option<Serial>) -> anyhow::Result<Self> {
        match (index, serial) {
            (Some(index), None) => Ok(Target::Index(index)),
            (None, Some(serial)) => Ok(Target::Serial(serial)),
            _ => anyhow::bail!("Pass exactly one of --index or --serial"),
        }
    }

    /// Serials are passed through; the dispatcher rejects unknown ones.
    pub fn resolve(self, store: &ViewStore) -> anyhow::Result<Serial> {
        match self {
            Target::Index(index) => serial_at(store, index),
            Target::Serial(serial) => Ok(serial),
        }
    }
}

/// Serial of the light at `index` in display order, counting from 1.
pub fn serial_at(store: &ViewStore, index: usize) -> anyhow::Result<Serial> {
    let serials: Vec<Serial> = store
        .grouped()
        .into_iter()
        .flat_map(|g| g.views.into_iter().map(|v| v.serial))
        .collect();
    index
        .checked_sub(1)
        .and_then(|i| serials.get(i).copied())
        .with_context(|| format!("No light at index {index}, {} known", serials.len()))
}

pub fn format_view(view: &ViewState) -> String {
    format!(
        "{:<16} {} {:<3}{}",
        view.display_label,
        view.display_color.hex(),
        if view.powered_on { "on" } else { "off" },
        if view.pending_optimistic {
            " (pending)"
        } else {
            ""
        }
    )
}

pub fn format_groups(groups: &[DeviceGroup]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut index = 1;
    for group in groups {
        lines.push(format!("[{}]", group.name));
        for view in &group.views {
            lines.push(format!("  {index} - {}", format_view(view)));
            index += 1;
        }
    }
    lines
}
