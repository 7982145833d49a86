pub mod color;
pub mod dispatcher;
pub mod logging;
pub mod model;
pub mod observer;
pub mod poller;
pub mod reconciler;
pub mod settings;
pub mod transport;
pub mod view;

#[cfg(test)]
mod test_helper;

pub use color::{Rgba, device_display_color, hsb_to_rgb, kelvin_to_rgb};
pub use dispatcher::CommandDispatcher;
pub use model::{DeviceSnapshot, Hsbk, Roster, Serial};
pub use observer::{ChannelObserver, ViewObserver};
pub use poller::{Poller, PollerHandle, PollerOptions, Readiness, ReadinessOptions};
pub use reconciler::{ChangeSet, ReconcileMode, Reconciler, StructuralCheck};
pub use settings::Settings;
pub use transport::{
    ColorEdit, CommandError, DeviceCommand, DeviceTransport, DiscoveryStatus, SimulatedTransport,
    TransportError,
};
pub use view::{DeviceGroup, ViewState, ViewStore};
