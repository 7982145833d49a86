mod state;
mod store;

pub use state::{DeviceGroup, UNGROUPED, ViewState};
pub use store::ViewStore;
