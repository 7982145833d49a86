mod serial;
mod snapshot;

pub use serial::{SERIAL_LEN, Serial, SerialParseError};
pub use snapshot::{DeviceSnapshot, Hsbk, Roster};
