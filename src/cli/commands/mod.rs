mod control;
mod convert;
mod list;
mod watch;

pub use control::{color, power};
pub use convert::{convert_hsb, convert_kelvin};
pub use list::list;
pub use watch::watch;
