pub mod settings;

pub use settings::{Bridge, DeviceEntry, DriverKind, Settings};
