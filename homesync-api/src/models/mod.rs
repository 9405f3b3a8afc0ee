mod capability;
mod device;
mod intent;
mod reading;

pub use capability::*;
pub use device::*;
pub use intent::*;
pub use reading::*;

/// Stable device identity, e.g. `main_outlet` or `living_room`.
pub type DeviceId = String;
