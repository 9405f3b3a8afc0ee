pub mod device;
pub mod intent;
pub mod reading;

pub use device::{Device, HealthTransition, Observation};
pub use intent::{Intent, IntentOutcome};
pub use reading::{CachedReading, Reading};
