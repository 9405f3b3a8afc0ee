mod dispatcher;
mod event_bus;
mod fallback;
mod hub;
mod poller;
mod reading_cache;
mod registry;

pub use dispatcher::*;
pub use event_bus::*;
pub use fallback::*;
pub use hub::*;
pub use poller::*;
pub use reading_cache::*;
pub use registry::*;
