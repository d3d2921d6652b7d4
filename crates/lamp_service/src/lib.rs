//! Cache, refresh scheduling and the lamp configuration read path.

pub mod brightness;
pub mod cache;
pub mod registry;
pub mod scheduler;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use brightness::{brightness_level, brightness_value};
pub use cache::{CacheStore, MemoryCache};
pub use registry::{LampRegistry, StaticRegistry};
pub use scheduler::{CycleSummary, RefreshScheduler, SchedulerState, TickOutcome};
pub use service::{ConfigOutcome, LampConfigService, LampStatus};
