//! Services - region monitoring logic and background tasks
//!
//! - `region_state` - Per-region inside/outside debounce state machine
//! - `registry` - Thread-safe registry, sighting dispatch, persistence
//! - `sweeper` - Periodic expiry sweep task
//! - `notification_worker` - Drains transition notifications to egress

pub mod notification_worker;
pub mod region_state;
pub mod registry;
pub mod sweeper;

// Re-export commonly used types
pub use notification_worker::NotificationWorker;
pub use region_state::RegionState;
pub use registry::{RegionRegistry, RegistrySettings, RestoreOutcome};
pub use sweeper::run_sweeper;
