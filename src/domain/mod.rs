//! Domain models - core types for region monitoring
//!
//! - `Identifier` - opaque beacon identifier bytes
//! - `Beacon` - a single proximity-sensor sighting
//! - `Region` - a monitored area and its match predicate
//! - `InsideStatus` / `MonitoringEvent` - transition state and payload

pub mod identifier;
pub mod region;
pub mod types;

// Re-export commonly used types at module level
pub use identifier::Identifier;
pub use region::{Beacon, Region};
pub use types::{epoch_ms, InsideStatus, MonitoringEvent, RegionStatus};
