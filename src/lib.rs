//! Beacon region monitoring library
//!
//! Debounces a stream of beacon sightings into inside/outside transitions
//! per region, notifies once per transition and persists state across
//! restarts. Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;

pub use domain::{Beacon, Identifier, InsideStatus, MonitoringEvent, Region};
pub use services::{RegionRegistry, RegistrySettings, RestoreOutcome};
