//! IO modules - external collaborator interfaces
//!
//! - `codec` - Versioned, checksummed snapshot encoding
//! - `state_store` - Durable named-blob storage (file, memory)
//! - `notifier` - Transition notification sinks
//! - `egress` - Transition output to file (JSONL format)
//! - `sightings` - JSON-line sighting ingestion

pub mod codec;
pub mod egress;
pub mod notifier;
pub mod sightings;
pub mod state_store;

// Re-export commonly used types
pub use codec::{DecodeError, Snapshot};
pub use egress::TransitionEgress;
pub use notifier::{create_notification_channel, ChannelNotifier, TransitionNotifier};
pub use sightings::run_sighting_reader;
pub use state_store::{FileStateStore, MemoryStateStore, StateStore};
