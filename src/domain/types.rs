//! Shared types for region monitoring

use crate::domain::region::Region;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Whether the observer is inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsideStatus {
    /// No sighting or sweep has been processed yet
    #[default]
    Unknown,
    Inside,
    Outside,
}

impl InsideStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            InsideStatus::Unknown => "unknown",
            InsideStatus::Inside => "inside",
            InsideStatus::Outside => "outside",
        }
    }

    #[inline]
    pub fn is_inside(&self) -> bool {
        matches!(self, InsideStatus::Inside)
    }
}

/// Point-in-time copy of a region's monitoring state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStatus {
    pub status: InsideStatus,
    pub last_seen_ms: Option<u64>,
}

/// Transition notification delivered once per inside/outside flip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringEvent {
    pub region: Region,
    pub inside: bool,
    /// Epoch ms at which the transition was computed
    pub ts: u64,
}

impl MonitoringEvent {
    pub fn new(region: Region, inside: bool, ts: u64) -> Self {
        Self { region, inside, ts }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
