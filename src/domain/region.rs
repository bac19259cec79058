//! Monitored regions and the sightings matched against them

use crate::domain::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single beacon sighting reported by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    /// Ordered identifiers (e.g. uuid, major, minor)
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    /// Hardware address of the transmitter, if known
    #[serde(default)]
    pub bluetooth_address: Option<String>,
    /// Received signal strength (dBm)
    #[serde(default)]
    pub rssi: Option<i32>,
}

impl Beacon {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self { identifiers, bluetooth_address: None, rssi: None }
    }

    pub fn with_bluetooth_address(mut self, address: impl Into<String>) -> Self {
        self.bluetooth_address = Some(address.into());
        self
    }

    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }

    #[inline]
    pub fn identifier(&self, index: usize) -> Option<&Identifier> {
        self.identifiers.get(index)
    }
}

/// A monitored region
///
/// Identity is the `unique_id` alone: two regions with the same id are the
/// same map key even if their match criteria differ. This keeps persisted
/// state attached to the right region across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    unique_id: String,
    /// Positional match criteria; `None` matches any identifier
    identifiers: Vec<Option<Identifier>>,
    #[serde(default)]
    bluetooth_address: Option<String>,
}

impl Region {
    pub fn new(unique_id: impl Into<String>, identifiers: Vec<Option<Identifier>>) -> Self {
        Self { unique_id: unique_id.into(), identifiers, bluetooth_address: None }
    }

    pub fn with_bluetooth_address(mut self, address: impl Into<String>) -> Self {
        self.bluetooth_address = Some(address.into());
        self
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn identifiers(&self) -> &[Option<Identifier>] {
        &self.identifiers
    }

    pub fn bluetooth_address(&self) -> Option<&str> {
        self.bluetooth_address.as_deref()
    }

    /// Check whether a sighting falls inside this region
    ///
    /// Every `Some` identifier must be present at the same position in the
    /// beacon and equal to it. A configured bluetooth address must match
    /// case-insensitively.
    pub fn matches(&self, beacon: &Beacon) -> bool {
        for (index, expected) in self.identifiers.iter().enumerate() {
            let Some(expected) = expected else {
                continue;
            };
            match beacon.identifier(index) {
                Some(actual) if actual == expected => {}
                _ => return false,
            }
        }

        if let Some(ref address) = self.bluetooth_address {
            match beacon.bluetooth_address.as_deref() {
                Some(actual) if actual.eq_ignore_ascii_case(address) => {}
                _ => return false,
            }
        }

        true
    }

    /// Whether both regions match exactly the same sightings
    pub fn same_criteria(&self, other: &Region) -> bool {
        self.identifiers == other.identifiers
            && match (&self.bluetooth_address, &other.bluetooth_address) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id == other.unique_id
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unique_id.hash(state);
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unique_id)?;
        for (i, id) in self.identifiers.iter().enumerate() {
            match id {
                Some(id) => write!(f, " id{}: {}", i + 1, id)?,
                None => write!(f, " id{}: *", i + 1)?,
            }
        }
        if let Some(ref address) = self.bluetooth_address {
            write!(f, " addr: {}", address)?;
        }
        Ok(())
    }
}
