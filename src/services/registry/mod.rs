//! Region registry - orchestration, dispatch and persistence
//!
//! The registry owns one `RegionState` per monitored region and is shared
//! between the sighting path, the expiry sweeper and application code.
//!
//! Every operation runs under a single mutex covering the map, the count and
//! the persistence flag. Computing transitions, notifying and saving happen
//! as one unit, so a concurrent `add`/`remove` can never observe or persist
//! a half-applied batch. Persistence is best-effort: failures are logged and
//! never surface to callers.


use crate::domain::{Beacon, Region, RegionStatus};
use crate::infra::clock::Clock;
use crate::infra::config::{default_blob_name, Config};
use crate::infra::metrics::Metrics;
use crate::io::codec::{self, DecodeError, Snapshot};
use crate::io::notifier::TransitionNotifier;
use crate::io::state_store::StateStore;
use crate::services::region_state::RegionState;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Registry tunables
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Time without a sighting before an inside region flips to outside
    pub expiration_ms: u64,
    /// When false the registry neither restores nor saves
    pub persistence_enabled: bool,
    /// Name of the state blob in the store
    pub blob_name: String,
}

impl RegistrySettings {
    /// Persisting settings with the default blob name
    pub fn new(expiration_ms: u64) -> Self {
        Self { expiration_ms, persistence_enabled: true, blob_name: default_blob_name() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            expiration_ms: config.expiration_ms(),
            persistence_enabled: config.persistence_enabled(),
            blob_name: config.blob_name().to_string(),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What happened when the registry tried to restore prior state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Snapshot decoded; number of regions restored
    Restored(usize),
    /// No snapshot stored (first run, or persistence was stopped)
    Absent,
    /// Snapshot written by another format version; discarded
    Incompatible,
    /// Snapshot damaged; discarded
    Corrupt,
    /// Store could not be read; started empty
    StoreError,
    /// Persistence disabled by settings; restore skipped
    Disabled,
}

/// State guarded by the registry lock
struct Inner {
    states: FxHashMap<Region, RegionState>,
    /// Mirrors `states.len()`
    monitoring_count: usize,
    persistence_enabled: bool,
}

/// Thread-safe registry of monitored regions
pub struct RegionRegistry {
    inner: Mutex<Inner>,
    settings: RegistrySettings,
    store: Arc<dyn StateStore>,
    /// Bound to every region added without its own notifier, and to restored regions
    notifier: Arc<dyn TransitionNotifier>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
    restore_outcome: RestoreOutcome,
}

impl RegionRegistry {
    /// Create a registry and restore any previously saved state
    pub fn new(
        settings: RegistrySettings,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn TransitionNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (states, restore_outcome) = if settings.persistence_enabled {
            Self::restore(store.as_ref(), &settings.blob_name, &notifier)
        } else {
            debug!("monitoring_state_restore_skipped");
            (FxHashMap::default(), RestoreOutcome::Disabled)
        };

        let monitoring_count = states.len();
        info!(
            regions = %monitoring_count,
            outcome = ?restore_outcome,
            persistence = %settings.persistence_enabled,
            "region_registry_initialized"
        );

        Self {
            inner: Mutex::new(Inner {
                states,
                monitoring_count,
                persistence_enabled: settings.persistence_enabled,
            }),
            settings,
            store,
            notifier,
            clock,
            metrics: None,
            restore_outcome,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        metrics.set_monitored_regions(self.inner.get_mut().monitoring_count);
        self.metrics = Some(metrics);
        self
    }

    /// Start monitoring a region, bound to the registry's notifier
    ///
    /// Returns false (and does nothing) if the region is already monitored.
    pub fn add(&self, region: Region) -> bool {
        self.add_with_notifier(region, self.notifier.clone())
    }

    /// Start monitoring a region with its own notifier
    pub fn add_with_notifier(&self, region: Region, notifier: Arc<dyn TransitionNotifier>) -> bool {
        let mut inner = self.inner.lock();
        if inner.states.contains_key(&region) {
            debug!(region = %region.unique_id(), "region_already_monitored");
            return false;
        }

        debug!(region = %region, "region_added");
        inner.states.insert(region, RegionState::new(notifier));
        inner.monitoring_count += 1;
        self.update_gauge(&inner);
        self.save_locked(&inner);
        true
    }

    /// Stop monitoring a region
    ///
    /// Returns false (and does nothing) if the region was not monitored.
    pub fn remove(&self, region: &Region) -> bool {
        let mut inner = self.inner.lock();
        if inner.states.remove(region).is_none() {
            return false;
        }

        debug!(region = %region.unique_id(), "region_removed");
        inner.monitoring_count -= 1;
        self.update_gauge(&inner);
        self.save_locked(&inner);
        true
    }

    /// Number of monitored regions
    pub fn count(&self) -> usize {
        self.inner.lock().monitoring_count
    }

    /// Point-in-time copy of the monitored regions
    pub fn regions_snapshot(&self) -> Vec<Region> {
        self.inner.lock().states.keys().cloned().collect()
    }

    /// Monitored regions whose id is not in `listed`, e.g. restored from a
    /// previous run but no longer configured
    pub fn regions_not_in(&self, listed: &[Region]) -> Vec<Region> {
        let inner = self.inner.lock();
        inner.states.keys().filter(|region| !listed.contains(region)).cloned().collect()
    }

    pub fn is_monitoring(&self, region: &Region) -> bool {
        self.inner.lock().states.contains_key(region)
    }

    /// Point-in-time copy of one region's state
    pub fn state_of(&self, region: &Region) -> Option<RegionStatus> {
        self.inner.lock().states.get(region).map(RegionState::snapshot)
    }

    /// Apply one sighting to every region it matches
    ///
    /// Each region that becomes inside is notified; the state is saved once
    /// if anything changed. Returns the number of transitions.
    pub fn dispatch_sighting(&self, beacon: &Beacon) -> usize {
        let mut inner = self.inner.lock();
        // Read under the lock so concurrent sightings apply in clock order
        let now_ms = self.clock.now_ms();
        if let Some(ref metrics) = self.metrics {
            metrics.record_sighting();
        }

        let mut transitions = 0;
        for (region, state) in inner.states.iter_mut() {
            if !region.matches(beacon) {
                continue;
            }
            if state.mark_seen(now_ms) {
                transitions += 1;
                info!(region = %region.unique_id(), "region_entered");
                state.notify(region, now_ms);
                if let Some(ref metrics) = self.metrics {
                    metrics.record_transition(true);
                }
            }
        }

        if transitions > 0 {
            self.save_locked(&inner);
        }
        transitions
    }

    /// Flip every region that has gone unseen past the expiration window
    ///
    /// Each region that becomes outside is notified; the state is saved once
    /// if anything changed. Returns the number of transitions.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        let expiration_ms = self.settings.expiration_ms;
        let mut inner = self.inner.lock();
        if let Some(ref metrics) = self.metrics {
            metrics.record_sweep();
        }

        let mut transitions = 0;
        for (region, state) in inner.states.iter_mut() {
            if state.check_expired(now_ms, expiration_ms) {
                transitions += 1;
                info!(
                    region = %region.unique_id(),
                    last_seen_ms = ?state.last_seen_ms(),
                    "region_exited"
                );
                state.notify(region, now_ms);
                if let Some(ref metrics) = self.metrics {
                    metrics.record_transition(false);
                }
            }
        }

        if transitions > 0 {
            self.save_locked(&inner);
        }
        transitions
    }

    /// Delete the saved state and stop saving for the rest of this registry's life
    pub fn disable_persistence(&self) {
        let mut inner = self.inner.lock();
        inner.persistence_enabled = false;
        match self.store.delete(&self.settings.blob_name) {
            Ok(()) => info!(blob = %self.settings.blob_name, "monitoring_state_preservation_stopped"),
            Err(e) => error!(
                blob = %self.settings.blob_name,
                error = %e,
                "monitoring_state_delete_failed"
            ),
        }
    }

    pub fn persistence_enabled(&self) -> bool {
        self.inner.lock().persistence_enabled
    }

    pub fn restore_outcome(&self) -> RestoreOutcome {
        self.restore_outcome
    }

    /// Current wall-clock time as seen by this registry
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn update_gauge(&self, inner: &Inner) {
        if let Some(ref metrics) = self.metrics {
            metrics.set_monitored_regions(inner.monitoring_count);
        }
    }

    /// Encode and write the whole map; caller holds the lock
    fn save_locked(&self, inner: &Inner) {
        if !inner.persistence_enabled {
            return;
        }

        let snapshot = Snapshot {
            regions: inner
                .states
                .iter()
                .map(|(region, state)| state.to_persisted(region))
                .collect(),
        };

        let result = codec::encode(&snapshot)
            .and_then(|bytes| self.store.save(&self.settings.blob_name, &bytes).map(|()| bytes.len()));

        match result {
            Ok(bytes) => {
                debug!(regions = %snapshot.regions.len(), bytes = %bytes, "monitoring_state_saved");
                if let Some(ref metrics) = self.metrics {
                    metrics.record_save(true);
                }
            }
            Err(e) => {
                error!(
                    blob = %self.settings.blob_name,
                    error = %e,
                    "monitoring_state_save_failed"
                );
                if let Some(ref metrics) = self.metrics {
                    metrics.record_save(false);
                }
            }
        }
    }

    fn restore(
        store: &dyn StateStore,
        blob_name: &str,
        notifier: &Arc<dyn TransitionNotifier>,
    ) -> (FxHashMap<Region, RegionState>, RestoreOutcome) {
        let mut states = FxHashMap::default();

        let bytes = match store.load(blob_name) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(blob = %blob_name, "monitoring_state_absent");
                return (states, RestoreOutcome::Absent);
            }
            Err(e) => {
                warn!(blob = %blob_name, error = %e, "monitoring_state_read_failed");
                return (states, RestoreOutcome::StoreError);
            }
        };

        match codec::decode::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                for persisted in &snapshot.regions {
                    states.insert(
                        persisted.region.clone(),
                        RegionState::from_persisted(persisted, notifier.clone()),
                    );
                }
                info!(blob = %blob_name, regions = %states.len(), "monitoring_state_restored");
                let restored = states.len();
                (states, RestoreOutcome::Restored(restored))
            }
            Err(e @ DecodeError::IncompatibleVersion { .. }) => {
                debug!(blob = %blob_name, reason = %e, "monitoring_state_incompatible_ignored");
                (states, RestoreOutcome::Incompatible)
            }
            Err(e @ DecodeError::Corrupt(_)) => {
                warn!(blob = %blob_name, error = %e, "monitoring_state_corrupt_ignored");
                (states, RestoreOutcome::Corrupt)
            }
        }
    }
}

impl std::fmt::Debug for RegionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry")
            .field("settings", &self.settings)
            .field("count", &self.count())
            .field("restore_outcome", &self.restore_outcome)
            .finish_non_exhaustive()
    }
}
