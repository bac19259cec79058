//! Integration tests for restart behavior against the on-disk state store

use beacon_monitor::domain::{Beacon, Identifier, InsideStatus, MonitoringEvent, Region};
use beacon_monitor::infra::ManualClock;
use beacon_monitor::io::{FileStateStore, StateStore, TransitionNotifier};
use beacon_monitor::services::{RegionRegistry, RegistrySettings, RestoreOutcome};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const BLOB: &str = "beacon_monitoring_state";

type Events = Arc<Mutex<Vec<(String, bool)>>>;

fn recorder() -> (Arc<dyn TransitionNotifier>, Events) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let notifier: Arc<dyn TransitionNotifier> = Arc::new(move |e: MonitoringEvent| {
        sink.lock().push((e.region.unique_id().to_string(), e.inside));
    });
    (notifier, events)
}

fn open(
    dir: &Path,
    settings: RegistrySettings,
    clock: Arc<ManualClock>,
) -> (RegionRegistry, Events) {
    let (notifier, events) = recorder();
    let registry =
        RegionRegistry::new(settings, Arc::new(FileStateStore::new(dir)), notifier, clock);
    (registry, events)
}

fn entrance() -> Region {
    Region::new("entrance", vec![Some(Identifier::from_u16(1)), None])
}

fn entrance_beacon() -> Beacon {
    Beacon::new(vec![Identifier::from_u16(1), Identifier::from_u16(9)])
}

#[test]
fn test_inside_state_survives_restart() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));

    {
        let (registry, events) = open(dir.path(), RegistrySettings::new(5_000), clock.clone());
        assert_eq!(registry.restore_outcome(), RestoreOutcome::Absent);
        registry.add(entrance());
        assert_eq!(registry.dispatch_sighting(&entrance_beacon()), 1);
        assert_eq!(*events.lock(), vec![("entrance".to_string(), true)]);
    }
    assert!(dir.path().join(BLOB).exists());

    // Still inside after restart: a fresh sighting is not a new entry
    clock.set(2_000);
    let (registry, events) = open(dir.path(), RegistrySettings::new(5_000), clock.clone());
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Restored(1));
    assert_eq!(registry.count(), 1);
    assert!(registry.is_monitoring(&entrance()));
    let status = registry.state_of(&entrance()).unwrap();
    assert_eq!(status.status, InsideStatus::Inside);
    assert_eq!(status.last_seen_ms, Some(1_000));

    assert_eq!(registry.dispatch_sighting(&entrance_beacon()), 0);
    assert!(events.lock().is_empty());

    assert_eq!(registry.sweep_expired(7_000), 0);
    assert_eq!(registry.sweep_expired(7_001), 1);
    assert_eq!(*events.lock(), vec![("entrance".to_string(), false)]);
}

#[test]
fn test_removed_region_is_not_restored() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));

    {
        let (registry, _events) = open(dir.path(), RegistrySettings::new(5_000), clock.clone());
        registry.add(entrance());
        registry.add(Region::new("kiosk", vec![]));
        assert!(registry.remove(&entrance()));
    }

    let (registry, _events) = open(dir.path(), RegistrySettings::new(5_000), clock);
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Restored(1));
    assert_eq!(registry.regions_snapshot(), vec![Region::new("kiosk", vec![])]);
}

#[test]
fn test_corrupt_file_starts_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(BLOB), b"definitely not a snapshot").unwrap();

    let (registry, _events) =
        open(dir.path(), RegistrySettings::new(5_000), Arc::new(ManualClock::new(0)));
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Corrupt);
    assert_eq!(registry.count(), 0);

    // The next save replaces the damaged blob
    registry.add(entrance());
    drop(registry);
    let (registry, _events) =
        open(dir.path(), RegistrySettings::new(5_000), Arc::new(ManualClock::new(0)));
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Restored(1));
}

#[test]
fn test_disable_persistence_deletes_blob_and_stops_saving() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));

    {
        let (registry, _events) = open(dir.path(), RegistrySettings::new(5_000), clock.clone());
        registry.add(entrance());
        assert!(dir.path().join(BLOB).exists());

        registry.disable_persistence();
        assert!(!registry.persistence_enabled());
        assert!(!dir.path().join(BLOB).exists());

        registry.dispatch_sighting(&entrance_beacon());
        registry.add(Region::new("kiosk", vec![]));
        assert!(!dir.path().join(BLOB).exists());
    }

    let (registry, _events) = open(dir.path(), RegistrySettings::new(5_000), clock);
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Absent);
    assert_eq!(registry.count(), 0);
}

#[test]
fn test_persistence_disabled_by_settings_ignores_existing_blob() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));

    {
        let (registry, _events) = open(dir.path(), RegistrySettings::new(5_000), clock.clone());
        registry.add(entrance());
    }
    let before = FileStateStore::new(dir.path()).load(BLOB).unwrap().unwrap();

    let mut settings = RegistrySettings::new(5_000);
    settings.persistence_enabled = false;
    let (registry, _events) = open(dir.path(), settings, clock);
    assert_eq!(registry.restore_outcome(), RestoreOutcome::Disabled);
    assert_eq!(registry.count(), 0);

    registry.add(Region::new("kiosk", vec![]));
    let after = FileStateStore::new(dir.path()).load(BLOB).unwrap().unwrap();
    assert_eq!(before, after);
}
