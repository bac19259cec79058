//! Per-region debounce state machine
//!
//! Converts a stream of matching sightings and periodic expiry checks into
//! stable inside/outside transitions for one region.
//!
//! Key behaviors:
//! - A sighting refreshes `last_seen_ms` (never backwards); it is a
//!   transition only if the region was not already inside
//! - An inside region goes outside once no sighting arrived for longer than
//!   the expiration window
//! - A region that was never sighted goes outside on its first check
//! - Status never returns to `Unknown`, and outside never re-signals

use crate::domain::{InsideStatus, MonitoringEvent, Region, RegionStatus};
use crate::io::codec::PersistedRegion;
use crate::io::notifier::TransitionNotifier;
use std::fmt;
use std::sync::Arc;

/// Monitoring state for a single region
pub struct RegionState {
    status: InsideStatus,
    /// Epoch ms of the most recent matching sighting
    last_seen_ms: Option<u64>,
    notifier: Arc<dyn TransitionNotifier>,
}

impl RegionState {
    pub fn new(notifier: Arc<dyn TransitionNotifier>) -> Self {
        Self { status: InsideStatus::Unknown, last_seen_ms: None, notifier }
    }

    /// Rebuild a state from its persisted form
    pub(crate) fn from_persisted(
        persisted: &PersistedRegion,
        notifier: Arc<dyn TransitionNotifier>,
    ) -> Self {
        Self { status: persisted.status, last_seen_ms: persisted.last_seen_ms, notifier }
    }

    pub(crate) fn to_persisted(&self, region: &Region) -> PersistedRegion {
        PersistedRegion {
            region: region.clone(),
            status: self.status,
            last_seen_ms: self.last_seen_ms,
        }
    }

    /// Record a matching sighting at `now_ms`
    ///
    /// Returns true if the region just became inside. `last_seen_ms` only
    /// moves forward; an older timestamp never shortens the window.
    pub fn mark_seen(&mut self, now_ms: u64) -> bool {
        self.last_seen_ms = Some(self.last_seen_ms.map_or(now_ms, |seen| seen.max(now_ms)));
        if self.status == InsideStatus::Inside {
            return false;
        }
        self.status = InsideStatus::Inside;
        true
    }

    /// Check whether the region timed out at `now_ms`
    ///
    /// Returns true if the region just became outside. Elapsed time saturates
    /// at zero, so a clock stepping backwards never expires a region.
    pub fn check_expired(&mut self, now_ms: u64, expiration_ms: u64) -> bool {
        let expired = match self.status {
            InsideStatus::Outside => false,
            InsideStatus::Inside | InsideStatus::Unknown => match self.last_seen_ms {
                None => true,
                Some(seen) => now_ms.saturating_sub(seen) > expiration_ms,
            },
        };

        if expired {
            self.status = InsideStatus::Outside;
        }
        expired
    }

    /// Emit the current status for `region` through this state's notifier
    pub fn notify(&self, region: &Region, ts: u64) {
        self.notifier.notify(MonitoringEvent::new(region.clone(), self.is_inside(), ts));
    }

    #[inline]
    pub fn status(&self) -> InsideStatus {
        self.status
    }

    #[inline]
    pub fn is_inside(&self) -> bool {
        self.status.is_inside()
    }

    #[inline]
    pub fn last_seen_ms(&self) -> Option<u64> {
        self.last_seen_ms
    }

    pub fn snapshot(&self) -> RegionStatus {
        RegionStatus { status: self.status, last_seen_ms: self.last_seen_ms }
    }
}

impl fmt::Debug for RegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionState")
            .field("status", &self.status)
            .field("last_seen_ms", &self.last_seen_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const WINDOW_MS: u64 = 10_000;

    fn recording_state() -> (RegionState, Arc<Mutex<Vec<MonitoringEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let notifier: Arc<dyn TransitionNotifier> =
            Arc::new(move |e: MonitoringEvent| sink.lock().push(e));
        (RegionState::new(notifier), events)
    }

    #[test]
    fn test_new_state_is_unknown() {
        let (state, _) = recording_state();
        assert_eq!(state.status(), InsideStatus::Unknown);
        assert!(state.last_seen_ms().is_none());
    }

    #[test]
    fn test_first_sighting_is_transition() {
        let (mut state, _) = recording_state();
        assert!(state.mark_seen(1_000));
        assert_eq!(state.status(), InsideStatus::Inside);
        assert_eq!(state.last_seen_ms(), Some(1_000));
    }

    #[test]
    fn test_repeat_sighting_refreshes_without_transition() {
        let (mut state, _) = recording_state();
        state.mark_seen(1_000);
        assert!(!state.mark_seen(2_000));
        assert!(!state.mark_seen(3_000));
        assert_eq!(state.last_seen_ms(), Some(3_000));
    }

    #[test]
    fn test_stale_sighting_does_not_rewind_last_seen() {
        let (mut state, _) = recording_state();
        state.mark_seen(200);
        assert!(!state.mark_seen(100));
        assert_eq!(state.last_seen_ms(), Some(200));

        // Window counts from 200, not 100
        assert!(!state.check_expired(100 + WINDOW_MS + 50, WINDOW_MS));
        assert!(state.is_inside());
    }

    #[test]
    fn test_expires_after_window() {
        let (mut state, _) = recording_state();
        state.mark_seen(1_000);

        // Exactly at the window is not yet expired
        assert!(!state.check_expired(1_000 + WINDOW_MS, WINDOW_MS));
        assert!(state.check_expired(1_000 + WINDOW_MS + 1, WINDOW_MS));
        assert_eq!(state.status(), InsideStatus::Outside);
    }

    #[test]
    fn test_outside_never_resignals() {
        let (mut state, _) = recording_state();
        state.mark_seen(0);
        assert!(state.check_expired(WINDOW_MS + 1, WINDOW_MS));
        assert!(!state.check_expired(WINDOW_MS * 2, WINDOW_MS));
        assert!(!state.check_expired(WINDOW_MS * 100, WINDOW_MS));
    }

    #[test]
    fn test_never_sighted_goes_outside_once() {
        let (mut state, _) = recording_state();
        assert!(state.check_expired(5, WINDOW_MS));
        assert_eq!(state.status(), InsideStatus::Outside);
        assert!(!state.check_expired(6, WINDOW_MS));
    }

    #[test]
    fn test_reentry_after_expiry() {
        let (mut state, _) = recording_state();
        state.mark_seen(0);
        state.check_expired(WINDOW_MS + 1, WINDOW_MS);
        assert!(state.mark_seen(WINDOW_MS + 2));
        assert!(state.is_inside());
    }

    #[test]
    fn test_clock_step_backwards_does_not_expire() {
        let (mut state, _) = recording_state();
        state.mark_seen(50_000);
        assert!(!state.check_expired(1_000, WINDOW_MS));
        assert!(state.is_inside());
    }

    #[test]
    fn test_notify_reports_current_status() {
        let (mut state, events) = recording_state();
        let region = Region::new("store", vec![]);

        state.mark_seen(100);
        state.notify(&region, 100);
        state.check_expired(100 + WINDOW_MS + 1, WINDOW_MS);
        state.notify(&region, 100 + WINDOW_MS + 1);

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert!(events[0].inside);
        assert!(!events[1].inside);
        assert_eq!(events[1].region, region);
    }

    #[test]
    fn test_persisted_roundtrip() {
        let (mut state, _) = recording_state();
        let region = Region::new("store", vec![]);
        state.mark_seen(777);

        let persisted = state.to_persisted(&region);
        let (fresh, _) = recording_state();
        let restored = RegionState::from_persisted(&persisted, fresh.notifier.clone());
        assert_eq!(restored.snapshot(), state.snapshot());
    }
}
