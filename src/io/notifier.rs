//! Transition notification sinks
//!
//! The registry calls `notify` while holding its lock, so implementations
//! must hand off quickly. `ChannelNotifier` does this with an unbounded mpsc
//! channel: a send never blocks and never drops a committed transition.

use crate::domain::MonitoringEvent;
use crate::infra::metrics::Metrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Receives one event per inside/outside transition
pub trait TransitionNotifier: Send + Sync {
    fn notify(&self, event: MonitoringEvent);
}

impl<F> TransitionNotifier for F
where
    F: Fn(MonitoringEvent) + Send + Sync,
{
    fn notify(&self, event: MonitoringEvent) {
        self(event)
    }
}

/// Non-blocking notifier backed by an unbounded channel
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<MonitoringEvent>,
    metrics: Option<Arc<Metrics>>,
    /// Rate-limits drop warnings to one per second
    last_drop_warn: Arc<Mutex<Option<Instant>>>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<MonitoringEvent>) -> Self {
        Self { tx, metrics: None, last_drop_warn: Arc::new(Mutex::new(None)) }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Count an event the consumer will never see
    fn record_drop(&self, event: &MonitoringEvent) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_notification_dropped();
        }

        let mut last = self.last_drop_warn.lock();
        let should_warn = last.map_or(true, |at| at.elapsed() > Duration::from_secs(1));
        if should_warn {
            *last = Some(Instant::now());
            warn!(
                region = %event.region.unique_id(),
                inside = %event.inside,
                "notification_dropped_consumer_gone"
            );
        }
    }
}

impl TransitionNotifier for ChannelNotifier {
    fn notify(&self, event: MonitoringEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            self.record_drop(&event);
        }
    }
}

/// Create a notification channel
///
/// Returns the notifier (for the registry) and the receiver (for a consumer task)
pub fn create_notification_channel(
    metrics: Arc<Metrics>,
) -> (ChannelNotifier, mpsc::UnboundedReceiver<MonitoringEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelNotifier::new(tx).with_metrics(metrics), rx)
}
