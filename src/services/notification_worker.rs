//! Notification worker - delivers transitions off the registry lock
//!
//! The registry hands events to a `ChannelNotifier`; this worker drains the
//! channel, logs each transition and appends it to the egress file.

use crate::domain::MonitoringEvent;
use crate::io::egress::TransitionEgress;
use tokio::sync::mpsc;
use tracing::info;

/// Worker that consumes transition events
pub struct NotificationWorker {
    rx: mpsc::UnboundedReceiver<MonitoringEvent>,
    egress: TransitionEgress,
    site_id: String,
}

impl NotificationWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<MonitoringEvent>,
        egress: TransitionEgress,
        site_id: &str,
    ) -> Self {
        Self { rx, egress, site_id: site_id.to_string() }
    }

    /// Run until every sender is dropped; returns events delivered to egress
    pub async fn run(mut self) -> usize {
        info!("notification_worker_started");
        let mut delivered = 0;

        while let Some(event) = self.rx.recv().await {
            info!(
                site = %self.site_id,
                region = %event.region.unique_id(),
                state = %if event.inside { "inside" } else { "outside" },
                ts = %event.ts,
                "monitoring_transition"
            );
            if self.egress.write_event(&event) {
                delivered += 1;
            }
        }

        info!(delivered = %delivered, "notification_worker_stopped");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_worker_writes_events_until_closed() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("transitions.jsonl");
        let egress = TransitionEgress::new(file_path.to_str().unwrap());

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = NotificationWorker::new(rx, egress, "test-site");
        let handle = tokio::spawn(worker.run());

        tx.send(MonitoringEvent::new(Region::new("A", vec![]), true, 1)).unwrap();
        tx.send(MonitoringEvent::new(Region::new("A", vec![]), false, 2)).unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 2);
        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
