//! Sighting ingestion from JSON lines
//!
//! Each non-empty line is one `Beacon`:
//! `{"identifiers":["2f234454-cf6d-4a0f-adf2-f4911ba9ffa6","1","2"],"rssi":-60}`
//! Lines starting with `#` are ignored. Malformed lines are logged and skipped.

use crate::domain::Beacon;
use crate::infra::metrics::Metrics;
use crate::services::RegionRegistry;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Parse one input line; `Ok(None)` for blank and comment lines
pub fn parse_sighting(line: &str) -> Result<Option<Beacon>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Read sightings until EOF or shutdown, dispatching each to the registry
///
/// Returns the number of sightings dispatched.
pub async fn run_sighting_reader<R>(
    reader: R,
    registry: Arc<RegionRegistry>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut dispatched = 0u64;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(dispatched = %dispatched, "sighting_reader_shutdown");
                    return dispatched;
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => match parse_sighting(&line) {
                        Ok(Some(beacon)) => {
                            debug!(identifiers = ?beacon.identifiers, rssi = ?beacon.rssi, "sighting_received");
                            registry.dispatch_sighting(&beacon);
                            dispatched += 1;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            metrics.record_sighting_rejected();
                            warn!(error = %e, line = %line, "sighting_parse_failed");
                        }
                    },
                    Ok(None) => {
                        info!(dispatched = %dispatched, "sighting_input_closed");
                        return dispatched;
                    }
                    Err(e) => {
                        warn!(error = %e, "sighting_read_failed");
                        return dispatched;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sighting() {
        let beacon = parse_sighting(r#"{"identifiers":["1","2"],"rssi":-70}"#).unwrap().unwrap();
        assert_eq!(beacon.identifiers.len(), 2);
        assert_eq!(beacon.rssi, Some(-70));
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        assert!(parse_sighting("").unwrap().is_none());
        assert!(parse_sighting("   ").unwrap().is_none());
        assert!(parse_sighting("# scanner restarted").unwrap().is_none());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_sighting("{not json").is_err());
        assert!(parse_sighting(r#"{"identifiers":["0xz"]}"#).is_err());
    }
}
