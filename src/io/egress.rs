//! Transition egress - writes monitoring events to file
//!
//! Events are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::MonitoringEvent;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// Egress writer for transitions
pub struct TransitionEgress {
    file_path: String,
}

impl TransitionEgress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write an event to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_event(&self, event: &MonitoringEvent) -> bool {
        match self.append_line(&event.to_json()) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    region = %event.region.unique_id(),
                    error = %e,
                    "transition_egress_failed"
                );
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_write_event() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("transitions.jsonl");
        let egress = TransitionEgress::new(file_path.to_str().unwrap());

        let event = MonitoringEvent::new(Region::new("store", vec![]), true, 42);
        assert!(egress.write_event(&event));

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["region"]["unique_id"], "store");
        assert_eq!(parsed["inside"], true);
    }

    #[test]
    fn test_append_mode_and_nested_dirs() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("transitions.jsonl");
        let egress = TransitionEgress::new(file_path.to_str().unwrap());

        egress.write_event(&MonitoringEvent::new(Region::new("a", vec![]), true, 1));
        egress.write_event(&MonitoringEvent::new(Region::new("a", vec![]), false, 2));

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(r#""inside":false"#));
    }

    #[test]
    fn test_write_failure_returns_false() {
        let dir = tempdir().unwrap();
        // Path is a directory, so opening it for append fails
        let egress = TransitionEgress::new(dir.path().to_str().unwrap());

        let event = MonitoringEvent::new(Region::new("a", vec![]), true, 1);
        assert!(!egress.write_event(&event));
    }
}
