//! Durable blob storage for monitoring state
//!
//! The registry only needs load/save/delete of a named byte blob. Absence is
//! `Ok(None)`, not an error.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Named byte-blob store
pub trait StateStore: Send + Sync {
    /// Read a blob; `Ok(None)` when it has never been written
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
    /// Replace a blob
    fn save(&self, name: &str, bytes: &[u8]) -> io::Result<()>;
    /// Delete a blob; deleting a missing blob succeeds
    fn delete(&self, name: &str) -> io::Result<()>;
}

/// One file per blob under a directory
///
/// Saves go to a sibling temp file which is renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl StateStore for FileStateStore {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.path_for(name);
        let tmp_path = self.dir.join(format!("{}.tmp", name));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        debug!(file = %path.display(), bytes = %bytes.len(), "state_blob_written");
        Ok(())
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-process store for tests and embedding
#[derive(Default)]
pub struct MemoryStateStore {
    blobs: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a blob directly, bypassing the codec
    pub fn put_raw(&self, name: &str, bytes: Vec<u8>) {
        self.blobs.lock().insert(name.to_string(), bytes);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.lock().contains_key(name)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(name).cloned())
    }

    fn save(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        self.blobs.lock().remove(name);
        Ok(())
    }
}
