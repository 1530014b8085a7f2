//! JSON file storage with temp-file + rename replacement.
//!
//! # Invariants
//! - The temp file lives in the target's directory so the final rename
//!   never crosses filesystems.
//! - Data is fsynced before the rename; a crash leaves either the old or
//!   the new document, never a mix.
//! - Writers serialize on an advisory lock on `<file>.lock`. The document
//!   itself is replaced by rename, so it cannot carry the lock.

use super::{SnapshotStorage, StorageLock};
use fs4::FileExt;
use log::warn;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = ".habitkeep-state-";
const TEMP_SUFFIX: &str = ".tmp";
const LOCK_SUFFIX: &str = ".lock";

/// Stores the state document as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file that carries the writer lock.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(LOCK_SUFFIX);
        self.parent_dir().join(name)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn lock(&self) -> io::Result<StorageLock> {
        fs::create_dir_all(self.parent_dir())?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(StorageLock::advisory(file))
    }

    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;

        // Best effort: the document is already replaced.
        if let Err(err) = sync_dir(dir) {
            warn!(
                "event=persist_dir_sync module=persist status=error dir={} error={}",
                dir.display(),
                err
            );
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Makes the rename itself durable on filesystems that need it.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{sync_dir, JsonFileStorage};
    use crate::persist::SnapshotStorage;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn read_of_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("absent.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn write_replaces_content_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("nested").join("state.json"));

        storage.write_atomic(b"first").unwrap();
        storage.write_atomic(b"second").unwrap();

        assert_eq!(storage.read().unwrap().unwrap(), b"second");
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn lock_sidecar_sits_next_to_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("state.json"));
        assert_eq!(storage.lock_path(), dir.path().join("state.json.lock"));

        let _held = storage.lock().unwrap();
        assert!(storage.lock_path().exists());
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn second_writer_waits_for_the_lock_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let first = JsonFileStorage::new(&path);
        let second = JsonFileStorage::new(&path);
        let released = Arc::new(AtomicBool::new(false));

        let held = first.lock().unwrap();
        let (acquired_tx, acquired_rx) = mpsc::channel();
        let waiter = {
            let released = Arc::clone(&released);
            thread::spawn(move || {
                let _lock = second.lock().unwrap();
                acquired_tx.send(released.load(Ordering::SeqCst)).unwrap();
            })
        };

        assert!(acquired_rx.recv_timeout(Duration::from_millis(100)).is_err());
        released.store(true, Ordering::SeqCst);
        drop(held);
        assert!(acquired_rx.recv_timeout(Duration::from_secs(5)).unwrap());
        waiter.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn directory_sync_reports_errors_to_the_caller() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sync_dir(dir.path()).is_ok());
        assert!(sync_dir(&dir.path().join("gone")).is_err());
    }
}
