//! Durable serialization of the store snapshot.
//!
//! # Responsibility
//! - Encode/decode the snapshot as one structured JSON document.
//! - Abstract the byte-level storage behind `SnapshotStorage`.
//!
//! # Invariants
//! - Writers replace the whole document atomically; readers never see a
//!   half-written document.
//! - Malformed documents are reported, never silently replaced.
//! - A writer holds `SnapshotStorage::lock` across read, mutate and
//!   replace, so stores in different processes never interleave writes.

mod document;
mod json_file;
mod memory;

pub use document::{decode_snapshot, encode_snapshot, StateDocument, STATE_DOCUMENT_VERSION};
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::store::Snapshot;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;

/// Exclusive hold on the stored document; released on drop.
#[derive(Debug)]
pub struct StorageLock {
    _file: Option<File>,
}

impl StorageLock {
    /// Lock for storage that only one process can reach.
    pub fn process_local() -> Self {
        Self { _file: None }
    }

    /// Lock backed by an OS advisory lock held on `file`.
    pub fn advisory(file: File) -> Self {
        Self { _file: Some(file) }
    }
}

/// Byte-level storage for the state document.
pub trait SnapshotStorage: Send + Sync {
    /// Blocks until this caller is the only writer of the document.
    fn lock(&self) -> io::Result<StorageLock> {
        Ok(StorageLock::process_local())
    }

    /// Returns the stored bytes, or `None` when nothing was stored yet.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replaces the stored bytes atomically.
    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()>;

    /// Human-readable location for diagnostics.
    fn location(&self) -> String;
}

impl<S: SnapshotStorage + ?Sized> SnapshotStorage for std::sync::Arc<S> {
    fn lock(&self) -> io::Result<StorageLock> {
        (**self).lock()
    }

    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read()
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_atomic(bytes)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Write-side failure.
#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Encode(serde_json::Error),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to write state document: {err}"),
            Self::Encode(err) => write!(f, "failed to encode state document: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Read-side failure.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Corrupt(String),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read state document: {err}"),
            Self::Corrupt(message) => write!(f, "corrupt state document: {message}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Corrupt(_) => None,
        }
    }
}

/// Serializes `snapshot` and hands it to `storage` for atomic replace.
pub fn persist(storage: &dyn SnapshotStorage, snapshot: &Snapshot) -> Result<(), PersistError> {
    let bytes = encode_snapshot(snapshot).map_err(PersistError::Encode)?;
    storage.write_atomic(&bytes)?;
    Ok(())
}

/// Reads and decodes the stored document; `Ok(None)` when absent.
pub fn load(storage: &dyn SnapshotStorage) -> Result<Option<Snapshot>, LoadError> {
    match storage.read().map_err(LoadError::Io)? {
        Some(bytes) => decode_snapshot(&bytes).map(Some),
        None => Ok(None),
    }
}
