//! Authoritative in-memory state, synchronized write-through to storage.
//!
//! # Responsibility
//! - Hold the single published `Snapshot` shared by every caller.
//! - Serialize mutations: validate, apply, persist, then publish.
//!
//! # Invariants
//! - Only one mutation is in flight at a time (`write_lock` in-process,
//!   `SnapshotStorage::lock` across processes).
//! - Every mutation starts from the stored document, so writes made by
//!   another store on the same document are never overwritten.
//! - Readers only ever see fully applied, durable snapshots.
//! - A mutation is published only after storage accepted it; on failure
//!   the last durable snapshot stays published.
//!
//! # See also
//! - `crate::persist` for the on-disk document and atomic replace.

mod snapshot;

pub use snapshot::{Applied, Mutation, Snapshot};

use crate::config::StoreConfig;
use crate::model::habit::ValidationError;
use crate::model::ids::{HabitId, ProofId};
use crate::model::now_epoch_ms;
use crate::persist::{self, JsonFileStorage, LoadError, MemoryStorage, PersistError, SnapshotStorage};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity named by a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Habit(HabitId),
    Proof(ProofId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Habit(id) => write!(f, "habit {id}"),
            Self::Proof(id) => write!(f, "proof {id}"),
        }
    }
}

/// Failure taxonomy shared by the store and everything layered on it.
#[derive(Debug)]
pub enum StoreError {
    /// Caller-supplied data violates an invariant.
    Validation(ValidationError),
    /// Referenced identifier does not exist.
    NotFound(EntityRef),
    /// Persisted document is unreadable or inconsistent.
    CorruptState(String),
    /// Durable write failed; in-memory state was not changed.
    Persistence(PersistError),
}

impl StoreError {
    /// Stable machine-readable code used by logs and outer layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::CorruptState(_) => "corrupt_state",
            Self::Persistence(_) => "persistence_failed",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::CorruptState(message) => write!(f, "corrupt state document: {message}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::NotFound(_) | Self::CorruptState(_) => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistError> for StoreError {
    fn from(value: PersistError) -> Self {
        Self::Persistence(value)
    }
}

impl From<LoadError> for StoreError {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::Io(err) => Self::Persistence(PersistError::Io(err)),
            LoadError::Corrupt(message) => Self::CorruptState(message),
        }
    }
}

/// Shared, thread-safe state store.
pub struct StateStore {
    storage: Box<dyn SnapshotStorage>,
    committed: RwLock<Arc<Snapshot>>,
    write_lock: Mutex<()>,
    retry_backoff: Duration,
}

impl StateStore {
    /// Opens a store over `storage`, loading the persisted document.
    ///
    /// An absent document yields an empty snapshot.
    ///
    /// # Errors
    /// - `CorruptState` when the document exists but cannot be used.
    /// - `Persistence` when the document cannot be read.
    pub fn open(storage: impl SnapshotStorage + 'static) -> StoreResult<Self> {
        let store = Self {
            storage: Box::new(storage),
            committed: RwLock::new(Arc::new(Snapshot::empty())),
            write_lock: Mutex::new(()),
            retry_backoff: StoreConfig::DEFAULT_RETRY_BACKOFF,
        };
        store.load()?;
        Ok(store)
    }

    /// Opens the JSON document configured in `config`.
    pub fn open_file(config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::open(JsonFileStorage::new(&config.data_path))?;
        Ok(store.with_retry_backoff(config.persist_retry_backoff))
    }

    /// Opens an empty store backed by process memory.
    pub fn open_in_memory() -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            committed: RwLock::new(Arc::new(Snapshot::empty())),
            write_lock: Mutex::new(()),
            retry_backoff: StoreConfig::DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Sets the pause before the single persist retry.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Reloads the persisted document and publishes it.
    ///
    /// On error the currently published snapshot is kept.
    pub fn load(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started_at = Instant::now();
        let location = self.storage.location();

        match persist::load(self.storage.as_ref()) {
            Ok(loaded) => {
                let existed = loaded.is_some();
                let snapshot = loaded.unwrap_or_default();
                info!(
                    "event=store_load module=store status=ok location={} existed={} habits={} proofs={} duration_ms={}",
                    location,
                    existed,
                    snapshot.habit_count(),
                    snapshot.proof_count(),
                    started_at.elapsed().as_millis()
                );
                self.publish(Arc::new(snapshot));
                Ok(())
            }
            Err(err) => {
                let err = StoreError::from(err);
                error!(
                    "event=store_load module=store status=error location={} duration_ms={} error_code={} error={}",
                    location,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Returns the current published snapshot.
    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        self.committed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validates, applies and durably persists one mutation.
    ///
    /// # Errors
    /// - `Validation` / `NotFound`: nothing changed.
    /// - `Persistence`: storage rejected the write (after one retry for I/O
    ///   errors); the previously durable snapshot stays published.
    /// - `CorruptState`: the stored document became unusable.
    pub fn apply(&self, mutation: Mutation) -> StoreResult<Applied> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let started_at = Instant::now();
        let op = mutation.op_name();

        let _storage_lock = match self.storage.lock() {
            Ok(lock) => lock,
            Err(err) => {
                let err = StoreError::Persistence(PersistError::Io(err));
                log_apply_failure(op, started_at, &err);
                return Err(err);
            }
        };
        let base = match self.refresh_from_storage() {
            Ok(base) => base,
            Err(err) => {
                log_apply_failure(op, started_at, &err);
                return Err(err);
            }
        };

        let mut candidate = Snapshot::clone(&base);
        let applied = match candidate.apply(mutation, now_epoch_ms()) {
            Ok(applied) => applied,
            Err(err) => {
                info!(
                    "event=store_apply module=store status=rejected op={} duration_ms={} error_code={}",
                    op,
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                return Err(err);
            }
        };

        if let Err(err) = self.persist_with_retry(&candidate) {
            let err = StoreError::from(err);
            log_apply_failure(op, started_at, &err);
            return Err(err);
        }

        self.publish(Arc::new(candidate));
        info!(
            "event=store_apply module=store status=ok op={} duration_ms={}",
            op,
            started_at.elapsed().as_millis()
        );
        Ok(applied)
    }

    /// Publishes the stored document when another writer changed it since
    /// this store last saw it. Called with both write locks held.
    fn refresh_from_storage(&self) -> StoreResult<Arc<Snapshot>> {
        let current = self.get_snapshot();
        match persist::load(self.storage.as_ref())? {
            Some(stored) if stored != *current => {
                info!(
                    "event=store_refresh module=store status=ok location={} habits={} proofs={}",
                    self.storage.location(),
                    stored.habit_count(),
                    stored.proof_count()
                );
                let stored = Arc::new(stored);
                self.publish(Arc::clone(&stored));
                Ok(stored)
            }
            _ => Ok(current),
        }
    }

    fn persist_with_retry(&self, snapshot: &Snapshot) -> Result<(), PersistError> {
        match persist::persist(self.storage.as_ref(), snapshot) {
            Err(PersistError::Io(err)) => {
                warn!(
                    "event=store_persist module=store status=retry backoff_ms={} error={}",
                    self.retry_backoff.as_millis(),
                    err
                );
                std::thread::sleep(self.retry_backoff);
                persist::persist(self.storage.as_ref(), snapshot)
            }
            other => other,
        }
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.committed.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

fn log_apply_failure(op: &str, started_at: Instant, err: &StoreError) {
    error!(
        "event=store_apply module=store status=error op={} duration_ms={} error_code={} error={}",
        op,
        started_at.elapsed().as_millis(),
        err.code(),
        err
    );
}
