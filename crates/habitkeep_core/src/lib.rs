//! Core state store for HabitKeep.
//! This crate is the single source of truth for habit/proof invariants and
//! for the durability of the state document.

pub mod config;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod service;
pub mod store;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::habit::{Habit, HabitChanges, HabitConfig, ValidationError};
pub use model::ids::{HabitId, IdCounters, InvalidIdError, ProofId};
pub use model::now_epoch_ms;
pub use model::proof::{Proof, ProofInput};
pub use persist::{
    JsonFileStorage, MemoryStorage, PersistError, SnapshotStorage, StorageLock,
};
pub use repo::habit_repo::{HabitDeletion, HabitRepository, ProofCursor, StoreHabitRepository};
pub use service::habit_service::{
    normalize_weekdays, HabitEdit, HabitForm, HabitOverview, HabitReport, HabitService,
    HabitStats, TodayStatus,
};
pub use store::{Applied, EntityRef, Mutation, Snapshot, StateStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
