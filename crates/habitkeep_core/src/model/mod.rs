//! Typed domain model for habits and their proofs.
//!
//! # Responsibility
//! - Define the canonical entities held by the state store.
//! - Keep validation rules next to the data they protect.
//!
//! # Invariants
//! - Every entity is identified by a stable, never-reused id.
//! - Proofs reference habits by id only; habits keep no back-pointer.

pub mod habit;
pub mod ids;
pub mod proof;
pub mod schedule;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
