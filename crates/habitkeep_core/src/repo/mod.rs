//! Repository layer over the state store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Hide the store's mutation format from service and outer layers.
//!
//! # Invariants
//! - Repository writes are validated and durable before they return.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to persistence failures.

pub mod habit_repo;
