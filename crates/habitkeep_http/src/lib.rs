//! HTTP route layer for the HabitKeep mobile client.
//!
//! # Responsibility
//! - Map REST routes onto the habit service.
//! - Render store failures as JSON error envelopes.
//!
//! # Invariants
//! - Handlers never touch the state document directly; every read and
//!   write goes through the shared `StateStore`.

pub mod config;
pub mod error;
mod handlers;
pub mod wire;

use axum::routing::{delete, get};
use axum::Router;
use habitkeep_core::{HabitService, StateStore, StoreHabitRepository};
use std::sync::Arc;

pub use config::ServerConfig;
pub use error::ApiError;

pub type AppService = HabitService<StoreHabitRepository>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
}

impl AppState {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            service: Arc::new(HabitService::new(StoreHabitRepository::new(store))),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/habits",
            get(handlers::list_habits).post(handlers::create_habit),
        )
        .route(
            "/habits/:habit_id",
            get(handlers::get_habit)
                .patch(handlers::update_habit)
                .delete(handlers::delete_habit),
        )
        .route(
            "/habits/:habit_id/proofs",
            get(handlers::list_proofs).post(handlers::add_proof),
        )
        .route("/habits/:habit_id/today", get(handlers::today))
        .route("/habits/:habit_id/stats", get(handlers::stats))
        .route("/proofs/:proof_id", delete(handlers::delete_proof))
        .with_state(state)
}
