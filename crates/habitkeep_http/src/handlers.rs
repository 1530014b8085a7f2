//! Route handlers.
//!
//! Store calls block on the state mutex and on file I/O, so every handler
//! runs them on tokio's blocking pool.

use crate::error::ApiError;
use crate::wire::{
    AddProofBody, CreateHabitBody, DayQuery, HabitDeletedView, HabitListItem, HabitStatsView,
    ListHabitsQuery, TodayView, UpdateHabitBody,
};
use crate::{AppService, AppState};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use habitkeep_core::{
    now_epoch_ms, EntityRef, Habit, HabitEdit, HabitForm, HabitId, HabitRepository, Proof,
    ProofId, StoreError,
};
use serde_json::{json, Value};

type ApiResult<T> = Result<T, ApiError>;

async fn run_blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppService) -> ApiResult<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|err| ApiError::internal(format!("store task failed: {err}")))?
}

fn habit_id(raw: &str) -> ApiResult<HabitId> {
    Ok(raw.trim().parse::<HabitId>()?)
}

fn proof_id(raw: &str) -> ApiResult<ProofId> {
    Ok(raw.trim().parse::<ProofId>()?)
}

pub(crate) async fn root() -> Json<Value> {
    Json(json!({"ok": true, "service": "habitkeep"}))
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.service.repo().snapshot();
    Json(json!({
        "status": "ok",
        "version": habitkeep_core::core_version(),
        "habits": snapshot.habit_count(),
        "proofs": snapshot.proof_count(),
    }))
}

pub(crate) async fn list_habits(
    State(state): State<AppState>,
    query: Result<Query<ListHabitsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<HabitListItem>>> {
    let Query(query) = query?;
    let items = run_blocking(&state, move |service| {
        Ok(service.habit_overview(query.include_archived)?)
    })
    .await?;
    Ok(Json(items.into_iter().map(HabitListItem::from).collect()))
}

pub(crate) async fn create_habit(
    State(state): State<AppState>,
    body: Result<Json<CreateHabitBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Habit>)> {
    let Json(body) = body?;
    let form = HabitForm::from(body);
    let habit = run_blocking(&state, move |service| {
        Ok(service.create_habit_from_form(&form)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub(crate) async fn get_habit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Habit>> {
    let id = habit_id(&raw_id)?;
    let habit = run_blocking(&state, move |service| Ok(service.repo().get_habit(id)?)).await?;
    match habit {
        Some(habit) => Ok(Json(habit)),
        None => Err(StoreError::NotFound(EntityRef::Habit(id)).into()),
    }
}

pub(crate) async fn update_habit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateHabitBody>, JsonRejection>,
) -> ApiResult<Json<Habit>> {
    let id = habit_id(&raw_id)?;
    let Json(body) = body?;
    let edit = HabitEdit::from(body);
    let habit = run_blocking(&state, move |service| Ok(service.edit_habit(id, &edit)?)).await?;
    Ok(Json(habit))
}

pub(crate) async fn delete_habit(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<HabitDeletedView>> {
    let id = habit_id(&raw_id)?;
    let deletion = run_blocking(&state, move |service| Ok(service.repo().delete_habit(id)?)).await?;
    Ok(Json(HabitDeletedView {
        deleted: deletion.habit.id,
        proofs_removed: deletion.proofs_removed,
    }))
}

pub(crate) async fn list_proofs(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Vec<Proof>>> {
    let id = habit_id(&raw_id)?;
    let proofs = run_blocking(&state, move |service| {
        Ok(service.repo().list_proofs(id)?.to_vec())
    })
    .await?;
    Ok(Json(proofs))
}

pub(crate) async fn add_proof(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<AddProofBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Proof>)> {
    let id = habit_id(&raw_id)?;
    let Json(body) = body?;
    let proof = run_blocking(&state, move |service| {
        Ok(service.confirm_habit(
            id,
            body.note.as_deref(),
            body.evidence.as_deref(),
            body.timestamp,
        )?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(proof)))
}

pub(crate) async fn today(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<DayQuery>, QueryRejection>,
) -> ApiResult<Json<TodayView>> {
    let id = habit_id(&raw_id)?;
    let Query(query) = query?;
    let now_ms = query.now_ms.unwrap_or_else(now_epoch_ms);
    let offset = query.tz_offset_minutes;
    let status = run_blocking(&state, move |service| {
        Ok(service.today_status(id, now_ms, offset)?)
    })
    .await?;
    Ok(Json(TodayView::new(id, now_ms, offset, status)))
}

pub(crate) async fn stats(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<DayQuery>, QueryRejection>,
) -> ApiResult<Json<HabitStatsView>> {
    let id = habit_id(&raw_id)?;
    let Query(query) = query?;
    let now_ms = query.now_ms.unwrap_or_else(now_epoch_ms);
    let offset = query.tz_offset_minutes;
    let stats = run_blocking(&state, move |service| {
        Ok(service.habit_stats(id, now_ms, offset)?)
    })
    .await?;
    Ok(Json(HabitStatsView::new(now_ms, offset, stats)))
}

pub(crate) async fn delete_proof(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Proof>> {
    let id = proof_id(&raw_id)?;
    let proof = run_blocking(&state, move |service| Ok(service.repo().delete_proof(id)?)).await?;
    Ok(Json(proof))
}
