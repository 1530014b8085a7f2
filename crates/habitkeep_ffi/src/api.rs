//! FFI use-case API for the admin GUI.
//!
//! # Responsibility
//! - Expose habit/proof administration to Dart via FRB.
//! - Translate form input into repository calls and results into envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back as `ok=false` envelopes; form state stays with the
//!   caller.
//! - One store per configured path, opened lazily from
//!   `StoreConfig::from_env`; a changed path opens a fresh store.

use habitkeep_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, now_epoch_ms,
    ping as ping_inner, HabitEdit, HabitForm, HabitId, HabitReport, HabitRepository,
    HabitService, Proof, ProofId, StateStore, StoreConfig, StoreError, StoreHabitRepository,
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

type AdminService = HabitService<StoreHabitRepository>;

struct CachedService {
    data_path: PathBuf,
    service: Arc<AdminService>,
}

static ADMIN_SERVICE: Mutex<Option<CachedService>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Habit row shown in the admin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminHabitItem {
    pub habit_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Monday = 0 .. Sunday = 6; empty means every day.
    pub due_weekdays: Vec<u8>,
    pub created_at: i64,
    pub start_at: i64,
    pub duration_days: Option<u32>,
    pub allowed_fail_days: Option<u32>,
    pub archived: bool,
    pub proof_count: u32,
    pub last_proof_at: Option<i64>,
    /// Past due days without a proof.
    pub missed_days: u32,
    pub current_streak: u32,
    /// Missed days exceed `allowed_fail_days`.
    pub failed: bool,
    /// The bounded habit window is over.
    pub finished: bool,
    /// `done|open|not_due` for the caller's local day.
    pub today_status: String,
}

/// Proof row shown in the admin detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminProofItem {
    pub proof_id: String,
    pub habit_id: String,
    pub timestamp: i64,
    pub note: Option<String>,
    pub evidence: Option<String>,
}

/// Habit list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminHabitListResponse {
    pub ok: bool,
    pub items: Vec<AdminHabitItem>,
    pub message: String,
}

/// Proof list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminProofListResponse {
    pub ok: bool,
    pub items: Vec<AdminProofItem>,
    pub message: String,
}

/// Generic action response envelope for admin form submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected habit ID, when the action targets a habit.
    pub habit_id: Option<String>,
    /// Created or deleted proof ID.
    pub proof_id: Option<String>,
    /// Stable error code (`validation_failed|not_found|...`) on failure.
    pub error_code: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl AdminActionResponse {
    fn habit(message: impl Into<String>, habit_id: HabitId) -> Self {
        Self {
            ok: true,
            habit_id: Some(habit_id.to_string()),
            proof_id: None,
            error_code: None,
            message: message.into(),
        }
    }

    fn proof(message: impl Into<String>, proof: &Proof) -> Self {
        Self {
            ok: true,
            habit_id: Some(proof.habit_id.to_string()),
            proof_id: Some(proof.id.to_string()),
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(op: &str, err: &AdminError) -> Self {
        Self {
            ok: false,
            habit_id: None,
            proof_id: None,
            error_code: Some(err.code().to_string()),
            message: format!("{op} failed: {err}"),
        }
    }
}

/// Habit form fields as submitted by the admin GUI.
///
/// Weekday labels accept indexes (`"0"`..`"6"`, `"7"` for Sunday) and
/// English/German names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminHabitInput {
    pub name: String,
    pub description: Option<String>,
    pub weekdays: Vec<String>,
    pub start_at: Option<i64>,
    pub duration_days: Option<u32>,
    pub allowed_fail_days: Option<u32>,
}

/// Partial habit edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminHabitUpdate {
    pub name: Option<String>,
    /// Blank text clears the description.
    pub description: Option<String>,
    pub weekdays: Option<Vec<String>>,
    pub start_at: Option<i64>,
    pub duration_days: Option<u32>,
    pub allowed_fail_days: Option<u32>,
    /// Removes both the duration and the allowed fail days.
    pub clear_limits: bool,
    pub archived: Option<bool>,
}

/// Creates a habit from the admin form.
///
/// # FFI contract
/// - Sync call, writes the state document before returning.
/// - Never panics.
/// - Returns the created habit ID on success.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_create_habit(input: AdminHabitInput) -> AdminActionResponse {
    let form = HabitForm {
        name: input.name,
        description: input.description,
        weekdays: input.weekdays,
        start_at: input.start_at,
        duration_days: input.duration_days,
        allowed_fail_days: input.allowed_fail_days,
    };
    match with_service(|service| Ok(service.create_habit_from_form(&form)?)) {
        Ok(habit) => AdminActionResponse::habit("Habit created.", habit.id),
        Err(err) => AdminActionResponse::failure("admin_create_habit", &err),
    }
}

/// Applies a partial edit to an existing habit.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_update_habit(habit_id: String, update: AdminHabitUpdate) -> AdminActionResponse {
    let result = with_service(|service| {
        let id = parse_habit_id(&habit_id)?;
        Ok(service.edit_habit(id, &to_edit(update))?)
    });
    match result {
        Ok(habit) => AdminActionResponse::habit("Habit updated.", habit.id),
        Err(err) => AdminActionResponse::failure("admin_update_habit", &err),
    }
}

/// Deletes a habit and every proof recorded for it.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_delete_habit(habit_id: String) -> AdminActionResponse {
    let result = with_service(|service| {
        let id = parse_habit_id(&habit_id)?;
        Ok(service.repo().delete_habit(id)?)
    });
    match result {
        Ok(deletion) => AdminActionResponse::habit(
            format!(
                "Habit deleted with {} proof(s).",
                deletion.proofs_removed
            ),
            deletion.habit.id,
        ),
        Err(err) => AdminActionResponse::failure("admin_delete_habit", &err),
    }
}

/// Records a proof for a habit.
///
/// # FFI contract
/// - `timestamp`: epoch ms; `None` stamps the current time.
/// - Blank `note` / `evidence` are stored as absent.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_add_proof(
    habit_id: String,
    note: Option<String>,
    evidence: Option<String>,
    timestamp: Option<i64>,
) -> AdminActionResponse {
    let result = with_service(|service| {
        let id = parse_habit_id(&habit_id)?;
        Ok(service.confirm_habit(id, note.as_deref(), evidence.as_deref(), timestamp)?)
    });
    match result {
        Ok(proof) => AdminActionResponse::proof("Proof added.", &proof),
        Err(err) => AdminActionResponse::failure("admin_add_proof", &err),
    }
}

/// Deletes a single proof.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_delete_proof(proof_id: String) -> AdminActionResponse {
    let result = with_service(|service| {
        let id = proof_id
            .trim()
            .parse::<ProofId>()
            .map_err(|err| AdminError::Store(StoreError::Validation(err.into())))?;
        Ok(service.repo().delete_proof(id)?)
    });
    match result {
        Ok(proof) => AdminActionResponse::proof("Proof deleted.", &proof),
        Err(err) => AdminActionResponse::failure("admin_delete_proof", &err),
    }
}

/// Lists habits with proof aggregates, ordered by habit ID.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_list_habits(include_archived: bool, tz_offset_minutes: i32) -> AdminHabitListResponse {
    let result = with_service(|service| {
        Ok(service.habit_report(include_archived, now_epoch_ms(), tz_offset_minutes)?)
    });
    match result {
        Ok(report) => {
            let items = report.into_iter().map(to_habit_item).collect::<Vec<_>>();
            AdminHabitListResponse {
                message: format!("Found {} habit(s).", items.len()),
                ok: true,
                items,
            }
        }
        Err(err) => AdminHabitListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("admin_list_habits failed: {err}"),
        },
    }
}

/// Lists one habit's proofs, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn admin_list_proofs(habit_id: String) -> AdminProofListResponse {
    let result = with_service(|service| {
        let id = parse_habit_id(&habit_id)?;
        let cursor = service.repo().list_proofs(id)?;
        Ok(cursor.iter().map(to_proof_item).collect::<Vec<_>>())
    });
    match result {
        Ok(items) => AdminProofListResponse {
            message: if items.is_empty() {
                "No proofs.".to_string()
            } else {
                format!("Found {} proof(s).", items.len())
            },
            ok: true,
            items,
        },
        Err(err) => AdminProofListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("admin_list_proofs failed: {err}"),
        },
    }
}

#[derive(Debug)]
enum AdminError {
    Open(StoreError),
    Store(StoreError),
}

impl AdminError {
    fn code(&self) -> &'static str {
        match self {
            Self::Open(err) | Self::Store(err) => err.code(),
        }
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "state store open failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl From<StoreError> for AdminError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

fn with_service<T>(f: impl FnOnce(&AdminService) -> Result<T, AdminError>) -> Result<T, AdminError> {
    let service = admin_service()?;
    f(&service)
}

/// Returns the service for the configured path, opening the store on
/// first use.
fn admin_service() -> Result<Arc<AdminService>, AdminError> {
    service_for(&ADMIN_SERVICE, &StoreConfig::from_env())
}

/// Reuses the cached service while `config.data_path` is unchanged.
///
/// A failed open is not cached; the next call retries.
fn service_for(
    slot: &Mutex<Option<CachedService>>,
    config: &StoreConfig,
) -> Result<Arc<AdminService>, AdminError> {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(cached) = slot
        .as_ref()
        .filter(|cached| cached.data_path == config.data_path)
    {
        return Ok(Arc::clone(&cached.service));
    }

    let store = StateStore::open_file(config).map_err(|err| {
        warn!(
            "event=admin_store_open module=ffi status=error error_code={}",
            err.code()
        );
        AdminError::Open(err)
    })?;
    info!(
        "event=admin_store_open module=ffi status=ok replaced={}",
        slot.is_some()
    );
    let service = Arc::new(HabitService::new(StoreHabitRepository::new(Arc::new(store))));
    *slot = Some(CachedService {
        data_path: config.data_path.clone(),
        service: Arc::clone(&service),
    });
    Ok(service)
}

fn parse_habit_id(raw: &str) -> Result<HabitId, AdminError> {
    raw.trim()
        .parse::<HabitId>()
        .map_err(|err| AdminError::Store(StoreError::Validation(err.into())))
}

fn to_edit(update: AdminHabitUpdate) -> HabitEdit {
    let (duration_days, allowed_fail_days) = if update.clear_limits {
        (Some(None), Some(None))
    } else {
        (
            update.duration_days.map(Some),
            update.allowed_fail_days.map(Some),
        )
    };

    HabitEdit {
        name: update.name,
        description: update.description.map(Some),
        weekdays: update.weekdays,
        start_at: update.start_at,
        duration_days,
        allowed_fail_days,
        archived: update.archived,
    }
}

fn to_habit_item(report: HabitReport) -> AdminHabitItem {
    let HabitReport { overview, stats } = report;
    let habit = overview.habit;
    AdminHabitItem {
        habit_id: habit.id.to_string(),
        name: habit.name,
        description: habit.description,
        due_weekdays: habit.due_weekdays,
        created_at: habit.created_at,
        start_at: habit.start_at,
        duration_days: habit.duration_days,
        allowed_fail_days: habit.allowed_fail_days,
        archived: habit.archived,
        proof_count: u32::try_from(overview.proof_count).unwrap_or(u32::MAX),
        last_proof_at: overview.last_proof_at,
        missed_days: stats.missed_days,
        current_streak: stats.current_streak,
        failed: stats.failed,
        finished: stats.finished,
        today_status: stats.today.as_str().to_string(),
    }
}

fn to_proof_item(proof: &Proof) -> AdminProofItem {
    AdminProofItem {
        proof_id: proof.id.to_string(),
        habit_id: proof.habit_id.to_string(),
        timestamp: proof.timestamp,
        note: proof.note.clone(),
        evidence: proof.evidence.clone(),
    }
}
