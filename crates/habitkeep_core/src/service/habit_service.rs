//! Habit use-case service.
//!
//! # Responsibility
//! - Normalize raw form/request input (trimming, weekday labels) before it
//!   reaches the repository.
//! - Provide list, "today" and progress projections for client screens.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Projections are computed from one snapshot so they are self-consistent.

use crate::model::habit::{
    check_epoch_ms, check_tz_offset, Habit, HabitChanges, HabitConfig, ValidationError,
};
use crate::model::ids::HabitId;
use crate::model::proof::{Proof, ProofInput};
use crate::model::schedule::LocalDay;
use crate::repo::habit_repo::HabitRepository;
use crate::store::{EntityRef, Snapshot, StoreError, StoreResult};
use std::collections::BTreeSet;

const WEEKDAY_ALIASES: [(u8, &[&str]); 7] = [
    (0, &["mo", "mon", "monday", "montag"]),
    (1, &["di", "tue", "tues", "tuesday", "dienstag"]),
    (2, &["mi", "wed", "wednesday", "mittwoch"]),
    (3, &["do", "thu", "thur", "thurs", "thursday", "donnerstag"]),
    (4, &["fr", "fri", "friday", "freitag"]),
    (5, &["sa", "sat", "saturday", "samstag"]),
    (6, &["so", "sun", "sunday", "sonntag"]),
];

/// Raw habit input as entered in a form or request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitForm {
    pub name: String,
    pub description: Option<String>,
    /// Weekday labels (`"mon"`, `"Dienstag"`) or indexes (`"0"`..`"6"`).
    pub weekdays: Vec<String>,
    pub start_at: Option<i64>,
    pub duration_days: Option<u32>,
    pub allowed_fail_days: Option<u32>,
}

/// Raw partial edit of a habit. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitEdit {
    pub name: Option<String>,
    /// Blank text clears the description, like `Some(None)`.
    pub description: Option<Option<String>>,
    pub weekdays: Option<Vec<String>>,
    pub start_at: Option<i64>,
    pub duration_days: Option<Option<u32>>,
    pub allowed_fail_days: Option<Option<u32>>,
    pub archived: Option<bool>,
}

/// Completion state of a habit for one local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodayStatus {
    /// A proof exists for the day.
    Done,
    /// Due, but no proof yet.
    Open,
    /// Archived, outside the habit window, or not a due weekday.
    NotDue,
}

impl TodayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Open => "open",
            Self::NotDue => "not_due",
        }
    }
}

/// Habit plus proof aggregates for list screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitOverview {
    pub habit: Habit,
    pub proof_count: usize,
    /// Timestamp of the most recent proof.
    pub last_proof_at: Option<i64>,
}

/// Progress of one habit over its window, as of one local day.
///
/// Derived on demand from the habit and its proofs; nothing here is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitStats {
    pub habit_id: HabitId,
    /// Due days from the first day of the window up to and including today.
    pub due_days: u32,
    /// Due days with at least one proof.
    pub done_days: u32,
    /// Past due days without a proof. Today is never counted as missed.
    pub missed_days: u32,
    /// Consecutive done due days ending at the latest evaluated due day.
    /// An open today does not break the streak.
    pub current_streak: u32,
    pub longest_streak: u32,
    pub allowed_fail_days: Option<u32>,
    /// `missed_days` exceeds `allowed_fail_days`.
    pub failed: bool,
    /// Today lies after the last day of a bounded window.
    pub finished: bool,
    pub today: TodayStatus,
}

/// List row with aggregates and progress, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitReport {
    pub overview: HabitOverview,
    pub stats: HabitStats,
}

/// Use-case service wrapper over a habit repository.
pub struct HabitService<R: HabitRepository> {
    repo: R,
}

impl<R: HabitRepository> HabitService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates a habit from raw form input.
    ///
    /// # Contract
    /// - Blank description becomes `None`.
    /// - Unknown weekday labels fail with `ValidationError::UnknownWeekday`.
    pub fn create_habit_from_form(&self, form: &HabitForm) -> StoreResult<Habit> {
        let config = HabitConfig {
            description: non_blank(form.description.as_deref()),
            due_weekdays: normalize_weekdays(&form.weekdays)?,
            start_at: form.start_at,
            duration_days: form.duration_days,
            allowed_fail_days: form.allowed_fail_days,
        };
        self.repo.create_habit(form.name.as_str(), config)
    }

    /// Applies a raw partial edit, normalizing it like
    /// [`Self::create_habit_from_form`].
    pub fn edit_habit(&self, habit_id: HabitId, edit: &HabitEdit) -> StoreResult<Habit> {
        let due_weekdays = match &edit.weekdays {
            Some(labels) => Some(normalize_weekdays(labels)?),
            None => None,
        };
        let changes = HabitChanges {
            name: edit.name.clone(),
            description: edit
                .description
                .as_ref()
                .map(|text| non_blank(text.as_deref())),
            due_weekdays,
            start_at: edit.start_at,
            duration_days: edit.duration_days,
            allowed_fail_days: edit.allowed_fail_days,
            archived: edit.archived,
        };
        self.repo.update_habit(habit_id, changes)
    }

    /// Records a completion proof; blank note/evidence become `None`.
    pub fn confirm_habit(
        &self,
        habit_id: HabitId,
        note: Option<&str>,
        evidence: Option<&str>,
        timestamp: Option<i64>,
    ) -> StoreResult<Proof> {
        let input = ProofInput {
            note: non_blank(note),
            evidence: non_blank(evidence),
            timestamp,
        };
        self.repo.add_proof(habit_id, input)
    }

    /// Resolves whether `habit_id` is done, open or not due on the local day
    /// containing `now_ms`.
    ///
    /// # Errors
    /// - `Validation` when `now_ms` or `tz_offset_minutes` is out of range.
    pub fn today_status(
        &self,
        habit_id: HabitId,
        now_ms: i64,
        tz_offset_minutes: i32,
    ) -> StoreResult<TodayStatus> {
        let today = resolve_day(now_ms, tz_offset_minutes)?;
        let snapshot = self.repo.snapshot();
        let habit = find_habit(&snapshot, habit_id)?;
        let done = snapshot
            .proofs_for(habit_id)
            .any(|proof| today.contains(proof.timestamp));
        Ok(status_on(habit, today, tz_offset_minutes, done))
    }

    /// Computes done/missed days, streaks and the fail limit for one habit
    /// as of the local day containing `now_ms`.
    ///
    /// Archived habits keep their history; only `today` reports `NotDue`.
    pub fn habit_stats(
        &self,
        habit_id: HabitId,
        now_ms: i64,
        tz_offset_minutes: i32,
    ) -> StoreResult<HabitStats> {
        let today = resolve_day(now_ms, tz_offset_minutes)?;
        let snapshot = self.repo.snapshot();
        let habit = find_habit(&snapshot, habit_id)?;
        Ok(compute_stats(
            habit,
            snapshot.proofs_for(habit_id),
            today,
            tz_offset_minutes,
        ))
    }

    /// Lists habits with proof aggregates, ordered by habit id.
    pub fn habit_overview(&self, include_archived: bool) -> StoreResult<Vec<HabitOverview>> {
        let snapshot = self.repo.snapshot();
        Ok(snapshot
            .habits()
            .filter(|habit| include_archived || !habit.archived)
            .map(|habit| overview_of(&snapshot, habit))
            .collect())
    }

    /// Like [`Self::habit_overview`], with progress for each habit.
    pub fn habit_report(
        &self,
        include_archived: bool,
        now_ms: i64,
        tz_offset_minutes: i32,
    ) -> StoreResult<Vec<HabitReport>> {
        let today = resolve_day(now_ms, tz_offset_minutes)?;
        let snapshot = self.repo.snapshot();
        Ok(snapshot
            .habits()
            .filter(|habit| include_archived || !habit.archived)
            .map(|habit| HabitReport {
                overview: overview_of(&snapshot, habit),
                stats: compute_stats(
                    habit,
                    snapshot.proofs_for(habit.id),
                    today,
                    tz_offset_minutes,
                ),
            })
            .collect())
    }
}

fn resolve_day(now_ms: i64, tz_offset_minutes: i32) -> Result<LocalDay, ValidationError> {
    check_epoch_ms("now_ms", now_ms)?;
    check_tz_offset(tz_offset_minutes)?;
    Ok(LocalDay::from_epoch_ms(now_ms, tz_offset_minutes))
}

fn find_habit(snapshot: &Snapshot, habit_id: HabitId) -> StoreResult<&Habit> {
    snapshot
        .habit(habit_id)
        .ok_or(StoreError::NotFound(EntityRef::Habit(habit_id)))
}

fn status_on(habit: &Habit, day: LocalDay, tz_offset_minutes: i32, done: bool) -> TodayStatus {
    if !habit.is_due_on(day, tz_offset_minutes) {
        TodayStatus::NotDue
    } else if done {
        TodayStatus::Done
    } else {
        TodayStatus::Open
    }
}

fn overview_of(snapshot: &Snapshot, habit: &Habit) -> HabitOverview {
    // Proofs are ordered by timestamp, so the last one seen is the latest.
    let mut proof_count = 0;
    let mut last_proof_at = None;
    for proof in snapshot.proofs_for(habit.id) {
        proof_count += 1;
        last_proof_at = Some(proof.timestamp);
    }
    HabitOverview {
        habit: habit.clone(),
        proof_count,
        last_proof_at,
    }
}

fn compute_stats<'a>(
    habit: &Habit,
    proofs: impl Iterator<Item = &'a Proof>,
    today: LocalDay,
    tz_offset_minutes: i32,
) -> HabitStats {
    let proof_days: BTreeSet<i64> = proofs
        .map(|proof| LocalDay::from_epoch_ms(proof.timestamp, tz_offset_minutes).index())
        .collect();
    let last_day = habit.last_day(tz_offset_minutes);
    let until = last_day.map_or(today, |last| last.min(today));

    let mut stats = HabitStats {
        habit_id: habit.id,
        due_days: 0,
        done_days: 0,
        missed_days: 0,
        current_streak: 0,
        longest_streak: 0,
        allowed_fail_days: habit.allowed_fail_days,
        failed: false,
        finished: last_day.is_some_and(|last| today > last),
        today: status_on(
            habit,
            today,
            tz_offset_minutes,
            proof_days.contains(&today.index()),
        ),
    };

    let mut day = habit.first_day(tz_offset_minutes);
    while day <= until {
        if habit.is_scheduled_on(day, tz_offset_minutes) {
            stats.due_days += 1;
            if proof_days.contains(&day.index()) {
                stats.done_days += 1;
                stats.current_streak += 1;
                stats.longest_streak = stats.longest_streak.max(stats.current_streak);
            } else if day < today {
                stats.missed_days += 1;
                stats.current_streak = 0;
            }
        }
        day = day.plus_days(1);
    }

    stats.failed = habit
        .allowed_fail_days
        .is_some_and(|allowed| stats.missed_days > allowed);
    stats
}

/// Parses weekday labels/indexes into sorted, deduplicated indexes
/// (Monday = 0).
///
/// Accepts indexes `0..=6`, `7` as a second spelling of Sunday (ISO
/// numbering), English and German names, and their common abbreviations,
/// case-insensitively.
pub fn normalize_weekdays(labels: &[String]) -> Result<Vec<u8>, ValidationError> {
    let mut days = Vec::with_capacity(labels.len());
    for label in labels {
        days.push(parse_weekday(label)?);
    }
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

fn parse_weekday(label: &str) -> Result<u8, ValidationError> {
    let normalized = label.trim().to_lowercase();
    if let Ok(index) = normalized.parse::<u8>() {
        return match index {
            0..=6 => Ok(index),
            7 => Ok(6),
            _ => Err(ValidationError::WeekdayOutOfRange(index)),
        };
    }
    WEEKDAY_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(index, _)| *index)
        .ok_or_else(|| ValidationError::UnknownWeekday(label.trim().to_string()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
