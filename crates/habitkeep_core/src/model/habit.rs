//! Habit domain model.
//!
//! # Responsibility
//! - Define the tracked recurring activity and its mutable schedule fields.
//! - Validate caller-supplied values before they reach the store.
//!
//! # Invariants
//! - `id` is stable and never reused for another habit.
//! - `name` is non-blank and at most `MAX_NAME_CHARS` characters.
//! - `due_weekdays` is sorted, deduplicated and within `0..=6`
//!   (Monday = 0). Empty means "every day".
//! - `duration_days`, when set, is greater than zero.
//! - `created_at` and `start_at` lie within `MIN_EPOCH_MS..=MAX_EPOCH_MS`.

use crate::model::ids::{HabitId, InvalidIdError};
use crate::model::schedule::{LocalDay, MAX_EPOCH_MS, MAX_TZ_OFFSET_MINUTES, MIN_EPOCH_MS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_NAME_CHARS: usize = 120;
pub const MAX_TEXT_CHARS: usize = 2000;

/// Validation failures for caller-supplied habit/proof data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty after trim.
    EmptyName,
    /// Name exceeds the character limit.
    NameTooLong { max: usize },
    /// Weekday index outside `0..=6`.
    WeekdayOutOfRange(u8),
    /// Weekday label could not be recognized.
    UnknownWeekday(String),
    /// `duration_days` was set to zero.
    ZeroDuration,
    /// Free text field exceeds the character limit.
    TextTooLong { field: &'static str, max: usize },
    /// Epoch-ms value outside the supported calendar range.
    TimestampOutOfRange { field: &'static str, value: i64 },
    /// UTC offset beyond +/- `MAX_TZ_OFFSET_MINUTES`.
    TzOffsetOutOfRange(i32),
    /// Identifier string could not be parsed.
    InvalidId(InvalidIdError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "habit name must not be blank"),
            Self::NameTooLong { max } => {
                write!(f, "habit name must be at most {max} characters")
            }
            Self::WeekdayOutOfRange(value) => {
                write!(f, "weekday {value} is out of range; expected 0..=6")
            }
            Self::UnknownWeekday(label) => write!(f, "unknown weekday `{label}`"),
            Self::ZeroDuration => write!(f, "duration_days must be greater than zero"),
            Self::TextTooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::TimestampOutOfRange { field, value } => write!(
                f,
                "{field} {value} is out of range; expected {MIN_EPOCH_MS}..={MAX_EPOCH_MS}"
            ),
            Self::TzOffsetOutOfRange(minutes) => write!(
                f,
                "tz offset {minutes} minutes is out of range; expected at most {MAX_TZ_OFFSET_MINUTES} either way"
            ),
            Self::InvalidId(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidId(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidIdError> for ValidationError {
    fn from(value: InvalidIdError) -> Self {
        Self::InvalidId(value)
    }
}

/// A tracked recurring activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// Monday = 0 .. Sunday = 6. Empty means due every day.
    #[serde(default)]
    pub due_weekdays: Vec<u8>,
    /// Unix epoch milliseconds; first day the habit counts.
    pub start_at: i64,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub allowed_fail_days: Option<u32>,
    #[serde(default)]
    pub archived: bool,
}

/// Optional settings accepted when creating a habit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitConfig {
    pub description: Option<String>,
    pub due_weekdays: Vec<u8>,
    /// Defaults to the creation time when `None`.
    pub start_at: Option<i64>,
    pub duration_days: Option<u32>,
    pub allowed_fail_days: Option<u32>,
}

/// Partial update for an existing habit. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub due_weekdays: Option<Vec<u8>>,
    pub start_at: Option<i64>,
    pub duration_days: Option<Option<u32>>,
    pub allowed_fail_days: Option<Option<u32>>,
    pub archived: Option<bool>,
}

impl HabitChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Habit {
    /// Builds a habit from creation input. Does not validate; the store
    /// calls [`Habit::validate`] before accepting it.
    pub fn new(id: HabitId, name: &str, config: HabitConfig, created_at: i64) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            created_at,
            description: config.description,
            due_weekdays: normalize_weekday_indexes(config.due_weekdays),
            start_at: config.start_at.unwrap_or(created_at),
            duration_days: config.duration_days,
            allowed_fail_days: config.allowed_fail_days,
            archived: false,
        }
    }

    /// Applies a partial update in place.
    pub fn apply_changes(&mut self, changes: HabitChanges) {
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(weekdays) = changes.due_weekdays {
            self.due_weekdays = normalize_weekday_indexes(weekdays);
        }
        if let Some(start_at) = changes.start_at {
            self.start_at = start_at;
        }
        if let Some(duration_days) = changes.duration_days {
            self.duration_days = duration_days;
        }
        if let Some(allowed_fail_days) = changes.allowed_fail_days {
            self.allowed_fail_days = allowed_fail_days;
        }
        if let Some(archived) = changes.archived {
            self.archived = archived;
        }
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong {
                max: MAX_NAME_CHARS,
            });
        }
        if let Some(day) = self.due_weekdays.iter().copied().find(|day| *day > 6) {
            return Err(ValidationError::WeekdayOutOfRange(day));
        }
        if self.duration_days == Some(0) {
            return Err(ValidationError::ZeroDuration);
        }
        check_text_len("description", self.description.as_deref())?;
        check_epoch_ms("created_at", self.created_at)?;
        check_epoch_ms("start_at", self.start_at)?;
        Ok(())
    }

    /// Returns whether the habit expects a proof on the given local day.
    ///
    /// Archived habits are never due. Days before `start_at` or at/after
    /// `start_at + duration_days` fall outside the habit window.
    pub fn is_due_on(&self, day: LocalDay, tz_offset_minutes: i32) -> bool {
        !self.archived && self.is_scheduled_on(day, tz_offset_minutes)
    }

    /// Local day of `start_at`.
    pub fn first_day(&self, tz_offset_minutes: i32) -> LocalDay {
        LocalDay::from_epoch_ms(self.start_at, tz_offset_minutes)
    }

    /// Last local day of the habit window, or `None` when open-ended.
    pub fn last_day(&self, tz_offset_minutes: i32) -> Option<LocalDay> {
        self.duration_days.map(|duration| {
            self.first_day(tz_offset_minutes)
                .plus_days(i64::from(duration) - 1)
        })
    }

    /// Like [`Habit::is_due_on`], but ignores the archive flag.
    pub fn is_scheduled_on(&self, day: LocalDay, tz_offset_minutes: i32) -> bool {
        let first_day = LocalDay::from_epoch_ms(self.start_at, tz_offset_minutes);
        if day < first_day {
            return false;
        }
        if let Some(duration) = self.duration_days {
            if day.index() >= first_day.index() + i64::from(duration) {
                return false;
            }
        }
        self.due_weekdays.is_empty() || self.due_weekdays.contains(&day.weekday())
    }
}

pub(crate) fn check_epoch_ms(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if (MIN_EPOCH_MS..=MAX_EPOCH_MS).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::TimestampOutOfRange { field, value })
    }
}

pub(crate) fn check_tz_offset(minutes: i32) -> Result<(), ValidationError> {
    if (-MAX_TZ_OFFSET_MINUTES..=MAX_TZ_OFFSET_MINUTES).contains(&minutes) {
        Ok(())
    } else {
        Err(ValidationError::TzOffsetOutOfRange(minutes))
    }
}

pub(crate) fn check_text_len(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > MAX_TEXT_CHARS => Err(ValidationError::TextTooLong {
            field,
            max: MAX_TEXT_CHARS,
        }),
        _ => Ok(()),
    }
}

fn normalize_weekday_indexes(mut weekdays: Vec<u8>) -> Vec<u8> {
    weekdays.sort_unstable();
    weekdays.dedup();
    weekdays
}

#[cfg(test)]
mod tests {
    use super::{check_tz_offset, Habit, HabitChanges, HabitConfig, ValidationError, MAX_NAME_CHARS};
    use crate::model::ids::HabitId;
    use crate::model::schedule::{LocalDay, DAY_MS};

    // 2024-01-01 00:00:00 UTC, a Monday.
    const MONDAY_MS: i64 = 1_704_067_200_000;

    fn habit(config: HabitConfig) -> Habit {
        Habit::new(HabitId::from_seq(1), "  Run  ", config, MONDAY_MS)
    }

    #[test]
    fn new_trims_name_and_normalizes_weekdays() {
        let created = habit(HabitConfig {
            due_weekdays: vec![4, 0, 4, 2],
            ..HabitConfig::default()
        });
        assert_eq!(created.name, "Run");
        assert_eq!(created.due_weekdays, vec![0, 2, 4]);
        assert_eq!(created.start_at, MONDAY_MS);
        assert!(created.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let mut blank = habit(HabitConfig::default());
        blank.name = "   ".to_string();
        assert_eq!(blank.validate(), Err(ValidationError::EmptyName));

        let mut long = habit(HabitConfig::default());
        long.name = "x".repeat(MAX_NAME_CHARS + 1);
        assert!(matches!(
            long.validate(),
            Err(ValidationError::NameTooLong { .. })
        ));

        let weekday = habit(HabitConfig {
            due_weekdays: vec![7],
            ..HabitConfig::default()
        });
        assert_eq!(
            weekday.validate(),
            Err(ValidationError::WeekdayOutOfRange(7))
        );

        let zero = habit(HabitConfig {
            duration_days: Some(0),
            ..HabitConfig::default()
        });
        assert_eq!(zero.validate(), Err(ValidationError::ZeroDuration));

        let far_future = habit(HabitConfig {
            start_at: Some(i64::MAX),
            ..HabitConfig::default()
        });
        assert_eq!(
            far_future.validate(),
            Err(ValidationError::TimestampOutOfRange {
                field: "start_at",
                value: i64::MAX
            })
        );
    }

    #[test]
    fn tz_offsets_beyond_fourteen_hours_are_rejected() {
        assert!(check_tz_offset(14 * 60).is_ok());
        assert!(check_tz_offset(-14 * 60).is_ok());
        assert_eq!(
            check_tz_offset(14 * 60 + 1),
            Err(ValidationError::TzOffsetOutOfRange(841))
        );
        assert_eq!(
            check_tz_offset(i32::MIN),
            Err(ValidationError::TzOffsetOutOfRange(i32::MIN))
        );
    }

    #[test]
    fn window_bounds_follow_duration() {
        let bounded = habit(HabitConfig {
            duration_days: Some(3),
            ..HabitConfig::default()
        });
        let first = bounded.first_day(0);
        assert_eq!(first, LocalDay::from_epoch_ms(MONDAY_MS, 0));
        assert_eq!(bounded.last_day(0), Some(first.plus_days(2)));
        assert_eq!(habit(HabitConfig::default()).last_day(0), None);
    }

    #[test]
    fn apply_changes_touches_only_given_fields() {
        let mut target = habit(HabitConfig {
            description: Some("morning".to_string()),
            ..HabitConfig::default()
        });
        target.apply_changes(HabitChanges {
            archived: Some(true),
            description: Some(None),
            ..HabitChanges::default()
        });
        assert!(target.archived);
        assert_eq!(target.description, None);
        assert_eq!(target.name, "Run");
    }

    #[test]
    fn due_days_follow_weekdays_and_window() {
        let target = habit(HabitConfig {
            due_weekdays: vec![0, 2],
            duration_days: Some(7),
            ..HabitConfig::default()
        });
        let monday = LocalDay::from_epoch_ms(MONDAY_MS, 0);
        let tuesday = LocalDay::from_epoch_ms(MONDAY_MS + DAY_MS, 0);
        let wednesday = LocalDay::from_epoch_ms(MONDAY_MS + 2 * DAY_MS, 0);
        let next_monday = LocalDay::from_epoch_ms(MONDAY_MS + 7 * DAY_MS, 0);
        let before = LocalDay::from_epoch_ms(MONDAY_MS - 5 * DAY_MS, 0);

        assert!(target.is_due_on(monday, 0));
        assert!(!target.is_due_on(tuesday, 0));
        assert!(target.is_due_on(wednesday, 0));
        assert!(!target.is_due_on(next_monday, 0));
        assert!(!target.is_due_on(before, 0));
    }
}
