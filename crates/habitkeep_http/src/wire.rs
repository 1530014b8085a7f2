//! Request and response bodies.
//!
//! Entities serialize with the same snake_case field names as the state
//! document. Request bodies reject unknown fields.

use habitkeep_core::{
    Habit, HabitEdit, HabitForm, HabitId, HabitOverview, HabitStats, TodayStatus,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Weekday given either as an index or as a label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WeekdayInput {
    Index(u8),
    Label(String),
}

impl WeekdayInput {
    fn into_label(self) -> String {
        match self {
            Self::Index(index) => index.to_string(),
            Self::Label(label) => label,
        }
    }
}

fn into_labels(days: Vec<WeekdayInput>) -> Vec<String> {
    days.into_iter().map(WeekdayInput::into_label).collect()
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateHabitBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weekdays: Vec<WeekdayInput>,
    #[serde(default)]
    pub start_at: Option<i64>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    #[serde(default)]
    pub allowed_fail_days: Option<u32>,
}

impl From<CreateHabitBody> for HabitForm {
    fn from(body: CreateHabitBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            weekdays: into_labels(body.weekdays),
            start_at: body.start_at,
            duration_days: body.duration_days,
            allowed_fail_days: body.allowed_fail_days,
        }
    }
}

/// Partial update; `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateHabitBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub weekdays: Option<Vec<WeekdayInput>>,
    #[serde(default)]
    pub start_at: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_days: Option<Option<u32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub allowed_fail_days: Option<Option<u32>>,
    #[serde(default)]
    pub archived: Option<bool>,
}

impl From<UpdateHabitBody> for HabitEdit {
    fn from(body: UpdateHabitBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            weekdays: body.weekdays.map(into_labels),
            start_at: body.start_at,
            duration_days: body.duration_days,
            allowed_fail_days: body.allowed_fail_days,
            archived: body.archived,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddProofBody {
    #[serde(default)]
    pub note: Option<String>,
    /// Path or URI of an externally stored artifact.
    #[serde(default)]
    pub evidence: Option<String>,
    /// Epoch ms; defaults to the time of the request.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListHabitsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Day the `today` and `stats` projections are evaluated for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayQuery {
    #[serde(default)]
    pub now_ms: Option<i64>,
    /// Minutes east of UTC.
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitListItem {
    #[serde(flatten)]
    pub habit: Habit,
    pub proof_count: usize,
    pub last_proof_at: Option<i64>,
}

impl From<HabitOverview> for HabitListItem {
    fn from(entry: HabitOverview) -> Self {
        Self {
            habit: entry.habit,
            proof_count: entry.proof_count,
            last_proof_at: entry.last_proof_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayView {
    pub habit_id: HabitId,
    pub now_ms: i64,
    pub tz_offset_minutes: i32,
    pub status: &'static str,
}

impl TodayView {
    pub fn new(habit_id: HabitId, now_ms: i64, tz_offset_minutes: i32, status: TodayStatus) -> Self {
        Self {
            habit_id,
            now_ms,
            tz_offset_minutes,
            status: status.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitStatsView {
    pub habit_id: HabitId,
    pub now_ms: i64,
    pub tz_offset_minutes: i32,
    pub due_days: u32,
    pub done_days: u32,
    pub missed_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub allowed_fail_days: Option<u32>,
    pub failed: bool,
    pub finished: bool,
    pub today: &'static str,
}

impl HabitStatsView {
    pub fn new(now_ms: i64, tz_offset_minutes: i32, stats: HabitStats) -> Self {
        Self {
            habit_id: stats.habit_id,
            now_ms,
            tz_offset_minutes,
            due_days: stats.due_days,
            done_days: stats.done_days,
            missed_days: stats.missed_days,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            allowed_fail_days: stats.allowed_fail_days,
            failed: stats.failed,
            finished: stats.finished,
            today: stats.today.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitDeletedView {
    pub deleted: HabitId,
    pub proofs_removed: usize,
}

#[cfg(test)]
mod tests {
    use super::{CreateHabitBody, HabitStatsView, UpdateHabitBody};
    use habitkeep_core::{HabitEdit, HabitForm, HabitId, HabitStats, TodayStatus};

    #[test]
    fn create_body_accepts_mixed_weekdays() {
        let body: CreateHabitBody =
            serde_json::from_str(r#"{"name":"Run","weekdays":[0,"wed","Freitag"]}"#).unwrap();
        let form = HabitForm::from(body);
        assert_eq!(form.weekdays, vec!["0", "wed", "Freitag"]);
        assert_eq!(form.duration_days, None);
    }

    #[test]
    fn create_body_rejects_unknown_fields() {
        let result = serde_json::from_str::<CreateHabitBody>(r#"{"name":"Run","colour":"red"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_body_separates_null_from_absent() {
        let body: UpdateHabitBody =
            serde_json::from_str(r#"{"description":null,"archived":true}"#).unwrap();
        let edit = HabitEdit::from(body);
        assert_eq!(edit.description, Some(None));
        assert_eq!(edit.duration_days, None);
        assert_eq!(edit.archived, Some(true));

        let body: UpdateHabitBody = serde_json::from_str(r#"{"duration_days":21}"#).unwrap();
        assert_eq!(body.duration_days, Some(Some(21)));
        assert_eq!(body.description, None);
    }

    #[test]
    fn stats_view_renders_status_as_text() {
        let stats = HabitStats {
            habit_id: HabitId::from_seq(2),
            due_days: 5,
            done_days: 3,
            missed_days: 1,
            current_streak: 2,
            longest_streak: 2,
            allowed_fail_days: Some(0),
            failed: true,
            finished: false,
            today: TodayStatus::Open,
        };
        let json = serde_json::to_value(HabitStatsView::new(42, -60, stats)).unwrap();
        assert_eq!(json["habit_id"], "h2");
        assert_eq!(json["tz_offset_minutes"], -60);
        assert_eq!(json["missed_days"], 1);
        assert_eq!(json["failed"], true);
        assert_eq!(json["today"], "open");
    }
}
