//! Local calendar-day arithmetic on epoch milliseconds.
//!
//! Days are counted from 1970-01-01 in the caller's fixed UTC offset.

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// 1970-01-01T00:00:00Z.
pub const MIN_EPOCH_MS: i64 = 0;
/// 9999-12-31T23:59:59.999Z.
pub const MAX_EPOCH_MS: i64 = 253_402_300_799_999;
/// Widest real-world UTC offset (UTC+14:00 / UTC-12:00 rounded up).
pub const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

/// One calendar day in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDay {
    index: i64,
    offset_ms: i64,
}

impl LocalDay {
    /// Resolves the local day containing `epoch_ms` at `tz_offset_minutes`
    /// east of UTC.
    ///
    /// Inputs outside `MIN_EPOCH_MS..=MAX_EPOCH_MS` and
    /// `MAX_TZ_OFFSET_MINUTES` are clamped by saturation; callers validate
    /// them first.
    pub fn from_epoch_ms(epoch_ms: i64, tz_offset_minutes: i32) -> Self {
        let offset_ms = i64::from(tz_offset_minutes) * 60 * 1000;
        Self {
            index: epoch_ms.saturating_add(offset_ms).div_euclid(DAY_MS),
            offset_ms,
        }
    }

    /// The local day `days` after this one (before, when negative).
    pub fn plus_days(self, days: i64) -> Self {
        Self {
            index: self.index.saturating_add(days),
            offset_ms: self.offset_ms,
        }
    }

    /// Days since 1970-01-01 (local).
    pub fn index(self) -> i64 {
        self.index
    }

    /// Monday = 0 .. Sunday = 6.
    pub fn weekday(self) -> u8 {
        // 1970-01-01 was a Thursday.
        (self.index + 3).rem_euclid(7) as u8
    }

    /// UTC epoch-ms window `[start, end)` covering this local day.
    pub fn window_ms(self) -> (i64, i64) {
        let start = self
            .index
            .saturating_mul(DAY_MS)
            .saturating_sub(self.offset_ms);
        (start, start.saturating_add(DAY_MS))
    }

    pub fn contains(self, epoch_ms: i64) -> bool {
        let (start, end) = self.window_ms();
        (start..end).contains(&epoch_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalDay, DAY_MS, MAX_EPOCH_MS};

    const MONDAY_MS: i64 = 1_704_067_200_000;

    #[test]
    fn weekday_of_known_dates() {
        assert_eq!(LocalDay::from_epoch_ms(0, 0).weekday(), 3);
        assert_eq!(LocalDay::from_epoch_ms(MONDAY_MS, 0).weekday(), 0);
        assert_eq!(LocalDay::from_epoch_ms(MONDAY_MS + 6 * DAY_MS, 0).weekday(), 6);
        assert_eq!(LocalDay::from_epoch_ms(-1, 0).weekday(), 2);
    }

    #[test]
    fn offset_shifts_day_boundaries() {
        // 23:30 UTC Sunday is already Monday at UTC+01:00.
        let late_sunday = MONDAY_MS - 30 * 60 * 1000;
        assert_eq!(LocalDay::from_epoch_ms(late_sunday, 0).weekday(), 6);
        let shifted = LocalDay::from_epoch_ms(late_sunday, 60);
        assert_eq!(shifted.weekday(), 0);

        let (start, end) = shifted.window_ms();
        assert_eq!(start, MONDAY_MS - 60 * 60 * 1000);
        assert_eq!(end - start, DAY_MS);
        assert!(shifted.contains(late_sunday));
        assert!(!shifted.contains(end));
    }

    #[test]
    fn extreme_inputs_saturate_instead_of_overflowing() {
        let day = LocalDay::from_epoch_ms(i64::MAX, 60);
        assert_eq!(day.index(), i64::MAX.div_euclid(DAY_MS));
        let (start, end) = day.window_ms();
        assert!(start <= end);
        assert_eq!(day.plus_days(i64::MAX).index(), i64::MAX);
    }

    #[test]
    fn plus_days_keeps_offset_and_moves_weekday() {
        let monday = LocalDay::from_epoch_ms(MONDAY_MS, 120);
        let wednesday = monday.plus_days(2);
        assert_eq!(wednesday.weekday(), 2);
        assert_eq!(wednesday.window_ms().0 - monday.window_ms().0, 2 * DAY_MS);
        assert_eq!(monday.plus_days(-1).weekday(), 6);
    }

    #[test]
    fn last_supported_instant_is_a_friday() {
        // 9999-12-31 was a Friday.
        assert_eq!(LocalDay::from_epoch_ms(MAX_EPOCH_MS, 0).weekday(), 4);
    }
}
