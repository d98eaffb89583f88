//! crates/mood_journal_core/src/calendar.rs
//!
//! Month grid for the calendar view and the date helpers the list view shares.
//!
//! Entries are bucketed by their *local* calendar day, using the offset the
//! service is configured with, never by their UTC date.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};

use crate::domain::Entry;

/// The calendar draws at most this many overflow dots under a day.
pub const MAX_OVERFLOW_DOTS: usize = 3;

/// A month being displayed. Navigation is unbounded in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    year: i32,
    month: u32,
}

impl MonthCursor {
    /// `month` is 1-based. Returns `None` for an invalid month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.next();
        match (self.first_day(), next.first_day()) {
            (Some(first), Some(following)) => (following - first).num_days() as u32,
            _ => 0,
        }
    }
}

/// One day of the grid with the entries written on it, earliest first.
#[derive(Debug, Clone)]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_today: bool,
    pub entries: Vec<Entry>,
}

impl DayCell {
    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// The entry whose glyph represents the day: the earliest one written.
    pub fn first(&self) -> Option<&Entry> {
        self.entries.first()
    }

    /// How many entries beyond the first exist for the day.
    pub fn overflow(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn overflow_dots(&self) -> usize {
        self.overflow().min(MAX_OVERFLOW_DOTS)
    }
}

/// A Sunday-first grid of weeks; `None` pads days outside the month.
#[derive(Debug, Clone)]
pub struct CalendarMonth {
    pub cursor: MonthCursor,
    pub weeks: Vec<[Option<DayCell>; 7]>,
}

impl CalendarMonth {
    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flat_map(|week| week.iter().flatten())
    }

    pub fn day(&self, day: u32) -> Option<&DayCell> {
        self.days().find(|cell| cell.day() == day)
    }
}

/// The local calendar day an instant falls on.
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Entries written on `date` (local), earliest first. `entries` is in store
/// order (newest first); entries sharing a timestamp keep insertion order.
pub fn entries_on(entries: &[Entry], date: NaiveDate, offset: FixedOffset) -> Vec<Entry> {
    let mut on_day: Vec<Entry> = entries
        .iter()
        .rev()
        .filter(|entry| local_day(entry.created_at, offset) == date)
        .cloned()
        .collect();
    on_day.sort_by_key(|entry| entry.created_at);
    on_day
}

/// Builds the grid for `cursor`, placing each entry on its local day.
pub fn build_month(
    cursor: MonthCursor,
    entries: &[Entry],
    offset: FixedOffset,
    today: NaiveDate,
) -> CalendarMonth {
    let mut weeks = Vec::new();
    let Some(first) = cursor.first_day() else {
        return CalendarMonth { cursor, weeks };
    };

    let mut week: [Option<DayCell>; 7] = Default::default();
    let mut slot = first.weekday().num_days_from_sunday() as usize;

    for date in first.iter_days().take(cursor.days_in_month() as usize) {
        week[slot] = Some(DayCell {
            date,
            is_today: date == today,
            entries: entries_on(entries, date, offset),
        });
        slot += 1;
        if slot == 7 {
            weeks.push(std::mem::take(&mut week));
            slot = 0;
        }
    }
    if slot > 0 {
        weeks.push(week);
    }

    CalendarMonth { cursor, weeks }
}

/// `2025年1月5日 09:03`, in the given offset.
pub fn format_entry_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    format!(
        "{}年{}月{}日 {:02}:{:02}",
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DefaultEmotion, EmotionKey, Glyph};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn tokyo() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn entry(emotion: DefaultEmotion, at: DateTime<Utc>) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            emotion: EmotionKey::Default(emotion),
            custom_emotion_id: None,
            custom_emotion: None,
            note: None,
            weather: "晴れ".to_string(),
            created_at: at,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn navigation_wraps_years_in_both_directions() {
        let jan = MonthCursor::new(2025, 1).unwrap();
        assert_eq!(jan.prev(), MonthCursor::new(2024, 12).unwrap());
        assert_eq!(jan.prev().next(), jan);
        let dec = MonthCursor::new(2025, 12).unwrap();
        assert_eq!(dec.next(), MonthCursor::new(2026, 1).unwrap());
        assert!(MonthCursor::new(2025, 13).is_none());
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(MonthCursor::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(MonthCursor::new(2025, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthCursor::new(2025, 4).unwrap().days_in_month(), 30);
    }

    #[test]
    fn grid_starts_on_sunday() {
        // 2025-06-01 is a Sunday, 2025-05-01 a Thursday.
        let june = build_month(
            MonthCursor::new(2025, 6).unwrap(),
            &[],
            tokyo(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        );
        assert_eq!(june.weeks[0][0].as_ref().map(|c| c.day()), Some(1));
        assert_eq!(june.weeks.len(), 5);

        let may = build_month(
            MonthCursor::new(2025, 5).unwrap(),
            &[],
            tokyo(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
        );
        assert!(may.weeks[0][4].is_some());
        assert!(may.weeks[0][..4].iter().all(Option::is_none));
        assert_eq!(may.days().count(), 31);
    }

    #[test]
    fn entries_are_bucketed_by_local_day_not_utc() {
        // 2025-03-09 20:00 UTC is 2025-03-10 05:00 in Tokyo.
        let late = entry(DefaultEmotion::Calm, utc(2025, 3, 9, 20, 0));
        let month = build_month(
            MonthCursor::new(2025, 3).unwrap(),
            &[late],
            tokyo(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        assert!(month.day(9).unwrap().entries.is_empty());
        assert_eq!(month.day(10).unwrap().entries.len(), 1);
    }

    #[test]
    fn day_cell_shows_earliest_entry_and_overflow() {
        // Store order is newest first.
        let entries = vec![
            entry(DefaultEmotion::Anger, utc(2025, 3, 10, 9, 0)),
            entry(DefaultEmotion::Sadness, utc(2025, 3, 10, 5, 0)),
            entry(DefaultEmotion::Joy, utc(2025, 3, 10, 1, 0)),
        ];
        let month = build_month(
            MonthCursor::new(2025, 3).unwrap(),
            &entries,
            tokyo(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        );
        let cell = month.day(10).unwrap();
        assert_eq!(
            cell.first().map(Entry::glyph),
            Some(Glyph::Default(DefaultEmotion::Joy))
        );
        assert_eq!(cell.overflow(), 2);
        assert!(cell.is_today);

        let single = month.day(11).unwrap();
        assert_eq!(single.overflow(), 0);
        assert!(single.first().is_none());
    }

    #[test]
    fn overflow_dots_are_capped() {
        let at = utc(2025, 3, 10, 1, 0);
        let entries: Vec<Entry> = (0..6).map(|_| entry(DefaultEmotion::Calm, at)).collect();
        let cells = entries_on(&entries, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), tokyo());
        let cell = DayCell {
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            is_today: false,
            entries: cells,
        };
        assert_eq!(cell.overflow(), 5);
        assert_eq!(cell.overflow_dots(), MAX_OVERFLOW_DOTS);
    }

    #[test]
    fn same_timestamp_keeps_insertion_order() {
        let at = utc(2025, 3, 10, 1, 0);
        let older = entry(DefaultEmotion::Joy, at);
        let newer = entry(DefaultEmotion::Anger, at);
        let on_day = entries_on(
            &[newer.clone(), older.clone()],
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            tokyo(),
        );
        assert_eq!(on_day[0].id, older.id);
    }

    #[test]
    fn dates_format_in_local_time() {
        assert_eq!(
            format_entry_date(utc(2025, 1, 4, 15, 3), tokyo()),
            "2025年1月5日 00:03"
        );
    }
}
