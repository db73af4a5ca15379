//! Story dates: `dd.mm.yyyy` parsing and formatting, past-date checks, next-date inference and
//! send timestamp arithmetic.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::config::ScheduleTime;

pub const DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("unparseable date: {0:?}")]
    Unparseable(String),
    #[error("invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTime { hour: u32, minute: u32, second: u32 },
    #[error("invalid utc offset: {0} hours")]
    InvalidOffset(i32),
    #[error("ambiguous local time")]
    Ambiguous,
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn validate_date(s: &str) -> bool {
    parse_date(s).is_some()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// English weekday name, e.g. `Friday`.
pub fn day_of_week(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// `dd.mm.yyyy (Weekday)`, the form given to the content provider.
pub fn describe_date(date: NaiveDate) -> String {
    format!("{} ({})", format_date(date), day_of_week(date))
}

/// Calendar date of `now` in the schedule's offset; falls back to UTC for an invalid offset.
pub fn today(now: DateTime<Utc>, schedule: &ScheduleTime) -> NaiveDate {
    match schedule.offset() {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

/// Strictly before `today`. A story for today is still allowed.
pub fn is_past(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// Day after the last scheduled post, never earlier than `today`. None without history.
pub fn next_story_date(
    last_scheduled: Option<DateTime<FixedOffset>>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let last = last_scheduled?;
    let next = last
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(today);
    Some(next.max(today))
}

/// Absolute send time: `date` at the configured time-of-day in the configured fixed offset.
pub fn schedule_timestamp(
    date: &str,
    schedule: &ScheduleTime,
) -> Result<DateTime<FixedOffset>, DateError> {
    let day = parse_date(date).ok_or_else(|| DateError::Unparseable(date.to_string()))?;
    let naive = day
        .and_hms_opt(schedule.hour, schedule.minute, schedule.second)
        .ok_or(DateError::InvalidTime {
            hour: schedule.hour,
            minute: schedule.minute,
            second: schedule.second,
        })?;
    let offset = schedule
        .offset()
        .ok_or(DateError::InvalidOffset(schedule.utc_offset_hours))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or(DateError::Ambiguous)
}
