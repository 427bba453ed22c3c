// Picks a display granularity for date-grouped charts from the span of the
// data being charted.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

/// Display bucket for a date axis, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatBucket {
    HourOfDay,
    DayMonthYear,
    #[default]
    MonthYear,
    Year,
}

impl FormatBucket {
    pub fn name(&self) -> &'static str {
        match self {
            FormatBucket::HourOfDay => "hour-of-day",
            FormatBucket::DayMonthYear => "day-month-year",
            FormatBucket::MonthYear => "month-year",
            FormatBucket::Year => "year",
        }
    }

    /// `DATE_FORMAT` pattern for hosts that group in SQL.
    pub fn sql_pattern(&self) -> &'static str {
        match self {
            FormatBucket::HourOfDay => "%h:00 %p",
            FormatBucket::DayMonthYear => "%d-%b-%Y",
            FormatBucket::MonthYear => "%b-%Y",
            FormatBucket::Year => "%Y",
        }
    }

    /// Equivalent chrono pattern.
    pub fn pattern(&self) -> &'static str {
        match self {
            FormatBucket::HourOfDay => "%I:00 %p",
            FormatBucket::DayMonthYear => "%d-%b-%Y",
            FormatBucket::MonthYear => "%b-%Y",
            FormatBucket::Year => "%Y",
        }
    }

    /// Label a timestamp with this bucket.
    pub fn label(&self, at: NaiveDateTime) -> String {
        at.format(self.pattern()).to_string()
    }

    /// Start of the bucket containing `at`; useful as a sort key for labels.
    pub fn truncate(&self, at: NaiveDateTime) -> NaiveDateTime {
        let date = at.date();
        let truncated = match self {
            FormatBucket::HourOfDay => date.and_hms_opt(at.hour(), 0, 0),
            FormatBucket::DayMonthYear => date.and_hms_opt(0, 0, 0),
            FormatBucket::MonthYear => date
                .with_day0(0)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            FormatBucket::Year => date
                .with_ordinal0(0)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        };
        truncated.unwrap_or(at)
    }
}

/// Choose a bucket for data spanning `min..=max`.
///
/// Missing bounds (no data) give the default month-year bucket. The span is
/// counted in whole days from the start of `min`'s day to the end of `max`'s
/// day: the same day is 0, then 1..=31 days by day, 32..=366 by month and
/// anything longer by year. Reversed bounds are swapped.
pub fn infer_format(min: Option<NaiveDateTime>, max: Option<NaiveDateTime>) -> FormatBucket {
    let (Some(min), Some(max)) = (min, max) else {
        return FormatBucket::default();
    };
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let days = (hi.date() - lo.date()).num_days();

    match days {
        0 => FormatBucket::HourOfDay,
        1..=31 => FormatBucket::DayMonthYear,
        32..=366 => FormatBucket::MonthYear,
        _ => FormatBucket::Year,
    }
}
