//! Pure month-grid arithmetic: how many day cells a month needs, how many
//! blanks pad the first Monday-started week, and which events fall on which
//! day. Months are 1-12 throughout.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::models::CalendarEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthLayout {
    pub days_in_month: u32,
    pub leading_blanks: u32,
}

/// Grid shape for a month, or `None` when the year/month pair is not a
/// real calendar month. Day count comes from stepping back one day from
/// the first of the following month, which makes leap years fall out of
/// the date arithmetic.
pub fn month_layout(year: i32, month: u32) -> Option<MonthLayout> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next) = next_month(year, month);
    let last = NaiveDate::from_ymd_opt(next_year, next, 1)?.pred_opt()?;
    Some(MonthLayout {
        days_in_month: last.day(),
        leading_blanks: first.weekday().num_days_from_monday(),
    })
}

/// Buckets events by day of month. An event lands in the bucket for its
/// date's day iff its year and month equal the queried pair; everything
/// else is dropped.
pub fn group_by_date<'a>(
    events: &'a [CalendarEvent],
    year: i32,
    month: u32,
) -> BTreeMap<u32, Vec<&'a CalendarEvent>> {
    let mut grouped: BTreeMap<u32, Vec<&CalendarEvent>> = BTreeMap::new();
    for event in events {
        if event.date.year() == year && event.date.month() == month {
            grouped.entry(event.date.day()).or_default().push(event);
        }
    }
    grouped
}

/// Day-of-month bucket for a date, or `None` when the date falls outside
/// the queried month. The grid handler feeds this the viewer's reported
/// local date, so the highlight follows the viewer's calendar, not the
/// server clock.
pub fn day_in_month(date: NaiveDate, year: i32, month: u32) -> Option<u32> {
    (date.year() == year && date.month() == month).then(|| date.day())
}

/// True iff the triple is the current date in the local calendar.
pub fn is_today(year: i32, month: u32, day: u32) -> bool {
    day_in_month(Local::now().date_naive(), year, month) == Some(day)
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
