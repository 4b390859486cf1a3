//! Weekly measurement grid
//!
//! Buckets readings into one row per local calendar day and one cell per
//! category. Day assignment uses the reading's local date in the window's
//! timezone, so DST transitions never shift a reading into a neighbouring
//! row.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use super::format::DateFormatter;
use super::Category;
use crate::models::Reading;

/// One calendar day of the grid
#[derive(Debug, Clone, Serialize)]
pub struct DayRow {
    pub date: NaiveDate,
    pub display_label: String,
    pub weekday_label: String,
    /// Readings per requested category, ascending by timestamp
    pub cells: BTreeMap<Category, Vec<Reading>>,
}

impl DayRow {
    pub fn cell(&self, category: Category) -> &[Reading] {
        self.cells.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }

    pub fn reading_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// First instant of a local calendar day.
///
/// Where a DST transition skips midnight the day starts at the first valid
/// local time after it.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Most recent Sunday at or before `reference`, at local midnight
pub fn week_start<Tz: TimeZone>(reference: &DateTime<Tz>) -> DateTime<Tz> {
    let date = reference.date_naive();
    let back = i64::from(date.weekday().num_days_from_sunday());
    local_midnight(&reference.timezone(), date - Duration::days(back))
}

/// Sunday-aligned display week: `end` is local midnight six days after `start`
#[derive(Debug, Clone)]
pub struct WeekWindow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> WeekWindow<Tz> {
    /// The week containing `reference`
    pub fn containing(reference: &DateTime<Tz>) -> Self {
        let start = week_start(reference);
        let end = local_midnight(&start.timezone(), start.date_naive() + Duration::days(6));
        Self { start, end }
    }

    /// The week `offset_weeks` away from the one containing `reference`.
    ///
    /// `None` when that week, with a day of slack either side, lies outside
    /// the representable calendar.
    pub fn offset_from(reference: &DateTime<Tz>, offset_weeks: i64) -> Option<Self> {
        let current = Self::containing(reference);
        let days = offset_weeks.checked_mul(7)?;
        let shifted = if days >= 0 {
            current.first_day().checked_add_days(Days::new(days.unsigned_abs()))?
        } else {
            current.first_day().checked_sub_days(Days::new(days.unsigned_abs()))?
        };
        shifted.checked_sub_days(Days::new(7))?;
        shifted.checked_add_days(Days::new(8))?;
        Some(Self::containing(&local_midnight(&reference.timezone(), shifted)))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Inclusive filter bounds covering every instant of the window's days.
    ///
    /// `end` marks the start of the final day, so the upper bound extends to
    /// the last microsecond before the following local midnight.
    pub fn filter_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let next_day = local_midnight(&self.start.timezone(), self.last_day() + Duration::days(1));
        (
            self.start.with_timezone(&Utc),
            next_day.with_timezone(&Utc) - Duration::microseconds(1),
        )
    }

    pub fn contains_day(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

/// Whether `date` lies after the local day containing `now`
pub fn is_future_day<Tz: TimeZone>(date: NaiveDate, now: &DateTime<Tz>) -> bool {
    date > now.date_naive()
}

/// Build one row per local day from `window_start` to `window_end` inclusive.
///
/// Every row carries a cell for each requested category, empty when no
/// reading falls on that day. Readings outside the window or in a category
/// that was not requested are dropped; callers filter beforehand.
pub fn build_week_grid<Tz: TimeZone>(
    readings: &[Reading],
    categories: &[Category],
    window_start: &DateTime<Tz>,
    window_end: &DateTime<Tz>,
    formatter: &dyn DateFormatter,
) -> Vec<DayRow> {
    let tz = window_start.timezone();
    let first_day = window_start.date_naive();
    let last_day = window_end.with_timezone(&tz).date_naive();
    let day_count = (last_day - first_day).num_days() + 1;
    if day_count <= 0 {
        return Vec::new();
    }

    let mut rows: Vec<DayRow> = (0..day_count)
        .map(|offset| empty_row(first_day + Duration::days(offset), categories, formatter))
        .collect();

    for reading in readings {
        let local_day = reading.timestamp.with_timezone(&tz).date_naive();
        let index = (local_day - first_day).num_days();
        if index < 0 || index >= day_count {
            continue;
        }
        if let Some(cell) = rows[index as usize].cells.get_mut(&reading.category) {
            cell.push(reading.clone());
        }
    }

    sort_cells(&mut rows);
    rows
}

/// Rows for a report: one per local day that has a reading in a requested
/// category, ascending by date.
pub fn build_report_rows<Tz: TimeZone>(
    readings: &[Reading],
    categories: &[Category],
    tz: &Tz,
    formatter: &dyn DateFormatter,
) -> Vec<DayRow> {
    let local_day = |r: &Reading| r.timestamp.with_timezone(tz).date_naive();
    let requested: Vec<&Reading> = readings
        .iter()
        .filter(|r| categories.contains(&r.category))
        .collect();

    let days: BTreeSet<NaiveDate> = requested.iter().map(|r| local_day(*r)).collect();
    let mut rows: BTreeMap<NaiveDate, DayRow> = days
        .into_iter()
        .map(|date| (date, empty_row(date, categories, formatter)))
        .collect();

    for reading in requested {
        if let Some(cell) = rows
            .get_mut(&local_day(reading))
            .and_then(|row| row.cells.get_mut(&reading.category))
        {
            cell.push(reading.clone());
        }
    }

    let mut rows: Vec<DayRow> = rows.into_values().collect();
    sort_cells(&mut rows);
    rows
}

fn empty_row(date: NaiveDate, categories: &[Category], formatter: &dyn DateFormatter) -> DayRow {
    DayRow {
        date,
        display_label: formatter.day_label(date),
        weekday_label: formatter.weekday_label(date),
        cells: categories.iter().map(|&c| (c, Vec::new())).collect(),
    }
}

fn sort_cells(rows: &mut [DayRow]) {
    for row in rows {
        for cell in row.cells.values_mut() {
            cell.sort_by_key(|r| r.timestamp);
        }
    }
}
