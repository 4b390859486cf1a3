//! Week view MCP Tool
//!
//! One Sunday-to-Saturday week of readings laid out as a grid. Each cell
//! shows the status cached when the reading was written.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::db::Database;
use crate::glucose::{build_week_grid, filter_by_range, Category, DateFormatter, Status, WeekWindow};
use crate::models::Reading;

use super::{ToolError, ToolResult};

#[derive(Debug, Serialize)]
pub struct CellReading {
    pub id: String,
    pub value: i64,
    pub time: String,
    pub status: Status,
    pub status_label: String,
}

#[derive(Debug, Serialize)]
pub struct CellView {
    pub category: String,
    pub readings: Vec<CellReading>,
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: String,
    pub display_label: String,
    pub weekday_label: String,
    pub is_today: bool,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Serialize)]
pub struct ColumnView {
    pub category: String,
    pub label: String,
}

/// Response for get_week_view
#[derive(Debug, Serialize)]
pub struct WeekViewResponse {
    /// Weeks relative to the current one; never positive
    pub offset: i64,
    pub week_start: String,
    pub week_end: String,
    pub range_label: String,
    pub can_go_forward: bool,
    pub columns: Vec<ColumnView>,
    pub days: Vec<DayView>,
    pub total_readings: usize,
}

/// Grid for the week `offset` weeks before the current one.
///
/// Positive offsets are clamped to the current week.
pub fn get_week_view<Tz: TimeZone>(
    db: &Database,
    offset: i64,
    now: &DateTime<Tz>,
    formatter: &dyn DateFormatter,
) -> ToolResult<WeekViewResponse> {
    let offset = offset.min(0);
    let window = WeekWindow::offset_from(now, offset)
        .ok_or_else(|| ToolError::invalid(format!("Week offset {} is out of range", offset)))?;
    let (start, end) = window.filter_bounds();

    let conn = db.get_conn()?;
    let readings = Reading::list_between(&conn, &start, &end)
        .map_err(|e| ToolError::Failed(format!("Failed to load readings: {}", e)))?;
    let in_week = filter_by_range(&readings, Some(start), Some(end));

    let categories = Category::ALL;
    let rows = build_week_grid(&in_week, &categories, &window.start, &window.end, formatter);
    let tz = now.timezone();
    let today = now.date_naive();

    let days: Vec<DayView> = rows
        .into_iter()
        .map(|row| DayView {
            date: row.date.to_string(),
            is_today: row.date == today,
            cells: categories
                .iter()
                .map(|&category| CellView {
                    category: category.as_str().to_string(),
                    readings: row
                        .cell(category)
                        .iter()
                        .map(|r| CellReading {
                            id: r.id.clone(),
                            value: r.value,
                            time: formatter.time_label(r.timestamp.with_timezone(&tz).time()),
                            status: r.status,
                            status_label: formatter.status_label(r.status).to_string(),
                        })
                        .collect(),
                })
                .collect(),
            display_label: row.display_label,
            weekday_label: row.weekday_label,
        })
        .collect();

    tracing::debug!(offset, readings = in_week.len(), "Week view built");

    Ok(WeekViewResponse {
        offset,
        week_start: window.first_day().to_string(),
        week_end: window.last_day().to_string(),
        range_label: formatter.range_label(window.first_day(), window.last_day()),
        can_go_forward: offset < 0,
        columns: categories
            .iter()
            .map(|&c| ColumnView {
                category: c.as_str().to_string(),
                label: formatter.category_label(c).to_string(),
            })
            .collect(),
        days,
        total_readings: in_week.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glucose::{EnglishFormatter, RangeThresholds};
    use crate::models::{parse_timestamp, ReadingCreate};
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        // Wednesday
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 9, 15, 0)
            .unwrap()
    }

    fn seeded_db(entries: &[(i64, Category, &str)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            crate::db::migrations::run_migrations(conn)?;
            for (value, category, ts) in entries {
                Reading::create(
                    conn,
                    &ReadingCreate {
                        value: *value,
                        category: *category,
                        timestamp: parse_timestamp(ts).unwrap(),
                    },
                    &RangeThresholds::defaults(),
                )?;
            }
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_current_week() {
        let db = seeded_db(&[
            (100, Category::Fasting, "2024-01-07T07:00:00+02:00"),
            (130, Category::PostBreakfast, "2024-01-07T09:05:00+02:00"),
            (105, Category::PostDinner, "2024-01-13T21:30:00+02:00"),
            (90, Category::Fasting, "2024-01-06T07:00:00+02:00"),
        ]);
        let view = get_week_view(&db, 0, &now(), &EnglishFormatter).unwrap();

        assert_eq!(view.week_start, "2024-01-07");
        assert_eq!(view.week_end, "2024-01-13");
        assert_eq!(view.range_label, "07/01 to 13/01");
        assert!(!view.can_go_forward);
        assert_eq!(view.days.len(), 7);
        assert_eq!(view.total_readings, 3);
        assert!(view.days[3].is_today);

        let sunday = &view.days[0];
        assert_eq!(sunday.cells[0].readings[0].value, 100);
        assert_eq!(sunday.cells[0].readings[0].time, "07:00");
        assert_eq!(sunday.cells[1].readings[0].status, Status::AboveRange);
        assert_eq!(view.days[6].cells[3].readings[0].value, 105);
    }

    #[test]
    fn test_previous_week_and_clamped_offset() {
        let db = seeded_db(&[(90, Category::Fasting, "2024-01-06T07:00:00+02:00")]);

        let previous = get_week_view(&db, -1, &now(), &EnglishFormatter).unwrap();
        assert_eq!(previous.week_start, "2023-12-31");
        assert!(previous.can_go_forward);
        assert_eq!(previous.days[6].cells[0].readings.len(), 1);

        let future = get_week_view(&db, 3, &now(), &EnglishFormatter).unwrap();
        assert_eq!(future.offset, 0);
        assert_eq!(future.week_start, "2024-01-07");
    }

    #[test]
    fn test_offset_beyond_calendar_is_invalid_input() {
        let db = seeded_db(&[]);
        for offset in [-100_000_000, i64::MIN] {
            assert!(matches!(
                get_week_view(&db, offset, &now(), &EnglishFormatter),
                Err(ToolError::InvalidInput(_))
            ));
        }
    }
}
