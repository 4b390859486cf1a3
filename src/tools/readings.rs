//! Reading MCP Tools
//!
//! Recording, listing, correcting and deleting glucose readings, plus the
//! live status preview and OCR value suggestion used while entering one.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::glucose::{
    classify, extract_glucose_value, is_future_day, parse_value_input, DateFormatter,
    GlucoseRange, Status,
};
use crate::models::{load_thresholds, Reading, ReadingCreate, ReadingUpdate};

use super::{parse_category, parse_local_timestamp, ToolError, ToolResult};

/// Reading as returned by the tools
#[derive(Debug, Serialize)]
pub struct ReadingView {
    pub id: String,
    pub value: i64,
    pub unit: String,
    pub value_display: String,
    pub category: String,
    pub category_label: String,
    pub timestamp: String,
    pub local_date: String,
    pub local_time: String,
    pub status: Status,
    pub status_label: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ReadingView {
    pub fn new<Tz: TimeZone>(reading: Reading, tz: &Tz, formatter: &dyn DateFormatter) -> Self {
        let local = reading.timestamp.with_timezone(tz);
        Self {
            value_display: reading.format_value(),
            category: reading.category.as_str().to_string(),
            category_label: formatter.category_label(reading.category).to_string(),
            timestamp: reading.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            local_date: formatter.day_label(local.date_naive()),
            local_time: formatter.time_label(local.time()),
            status_label: formatter.status_label(reading.status).to_string(),
            status: reading.status,
            id: reading.id,
            value: reading.value,
            unit: reading.unit,
            created_at: reading.created_at,
            updated_at: reading.updated_at,
        }
    }
}

/// Response for list_readings
#[derive(Debug, Serialize)]
pub struct ListReadingsResponse {
    pub readings: Vec<ReadingView>,
    pub total: usize,
}

/// Response for preview_status
#[derive(Debug, Serialize)]
pub struct PreviewStatusResponse {
    pub value: Option<i64>,
    pub category: String,
    pub range: GlucoseRange,
    /// `None` when the input is not a number
    pub status: Option<Status>,
    pub status_label: Option<String>,
}

/// Response for suggest_value_from_text
#[derive(Debug, Serialize)]
pub struct SuggestValueResponse {
    pub suggested_value: Option<i64>,
    pub message: String,
}

/// Response for delete operations
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: String,
}

/// Parse a form value, refusing anything that is not a positive integer
fn parse_value(input: &str) -> ToolResult<i64> {
    match parse_value_input(input) {
        Some(v) if v > 0 => Ok(v),
        Some(v) => Err(ToolError::invalid(format!("Value must be greater than 0, got {}", v))),
        None => Err(ToolError::invalid(format!("Invalid glucose value: '{}'", input))),
    }
}

/// Reject readings dated after the current local day
fn ensure_not_future<Tz: TimeZone>(timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> ToolResult<()> {
    let day = timestamp.with_timezone(&now.timezone()).date_naive();
    if is_future_day(day, now) {
        return Err(ToolError::invalid(format!(
            "Cannot record a reading for a future day ({})",
            day
        )));
    }
    Ok(())
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Record a reading, classified against the current thresholds
pub fn add_reading<Tz: TimeZone>(
    db: &Database,
    value: &str,
    category: &str,
    timestamp: Option<&str>,
    now: &DateTime<Tz>,
    formatter: &dyn DateFormatter,
) -> ToolResult<ReadingView> {
    let value = parse_value(value)?;
    let category = parse_category(category)?;
    let timestamp = match timestamp {
        Some(ts) => parse_local_timestamp(ts, now)?,
        None => now.with_timezone(&Utc),
    };
    ensure_not_future(&timestamp, now)?;

    let conn = db.get_conn()?;
    let thresholds = load_thresholds(&conn)?;

    let reading = Reading::create(
        &conn,
        &ReadingCreate {
            value,
            category,
            timestamp,
        },
        &thresholds,
    )
    .map_err(|e| ToolError::Failed(format!("Failed to save reading: {}", e)))?;

    tracing::info!(
        id = %reading.id,
        value = reading.value,
        category = reading.category.as_str(),
        status = reading.status.as_str(),
        "Reading recorded"
    );

    Ok(ReadingView::new(reading, &now.timezone(), formatter))
}

/// Get a reading by ID
pub fn get_reading<Tz: TimeZone>(
    db: &Database,
    id: &str,
    tz: &Tz,
    formatter: &dyn DateFormatter,
) -> ToolResult<Option<ReadingView>> {
    let conn = db.get_conn()?;
    let reading = Reading::get_by_id(&conn, id)
        .map_err(|e| ToolError::Failed(format!("Failed to get reading: {}", e)))?;
    Ok(reading.map(|r| ReadingView::new(r, tz, formatter)))
}

/// List readings newest first
pub fn list_readings<Tz: TimeZone>(
    db: &Database,
    limit: Option<i64>,
    tz: &Tz,
    formatter: &dyn DateFormatter,
) -> ToolResult<ListReadingsResponse> {
    let conn = db.get_conn()?;
    let readings = Reading::list(&conn, limit)
        .map_err(|e| ToolError::Failed(format!("Failed to list readings: {}", e)))?;

    let readings: Vec<ReadingView> = readings
        .into_iter()
        .map(|r| ReadingView::new(r, tz, formatter))
        .collect();
    let total = readings.len();
    Ok(ListReadingsResponse { readings, total })
}

/// Correct a reading; the status is recomputed against the current thresholds
pub fn update_reading<Tz: TimeZone>(
    db: &Database,
    id: &str,
    value: Option<&str>,
    category: Option<&str>,
    timestamp: Option<&str>,
    now: &DateTime<Tz>,
    formatter: &dyn DateFormatter,
) -> ToolResult<Option<ReadingView>> {
    let data = ReadingUpdate {
        value: value.map(parse_value).transpose()?,
        category: category.map(parse_category).transpose()?,
        timestamp: timestamp
            .map(|ts| parse_local_timestamp(ts, now))
            .transpose()?,
    };
    if let Some(ts) = &data.timestamp {
        ensure_not_future(ts, now)?;
    }

    let conn = db.get_conn()?;
    let thresholds = load_thresholds(&conn)?;
    let updated = Reading::update(&conn, id, &data, &thresholds)
        .map_err(|e| ToolError::Failed(format!("Failed to update reading: {}", e)))?;

    if let Some(reading) = &updated {
        tracing::info!(id = %reading.id, status = reading.status.as_str(), "Reading updated");
    }

    Ok(updated.map(|r| ReadingView::new(r, &now.timezone(), formatter)))
}

/// Delete a reading
pub fn delete_reading(db: &Database, id: &str) -> ToolResult<DeleteResponse> {
    let conn = db.get_conn()?;
    let deleted = Reading::delete(&conn, id)
        .map_err(|e| ToolError::Failed(format!("Failed to delete reading: {}", e)))?;

    if !deleted {
        return Err(ToolError::invalid(format!("Reading not found with id: {}", id)));
    }

    tracing::info!(id = %id, "Reading deleted");
    Ok(DeleteResponse {
        success: true,
        deleted_id: id.to_string(),
    })
}

/// Live classification of form input; nothing is stored
pub fn preview_status(
    db: &Database,
    value: &str,
    category: &str,
    formatter: &dyn DateFormatter,
) -> ToolResult<PreviewStatusResponse> {
    let category = parse_category(category)?;
    let conn = db.get_conn()?;
    let thresholds = load_thresholds(&conn)?;

    let value = parse_value_input(value);
    let status = value.map(|v| classify(v, category, &thresholds));

    Ok(PreviewStatusResponse {
        value,
        category: category.as_str().to_string(),
        range: thresholds.get(category),
        status,
        status_label: status.map(|s| formatter.status_label(s).to_string()),
    })
}

/// Suggest a value from meter OCR text
pub fn suggest_value_from_text(raw_text: &str) -> SuggestValueResponse {
    let suggested_value = extract_glucose_value(raw_text);
    let message = match suggested_value {
        Some(v) => format!("Suggested value {} mg/dL. Confirm it against the meter display.", v),
        None => "No number found in the text".to_string(),
    };
    SuggestValueResponse {
        suggested_value,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glucose::{Category, EnglishFormatter, RangeThresholds};
    use crate::models::update_range;
    use chrono::FixedOffset;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| crate::db::migrations::run_migrations(conn))
            .unwrap();
        db
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 9, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_add_reading_classifies_and_labels() {
        let db = test_db();
        let view = add_reading(&db, "100", "fasting", Some("2024-01-10 07:00"), &now(), &EnglishFormatter)
            .unwrap();
        assert_eq!(view.status, Status::AboveRange);
        assert_eq!(view.status_label, "Above range");
        assert_eq!(view.local_time, "07:00");
        assert_eq!(view.local_date, "10/01/24");
        assert_eq!(view.timestamp, "2024-01-10T05:00:00.000Z");
    }

    #[test]
    fn test_add_reading_rejects_bad_input() {
        let db = test_db();
        let f = &EnglishFormatter;
        assert!(matches!(
            add_reading(&db, "abc", "fasting", None, &now(), f),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            add_reading(&db, "0", "fasting", None, &now(), f),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            add_reading(&db, "90", "fasting", Some("2024-01-11 06:00"), &now(), f),
            Err(ToolError::InvalidInput(_))
        ));
        assert_eq!(list_readings(&db, None, &now().timezone(), f).unwrap().total, 0);
    }

    #[test]
    fn test_later_time_today_is_allowed() {
        let db = test_db();
        let view = add_reading(&db, "110", "post_dinner", Some("2024-01-10 21:00"), &now(), &EnglishFormatter);
        assert!(view.is_ok());
    }

    #[test]
    fn test_update_recomputes_with_current_thresholds() {
        let db = test_db();
        let f = &EnglishFormatter;
        let view = add_reading(&db, "90", "fasting", Some("2024-01-09 07:00"), &now(), f).unwrap();
        assert_eq!(view.status, Status::InRange);

        db.with_conn_mut(|conn| update_range(conn, Category::Fasting, GlucoseRange::new(70, 85)))
            .unwrap();

        // Cached status survives the threshold change
        let stored = get_reading(&db, &view.id, &now().timezone(), f).unwrap().unwrap();
        assert_eq!(stored.status, Status::InRange);

        let updated = update_reading(&db, &view.id, None, Some("post_lunch"), None, &now(), f)
            .unwrap()
            .unwrap();
        assert_eq!(updated.category, "post_lunch");
        assert_eq!(updated.status, Status::InRange);

        let updated = update_reading(&db, &view.id, None, Some("fasting"), None, &now(), f)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, Status::AboveRange);

        assert!(update_reading(&db, "missing", Some("90"), None, None, &now(), f)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_reading() {
        let db = test_db();
        let view = add_reading(&db, "95", "fasting", None, &now(), &EnglishFormatter).unwrap();
        assert!(delete_reading(&db, &view.id).unwrap().success);
        assert!(matches!(delete_reading(&db, &view.id), Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn test_preview_status() {
        let db = test_db();
        let preview = preview_status(&db, "121", "post_breakfast", &EnglishFormatter).unwrap();
        assert_eq!(preview.status, Some(Status::AboveRange));
        assert_eq!(preview.range, RangeThresholds::defaults().get(Category::PostBreakfast));

        let preview = preview_status(&db, "", "post_breakfast", &EnglishFormatter).unwrap();
        assert_eq!(preview.value, None);
        assert_eq!(preview.status, None);
    }

    #[test]
    fn test_suggest_value() {
        assert_eq!(suggest_value_from_text("88 mg/dL 88").suggested_value, Some(88));
        assert_eq!(suggest_value_from_text("--").suggested_value, None);
    }
}
