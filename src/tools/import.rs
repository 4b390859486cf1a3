//! Legacy import MCP Tool
//!
//! Loads an export from the old client. Categories are migrated first, then
//! everything is written in one transaction so a failed import leaves the
//! database as it was.

use std::path::Path;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::db::Database;
use crate::glucose::is_future_day;
use crate::models::legacy::SkippedMeasurement;
use crate::models::{load_thresholds, save_thresholds, LegacyExport, Reading, ReadingCreate};

use super::{ToolError, ToolResult};

/// Response for import_legacy_export
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub success: bool,
    pub total_measurements: usize,
    pub imported: usize,
    /// Already present under the same id
    pub duplicates: usize,
    pub skipped: Vec<SkippedMeasurement>,
    pub ranges_imported: bool,
    pub unknown_range_keys: Vec<String>,
    pub message: String,
}

/// Import a legacy export given as JSON text.
///
/// Readings are classified against the ranges in effect after the import,
/// so an export that carries its own ranges is evaluated with them.
/// Measurements dated after the local day of `now` are skipped.
pub fn import_legacy_export<Tz: TimeZone>(
    db: &Database,
    json: &str,
    now: &DateTime<Tz>,
) -> ToolResult<ImportSummary> {
    let export = LegacyExport::from_json(json)
        .map_err(|e| ToolError::invalid(format!("Invalid legacy export: {}", e)))?;
    let mut migrated = export.migrate();

    let tz = now.timezone();
    let (future, current): (Vec<_>, Vec<_>) = std::mem::take(&mut migrated.measurements)
        .into_iter()
        .partition(|m| is_future_day(m.timestamp.with_timezone(&tz).date_naive(), now));
    migrated.measurements = current;
    migrated.skipped.extend(future.into_iter().map(|m| SkippedMeasurement {
        index: m.index,
        reason: format!("timestamp '{}' is on a future day", m.timestamp),
    }));
    migrated.skipped.sort_by_key(|s| s.index);
    let ranges_imported = migrated.ranges.is_some();

    if let Some(ranges) = &migrated.ranges {
        ranges.validate().map_err(|e| ToolError::invalid(format!("Invalid legacy ranges: {}", e)))?;
    }

    let (imported, duplicates) = db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        if let Some(ranges) = &migrated.ranges {
            save_thresholds(&tx, ranges)?;
        }
        let thresholds = load_thresholds(&tx)?;

        let mut imported: usize = 0;
        let mut duplicates: usize = 0;
        for m in &migrated.measurements {
            let data = ReadingCreate {
                value: m.value,
                category: m.category,
                timestamp: m.timestamp,
            };
            match &m.legacy_id {
                Some(id) if Reading::exists(&tx, id)? => duplicates += 1,
                Some(id) => {
                    Reading::create_with_id(&tx, id, &data, &thresholds)?;
                    imported += 1;
                }
                None => {
                    Reading::create(&tx, &data, &thresholds)?;
                    imported += 1;
                }
            }
        }

        tx.commit()?;
        Ok((imported, duplicates))
    })?;

    for skipped in &migrated.skipped {
        tracing::warn!(index = skipped.index, reason = %skipped.reason, "Skipped legacy measurement");
    }
    tracing::info!(
        imported,
        duplicates,
        skipped = migrated.skipped.len(),
        ranges_imported,
        "Legacy import finished"
    );

    Ok(ImportSummary {
        success: true,
        total_measurements: export.measurements.len(),
        imported,
        duplicates,
        message: format!(
            "Imported {} of {} measurements ({} duplicates, {} skipped)",
            imported,
            export.measurements.len(),
            duplicates,
            migrated.skipped.len()
        ),
        skipped: migrated.skipped,
        ranges_imported,
        unknown_range_keys: migrated.unknown_range_keys,
    })
}

/// Import a legacy export from a file on disk
pub fn import_legacy_file<Tz: TimeZone>(
    db: &Database,
    path: &Path,
    now: &DateTime<Tz>,
) -> ToolResult<ImportSummary> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ToolError::invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;
    import_legacy_export(db, &json, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glucose::{Category, GlucoseRange, Status};
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, 9, 15, 0)
            .unwrap()
    }

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| crate::db::migrations::run_migrations(conn))
            .unwrap();
        db
    }

    const EXPORT: &str = r#"{
        "measurements": [
            {"id": "m1", "value": 90, "unit": "mg/dL", "timestamp": "2024-01-07T05:00:00.000Z", "category": "Fasting", "status": "inRange"},
            {"id": "m2", "value": 125, "timestamp": "2024-01-07T19:00:00.000Z", "category": "Before Sleep"},
            {"id": "m3", "value": 110, "timestamp": "2024-01-08T12:00:00.000Z", "category": "אחרי ארוחת צהריים"},
            {"id": "m4", "value": 100, "timestamp": "2024-01-08T16:00:00.000Z", "category": "Snack"}
        ],
        "ranges": {"Fasting": {"lower": 70, "upper": 85}}
    }"#;

    #[test]
    fn test_import_migrates_and_classifies_with_imported_ranges() {
        let db = test_db();
        let summary = import_legacy_export(&db, EXPORT, &now()).unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.ranges_imported);

        let conn = db.get_conn().unwrap();
        let fasting = Reading::get_by_id(&conn, "m1").unwrap().unwrap();
        assert_eq!(fasting.status, Status::AboveRange);
        let dinner = Reading::get_by_id(&conn, "m2").unwrap().unwrap();
        assert_eq!(dinner.category, Category::PostDinner);
        assert_eq!(dinner.status, Status::AboveRange);
        let lunch = Reading::get_by_id(&conn, "m3").unwrap().unwrap();
        assert_eq!(lunch.category, Category::PostLunch);

        let thresholds = load_thresholds(&conn).unwrap();
        assert_eq!(thresholds.get(Category::Fasting), GlucoseRange::new(70, 85));
    }

    #[test]
    fn test_reimport_skips_duplicates() {
        let db = test_db();
        import_legacy_export(&db, EXPORT, &now()).unwrap();
        let summary = import_legacy_export(&db, EXPORT, &now()).unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.duplicates, 3);
        let conn = db.get_conn().unwrap();
        assert_eq!(Reading::count(&conn).unwrap(), 3);
    }

    #[test]
    fn test_invalid_export_rejected() {
        let db = test_db();
        assert!(matches!(
            import_legacy_export(&db, "not json", &now()),
            Err(ToolError::InvalidInput(_))
        ));
        let inverted = r#"{"measurements": [], "ranges": {"Fasting": {"lower": 96, "upper": 140}}}"#;
        assert!(matches!(
            import_legacy_export(&db, inverted, &now()),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_import_file() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, EXPORT).unwrap();
        assert_eq!(import_legacy_file(&db, &path, &now()).unwrap().imported, 3);
        assert!(import_legacy_file(&db, &dir.path().join("missing.json"), &now()).is_err());
    }

    #[test]
    fn test_future_day_measurements_skipped() {
        let db = test_db();
        let export = r#"{
            "measurements": [
                {"id": "f1", "value": 92, "timestamp": "2024-01-10T20:00:00Z", "category": "Fasting"},
                {"id": "f2", "value": 92, "timestamp": "2024-01-11T07:00:00Z", "category": "Fasting"},
                {"id": "f3", "value": 88, "timestamp": "9999-01-01T07:00:00Z", "category": "Fasting"}
            ]
        }"#;
        let summary = import_legacy_export(&db, export, &now()).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(
            summary.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(summary.skipped[0].reason.contains("future day"));

        let conn = db.get_conn().unwrap();
        assert!(Reading::get_by_id(&conn, "f1").unwrap().is_some());
        assert!(Reading::get_by_id(&conn, "f2").unwrap().is_none());
    }
}
