//! Glucose reading model
//!
//! A single finger-stick measurement. The range status is cached at write
//! time and only recomputed by an explicit update.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::glucose::{classify, Category, RangeThresholds, Status};

/// Unit every reading is recorded in
pub const GLUCOSE_UNIT: &str = "mg/dL";

/// A glucose reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub value: i64,
    pub unit: String,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingCreate {
    pub value: i64,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}

/// Data for updating a reading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingUpdate {
    pub value: Option<i64>,
    pub category: Option<Category>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReadingUpdate {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.category.is_none() && self.timestamp.is_none()
    }
}

/// Canonical storage form of an instant
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 instant, accepting any offset
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl Reading {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let category_str: String = row.get("category")?;
        let status_str: String = row.get("status")?;
        let timestamp_str: String = row.get("timestamp")?;

        let invalid = |column: usize, what: &str, value: &str| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                format!("invalid {}: {}", what, value).into(),
            )
        };

        let category = Category::from_str(&category_str)
            .ok_or_else(|| invalid(3, "category", &category_str))?;
        let status = Status::from_str(&status_str)
            .ok_or_else(|| invalid(5, "status", &status_str))?;
        let timestamp = parse_timestamp(&timestamp_str)
            .ok_or_else(|| invalid(4, "timestamp", &timestamp_str))?;

        Ok(Self {
            id: row.get("id")?,
            value: row.get("value")?,
            unit: row.get("unit")?,
            category,
            timestamp,
            status,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new reading, classifying it against the current thresholds
    pub fn create(
        conn: &Connection,
        data: &ReadingCreate,
        thresholds: &RangeThresholds,
    ) -> DbResult<Self> {
        let id = uuid::Uuid::new_v4().to_string();
        Self::create_with_id(conn, &id, data, thresholds)
    }

    /// Insert under a caller-chosen id (legacy imports keep their ids)
    pub fn create_with_id(
        conn: &Connection,
        id: &str,
        data: &ReadingCreate,
        thresholds: &RangeThresholds,
    ) -> DbResult<Self> {
        let status = classify(data.value, data.category, thresholds);

        conn.execute(
            r#"
            INSERT INTO readings (id, value, unit, category, timestamp, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                data.value,
                GLUCOSE_UNIT,
                data.category.as_str(),
                format_timestamp(&data.timestamp),
                status.as_str(),
            ],
        )?;

        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn exists(conn: &Connection, id: &str) -> DbResult<bool> {
        let found: i64 = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM readings WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    /// Get a reading by ID
    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM readings WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(reading) => Ok(Some(reading)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List readings newest first
    pub fn list(conn: &Connection, limit: Option<i64>) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM readings ORDER BY timestamp DESC LIMIT ?1"
        )?;
        // SQLite treats a negative LIMIT as unbounded
        let readings = stmt
            .query_map([limit.unwrap_or(-1)], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Readings with `start <= timestamp <= end`, oldest first
    pub fn list_between(
        conn: &Connection,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM readings WHERE timestamp >= ?1 AND timestamp <= ?2 ORDER BY timestamp"
        )?;
        let readings = stmt
            .query_map(
                params![format_timestamp(start), format_timestamp(end)],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Update a reading and recompute its status against the current thresholds
    pub fn update(
        conn: &Connection,
        id: &str,
        data: &ReadingUpdate,
        thresholds: &RangeThresholds,
    ) -> DbResult<Option<Self>> {
        let existing = match Self::get_by_id(conn, id)? {
            Some(reading) => reading,
            None => return Ok(None),
        };

        if data.is_empty() {
            return Ok(Some(existing));
        }

        let value = data.value.unwrap_or(existing.value);
        let category = data.category.unwrap_or(existing.category);
        let timestamp = data.timestamp.unwrap_or(existing.timestamp);
        let status = classify(value, category, thresholds);

        conn.execute(
            r#"
            UPDATE readings
            SET value = ?1, category = ?2, timestamp = ?3, status = ?4,
                updated_at = datetime('now')
            WHERE id = ?5
            "#,
            params![
                value,
                category.as_str(),
                format_timestamp(&timestamp),
                status.as_str(),
                id,
            ],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Delete a reading
    pub fn delete(conn: &Connection, id: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM readings WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Format the reading for display, e.g. `104 mg/dL`
    pub fn format_value(&self) -> String {
        format!("{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::glucose::GlucoseRange;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_create_assigns_id_and_status() {
        let conn = test_conn();
        let reading = Reading::create(
            &conn,
            &ReadingCreate {
                value: 100,
                category: Category::Fasting,
                timestamp: ts("2024-01-07T07:00:00Z"),
            },
            &RangeThresholds::defaults(),
        )
        .unwrap();

        assert!(uuid::Uuid::parse_str(&reading.id).is_ok());
        assert_eq!(reading.status, Status::AboveRange);
        assert_eq!(reading.unit, GLUCOSE_UNIT);
        assert_eq!(reading.timestamp, ts("2024-01-07T07:00:00Z"));
    }

    #[test]
    fn test_status_not_reclassified_when_thresholds_change() {
        let conn = test_conn();
        let reading = Reading::create(
            &conn,
            &ReadingCreate {
                value: 90,
                category: Category::Fasting,
                timestamp: ts("2024-01-07T07:00:00Z"),
            },
            &RangeThresholds::defaults(),
        )
        .unwrap();
        assert_eq!(reading.status, Status::InRange);

        let tighter = RangeThresholds::defaults()
            .with(Category::Fasting, GlucoseRange::new(70, 85));

        // Stored status still reflects the thresholds at write time
        let stored = Reading::get_by_id(&conn, &reading.id).unwrap().unwrap();
        assert_eq!(stored.status, Status::InRange);

        // An explicit update recomputes against the current thresholds
        let updated = Reading::update(
            &conn,
            &reading.id,
            &ReadingUpdate { value: Some(90), ..Default::default() },
            &tighter,
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.status, Status::AboveRange);
    }

    #[test]
    fn test_update_missing_reading_returns_none() {
        let conn = test_conn();
        let result = Reading::update(
            &conn,
            "missing",
            &ReadingUpdate { value: Some(100), ..Default::default() },
            &RangeThresholds::defaults(),
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_list_newest_first_and_delete() {
        let conn = test_conn();
        let thresholds = RangeThresholds::defaults();
        for (value, when) in [(90, "2024-01-07T07:00:00Z"), (110, "2024-01-08T07:00:00Z")] {
            Reading::create(
                &conn,
                &ReadingCreate { value, category: Category::Fasting, timestamp: ts(when) },
                &thresholds,
            )
            .unwrap();
        }

        let all = Reading::list(&conn, None).unwrap();
        assert_eq!(all.iter().map(|r| r.value).collect::<Vec<_>>(), vec![110, 90]);
        assert_eq!(Reading::list(&conn, Some(1)).unwrap().len(), 1);

        assert!(Reading::delete(&conn, &all[0].id).unwrap());
        assert!(!Reading::delete(&conn, &all[0].id).unwrap());
        assert_eq!(Reading::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_list_between_is_inclusive_and_ascending() {
        let conn = test_conn();
        let thresholds = RangeThresholds::defaults();
        for (value, when) in [
            (80, "2024-01-06T23:59:59.999Z"),
            (90, "2024-01-07T00:00:00Z"),
            (100, "2024-01-10T08:00:00Z"),
            (110, "2024-01-13T23:59:59.999Z"),
            (120, "2024-01-14T00:00:00Z"),
        ] {
            Reading::create(
                &conn,
                &ReadingCreate { value, category: Category::Fasting, timestamp: ts(when) },
                &thresholds,
            )
            .unwrap();
        }

        let week = Reading::list_between(
            &conn,
            &ts("2024-01-07T00:00:00Z"),
            &ts("2024-01-13T23:59:59.999999Z"),
        )
        .unwrap();
        assert_eq!(week.iter().map(|r| r.value).collect::<Vec<_>>(), vec![90, 100, 110]);
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        assert_eq!(
            parse_timestamp("2024-01-07T09:00:00+02:00"),
            Some(ts("2024-01-07T07:00:00Z"))
        );
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(format_timestamp(&ts("2024-01-07T07:00:00Z")), "2024-01-07T07:00:00.000Z");
    }
}
