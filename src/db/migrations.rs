//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!(version = 1, "Applied schema migration");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- READINGS
        -- Glucose measurements with cached range status
        -- ============================================
        CREATE TABLE readings (
            id TEXT PRIMARY KEY,                 -- UUID v4
            value INTEGER NOT NULL,              -- mg/dL
            unit TEXT NOT NULL DEFAULT 'mg/dL',
            category TEXT NOT NULL CHECK(category IN ('fasting', 'post_breakfast', 'post_lunch', 'post_dinner')),
            timestamp TEXT NOT NULL,             -- RFC 3339, UTC, millisecond precision
            status TEXT NOT NULL CHECK(status IN ('belowRange', 'inRange', 'aboveRange')),

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_readings_timestamp ON readings(timestamp);
        CREATE INDEX idx_readings_category ON readings(category);

        -- ============================================
        -- RANGE SETTINGS
        -- Customised per-category ranges; absent rows use defaults
        -- ============================================
        CREATE TABLE range_settings (
            category TEXT PRIMARY KEY CHECK(category IN ('fasting', 'post_breakfast', 'post_lunch', 'post_dinner')),
            lower INTEGER NOT NULL,
            upper INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            CHECK (lower < upper)
        );

        -- ============================================
        -- PATIENT INFO
        -- Single row used for report headers
        -- ============================================
        CREATE TABLE patient_info (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            name TEXT NOT NULL,
            dob TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
