//! Persisted range settings
//!
//! One row per category that has been customised. Missing rows resolve to
//! the built-in defaults, so a fresh database needs no seeding.

use rusqlite::{params, Connection};

use crate::db::DbResult;
use crate::glucose::{Category, GlucoseRange, RangeThresholds};

/// Load the stored thresholds, normalized against the defaults
pub fn load_thresholds(conn: &Connection) -> DbResult<RangeThresholds> {
    let mut stmt = conn.prepare("SELECT category, lower, upper FROM range_settings")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut thresholds = RangeThresholds::default();
    for (key, lower, upper) in rows {
        match Category::from_str(&key) {
            Some(category) => thresholds.set(category, GlucoseRange::new(lower, upper)),
            None => tracing::warn!(category = %key, "Ignoring range for unknown category"),
        }
    }

    Ok(thresholds.normalize())
}

/// Replace every stored range with the given configuration.
///
/// Callers normalize and validate first, and own the transaction.
pub fn save_thresholds(conn: &Connection, thresholds: &RangeThresholds) -> DbResult<()> {
    conn.execute("DELETE FROM range_settings", [])?;
    for (category, range) in thresholds.iter() {
        conn.execute(
            r#"
            INSERT INTO range_settings (category, lower, upper)
            VALUES (?1, ?2, ?3)
            "#,
            params![category.as_str(), range.lower, range.upper],
        )?;
    }
    Ok(())
}

/// Tighten one category's range and persist the whole configuration.
///
/// Existing readings keep their cached status.
pub fn update_range(
    conn: &mut Connection,
    category: Category,
    range: GlucoseRange,
) -> DbResult<RangeThresholds> {
    let mut thresholds = load_thresholds(conn)?;
    thresholds.set(category, range);
    let normalized = thresholds.normalize();
    normalized.validate()?;

    let tx = conn.transaction()?;
    save_thresholds(&tx, &normalized)?;
    tx.commit()?;
    Ok(normalized)
}

/// Drop every customised range
pub fn reset_thresholds(conn: &Connection) -> DbResult<()> {
    conn.execute("DELETE FROM range_settings", [])?;
    Ok(())
}
