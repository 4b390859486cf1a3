//! Range settings MCP Tools
//!
//! Changing a range never reclassifies stored readings; only readings added
//! or updated afterwards see the new bounds.

use serde::Serialize;

use crate::db::Database;
use crate::glucose::{default_range, DateFormatter, GlucoseRange, RangeThresholds};
use crate::models::{load_thresholds, reset_thresholds, update_range};

use super::{parse_category, ToolError, ToolResult};

/// One category's effective range
#[derive(Debug, Serialize)]
pub struct RangeEntry {
    pub category: String,
    pub category_label: String,
    pub lower: i64,
    pub upper: i64,
    pub default_lower: i64,
    pub default_upper: i64,
    pub customized: bool,
}

/// Response for get_ranges, set_range and reset_ranges
#[derive(Debug, Serialize)]
pub struct RangesResponse {
    pub ranges: Vec<RangeEntry>,
    pub unit: &'static str,
    pub message: Option<String>,
}

fn ranges_response(
    thresholds: &RangeThresholds,
    formatter: &dyn DateFormatter,
    message: Option<String>,
) -> RangesResponse {
    let ranges = thresholds
        .iter()
        .map(|(category, range)| {
            let default = default_range(category);
            RangeEntry {
                category: category.as_str().to_string(),
                category_label: formatter.category_label(category).to_string(),
                lower: range.lower,
                upper: range.upper,
                default_lower: default.lower,
                default_upper: default.upper,
                customized: range != default,
            }
        })
        .collect();

    RangesResponse {
        ranges,
        unit: crate::models::GLUCOSE_UNIT,
        message,
    }
}

/// Current effective ranges
pub fn get_ranges(db: &Database, formatter: &dyn DateFormatter) -> ToolResult<RangesResponse> {
    let conn = db.get_conn()?;
    let thresholds = load_thresholds(&conn)?;
    Ok(ranges_response(&thresholds, formatter, None))
}

/// Tighten one category's range.
///
/// Bounds outside the default are clamped back to it; a range that ends up
/// empty is rejected and nothing is stored.
pub fn set_range(
    db: &Database,
    category: &str,
    lower: i64,
    upper: i64,
    formatter: &dyn DateFormatter,
) -> ToolResult<RangesResponse> {
    let category = parse_category(category)?;
    if lower >= upper {
        return Err(ToolError::invalid(format!(
            "Lower bound ({}) must be below upper bound ({})",
            lower, upper
        )));
    }

    let requested = GlucoseRange::new(lower, upper);
    let thresholds = db.with_conn_mut(|conn| update_range(conn, category, requested))?;
    let applied = thresholds.get(category);

    tracing::info!(
        category = category.as_str(),
        lower = applied.lower,
        upper = applied.upper,
        "Range updated"
    );

    let message = (applied != requested).then(|| {
        format!(
            "Requested {}-{} was clamped to {}-{}; ranges can only be tightened",
            lower, upper, applied.lower, applied.upper
        )
    });

    Ok(ranges_response(&thresholds, formatter, message))
}

/// Restore the default ranges
pub fn reset_ranges(db: &Database, formatter: &dyn DateFormatter) -> ToolResult<RangesResponse> {
    let conn = db.get_conn()?;
    reset_thresholds(&conn)?;
    tracing::info!("Ranges reset to defaults");
    Ok(ranges_response(
        &RangeThresholds::defaults(),
        formatter,
        Some("Ranges reset to defaults".to_string()),
    ))
}
