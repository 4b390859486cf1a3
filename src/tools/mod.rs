//! SugarMama Tools module
//!
//! Tool implementations behind the MCP server. Each function checks out a
//! pooled connection, does its work and returns a serializable response.

pub mod import;
pub mod patient;
pub mod ranges;
pub mod readings;
pub mod reports;
pub mod status;
pub mod week_view;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::db::DbError;
use crate::glucose::Category;
use crate::models::parse_timestamp;

/// Tool failure, split by who has to fix it
#[derive(Debug, Error)]
pub enum ToolError {
    /// The request itself is wrong; retrying with other input can succeed
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidInput(message.into())
    }
}

impl From<DbError> for ToolError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InvalidRange(inner) => ToolError::InvalidInput(inner.to_string()),
            other => ToolError::Failed(format!("Database error: {}", other)),
        }
    }
}

/// Category from a canonical key, an alias or its Hebrew label
pub fn parse_category(input: &str) -> ToolResult<Category> {
    Category::from_str(input)
        .or_else(|| {
            Category::ALL
                .into_iter()
                .find(|c| c.hebrew_name() == input.trim())
        })
        .ok_or_else(|| {
            ToolError::invalid(format!(
                "Invalid category: '{}'. Valid categories: fasting, post_breakfast, post_lunch, post_dinner",
                input
            ))
        })
}

/// Instant from user input, interpreted in `now`'s timezone.
///
/// Accepts RFC 3339, a local `YYYY-MM-DD HH:MM[:SS]` (or with `T`), or a bare
/// `YYYY-MM-DD`, which takes the current wall-clock time on that day.
pub fn parse_local_timestamp<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
) -> ToolResult<DateTime<Utc>> {
    let input = input.trim();
    if let Some(ts) = parse_timestamp(input) {
        return Ok(ts);
    }

    let tz = now.timezone();
    let local = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(now.time()))
        });

    local
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            ToolError::invalid(format!(
                "Invalid timestamp: '{}'. Use RFC 3339, 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD'",
                input
            ))
        })
}
