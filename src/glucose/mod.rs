//! Glucose domain logic
//!
//! Pure functions over readings and range settings: range classification,
//! the weekly grid, report windows, display formatting and value
//! recognition. Nothing in here touches the database.

pub mod category;
pub mod evaluator;
pub mod format;
pub mod grid;
pub mod recognition;
pub mod thresholds;
pub mod window;

pub use category::{Category, Status};
pub use evaluator::classify;
pub use format::{DateFormatter, EnglishFormatter, HebrewFormatter, Locale};
pub use grid::{
    build_report_rows, build_week_grid, is_future_day, local_midnight, week_start, DayRow,
    WeekWindow,
};
pub use recognition::{extract_glucose_value, parse_value_input};
pub use thresholds::{default_range, GlucoseRange, RangeError, RangeThresholds};
pub use window::{filter_by_range, ReportRange, ReportWindow};
