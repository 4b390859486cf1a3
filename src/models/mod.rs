//! Data models
//!
//! Rust structs representing database entities.

pub mod legacy;
mod patient;
pub mod range_settings;
pub mod reading;

pub use legacy::{migrate_category_key, LegacyExport, MigratedExport};
pub use patient::PatientInfo;
pub use range_settings::{load_thresholds, reset_thresholds, save_thresholds, update_range};
pub use reading::{
    format_timestamp, parse_timestamp, Reading, ReadingCreate, ReadingUpdate, GLUCOSE_UNIT,
};
