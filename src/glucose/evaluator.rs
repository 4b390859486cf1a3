//! Range status evaluation

use super::{Category, RangeThresholds, Status};

/// Classify a reading against its category's range.
///
/// Both bounds are inclusive: a value equal to `lower` or `upper` is in range.
pub fn classify(value: i64, category: Category, thresholds: &RangeThresholds) -> Status {
    let range = thresholds.get(category);
    if value < range.lower {
        Status::BelowRange
    } else if value > range.upper {
        Status::AboveRange
    } else {
        Status::InRange
    }
}
