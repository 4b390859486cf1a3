//! Legacy export migration
//!
//! Older exports keyed categories by their English labels ("After Lunch")
//! or their localized Hebrew labels, and tracked a fifth "Before Sleep"
//! context that is now folded into post-dinner. This module turns such an
//! export into canonical readings and range settings before anything is
//! written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::glucose::{Category, GlucoseRange, RangeThresholds};
use crate::models::reading::parse_timestamp;

/// Raw export as written by the old client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyExport {
    #[serde(default)]
    pub measurements: Vec<LegacyMeasurement>,
    #[serde(default)]
    pub ranges: BTreeMap<String, LegacyRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMeasurement {
    #[serde(default)]
    pub id: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub timestamp: String,
    pub category: String,
    /// Ignored; status is recomputed on import
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LegacyRange {
    pub lower: i64,
    pub upper: i64,
}

/// A measurement that survived migration
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedMeasurement {
    /// Position in the export's measurement list
    pub index: usize,
    pub legacy_id: Option<String>,
    pub value: i64,
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}

/// Why a measurement was left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMeasurement {
    pub index: usize,
    pub reason: String,
}

/// Canonical form of a legacy export
#[derive(Debug, Clone, Default)]
pub struct MigratedExport {
    pub measurements: Vec<MigratedMeasurement>,
    /// Export ranges merged over the defaults; `None` when the export had none
    pub ranges: Option<RangeThresholds>,
    pub skipped: Vec<SkippedMeasurement>,
    pub unknown_range_keys: Vec<String>,
}

/// Map an old or localized category key to its category.
///
/// "Before Sleep" has no counterpart and becomes post-dinner.
pub fn migrate_category_key(key: &str) -> Option<Category> {
    match key.trim() {
        "Fasting" => Some(Category::Fasting),
        "After Breakfast" => Some(Category::PostBreakfast),
        "After Lunch" => Some(Category::PostLunch),
        "After Dinner" | "Before Sleep" => Some(Category::PostDinner),
        other => Category::ALL
            .into_iter()
            .find(|c| c.hebrew_name() == other)
            .or_else(|| Category::from_str(other)),
    }
}

impl LegacyExport {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Rewrite categories, parse timestamps and merge ranges.
    ///
    /// Entries with an unknown category or an unreadable timestamp are
    /// skipped and reported, never guessed.
    pub fn migrate(&self) -> MigratedExport {
        let mut out = MigratedExport::default();

        for (index, m) in self.measurements.iter().enumerate() {
            let Some(category) = migrate_category_key(&m.category) else {
                out.skipped.push(SkippedMeasurement {
                    index,
                    reason: format!("unknown category '{}'", m.category),
                });
                continue;
            };
            let Some(timestamp) = parse_timestamp(&m.timestamp) else {
                out.skipped.push(SkippedMeasurement {
                    index,
                    reason: format!("invalid timestamp '{}'", m.timestamp),
                });
                continue;
            };
            if !m.value.is_finite() {
                out.skipped.push(SkippedMeasurement {
                    index,
                    reason: "value is not a number".to_string(),
                });
                continue;
            }

            out.measurements.push(MigratedMeasurement {
                index,
                legacy_id: m.id.clone().filter(|id| !id.trim().is_empty()),
                value: m.value.round() as i64,
                category,
                timestamp,
            });
        }

        if !self.ranges.is_empty() {
            let mut merged = RangeThresholds::defaults();
            for (key, range) in &self.ranges {
                match migrate_category_key(key) {
                    Some(category) => {
                        merged.set(category, GlucoseRange::new(range.lower, range.upper))
                    }
                    None => out.unknown_range_keys.push(key.clone()),
                }
            }
            out.ranges = Some(merged.normalize());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_category_keys() {
        assert_eq!(migrate_category_key("Fasting"), Some(Category::Fasting));
        assert_eq!(migrate_category_key("After Breakfast"), Some(Category::PostBreakfast));
        assert_eq!(migrate_category_key("After Lunch"), Some(Category::PostLunch));
        assert_eq!(migrate_category_key("After Dinner"), Some(Category::PostDinner));
        assert_eq!(migrate_category_key("Before Sleep"), Some(Category::PostDinner));
        assert_eq!(migrate_category_key("צום"), Some(Category::Fasting));
        assert_eq!(migrate_category_key("אחרי ארוחת ערב"), Some(Category::PostDinner));
        assert_eq!(migrate_category_key("post_lunch"), Some(Category::PostLunch));
        assert_eq!(migrate_category_key("Snack"), None);
    }

    #[test]
    fn test_migrate_export() {
        let json = r#"{
            "measurements": [
                {"id": "a1", "value": 92, "unit": "mg/dL", "timestamp": "2024-01-07T05:00:00.000Z", "category": "Fasting", "status": "inRange"},
                {"id": "a2", "value": 131, "timestamp": "2024-01-07T19:30:00.000Z", "category": "Before Sleep"},
                {"id": "a3", "value": 100, "timestamp": "2024-01-08T05:00:00.000Z", "category": "Snack"},
                {"value": 110, "timestamp": "yesterday", "category": "After Lunch"}
            ],
            "ranges": {
                "Fasting": {"lower": 60, "upper": 90},
                "Bedtime": {"lower": 70, "upper": 130}
            }
        }"#;

        let migrated = LegacyExport::from_json(json).unwrap().migrate();

        assert_eq!(migrated.measurements.len(), 2);
        assert_eq!(migrated.measurements[0].legacy_id.as_deref(), Some("a1"));
        assert_eq!(migrated.measurements[1].category, Category::PostDinner);
        assert_eq!(migrated.measurements[1].value, 131);

        let reasons: Vec<usize> = migrated.skipped.iter().map(|s| s.index).collect();
        assert_eq!(reasons, vec![2, 3]);

        let ranges = migrated.ranges.unwrap();
        assert_eq!(ranges.get(Category::Fasting), GlucoseRange::new(70, 90));
        assert_eq!(ranges.get(Category::PostDinner), GlucoseRange::new(70, 120));
        assert_eq!(migrated.unknown_range_keys, vec!["Bedtime".to_string()]);
    }

    #[test]
    fn test_export_without_ranges() {
        let migrated = LegacyExport::from_json(r#"{"measurements": []}"#)
            .unwrap()
            .migrate();
        assert!(migrated.ranges.is_none());
        assert!(migrated.measurements.is_empty());
    }
}
