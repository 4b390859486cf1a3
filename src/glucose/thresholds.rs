//! Per-category glucose ranges
//!
//! Every category has a shipped default range. User ranges may tighten a
//! default but never widen it: normalization clamps the lower bound up and
//! the upper bound down to the default bounds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Category;

/// Lower bound shared by every default range (mg/dL)
pub const DEFAULT_LOWER: i64 = 70;
/// Default fasting upper bound (mg/dL)
pub const DEFAULT_FASTING_UPPER: i64 = 95;
/// Default post-meal upper bound (mg/dL)
pub const DEFAULT_POST_MEAL_UPPER: i64 = 120;

/// Range configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("Invalid range for {category}: lower ({lower}) must be below upper ({upper})")]
    Inverted {
        category: &'static str,
        lower: i64,
        upper: i64,
    },
}

/// Inclusive `[lower, upper]` range in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseRange {
    pub lower: i64,
    pub upper: i64,
}

impl GlucoseRange {
    pub const fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }
}

/// Built-in default range for a category
pub fn default_range(category: Category) -> GlucoseRange {
    match category {
        Category::Fasting => GlucoseRange::new(DEFAULT_LOWER, DEFAULT_FASTING_UPPER),
        Category::PostBreakfast | Category::PostLunch | Category::PostDinner => {
            GlucoseRange::new(DEFAULT_LOWER, DEFAULT_POST_MEAL_UPPER)
        }
    }
}

/// Range configuration keyed by category.
///
/// Categories without an explicit entry resolve to [`default_range`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeThresholds {
    ranges: BTreeMap<Category, GlucoseRange>,
}

impl RangeThresholds {
    /// Configuration with every category set to its default
    pub fn defaults() -> Self {
        Self {
            ranges: Category::ALL
                .iter()
                .map(|&c| (c, default_range(c)))
                .collect(),
        }
    }

    /// Range in effect for a category
    pub fn get(&self, category: Category) -> GlucoseRange {
        self.ranges
            .get(&category)
            .copied()
            .unwrap_or_else(|| default_range(category))
    }

    /// Explicitly configured range, if any
    pub fn explicit(&self, category: Category) -> Option<GlucoseRange> {
        self.ranges.get(&category).copied()
    }

    pub fn set(&mut self, category: Category, range: GlucoseRange) {
        self.ranges.insert(category, range);
    }

    /// Builder-style variant of [`RangeThresholds::set`]
    pub fn with(mut self, category: Category, range: GlucoseRange) -> Self {
        self.set(category, range);
        self
    }

    /// Iterate effective ranges in display order
    pub fn iter(&self) -> impl Iterator<Item = (Category, GlucoseRange)> + '_ {
        Category::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// Fill every category and clamp each range into its default bounds
    pub fn normalize(&self) -> Self {
        let ranges = Category::ALL
            .iter()
            .map(|&category| {
                let current = self.get(category);
                let default = default_range(category);
                let range = GlucoseRange::new(
                    current.lower.max(default.lower),
                    current.upper.min(default.upper),
                );
                (category, range)
            })
            .collect();
        Self { ranges }
    }

    pub fn is_normalized(&self) -> bool {
        *self == self.normalize()
    }

    /// Every effective range must have `lower < upper`
    pub fn validate(&self) -> Result<(), RangeError> {
        for (category, range) in self.iter() {
            if range.lower >= range.upper {
                return Err(RangeError::Inverted {
                    category: category.as_str(),
                    lower: range.lower,
                    upper: range.upper,
                });
            }
        }
        Ok(())
    }
}
