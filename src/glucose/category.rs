//! Measurement categories and range status
//!
//! The four daily measurement contexts and the classification a reading
//! receives against its category's range.

use serde::{Deserialize, Serialize};

/// Measurement context for a glucose reading.
///
/// Declaration order is the display order: grid columns and report columns
/// both follow it, which is why `Ord` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Fasting,
    PostBreakfast,
    PostLunch,
    PostDinner,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::Fasting,
        Category::PostBreakfast,
        Category::PostLunch,
        Category::PostDinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fasting => "fasting",
            Category::PostBreakfast => "post_breakfast",
            Category::PostLunch => "post_lunch",
            Category::PostDinner => "post_dinner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "fasting" | "fast" => Some(Category::Fasting),
            "post_breakfast" | "after_breakfast" | "breakfast" => Some(Category::PostBreakfast),
            "post_lunch" | "after_lunch" | "lunch" => Some(Category::PostLunch),
            "post_dinner" | "after_dinner" | "dinner" => Some(Category::PostDinner),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Fasting => "Fasting",
            Category::PostBreakfast => "After Breakfast",
            Category::PostLunch => "After Lunch",
            Category::PostDinner => "After Dinner",
        }
    }

    /// Localized label used by the Hebrew interface
    pub fn hebrew_name(&self) -> &'static str {
        match self {
            Category::Fasting => "צום",
            Category::PostBreakfast => "אחרי ארוחת בוקר",
            Category::PostLunch => "אחרי ארוחת צהריים",
            Category::PostDinner => "אחרי ארוחת ערב",
        }
    }
}

/// Classification of a reading relative to its category's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    BelowRange,
    InRange,
    AboveRange,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::BelowRange => "belowRange",
            Status::InRange => "inRange",
            Status::AboveRange => "aboveRange",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "belowRange" | "below_range" | "below" => Some(Status::BelowRange),
            "inRange" | "in_range" => Some(Status::InRange),
            "aboveRange" | "above_range" | "above" => Some(Status::AboveRange),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Status::BelowRange => "Below range",
            Status::InRange => "In range",
            Status::AboveRange => "Above range",
        }
    }

    /// Compact label for report cells
    pub fn short_label(&self) -> &'static str {
        match self {
            Status::BelowRange => "below",
            Status::InRange => "in range",
            Status::AboveRange => "above",
        }
    }

    pub fn hebrew_name(&self) -> &'static str {
        match self {
            Status::BelowRange => "מתחת לטווח",
            Status::InRange => "בטווח",
            Status::AboveRange => "מעל הטווח",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_matches_columns() {
        let mut shuffled = vec![
            Category::PostDinner,
            Category::Fasting,
            Category::PostLunch,
            Category::PostBreakfast,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Category::ALL.to_vec());
    }

    #[test]
    fn test_category_from_str_aliases() {
        assert_eq!(Category::from_str("fasting"), Some(Category::Fasting));
        assert_eq!(Category::from_str("Post-Breakfast"), Some(Category::PostBreakfast));
        assert_eq!(Category::from_str("after lunch"), Some(Category::PostLunch));
        assert_eq!(Category::from_str("dinner"), Some(Category::PostDinner));
        assert_eq!(Category::from_str("before sleep"), None);
    }

    #[test]
    fn test_category_round_trips_through_key() {
        for category in Category::ALL {
            assert_eq!(Category::from_str(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_string(&Status::AboveRange).unwrap();
        assert_eq!(json, "\"aboveRange\"");
        assert_eq!(Status::from_str("inRange"), Some(Status::InRange));
        assert_eq!(Status::from_str("unknown"), None);
    }
}
