//! Display formatting for dates and times
//!
//! Labels are presentation only. Grid bucketing works on `NaiveDate` and
//! never parses these strings back.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use super::{Category, Status};

/// Locale-aware labels for grid rows and report cells
pub trait DateFormatter {
    /// Short calendar date, e.g. `07/01/24`
    fn day_label(&self, date: NaiveDate) -> String;

    /// Full weekday name
    fn weekday_label(&self, date: NaiveDate) -> String;

    /// Wall-clock time of a reading
    fn time_label(&self, time: NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    /// Week navigation badge, e.g. `07/01 to 13/01`
    fn range_label(&self, start: NaiveDate, end: NaiveDate) -> String;

    fn category_label(&self, category: Category) -> &'static str;

    fn status_label(&self, status: Status) -> &'static str;
}

/// English labels (day-first dates)
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishFormatter;

impl DateFormatter for EnglishFormatter {
    fn day_label(&self, date: NaiveDate) -> String {
        date.format("%d/%m/%y").to_string()
    }

    fn weekday_label(&self, date: NaiveDate) -> String {
        date.format("%A").to_string()
    }

    fn range_label(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!("{} to {}", start.format("%d/%m"), end.format("%d/%m"))
    }

    fn category_label(&self, category: Category) -> &'static str {
        category.display_name()
    }

    fn status_label(&self, status: Status) -> &'static str {
        status.display_name()
    }
}

/// Hebrew labels matching the he-IL presentation
#[derive(Debug, Clone, Copy, Default)]
pub struct HebrewFormatter;

fn hebrew_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "יום ראשון",
        Weekday::Mon => "יום שני",
        Weekday::Tue => "יום שלישי",
        Weekday::Wed => "יום רביעי",
        Weekday::Thu => "יום חמישי",
        Weekday::Fri => "יום שישי",
        Weekday::Sat => "יום שבת",
    }
}

impl DateFormatter for HebrewFormatter {
    fn day_label(&self, date: NaiveDate) -> String {
        date.format("%d.%m.%y").to_string()
    }

    fn weekday_label(&self, date: NaiveDate) -> String {
        hebrew_weekday(date.weekday()).to_string()
    }

    fn range_label(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!("{} עד {}", start.format("%d.%m"), end.format("%d.%m"))
    }

    fn category_label(&self, category: Category) -> &'static str {
        category.hebrew_name()
    }

    fn status_label(&self, status: Status) -> &'static str {
        status.hebrew_name()
    }
}

/// Display locale selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Hebrew,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Hebrew => "he",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Locale::English),
            "he" | "he-il" | "hebrew" => Some(Locale::Hebrew),
            _ => None,
        }
    }

    pub fn formatter(&self) -> &'static dyn DateFormatter {
        match self {
            Locale::English => &EnglishFormatter,
            Locale::Hebrew => &HebrewFormatter,
        }
    }
}
