//! Report window selection and time filtering

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Reading;

/// Named lookback window for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    Week,
    #[default]
    Month,
    ThreeMonths,
    All,
}

impl ReportRange {
    pub const ALL: [ReportRange; 4] = [
        ReportRange::Week,
        ReportRange::Month,
        ReportRange::ThreeMonths,
        ReportRange::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportRange::Week => "week",
            ReportRange::Month => "month",
            ReportRange::ThreeMonths => "three_months",
            ReportRange::All => "all",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "week" | "last_week" => Some(ReportRange::Week),
            "month" | "last_month" => Some(ReportRange::Month),
            "three_months" | "threemonths" | "3_months" | "quarter" => Some(ReportRange::ThreeMonths),
            "all" => Some(ReportRange::All),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReportRange::Week => "Last week",
            ReportRange::Month => "Last month",
            ReportRange::ThreeMonths => "Last 3 months",
            ReportRange::All => "All measurements",
        }
    }

    /// Days looked back from `now`; `None` for an unbounded window
    pub fn lookback_days(&self) -> Option<u64> {
        match self {
            ReportRange::Week => Some(7),
            ReportRange::Month => Some(30),
            ReportRange::ThreeMonths => Some(90),
            ReportRange::All => None,
        }
    }

    /// Resolve to explicit bounds relative to `now`.
    ///
    /// The lookback is calendar days in `now`'s timezone, so the start keeps
    /// the same wall-clock time across a DST change.
    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ReportWindow {
        let Some(days) = self.lookback_days() else {
            return ReportWindow::unbounded();
        };

        let start = now
            .clone()
            .checked_sub_days(Days::new(days))
            .unwrap_or_else(|| now.clone() - Duration::days(days as i64));

        ReportWindow {
            start: Some(start.with_timezone(&Utc)),
            end: Some(now.with_timezone(&Utc)),
        }
    }
}

/// Optional inclusive bounds on reading timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *ts >= start) && self.end.map_or(true, |end| *ts <= end)
    }
}

/// Keep readings whose timestamp lies within the inclusive bounds
pub fn filter_by_range(
    readings: &[Reading],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Reading> {
    let window = ReportWindow { start, end };
    readings
        .iter()
        .filter(|r| window.contains(&r.timestamp))
        .cloned()
        .collect()
}
