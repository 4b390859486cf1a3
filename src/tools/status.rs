//! SugarMama Status Tool
//!
//! Provides runtime status information about the SugarMama service, plus
//! the measurement guide served by the tracking_instructions tool.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::config::Config;

/// Measurement and usage guide for assistants and users
pub const TRACKING_INSTRUCTIONS: &str = r#"
# SugarMama Glucose Tracking Instructions

This guide explains how to record glucose readings during pregnancy and how
to use the SugarMama tools.

## Daily Measurement Schedule (4 readings)

1. **Fasting** (`fasting`): in the morning right after waking, before eating,
   drinking or brushing teeth, after at least 8 hours with only water.
2. **After breakfast** (`post_breakfast`): two hours after the first bite.
3. **After lunch** (`post_lunch`): two hours after the first bite.
4. **After dinner** (`post_dinner`): two hours after the first bite.

## Default Target Ranges (mg/dL)

| Category | Lower | Upper |
|----------|-------|-------|
| Fasting | 70 | 95 |
| After a meal | 70 | 120 |

Both bounds are inclusive. These ranges are general guidance only: the
personal targets come from the doctor or dietitian. Ranges can be tightened
with `set_range` but never widened past the defaults.

## Preparing a Measurement

- Wash hands with soap and water so food residue does not raise the
  reading, then dry them well.
- Load a new lancet and a new test strip following the meter's booklet.

## Taking the Measurement

- Insert the strip; the meter switches on by itself.
- Set the lancing depth and prick the side of the fingertip.
- Squeeze gently until a drop forms and touch the strip to it.
- Wait for the value and record it right away.

## After the Measurement

- Discard the used strip.
- Change the lancet once a day or as convenient.

---

## Recording a Reading

**Tool:** `add_reading`
- `value`: the number on the meter, e.g. `"104"`
- `category`: `fasting`, `post_breakfast`, `post_lunch` or `post_dinner`
- `timestamp` (optional): RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`
  (local time). Defaults to now. Future days are rejected.

The status (`belowRange`, `inRange`, `aboveRange`) is computed when the
reading is saved and kept even if the ranges change later. Updating a reading
with `update_reading` recomputes it.

**Before saving**, `preview_status` shows the status a value would get.
If the user has a photo of the meter, pass the OCR text to
`suggest_value_from_text` and confirm the suggestion with the user.

## Reviewing

- `get_week_view` with `offset` 0 for this week, -1 for last week, and so on.
  Weeks run Sunday to Saturday.
- `list_readings` lists everything, newest first.

## Reports

`export_pdf_report` writes a PDF for the care team.
- `range`: `week`, `month` (default), `three_months` or `all`
- Only days with readings appear; statuses use the current ranges.
- Set the name on the report with `set_patient_info`.
"#;

/// Runtime status of the SugarMama service
#[derive(Debug, Clone, Serialize)]
pub struct SugarMamaStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub reading_count: Option<i64>,

    /// Configuration
    pub reports_dir: String,
    pub locale: String,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    reports_dir: PathBuf,
    locale: String,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(config: &Config) -> Self {
        Self {
            start_time: Instant::now(),
            database_path: config.database_path.clone(),
            reports_dir: config.reports_dir.clone(),
            locale: config.locale.as_str().to_string(),
        }
    }

    /// Get the current status
    pub fn get_status(&self, reading_count: Option<i64>) -> SugarMamaStatus {
        let build_info = BuildInfo::current();

        // Get database size if it exists
        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        SugarMamaStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            reading_count,
            reports_dir: self.reports_dir.display().to_string(),
            locale: self.locale.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
