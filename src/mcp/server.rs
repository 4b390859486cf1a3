//! SugarMama MCP Server Implementation
//!
//! Implements the MCP server with all SugarMama tools.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::glucose::DateFormatter;
use crate::models::Reading;
use crate::tools::status::StatusTracker;
use crate::tools::{import, patient, ranges, readings, reports, week_view, ToolError};

/// SugarMama MCP Service
#[derive(Clone)]
pub struct SugarMamaService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    config: Arc<Config>,
    tool_router: ToolRouter<SugarMamaService>,
}

impl SugarMamaService {
    pub fn new(config: Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(&config))),
            database,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    fn formatter(&self) -> &'static dyn DateFormatter {
        self.config.locale.formatter()
    }
}

fn to_mcp_error(e: ToolError) -> McpError {
    match e {
        ToolError::InvalidInput(message) => McpError::invalid_params(message, None),
        ToolError::Failed(message) => McpError::internal_error(message, None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Reading Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddReadingParams {
    /// Glucose value in mg/dL as entered, e.g. "104"
    pub value: String,
    /// Category: fasting, post_breakfast, post_lunch, post_dinner
    pub category: String,
    /// When it was measured: RFC 3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD" in local time (defaults to now)
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetReadingParams {
    /// Reading ID
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListReadingsParams {
    /// Maximum number of readings to return (newest first)
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateReadingParams {
    /// Reading ID
    pub id: String,
    /// New value in mg/dL
    pub value: Option<String>,
    /// New category
    pub category: Option<String>,
    /// New timestamp
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteReadingParams {
    /// Reading ID
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewStatusParams {
    /// Value as typed so far
    pub value: String,
    /// Category the value is for
    pub category: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SuggestValueParams {
    /// Raw OCR text read from a photo of the meter display
    pub raw_text: String,
}

// ============================================================================
// Range Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetRangeParams {
    /// Category: fasting, post_breakfast, post_lunch, post_dinner
    pub category: String,
    /// Lower bound in mg/dL (inclusive, at least 70)
    pub lower: i64,
    /// Upper bound in mg/dL (inclusive, at most 95 fasting / 120 after meals)
    pub upper: i64,
}

// ============================================================================
// View, Report and Import Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetWeekViewParams {
    /// Weeks relative to the current one: 0 = this week, -1 = last week (positive values are clamped to 0)
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportPdfReportParams {
    /// Report window: week, month (default), three_months, all
    pub range: Option<String>,
    /// Output file path (defaults to the reports directory)
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportLegacyExportParams {
    /// Legacy export JSON text
    pub json: Option<String>,
    /// Path to a legacy export file (used when json is not given)
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPatientInfoParams {
    /// Patient name shown in the report header
    pub name: String,
    /// Date of birth (YYYY-MM-DD)
    pub dob: Option<String>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl SugarMamaService {
    // --- Status ---

    #[tool(description = "Get the current status of the SugarMama service including build info, database status, and process information")]
    async fn sugarmama_status(&self) -> Result<CallToolResult, McpError> {
        let reading_count = self
            .database
            .with_conn(Reading::count)
            .map_err(|e| tracing::warn!(error = %e, "Could not count readings"))
            .ok();
        let tracker = self.status_tracker.lock().await;
        json_result(&tracker.get_status(reading_count))
    }

    #[tool(description = "Get the glucose measurement guide and instructions for using the tracking tools. Call this when starting a session or when unsure how to record readings.")]
    fn tracking_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::TRACKING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(TRACKING_INSTRUCTIONS)]))
    }

    // --- Readings ---

    #[tool(description = "Record a glucose reading. The range status is computed with the current ranges and stored with the reading. Readings on future days are rejected.")]
    fn add_reading(&self, Parameters(p): Parameters<AddReadingParams>) -> Result<CallToolResult, McpError> {
        let result = readings::add_reading(
            &self.database,
            &p.value,
            &p.category,
            p.timestamp.as_deref(),
            &Local::now(),
            self.formatter(),
        )
        .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Get a glucose reading by ID")]
    fn get_reading(&self, Parameters(p): Parameters<GetReadingParams>) -> Result<CallToolResult, McpError> {
        let result = readings::get_reading(&self.database, &p.id, &Local, self.formatter())
            .map_err(to_mcp_error)?;
        match result {
            Some(reading) => json_result(&reading),
            None => json_result(&serde_json::json!({"error": "Reading not found", "id": p.id})),
        }
    }

    #[tool(description = "List glucose readings, newest first")]
    fn list_readings(&self, Parameters(p): Parameters<ListReadingsParams>) -> Result<CallToolResult, McpError> {
        let result = readings::list_readings(&self.database, p.limit, &Local, self.formatter())
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Correct a reading's value, category or time. The status is recomputed against the current ranges.")]
    fn update_reading(&self, Parameters(p): Parameters<UpdateReadingParams>) -> Result<CallToolResult, McpError> {
        let result = readings::update_reading(
            &self.database,
            &p.id,
            p.value.as_deref(),
            p.category.as_deref(),
            p.timestamp.as_deref(),
            &Local::now(),
            self.formatter(),
        )
        .map_err(to_mcp_error)?;
        match result {
            Some(reading) => json_result(&reading),
            None => json_result(&serde_json::json!({"error": "Reading not found", "id": p.id})),
        }
    }

    #[tool(description = "Permanently delete a glucose reading")]
    fn delete_reading(&self, Parameters(p): Parameters<DeleteReadingParams>) -> Result<CallToolResult, McpError> {
        let result = readings::delete_reading(&self.database, &p.id).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Preview the range status a value would get, without saving. Returns a null status when the value is not a number.")]
    fn preview_status(&self, Parameters(p): Parameters<PreviewStatusParams>) -> Result<CallToolResult, McpError> {
        let result = readings::preview_status(&self.database, &p.value, &p.category, self.formatter())
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Suggest a glucose value from OCR text of a meter photo. The suggestion must be confirmed by the user before saving.")]
    fn suggest_value_from_text(&self, Parameters(p): Parameters<SuggestValueParams>) -> Result<CallToolResult, McpError> {
        json_result(&readings::suggest_value_from_text(&p.raw_text))
    }

    // --- Ranges ---

    #[tool(description = "Get the current target range for each category")]
    fn get_ranges(&self) -> Result<CallToolResult, McpError> {
        let result = ranges::get_ranges(&self.database, self.formatter()).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Tighten the target range for one category. Bounds are clamped to the defaults (70-95 fasting, 70-120 after meals). Existing readings keep their status.")]
    fn set_range(&self, Parameters(p): Parameters<SetRangeParams>) -> Result<CallToolResult, McpError> {
        let result = ranges::set_range(&self.database, &p.category, p.lower, p.upper, self.formatter())
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Reset every target range to its default")]
    fn reset_ranges(&self) -> Result<CallToolResult, McpError> {
        let result = ranges::reset_ranges(&self.database, self.formatter()).map_err(to_mcp_error)?;
        json_result(&result)
    }

    // --- Week view ---

    #[tool(description = "Get a Sunday-to-Saturday grid of readings by day and category. offset 0 is the current week, -1 the previous week.")]
    fn get_week_view(&self, Parameters(p): Parameters<GetWeekViewParams>) -> Result<CallToolResult, McpError> {
        let result = week_view::get_week_view(&self.database, p.offset, &Local::now(), self.formatter())
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    // --- Reports ---

    #[tool(description = "Export readings to a PDF report for the care team. range: week, month (default), three_months, all. Statuses use the current ranges.")]
    fn export_pdf_report(&self, Parameters(p): Parameters<ExportPdfReportParams>) -> Result<CallToolResult, McpError> {
        let result = reports::export_pdf_report(
            &self.database,
            p.range.as_deref(),
            p.output_path.as_deref(),
            &self.config.reports_dir,
            &Local::now(),
        )
        .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Set the patient name and date of birth printed on reports")]
    fn set_patient_info(&self, Parameters(p): Parameters<SetPatientInfoParams>) -> Result<CallToolResult, McpError> {
        let result = patient::set_patient_info(&self.database, &p.name, p.dob.as_deref())
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Get the patient details printed on reports")]
    fn get_patient_info(&self) -> Result<CallToolResult, McpError> {
        let result = patient::get_patient_info(&self.database).map_err(to_mcp_error)?;
        match result {
            Some(info) => json_result(&info),
            None => json_result(&serde_json::json!({"error": "Patient info not set"})),
        }
    }

    // --- Import ---

    #[tool(description = "Import a legacy export (JSON with measurements and ranges). Old category names are migrated; 'Before Sleep' becomes post_dinner. Measurements on future days are skipped. Pass either json or file_path.")]
    fn import_legacy_export(&self, Parameters(p): Parameters<ImportLegacyExportParams>) -> Result<CallToolResult, McpError> {
        let now = Local::now();
        let result = match (p.json.as_deref(), p.file_path.as_deref()) {
            (Some(json), _) => import::import_legacy_export(&self.database, json, &now),
            (None, Some(path)) => import::import_legacy_file(&self.database, Path::new(path), &now),
            (None, None) => Err(ToolError::invalid("Either json or file_path is required")),
        }
        .map_err(to_mcp_error)?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for SugarMamaService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sugarmama".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("SugarMama".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SugarMama - glucose tracking for gestational diabetes. \
                 IMPORTANT: Call tracking_instructions first for the measurement guide. \
                 Readings: add/get/list/update/delete_reading, preview_status, suggest_value_from_text. \
                 Ranges: get_ranges, set_range (tighten only), reset_ranges. \
                 Views: get_week_view (offset 0 = this week, negative = earlier). \
                 Reports: export_pdf_report, set_patient_info, get_patient_info. \
                 Migration: import_legacy_export."
                    .into(),
            ),
        }
    }
}
