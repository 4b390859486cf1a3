//! Report MCP Tools
//!
//! PDF export of glucose readings for the care team. Rows come from the same
//! grid builder as the week view, restricted to days that have readings,
//! and every reading is re-evaluated against the ranges in effect when the
//! report is generated.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use printpdf::*;
use serde::Serialize;

use crate::db::Database;
use crate::glucose::{
    build_report_rows, classify, filter_by_range, Category, DateFormatter, DayRow,
    EnglishFormatter, RangeThresholds, ReportRange, Status,
};
use crate::models::{load_thresholds, PatientInfo, Reading};

use super::{ToolError, ToolResult};

// ============================================================================
// Color Constants (RGB 0-255)
// ============================================================================

const COLOR_TITLE: (u8, u8, u8) = (190, 24, 93);       // Rose
const COLOR_IN_RANGE: (u8, u8, u8) = (0, 140, 70);     // Green
const COLOR_ABOVE: (u8, u8, u8) = (200, 0, 0);         // Red
const COLOR_BELOW: (u8, u8, u8) = (0, 90, 180);        // Blue
const COLOR_BLACK: (u8, u8, u8) = (0, 0, 0);
const COLOR_GRAY: (u8, u8, u8) = (128, 128, 128);
const COLOR_LIGHT_GRAY: (u8, u8, u8) = (220, 220, 220);

// ============================================================================
// Page Layout (A4 portrait, millimetres)
// ============================================================================

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 12.0;
const MARGIN_TOP: f32 = 18.0;
const MARGIN_BOTTOM: f32 = 15.0;
const DATE_COL_WIDTH: f32 = 26.0;
const CATEGORY_COL_WIDTH: f32 = 42.0;
const CELL_LINE_HEIGHT: f32 = 3.8;
const ROW_PADDING: f32 = 2.5;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ExportReportResponse {
    pub success: bool,
    pub file_path: String,
    pub range: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub total_readings: usize,
    pub days_with_readings: usize,
    pub pages: usize,
    pub message: String,
}

/// Header block printed above the table
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub patient: Option<String>,
    pub period: String,
    pub generated: String,
}

// ============================================================================
// PDF Generation Helper Functions
// ============================================================================

fn rgb_to_printpdf(color: (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        color.0 as f32 / 255.0,
        color.1 as f32 / 255.0,
        color.2 as f32 / 255.0,
        None,
    ))
}

fn add_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    x: Mm,
    y: Mm,
    size: f32,
    color: (u8, u8, u8),
) {
    layer.set_fill_color(rgb_to_printpdf(color));
    layer.use_text(text, size, x, y, font);
}

fn add_line(
    layer: &PdfLayerReference,
    x1: Mm,
    y1: Mm,
    x2: Mm,
    y2: Mm,
    color: (u8, u8, u8),
    width: f32,
) {
    layer.set_outline_color(rgb_to_printpdf(color));
    layer.set_outline_thickness(width);

    let line = Line {
        points: vec![
            (Point::new(x1, y1), false),
            (Point::new(x2, y2), false),
        ],
        is_closed: false,
    };
    layer.add_line(line);
}

fn status_color(status: Status) -> (u8, u8, u8) {
    match status {
        Status::InRange => COLOR_IN_RANGE,
        Status::AboveRange => COLOR_ABOVE,
        Status::BelowRange => COLOR_BELOW,
    }
}

fn category_x(index: usize) -> f32 {
    MARGIN_LEFT + DATE_COL_WIDTH + index as f32 * CATEGORY_COL_WIDTH
}

/// One line per reading: `104 mg/dL - 08:15 - in range`
pub fn cell_lines<Tz: TimeZone>(
    readings: &[Reading],
    thresholds: &RangeThresholds,
    tz: &Tz,
    formatter: &dyn DateFormatter,
) -> Vec<(String, Status)> {
    readings
        .iter()
        .map(|r| {
            let status = classify(r.value, r.category, thresholds);
            let time = formatter.time_label(r.timestamp.with_timezone(tz).time());
            (
                format!("{} - {} - {}", r.format_value(), time, status.short_label()),
                status,
            )
        })
        .collect()
}

fn draw_table_header(layer: &PdfLayerReference, font_bold: &IndirectFontRef, y: f32) {
    add_text(layer, font_bold, "Date", Mm(MARGIN_LEFT), Mm(y), 9.0, COLOR_BLACK);
    for (i, category) in Category::ALL.iter().enumerate() {
        add_text(
            layer,
            font_bold,
            category.display_name(),
            Mm(category_x(i)),
            Mm(y),
            9.0,
            COLOR_BLACK,
        );
    }
    add_line(
        layer,
        Mm(MARGIN_LEFT),
        Mm(y - 1.8),
        Mm(PAGE_WIDTH - MARGIN_LEFT),
        Mm(y - 1.8),
        COLOR_GRAY,
        0.5,
    );
}

/// Render the report to `path`, returning the page count.
///
/// The builtin Helvetica fonts only cover Latin text, so the report is
/// always laid out with English labels.
pub fn render_report_pdf<Tz: TimeZone>(
    path: &Path,
    header: &ReportHeader,
    rows: &[DayRow],
    thresholds: &RangeThresholds,
    tz: &Tz,
) -> Result<usize, String> {
    let formatter = EnglishFormatter;

    let (doc, page1, layer1) = PdfDocument::new(
        "Glucose Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let font = doc.add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;
    let font_bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| e.to_string())?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut pages = 1;
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    // Title and header
    add_text(&layer, &font_bold, "Glucose Tracking Report", Mm(MARGIN_LEFT), Mm(y), 18.0, COLOR_TITLE);
    y -= 9.0;

    if let Some(patient) = &header.patient {
        add_text(&layer, &font, &format!("Patient: {}", patient), Mm(MARGIN_LEFT), Mm(y), 11.0, COLOR_BLACK);
        y -= 6.0;
    }

    add_text(&layer, &font, &format!("Period: {}", header.period), Mm(MARGIN_LEFT), Mm(y), 11.0, COLOR_BLACK);
    add_text(&layer, &font, &format!("Generated: {}", header.generated), Mm(120.0), Mm(y), 11.0, COLOR_BLACK);
    y -= 7.0;

    let ranges: Vec<String> = thresholds
        .iter()
        .map(|(c, r)| format!("{} {}-{}", c.display_name(), r.lower, r.upper))
        .collect();
    add_text(&layer, &font, &format!("Ranges (mg/dL): {}", ranges.join(", ")), Mm(MARGIN_LEFT), Mm(y), 9.0, COLOR_BLACK);
    y -= 5.0;
    add_text(
        &layer,
        &font,
        "Ranges are general guidance. Follow the personal targets set by your doctor or dietitian.",
        Mm(MARGIN_LEFT),
        Mm(y),
        8.0,
        COLOR_GRAY,
    );
    y -= 4.0;
    add_text(
        &layer,
        &font,
        "This report is for tracking only and does not replace medical advice.",
        Mm(MARGIN_LEFT),
        Mm(y),
        8.0,
        COLOR_GRAY,
    );
    y -= 10.0;

    draw_table_header(&layer, &font_bold, y);
    y -= 6.5;

    if rows.is_empty() {
        add_text(&layer, &font, "No measurements in the selected period.", Mm(MARGIN_LEFT), Mm(y), 10.0, COLOR_BLACK);
    }

    for row in rows {
        let cells: Vec<Vec<(String, Status)>> = Category::ALL
            .iter()
            .map(|&c| cell_lines(row.cell(c), thresholds, tz, &formatter))
            .collect();
        let line_count = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let row_height = line_count as f32 * CELL_LINE_HEIGHT + ROW_PADDING;

        if y - row_height < MARGIN_BOTTOM {
            let (page, page_layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page).get_layer(page_layer);
            pages += 1;
            y = PAGE_HEIGHT - MARGIN_TOP;
            draw_table_header(&layer, &font_bold, y);
            y -= 6.5;
        }

        add_text(&layer, &font_bold, &row.display_label, Mm(MARGIN_LEFT), Mm(y), 8.0, COLOR_BLACK);
        add_text(&layer, &font, &row.weekday_label, Mm(MARGIN_LEFT), Mm(y - CELL_LINE_HEIGHT), 7.0, COLOR_GRAY);

        for (i, lines) in cells.iter().enumerate() {
            for (j, (text, status)) in lines.iter().enumerate() {
                let line_y = y - j as f32 * CELL_LINE_HEIGHT;
                add_text(&layer, &font, text, Mm(category_x(i)), Mm(line_y), 7.5, status_color(*status));
            }
        }

        let row_bottom = y - row_height + 1.5;
        add_line(
            &layer,
            Mm(MARGIN_LEFT),
            Mm(row_bottom),
            Mm(PAGE_WIDTH - MARGIN_LEFT),
            Mm(row_bottom),
            COLOR_LIGHT_GRAY,
            0.3,
        );
        y -= row_height;
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| e.to_string())?;

    Ok(pages)
}

/// Default file name, e.g. `glucose-report-month-20240331-1200.pdf`
pub fn report_file_name<Tz: TimeZone>(range: ReportRange, now: &DateTime<Tz>) -> String {
    format!(
        "glucose-report-{}-{}.pdf",
        range.as_str().replace('_', "-"),
        now.naive_local().format("%Y%m%d-%H%M")
    )
}

fn period_label<Tz: TimeZone>(
    range: ReportRange,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    tz: &Tz,
    formatter: &dyn DateFormatter,
) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!(
            "{} ({} to {})",
            range.display_name(),
            formatter.day_label(start.with_timezone(tz).date_naive()),
            formatter.day_label(end.with_timezone(tz).date_naive())
        ),
        _ => range.display_name().to_string(),
    }
}

// ============================================================================
// Tool Functions
// ============================================================================

/// Export readings in the selected window to a PDF
pub fn export_pdf_report<Tz: TimeZone>(
    db: &Database,
    range: Option<&str>,
    output_path: Option<&str>,
    reports_dir: &Path,
    now: &DateTime<Tz>,
) -> ToolResult<ExportReportResponse> {
    let range = match range {
        Some(r) => ReportRange::from_str(r).ok_or_else(|| {
            ToolError::invalid(format!(
                "Invalid range: '{}'. Valid ranges: week, month, three_months, all",
                r
            ))
        })?,
        None => ReportRange::default(),
    };
    let path = output_path
        .map(PathBuf::from)
        .unwrap_or_else(|| reports_dir.join(report_file_name(range, now)));

    let conn = db.get_conn()?;
    let readings = Reading::list(&conn, None)
        .map_err(|e| ToolError::Failed(format!("Failed to load readings: {}", e)))?;
    let thresholds = load_thresholds(&conn)?;
    let patient = PatientInfo::get(&conn)?;
    drop(conn);

    let window = range.resolve(now);
    let filtered = filter_by_range(&readings, window.start, window.end);

    let tz = now.timezone();
    let formatter = EnglishFormatter;
    let rows = build_report_rows(&filtered, &Category::ALL, &tz, &formatter);

    let header = ReportHeader {
        patient: patient.map(|p| p.header_line()),
        period: period_label(range, window.start, window.end, &tz, &formatter),
        generated: now.naive_local().format("%d/%m/%y %H:%M").to_string(),
    };

    let pages = render_report_pdf(&path, &header, &rows, &thresholds, &tz)
        .map_err(|e| ToolError::Failed(format!("Failed to write report: {}", e)))?;

    let file_path = path.display().to_string();
    tracing::info!(
        path = %file_path,
        range = range.as_str(),
        readings = filtered.len(),
        pages,
        "Report written"
    );

    Ok(ExportReportResponse {
        success: true,
        range: range.as_str().to_string(),
        period_start: window.start.map(|t| t.to_rfc3339()),
        period_end: window.end.map(|t| t.to_rfc3339()),
        total_readings: filtered.len(),
        days_with_readings: rows.len(),
        pages,
        message: format!(
            "Report generated with {} readings over {} days",
            filtered.len(),
            rows.len()
        ),
        file_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glucose::GlucoseRange;
    use crate::models::{parse_timestamp, ReadingCreate};
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 31, 12, 0, 0)
            .unwrap()
    }

    fn seeded_db(entries: &[(i64, Category, &str)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            crate::db::migrations::run_migrations(conn)?;
            for (value, category, ts) in entries {
                Reading::create(
                    conn,
                    &ReadingCreate {
                        value: *value,
                        category: *category,
                        timestamp: parse_timestamp(ts).unwrap(),
                    },
                    &RangeThresholds::defaults(),
                )?;
            }
            Ok(())
        })
        .unwrap();
        db
    }

    fn reading(value: i64, category: Category, ts: &str) -> Reading {
        Reading {
            id: ts.to_string(),
            value,
            unit: "mg/dL".to_string(),
            category,
            timestamp: parse_timestamp(ts).unwrap(),
            status: Status::InRange,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_cell_lines_use_current_thresholds() {
        let tighter = RangeThresholds::defaults().with(Category::Fasting, GlucoseRange::new(70, 85));
        let readings = vec![reading(90, Category::Fasting, "2024-03-30T05:15:00Z")];
        let lines = cell_lines(&readings, &tighter, &FixedOffset::east_opt(7200).unwrap(), &EnglishFormatter);
        assert_eq!(lines, vec![("90 mg/dL - 07:15 - above".to_string(), Status::AboveRange)]);
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(ReportRange::ThreeMonths, &now()),
            "glucose-report-three-months-20240331-1200.pdf"
        );
    }

    #[test]
    fn test_export_month_report() {
        let db = seeded_db(&[
            (92, Category::Fasting, "2024-03-30T07:00:00+02:00"),
            (128, Category::PostLunch, "2024-03-30T14:00:00+02:00"),
            (99, Category::Fasting, "2024-03-02T07:00:00+02:00"),
            (88, Category::Fasting, "2024-02-15T07:00:00+02:00"),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let response = export_pdf_report(&db, Some("month"), None, dir.path(), &now()).unwrap();
        assert!(response.success);
        assert_eq!(response.total_readings, 3);
        assert_eq!(response.days_with_readings, 2);
        assert_eq!(response.pages, 1);

        let bytes = std::fs::read(&response.file_path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(response.file_path.ends_with("glucose-report-month-20240331-1200.pdf"));
    }

    #[test]
    fn test_export_empty_and_invalid_range() {
        let db = seeded_db(&[]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("empty.pdf");

        let response = export_pdf_report(
            &db,
            Some("all"),
            Some(path.to_str().unwrap()),
            dir.path(),
            &now(),
        )
        .unwrap();
        assert_eq!(response.total_readings, 0);
        assert!(response.period_start.is_none());
        assert!(path.exists());

        assert!(matches!(
            export_pdf_report(&db, Some("year"), None, dir.path(), &now()),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_long_report_spans_pages() {
        let db = seeded_db(&[]);
        db.with_conn_mut(|conn| {
            for day in 0..80 {
                let ts = now() - chrono::Duration::days(day);
                Reading::create(
                    conn,
                    &ReadingCreate {
                        value: 80 + day,
                        category: Category::Fasting,
                        timestamp: ts.with_timezone(&Utc),
                    },
                    &RangeThresholds::defaults(),
                )?;
            }
            Ok(())
        })
        .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let response = export_pdf_report(&db, Some("three_months"), None, dir.path(), &now()).unwrap();
        assert_eq!(response.days_with_readings, 80);
        assert!(response.pages > 1);
    }
}
