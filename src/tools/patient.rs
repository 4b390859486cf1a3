//! Patient info MCP Tools
//!
//! Name and date of birth shown in the report header.

use serde::Serialize;

use crate::db::Database;
use crate::models::PatientInfo;

use super::{ToolError, ToolResult};

/// Response for set_patient_info and get_patient_info
#[derive(Debug, Serialize)]
pub struct PatientInfoResponse {
    pub name: String,
    pub dob: String,
    pub updated_at: String,
}

impl From<PatientInfo> for PatientInfoResponse {
    fn from(info: PatientInfo) -> Self {
        Self {
            name: info.name,
            dob: info.dob,
            updated_at: info.updated_at,
        }
    }
}

/// Set the report header details
pub fn set_patient_info(db: &Database, name: &str, dob: Option<&str>) -> ToolResult<PatientInfoResponse> {
    if name.trim().is_empty() {
        return Err(ToolError::invalid("Patient name must not be empty"));
    }
    let dob = dob.unwrap_or("").trim();
    if !dob.is_empty() && chrono::NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
        return Err(ToolError::invalid(format!(
            "Invalid date of birth: '{}'. Use YYYY-MM-DD",
            dob
        )));
    }

    let conn = db.get_conn()?;
    let info = PatientInfo::set(&conn, name, dob)
        .map_err(|e| ToolError::Failed(format!("Failed to save patient info: {}", e)))?;
    tracing::info!("Patient info updated");
    Ok(info.into())
}

pub fn get_patient_info(db: &Database) -> ToolResult<Option<PatientInfoResponse>> {
    let conn = db.get_conn()?;
    Ok(PatientInfo::get(&conn)?.map(PatientInfoResponse::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| crate::db::migrations::run_migrations(conn))
            .unwrap();
        db
    }

    #[test]
    fn test_set_and_get() {
        let db = test_db();
        assert!(get_patient_info(&db).unwrap().is_none());

        let info = set_patient_info(&db, "Dana Levi", Some("1992-04-18")).unwrap();
        assert_eq!(info.name, "Dana Levi");

        let info = set_patient_info(&db, "Dana Levi", None).unwrap();
        assert_eq!(info.dob, "");
        assert_eq!(get_patient_info(&db).unwrap().unwrap().name, "Dana Levi");
    }

    #[test]
    fn test_validation() {
        let db = test_db();
        assert!(matches!(set_patient_info(&db, "  ", None), Err(ToolError::InvalidInput(_))));
        assert!(matches!(
            set_patient_info(&db, "Dana", Some("18/04/1992")),
            Err(ToolError::InvalidInput(_))
        ));
    }
}
