//! Utility to set patient info in the database
//!
//! Usage: set_patient_info <name> [dob YYYY-MM-DD]

use sugarmama::config::Config;
use sugarmama::tools::patient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let name = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("Usage: set_patient_info <name> [dob YYYY-MM-DD]");
            std::process::exit(2);
        }
    };
    let dob = args.next();

    let config = Config::from_env();
    println!("Database path: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = sugarmama::db::Database::new(&config.database_path)?;

    // Run migrations
    database.with_conn(|conn| {
        sugarmama::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    // Set patient info
    let patient = patient::set_patient_info(&database, &name, dob.as_deref())?;
    println!("Patient info set:");
    println!("  Name: {}", patient.name);
    println!("  DOB: {}", patient.dob);
    println!("  Updated: {}", patient.updated_at);

    Ok(())
}
