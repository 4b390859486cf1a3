//! Import a legacy export file into the database
//!
//! Usage: import_legacy <export.json>

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use sugarmama::config::Config;
use sugarmama::tools::import;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sugarmama=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: import_legacy <export.json>");
            std::process::exit(2);
        }
    };

    let config = Config::from_env();
    println!("Database path: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = sugarmama::db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        sugarmama::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let summary = import::import_legacy_file(&database, &path, &chrono::Local::now())?;
    println!("{}", summary.message);
    for skipped in &summary.skipped {
        println!("  skipped #{}: {}", skipped.index, skipped.reason);
    }
    if !summary.unknown_range_keys.is_empty() {
        println!("  ignored ranges: {}", summary.unknown_range_keys.join(", "));
    }

    Ok(())
}
