//! Runtime configuration
//!
//! Everything comes from environment variables with defaults next to the
//! project's `data/` directory.

use std::path::PathBuf;

use crate::glucose::Locale;

pub const DATABASE_PATH_VAR: &str = "SUGARMAMA_DATABASE_PATH";
pub const REPORTS_DIR_VAR: &str = "SUGARMAMA_REPORTS_DIR";
pub const LOCALE_VAR: &str = "SUGARMAMA_LOCALE";

const DATABASE_FILE: &str = "sugarmama.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub reports_dir: PathBuf,
    pub locale: Locale,
}

impl Config {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, falling back to defaults
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_path = non_empty(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir().join(DATABASE_FILE));

        let reports_dir = non_empty(REPORTS_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                database_path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("reports")
            });

        let locale = match non_empty(LOCALE_VAR) {
            Some(value) => Locale::from_str(&value).unwrap_or_else(|| {
                tracing::warn!(locale = %value, "Unknown locale, using English");
                Locale::default()
            }),
            None => Locale::default(),
        };

        Self {
            database_path,
            reports_dir,
            locale,
        }
    }
}

/// `<project>/data`, found by walking up from `target/{debug,release}`
pub fn default_data_dir() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::resolve(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with(&[]);
        assert!(config.database_path.ends_with("data/sugarmama.db"));
        assert!(config.reports_dir.ends_with("data/reports"));
        assert_eq!(config.locale, Locale::English);
    }

    #[test]
    fn test_overrides() {
        let config = resolve_with(&[
            (DATABASE_PATH_VAR, "/tmp/sm/test.db"),
            (LOCALE_VAR, "he"),
        ]);
        assert_eq!(config.database_path, PathBuf::from("/tmp/sm/test.db"));
        assert_eq!(config.reports_dir, PathBuf::from("/tmp/sm/reports"));
        assert_eq!(config.locale, Locale::Hebrew);

        let config = resolve_with(&[(REPORTS_DIR_VAR, "/srv/out"), (LOCALE_VAR, "fr")]);
        assert_eq!(config.reports_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.locale, Locale::English);
    }
}
