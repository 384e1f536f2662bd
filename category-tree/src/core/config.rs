use crate::tree::{DeletePolicy, TreeOptions};
use std::fmt::Display;
use std::str::FromStr;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | DATABASE_URL | sqlite:categories.db | SQLite database location |
/// | DB_MAX_CONNECTIONS | 5 | Connection pool size |
/// | LOG_LEVEL | info | tracing filter directive |
/// | LOG_JSON | false | Emit JSON log lines |
/// | LOG_DIR | (unset) | Directory for daily rolling log files |
/// | CATEGORY_DELETE_POLICY | reject | reject / reassign / cascade |
///
/// # Example
///
/// ```ignore
/// DATABASE_URL=sqlite:/data/catalog.db CATEGORY_DELETE_POLICY=reassign category-tree verify
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// What deleting a category with children does
    pub delete_policy: DeletePolicy,
    /// Values that were set but could not be parsed
    ///
    /// Collected here because configuration is read before the logger is up.
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut warnings = Vec::new();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:categories.db".into()),
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", &mut warnings)
                .unwrap_or(5),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_var(&lookup, "LOG_JSON", &mut warnings).unwrap_or(false),
            log_dir: lookup("LOG_DIR").filter(|v| !v.is_empty()),
            delete_policy: parse_var(&lookup, "CATEGORY_DELETE_POLICY", &mut warnings)
                .unwrap_or_default(),
            warnings,
        }
    }

    /// Override the database location, keeping everything else default
    ///
    /// Used by tests
    pub fn with_overrides(database_url: impl Into<String>) -> Self {
        let mut config = Self::from_lookup(|_| None);
        config.database_url = database_url.into();
        config.db_max_connections = 1;
        config
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            delete_policy: self.delete_policy,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warnings.push(format!("Ignoring {key}={raw:?}: {e}"));
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
