use crate::core::{GradebookError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "GRADEBOOK_CONFIG";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub credentials: CredentialsConfig,
}

/// Where the store lives and how the connection is opened.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or ":memory:"
    pub path: PathBuf,
    /// Create the file (and its parent directory) when it does not exist
    pub create_if_missing: bool,
    /// Create the course/student/student_grade tables when absent
    pub create_schema: bool,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_database_path(),
            create_if_missing: true,
            create_schema: true,
            busy_timeout_ms: 5000,
        }
    }
}

/// Fallbacks used when the startup prompts are left blank.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CredentialsConfig {
    pub default_user: String,
    pub default_password: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig {
            default_user: "admin".to_string(),
            default_password: String::new(),
        }
    }
}

/// Default database location: `<data dir>/gradebook/gradebook.db`, or
/// `gradebook.db` in the working directory when no data dir is known.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("gradebook").join("gradebook.db"))
        .unwrap_or_else(|| PathBuf::from("gradebook.db"))
}

/// Location of the configuration file: `$GRADEBOOK_CONFIG` when set,
/// otherwise `<config dir>/gradebook/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    match env::var_os(CONFIG_ENV_VAR) {
        Some(path) => Some(PathBuf::from(path)),
        None => dirs::config_dir().map(|dir| dir.join("gradebook").join("config.toml")),
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// A missing file yields the defaults; an unreadable or malformed file is a
/// `GradebookError::Config`.
///
/// # Example
///
/// ```no_run
/// let config = gradebook::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(GradebookError::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };
    parse_config(&content)
        .map_err(|e| GradebookError::Config(format!("{}: {}", path.display(), e)))
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Loads configuration from the default location.
pub fn load() -> Result<Config> {
    match config_path() {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}
