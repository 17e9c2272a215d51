//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use std::env;
use std::path::PathBuf;

use directories::BaseDirs;
use reqwest::Url;
use thiserror::Error;

pub const STUDENTS_URL_VAR: &str = "ENROLLMENT_ADMIN_STUDENTS_URL";
pub const COURSES_URL_VAR: &str = "ENROLLMENT_ADMIN_COURSES_URL";
pub const LOG_LEVEL_VAR: &str = "ENROLLMENT_ADMIN_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "ENROLLMENT_ADMIN_LOG_DIR";

const DEFAULT_STUDENTS_URL: &str = "http://microservices.local/api/estudiantes";
const DEFAULT_COURSES_URL: &str = "http://microservices.local/api/cursos";
const DEFAULT_LOG_LEVEL: &str = "info";
/// Folder under the user's home used when no log directory is configured.
const DATA_DIR_NAME: &str = ".enrollment-admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} must use http or https ({value})")]
    UnsupportedScheme { var: &'static str, value: String },
    #[error("could not locate home directory; set {LOG_DIR_VAR}")]
    NoHomeDir,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the student service, without a trailing slash.
    pub students_url: String,
    /// Base URL of the course service (also serves enrollments).
    pub courses_url: String,
    /// Filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Directory receiving the log file.
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let students_url = base_url(
            STUDENTS_URL_VAR,
            value(STUDENTS_URL_VAR).unwrap_or_else(|| DEFAULT_STUDENTS_URL.to_string()),
        )?;
        let courses_url = base_url(
            COURSES_URL_VAR,
            value(COURSES_URL_VAR).unwrap_or_else(|| DEFAULT_COURSES_URL.to_string()),
        )?;
        let log_level = value(LOG_LEVEL_VAR).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_dir = match value(LOG_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_log_dir()?,
        };

        Ok(Self {
            students_url,
            courses_url,
            log_level,
            log_dir,
        })
    }
}

/// Validate a service base URL and strip trailing slashes.
fn base_url(var: &'static str, raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    let url = Url::parse(&trimmed).map_err(|err| ConfigError::InvalidUrl {
        var,
        value: raw.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme { var, value: raw });
    }
    Ok(trimmed)
}

fn default_log_dir() -> Result<PathBuf, ConfigError> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDir)?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
