//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::FixedOffset;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// One local-storage file per guest device lives here.
    pub guest_storage_path: PathBuf,
    /// Root of the image bucket.
    pub image_storage_path: PathBuf,
    /// Prefix used to build public URLs of stored images.
    pub public_base_url: String,
    pub openweather_api_key: Option<String>,
    pub weather_api_base: String,
    /// Offset used to bucket entries into calendar days.
    pub local_offset: FixedOffset,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Storage Settings ---
        let guest_storage_path = std::env::var("GUEST_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./guest_storage"));
        let image_storage_path = std::env::var("IMAGE_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Load Weather Settings (key is optional) ---
        let openweather_api_key = std::env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        let weather_api_base = std::env::var("WEATHER_API_BASE")
            .unwrap_or_else(|_| "https://api.openweathermap.org".to_string())
            .trim_end_matches('/')
            .to_string();

        let offset_str =
            std::env::var("LOCAL_UTC_OFFSET_MINUTES").unwrap_or_else(|_| "540".to_string());
        let local_offset = parse_offset_minutes(&offset_str)?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            guest_storage_path,
            image_storage_path,
            public_base_url,
            openweather_api_key,
            weather_api_base,
            local_offset,
            cors_origin,
        })
    }
}

fn parse_offset_minutes(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidValue("LOCAL_UTC_OFFSET_MINUTES".to_string(), reason.to_string())
    };
    let minutes = value
        .trim()
        .parse::<i32>()
        .map_err(|_| invalid(&format!("'{}' is not a number of minutes", value)))?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| invalid("offset must be within ±24 hours"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_parse_from_minutes() {
        assert_eq!(
            parse_offset_minutes("540").unwrap(),
            FixedOffset::east_opt(9 * 3600).unwrap()
        );
        assert_eq!(
            parse_offset_minutes("-300").unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
        assert!(parse_offset_minutes("2000").is_err());
        assert!(parse_offset_minutes("tokyo").is_err());
    }
}
