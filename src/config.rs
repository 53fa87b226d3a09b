//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::identity::session::DEFAULT_SESSION_TTL_MINUTES;

/// Google's ID-token introspection endpoint.
pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Application configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// OAuth client id that Google ID tokens must be issued for.
    pub google_client_id: String,
    /// Token introspection endpoint (overridable for tests and proxies).
    pub tokeninfo_url: String,
    /// Bearer token required by the admin endpoints.
    pub admin_token: SecretString,
    /// Minutes an onboarding session stays valid.
    pub session_ttl_minutes: i64,
}

impl AppConfig {
    /// Build config from environment variables.
    ///
    /// `GOOGLE_CLIENT_ID` and `CAMPUS_TRANSIT_ADMIN_TOKEN` are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("CAMPUS_TRANSIT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/campus-transit.db"));

        let port = match lookup("CAMPUS_TRANSIT_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CAMPUS_TRANSIT_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => 8080,
        };

        let google_client_id = lookup("GOOGLE_CLIENT_ID")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".to_string()))?;

        let tokeninfo_url =
            lookup("GOOGLE_TOKENINFO_URL").unwrap_or_else(|| DEFAULT_TOKENINFO_URL.to_string());

        let admin_token = lookup("CAMPUS_TRANSIT_ADMIN_TOKEN")
            .filter(|s| !s.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("CAMPUS_TRANSIT_ADMIN_TOKEN".to_string()))?;

        let session_ttl_minutes = match lookup("CAMPUS_TRANSIT_SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|m: &i64| *m > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "CAMPUS_TRANSIT_SESSION_TTL_MINUTES".to_string(),
                    message: format!("'{raw}' is not a positive number of minutes"),
                })?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };

        Ok(Self {
            db_path,
            port,
            google_client_id,
            tokeninfo_url,
            admin_token,
            session_ttl_minutes,
        })
    }
}
