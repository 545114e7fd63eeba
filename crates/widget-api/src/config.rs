//! Process-level configuration, assembled from environment variables.
//! Composes [`widget_store::StoreConfig`] (Redis, rate limiting, retention)
//! with the handful of settings that belong to the HTTP transport itself.

use serde::{Deserialize, Serialize};
use widget_store::StoreConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub server_read_timeout_secs: u64,
    /// Combined with `server_read_timeout_secs` into the single overall
    /// request deadline `main` builds its `TimeoutLayer` from — Axum's
    /// timeout middleware doesn't distinguish a read phase from a write one.
    pub server_write_timeout_secs: u64,
    pub jwt_secret: String,
    pub log_level: String,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Reads every recognized environment variable. A key that is set but
    /// fails to parse is a fatal configuration error; a key that is unset
    /// falls back to its documented default.
    pub fn from_env() -> Result<Self, String> {
        let server_port = match std::env::var("SERVER_PORT") {
            Ok(v) => v.parse().map_err(|_| "SERVER_PORT must be an integer".to_string())?,
            Err(_) => 8080,
        };

        let server_read_timeout_secs = match std::env::var("SERVER_READ_TIMEOUT") {
            Ok(v) => v
                .parse()
                .map_err(|_| "SERVER_READ_TIMEOUT must be an integer number of seconds".to_string())?,
            Err(_) => 30,
        };

        let server_write_timeout_secs = match std::env::var("SERVER_WRITE_TIMEOUT") {
            Ok(v) => v
                .parse()
                .map_err(|_| "SERVER_WRITE_TIMEOUT must be an integer number of seconds".to_string())?,
            Err(_) => 30,
        };

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET is required".to_string())?;
        if jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        if !matches!(log_level.as_str(), "debug" | "info" | "warn" | "error" | "fatal") {
            return Err(format!(
                "LOG_LEVEL must be one of debug, info, warn, error, fatal (got {log_level})"
            ));
        }

        let store = StoreConfig::from_env()?;

        Ok(Self {
            server_port,
            server_read_timeout_secs,
            server_write_timeout_secs,
            jwt_secret,
            log_level,
            store,
        })
    }

    /// Maps `LOG_LEVEL`'s `fatal` (not a `tracing::Level`) onto `error`, the
    /// closest level `EnvFilter` understands.
    pub fn tracing_filter(&self) -> &str {
        match self.log_level.as_str() {
            "fatal" => "error",
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_log_level() {
        std::env::set_var("JWT_SECRET", "test-secret-rejects-unknown-log-level");
        std::env::set_var("LOG_LEVEL", "verbose");
        let result = AppConfig::from_env();
        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("LOG_LEVEL");
        assert!(result.is_err());
    }

    #[test]
    fn requires_jwt_secret() {
        std::env::remove_var("JWT_SECRET");
        assert!(AppConfig::from_env().is_err());
    }

    #[test]
    fn fatal_log_level_maps_to_error_filter() {
        let config = AppConfig {
            server_port: 8080,
            server_read_timeout_secs: 30,
            server_write_timeout_secs: 30,
            jwt_secret: "s".to_string(),
            log_level: "fatal".to_string(),
            store: StoreConfig::default(),
        };
        assert_eq!(config.tracing_filter(), "error");
    }
}
