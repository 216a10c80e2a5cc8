//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory holding quiz YAML files.
    pub quiz_dir: PathBuf,
    /// Base URL of the collaborator service.
    pub gateway_url: String,
    /// Bearer token for the collaborator service.
    pub gateway_api_key: Option<String>,
    /// Per-call timeout for collaborator calls.
    pub call_timeout: Duration,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl ServerConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{name} environment variable must be set")))
        };

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let timeout_ms: u64 = lookup("CALL_TIMEOUT_MS")
            .unwrap_or_else(|| "30000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("CALL_TIMEOUT_MS must be a number: {e}")))?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            quiz_dir: PathBuf::from(lookup("QUIZ_DIR").unwrap_or_else(|| "quizzes".to_string())),
            gateway_url: required("GATEWAY_URL")?,
            gateway_api_key: lookup("GATEWAY_API_KEY").filter(|v| !v.is_empty()),
            call_timeout: Duration::from_millis(timeout_ms),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_optional_variables_are_unset() {
        // Arrange
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/quizflow"),
            ("GATEWAY_URL", "http://reasoner"),
        ]);

        // Act
        let config = ServerConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.quiz_dir, PathBuf::from("quizzes"));
        assert_eq!(config.call_timeout, Duration::from_secs(30));
        assert!(config.gateway_api_key.is_none());
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_missing_database_url_is_rejected() {
        let lookup = lookup_from(&[("GATEWAY_URL", "http://reasoner")]);

        let result = ServerConfig::from_lookup(lookup);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/quizflow"),
            ("GATEWAY_URL", "http://reasoner"),
            ("PORT", "eighty"),
        ]);

        assert!(matches!(
            ServerConfig::from_lookup(lookup),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://db/quizflow"),
            ("GATEWAY_URL", "http://reasoner"),
            ("GATEWAY_API_KEY", "secret"),
            ("CALL_TIMEOUT_MS", "1500"),
            ("QUIZ_DIR", "/etc/quizflow"),
        ]);

        let config = ServerConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.gateway_api_key.as_deref(), Some("secret"));
        assert_eq!(config.call_timeout, Duration::from_millis(1500));
        assert_eq!(config.quiz_dir, PathBuf::from("/etc/quizflow"));
    }
}
