//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables use the `CHATTERBOX` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use chatterbox::config::AppConfig;
//!
//! # fn main() -> Result<(), chatterbox::config::ConfigError> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//!
//! println!("Server running on {}", config.server.socket_addr()?);
//! # Ok(())
//! # }
//! ```

mod ai;
mod auth;
mod database;
mod error;
mod server;
mod session;

pub use ai::AiConfig;
pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Authentication configuration (OIDC issuer)
    pub auth: AuthConfig,

    /// Completion provider configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Open session lifetime and stream buffering
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHATTERBOX` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `CHATTERBOX__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CHATTERBOX__AI__OPENAI_API_KEY=...` -> `ai.openai_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHATTERBOX")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.ai.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 8] = [
        "CHATTERBOX__DATABASE__URL",
        "CHATTERBOX__AUTH__ISSUER",
        "CHATTERBOX__AI__OPENAI_API_KEY",
        "CHATTERBOX__SERVER__PORT",
        "CHATTERBOX__SERVER__ENVIRONMENT",
        "CHATTERBOX__SESSION__IDLE_TIMEOUT_SECS",
        "CHATTERBOX__AI__MODEL",
        "CHATTERBOX__DATABASE__SEED",
    ];

    fn set_minimal_env() {
        env::set_var("CHATTERBOX__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("CHATTERBOX__AUTH__ISSUER", "https://auth.example.com");
        env::set_var("CHATTERBOX__AI__OPENAI_API_KEY", "sk-test");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.auth.issuer, "https://auth.example.com");
        assert_eq!(
            config.ai.openai_api_key.as_ref().unwrap().expose_secret(),
            "sk-test"
        );
    }

    #[test]
    fn test_validate_full_config() {
        let config = load_with(&[]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.ai.model, "o3-mini");
        assert_eq!(config.session.idle_timeout_secs, 1800);
        assert!(!config.database.seed);
    }

    #[test]
    fn test_overrides() {
        let config = load_with(&[
            ("CHATTERBOX__SERVER__PORT", "3000"),
            ("CHATTERBOX__SERVER__ENVIRONMENT", "production"),
            ("CHATTERBOX__SESSION__IDLE_TIMEOUT_SECS", "90"),
            ("CHATTERBOX__AI__MODEL", "gpt-4o-mini"),
            ("CHATTERBOX__DATABASE__SEED", "true"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.session.idle_timeout_secs, 90);
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert!(config.database.seed);
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("CHATTERBOX__AUTH__ISSUER", "https://auth.example.com");
        let result = AppConfig::load();
        clear_env();
        assert!(result.is_err());
    }
}
