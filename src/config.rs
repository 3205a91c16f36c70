//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use url::Url;

/// Default backend origin, matching the backend's development port
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Protocol the frontend is served over ("http" or "https")
    pub protocol: String,
}

/// Backend (OAuth/session server) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend origin, e.g. "http://localhost:8080"
    pub base_url: String,
}

impl BackendConfig {
    /// Parse the configured origin
    pub fn url(&self) -> Result<Url, crate::error::AppError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            crate::error::AppError::Config(format!("backend.base_url is invalid: {}", e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::error::AppError::Config(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (OAUTHDASH__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.protocol", "http")?
            .set_default("backend.base_url", DEFAULT_BACKEND_URL)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("OAUTHDASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Cookies written back to the browser carry `Secure` when the
    /// frontend itself is served over https.
    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        self.backend.url()?;

        if !matches!(
            self.server.protocol.to_ascii_lowercase().as_str(),
            "http" | "https"
        ) {
            return Err(crate::error::AppError::Config(format!(
                "server.protocol must be http or https, got {}",
                self.server.protocol
            )));
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                protocol = %self.server.protocol,
                "Forwarding session cookies without the Secure attribute"
            );
        }

        Ok(())
    }
}
