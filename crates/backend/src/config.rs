//! Backend configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional (server)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `SHOP_NAME` - Shop display name used in order descriptions and emails
//! - `SHOP_URL` - Public shop URL used in emails
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Feed generation
//! - `FEED_GENERATOR_COMMAND` - Command that rebuilds the feed file
//!   (default: `python3 generate_yml.py`)
//! - `FEED_OUTPUT_PATH` - Path of the generated feed (default: `dist/price_feed.yml`)
//! - `FEED_BLOCK_ON_BOOTSTRAP` - Whether startup awaits the first generation
//!   (default: true; `false` runs it in the background)
//! - `FEED_GENERATOR_TIMEOUT_SECS` - Generator subprocess timeout (default: 300)
//!
//! ## Payments (all required together; payment endpoint is disabled otherwise)
//! - `TINKOFF_TERMINAL_KEY` - Merchant terminal identifier
//! - `TINKOFF_PASSWORD` - Shared secret for request signing
//! - `TINKOFF_API_URL` - Init endpoint (default: `https://securepay.tinkoff.ru/v2/Init`)
//!
//! ## Email (all required together; notifications are skipped otherwise)
//! - `SMTP_HOST`, `SMTP_PORT` (default 465), `SMTP_USER`, `SMTP_PASS`
//! - `ADMIN_EMAIL` - Recipient of new-order alerts
//!
//! ## Site files export (required together; export returns 403 otherwise)
//! - `DOWNLOAD_KEY` - Secret key authorizing the archive download
//! - `SITE_FILES_DIR` - Directory to archive (default: `dist`)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Backend application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shop identity used in order descriptions and emails
    pub shop: ShopConfig,
    /// Feed generation configuration
    pub feed: FeedConfig,
    /// Payment gateway configuration (optional - payments disabled otherwise)
    pub payments: Option<TinkoffConfig>,
    /// SMTP configuration (optional - notifications skipped otherwise)
    pub email: Option<EmailConfig>,
    /// Site files export configuration (optional - export disabled otherwise)
    pub download: Option<DownloadConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Shop identity.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Display name (e.g. "Larkspur")
    pub name: String,
    /// Public URL (e.g. <https://larkspur.shop>)
    pub url: String,
}

/// Feed generation configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Command line that rebuilds the feed file, split on whitespace
    pub generator_command: String,
    /// Path the generator writes the feed to
    pub output_path: PathBuf,
    /// Whether startup awaits the first generation before binding
    pub block_on_bootstrap: bool,
    /// Generator subprocess timeout
    pub generator_timeout: Duration,
}

/// Payment gateway (Tinkoff Init API) configuration.
///
/// Implements `Debug` manually to redact the signing password.
#[derive(Clone)]
pub struct TinkoffConfig {
    /// Merchant terminal identifier
    pub terminal_key: String,
    /// Shared secret used for request signing (never transmitted)
    pub password: SecretString,
    /// Init endpoint URL
    pub api_url: String,
}

impl std::fmt::Debug for TinkoffConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinkoffConfig")
            .field("terminal_key", &self.terminal_key)
            .field("password", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port (TLS-on-connect)
    pub smtp_port: u16,
    /// SMTP authentication username, also the From address
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Recipient of new-order alerts
    pub admin_email: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

/// Site files export configuration.
///
/// Implements `Debug` manually to redact the download key.
#[derive(Clone)]
pub struct DownloadConfig {
    /// Secret key authorizing the archive download
    pub secret_key: SecretString,
    /// Directory whose contents are archived
    pub source_dir: PathBuf,
}

impl std::fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("secret_key", &"[REDACTED]")
            .field("source_dir", &self.source_dir)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    /// Optional sections (payments, email, download) become `None` when
    /// their variables are absent; only their dependent endpoints degrade.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a present variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            shop: ShopConfig::from_env(),
            feed: FeedConfig::from_env()?,
            payments: TinkoffConfig::from_env(),
            email: EmailConfig::from_env()?,
            download: DownloadConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopConfig {
    fn from_env() -> Self {
        Self {
            name: get_env_or_default("SHOP_NAME", "Larkspur"),
            url: get_env_or_default("SHOP_URL", "https://larkspur.shop"),
        }
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let block_on_bootstrap = get_env_or_default("FEED_BLOCK_ON_BOOTSTRAP", "true")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FEED_BLOCK_ON_BOOTSTRAP".to_string(), e.to_string())
            })?;
        let timeout_secs = get_env_or_default("FEED_GENERATOR_TIMEOUT_SECS", "300")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FEED_GENERATOR_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            generator_command: get_env_or_default("FEED_GENERATOR_COMMAND", "python3 generate_yml.py"),
            output_path: PathBuf::from(get_env_or_default(
                "FEED_OUTPUT_PATH",
                "dist/price_feed.yml",
            )),
            block_on_bootstrap,
            generator_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl TinkoffConfig {
    /// Load payment gateway configuration from environment.
    ///
    /// Returns `None` if the terminal key or password is not set
    /// (payment initiation disabled).
    fn from_env() -> Option<Self> {
        let terminal_key = get_optional_env("TINKOFF_TERMINAL_KEY")?;
        let password = get_optional_env("TINKOFF_PASSWORD")?;

        Some(Self {
            terminal_key,
            password: SecretString::from(password),
            api_url: get_env_or_default("TINKOFF_API_URL", "https://securepay.tinkoff.ru/v2/Init"),
        })
    }
}

impl EmailConfig {
    /// Load SMTP configuration from environment.
    ///
    /// Returns `None` if any of host, user, password or the admin address is
    /// not set (order notifications skipped). All four must be set together.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        let Some(smtp_username) = get_optional_env("SMTP_USER") else {
            return Ok(None);
        };
        let Some(smtp_password) = get_optional_env("SMTP_PASS") else {
            return Ok(None);
        };
        let Some(admin_email) = get_optional_env("ADMIN_EMAIL") else {
            return Ok(None);
        };
        let smtp_port = get_env_or_default("SMTP_PORT", "465")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password: SecretString::from(smtp_password),
            admin_email,
        }))
    }
}

impl DownloadConfig {
    /// Load site files export configuration from environment.
    ///
    /// Returns `None` if `DOWNLOAD_KEY` is not set (export disabled).
    fn from_env() -> Option<Self> {
        let secret_key = get_optional_env("DOWNLOAD_KEY")?;

        Some(Self {
            secret_key: SecretString::from(secret_key),
            source_dir: PathBuf::from(get_env_or_default("SITE_FILES_DIR", "dist")),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
