//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `POMELO_DATABASE_URL` - `PostgreSQL` connection string
//! - `POMELO_JWT_SECRET` - Bearer-token signing secret (min 32 chars)
//! - `PAYMENT_SECRET_KEY` - Card-processing provider secret key
//!
//! ## Optional
//! - `POMELO_HOST` - Bind address (default: 127.0.0.1)
//! - `POMELO_PORT` - Listen port (default: 8080)
//! - `PAYMENT_PROVIDER_URL` - Provider base URL (default: Stripe)
//! - `PAYMENT_TIMEOUT_SECS` - Provider request timeout (default: 10)
//! - `SMTP_HOST` / `SMTP_PORT` / `SMTP_USERNAME` / `SMTP_PASSWORD` /
//!   `SMTP_FROM` / `ALERT_EMAIL` - Email notification channel
//!   (enabled when `SMTP_HOST` is set)
//! - `SMS_GATEWAY_URL` / `SMS_API_KEY` / `ALERT_PHONE` - SMS
//!   notification channel (enabled when `SMS_GATEWAY_URL` is set)
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Error tracking

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` connection URL (contains password).
    pub database_url: SecretString,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Bearer-token signing secret.
    pub jwt_secret: SecretString,
    /// Card-processing provider configuration.
    pub payment: PaymentProviderConfig,
    /// Email notification channel, when configured.
    pub smtp: Option<SmtpConfig>,
    /// SMS notification channel, when configured.
    pub sms: Option<SmsConfig>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag.
    pub sentry_environment: Option<String>,
}

/// Card-processing provider configuration.
#[derive(Debug, Clone)]
pub struct PaymentProviderConfig {
    /// Provider API base URL.
    pub base_url: String,
    /// Provider secret key.
    pub secret_key: SecretString,
    /// Request timeout in seconds. A hung provider surfaces as a
    /// connection error instead of stalling checkout.
    pub timeout_secs: u64,
}

/// SMTP configuration for the email notification channel.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    /// Where operational alerts (low stock) are sent.
    pub alert_address: String,
}

/// SMS gateway configuration.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub base_url: String,
    pub api_key: SecretString,
    /// Operator number for alerts.
    pub alert_number: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or
    /// invalid, or the JWT secret fails the length check.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_secret("POMELO_DATABASE_URL")?;
        let host = get_env_or_default("POMELO_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("POMELO_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("POMELO_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("POMELO_PORT".to_owned(), e.to_string()))?;

        let jwt_secret = get_secret("POMELO_JWT_SECRET")?;
        validate_secret_length("POMELO_JWT_SECRET", &jwt_secret)?;

        let payment = PaymentProviderConfig::from_env()?;
        let smtp = SmtpConfig::from_env()?;
        let sms = SmsConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            payment,
            smtp,
            sms,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PaymentProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("PAYMENT_PROVIDER_URL", "https://api.stripe.com");
        let secret_key = get_secret("PAYMENT_SECRET_KEY")?;
        let timeout_secs = get_env_or_default("PAYMENT_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PAYMENT_TIMEOUT_SECS".to_owned(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            secret_key,
            timeout_secs,
        })
    }
}

impl SmtpConfig {
    /// `None` when `SMTP_HOST` is unset; email notifications are
    /// simply disabled.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_owned(), e.to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
            alert_address: get_required_env("ALERT_EMAIL")?,
        }))
    }
}

impl SmsConfig {
    /// `None` when `SMS_GATEWAY_URL` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(base_url) = get_optional_env("SMS_GATEWAY_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            base_url,
            api_key: get_secret("SMS_API_KEY")?,
            alert_number: get_required_env("ALERT_PHONE")?,
        }))
    }
}

fn get_required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn get_env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn get_optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_secret(name: &str) -> Result<SecretString, ConfigError> {
    get_required_env(name).map(SecretString::from)
}

fn validate_secret_length(name: &str, secret: &SecretString) -> Result<(), ConfigError> {
    use secrecy::ExposeSecret;
    if secret.expose_secret().len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
        ));
    }
    Ok(())
}
