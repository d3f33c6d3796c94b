use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// SMTP transport and sender identity for lifecycle mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub use_tls: bool,
    /// Upgrade a plain connection instead of wrapping it in TLS
    pub use_starttls: bool,
    pub from_email: String,
    /// Display name, also used as the brand in mail layouts
    pub from_name: String,
    pub connection_timeout_secs: u64,
    /// Staff inbox copied on lifecycle events (optional)
    pub notify_staff_email: Option<String>,
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| {
        error!("{} environment variable not found", name);
        ConfigError::EnvVarNotFound(name.to_string())
    })
}

fn parsed_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            error!("Invalid {} value: {}", name, raw);
            ConfigError::InvalidValue(format!("Invalid {} value", name))
        }),
        Err(_) => {
            warn!("{} not set, defaulting to {}", name, default);
            Ok(default)
        }
    }
}

impl EmailConfig {
    /// Loads SMTP settings. `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and
    /// `SMTP_FROM_EMAIL` are required; the rest fall back to [`Default`].
    /// `NOTIFY_STAFF_EMAIL` enables the operations copy of lifecycle mail.
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading email configuration from environment variables");
        let defaults = EmailConfig::default();

        let config = EmailConfig {
            smtp_host: required("SMTP_HOST")?,
            smtp_port: parsed_or("SMTP_PORT", defaults.smtp_port)?,
            smtp_username: required("SMTP_USERNAME")?,
            smtp_password: required("SMTP_PASSWORD")?,
            use_tls: parsed_or("SMTP_USE_TLS", defaults.use_tls)?,
            use_starttls: parsed_or("SMTP_USE_STARTTLS", defaults.use_starttls)?,
            from_email: required("SMTP_FROM_EMAIL")?,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or(defaults.from_name),
            connection_timeout_secs: parsed_or("SMTP_CONNECTION_TIMEOUT", defaults.connection_timeout_secs)?,
            notify_staff_email: env::var("NOTIFY_STAFF_EMAIL").ok().filter(|v| !v.trim().is_empty()),
        };
        debug!(
            host = %config.smtp_host,
            port = config.smtp_port,
            tls = config.use_tls,
            starttls = config.use_starttls,
            staff_copy = config.notify_staff_email.is_some(),
            "SMTP settings"
        );

        config.validate()?;
        info!("Email configuration loaded successfully");
        Ok(config)
    }

    /// Create EmailConfig for testing
    pub fn from_test_env() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: "test".to_string(),
            smtp_password: "test".to_string(),
            use_tls: false,
            use_starttls: false,
            from_email: "bookings@movers.test".to_string(),
            from_name: "Movers Test".to_string(),
            connection_timeout_secs: 10,
            notify_staff_email: Some("ops@example.com".to_string()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            error!("Invalid email configuration: {}", message);
            Err(ConfigError::ValidationError(message.to_string()))
        };

        for (name, value) in [
            ("SMTP host", &self.smtp_host),
            ("SMTP username", &self.smtp_username),
            ("SMTP password", &self.smtp_password),
            ("From email", &self.from_email),
        ] {
            if value.is_empty() {
                return invalid(&format!("{} cannot be empty", name));
            }
        }
        if self.smtp_port == 0 {
            return invalid("SMTP port cannot be 0");
        }
        if !self.from_email.contains('@') {
            return invalid("Invalid from email format");
        }
        if matches!(&self.notify_staff_email, Some(addr) if !addr.contains('@')) {
            return invalid("Invalid NOTIFY_STAFF_EMAIL format");
        }
        if self.connection_timeout_secs == 0 {
            return invalid("Connection timeout cannot be 0");
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: "".to_string(),
            smtp_password: "".to_string(),
            use_tls: true,
            use_starttls: true,
            from_email: "bookings@movers.example".to_string(),
            from_name: "Movers".to_string(),
            connection_timeout_secs: 30,
            notify_staff_email: None,
        }
    }
}
