use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens (HS256)
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    pub access_token_expiration: i64,
    /// Refresh token lifetime in minutes
    pub refresh_token_expiration: i64,
    /// `iss` claim stamped on and required from every token (optional)
    pub jwt_issuer: Option<String>,
}

fn minutes_from_env(name: &str, default: i64) -> Result<i64, ConfigError> {
    let value = match env::var(name) {
        Ok(raw) => raw.parse::<i64>().map_err(|e| {
            error!("Invalid {} value: {}", name, e);
            ConfigError::ParseError(format!("{}: {}", name, e))
        })?,
        Err(_) => {
            warn!("{} not set, using default: {} minutes", name, default);
            default
        }
    };
    debug!("{}: {} minutes", name, value);
    Ok(value)
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: signing key, at least 32 characters (required)
    /// - JWT_ACCESS_TOKEN_EXPIRY: minutes (defaults to 15)
    /// - JWT_REFRESH_TOKEN_EXPIRY: minutes (defaults to 10080 = 1 week)
    /// - JWT_ISSUER (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from environment variables");

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            error!("JWT_SECRET environment variable not found");
            ConfigError::EnvVarNotFound("JWT_SECRET".to_string())
        })?;

        let config = JwtConfig {
            jwt_secret,
            access_token_expiration: minutes_from_env("JWT_ACCESS_TOKEN_EXPIRY", 15)?,
            refresh_token_expiration: minutes_from_env("JWT_REFRESH_TOKEN_EXPIRY", 10080)?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
        };

        config.validate()?;
        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            error!("JWT secret is too short (minimum 32 characters required)");
            return Err(ConfigError::ValidationError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 || self.refresh_token_expiration <= 0 {
            error!("JWT token expiration must be greater than 0");
            return Err(ConfigError::ValidationError(
                "Token expiration must be greater than 0".to_string(),
            ));
        }

        if self.access_token_expiration >= self.refresh_token_expiration {
            warn!("Access token expiration is greater than or equal to refresh token expiration");
        }
        Ok(())
    }
}

/// Development and test defaults. Never use the built-in secret in production.
impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            access_token_expiration: 15,
            refresh_token_expiration: 10080,
            jwt_issuer: Some("movers-backend".to_string()),
        }
    }
}
