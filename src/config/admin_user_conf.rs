use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;

/// Staff account seeded at startup when it does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::EnvVarNotFound(name.to_string()))
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = AdminUserConfig {
            username: required("ADMIN_USERNAME")?,
            first_name: required("ADMIN_FIRST_NAME")?,
            last_name: required("ADMIN_LAST_NAME")?,
            email: required("ADMIN_EMAIL")?,
            password: required("ADMIN_PASSWORD")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.email.contains('@') {
            return Err(ConfigError::ValidationError("ADMIN_EMAIL is not an email address".to_string()));
        }
        if self.password.len() < 8 {
            return Err(ConfigError::ValidationError(
                "ADMIN_PASSWORD must be at least 8 characters long".to_string(),
            ));
        }
        Ok(())
    }
}
