use std::env;
use tracing::{error, info, warn};

use crate::config::ConfigError;
use crate::model::quote_status::LifecyclePolicy;

/// Business knobs of the quote lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Two-letter prefix of minted quote ids.
    pub quote_id_prefix: String,
    /// When false, staff may accept a quote that has not been priced yet.
    pub staff_accept_requires_quoted: bool,
}

impl LifecycleConfig {
    /// Load lifecycle configuration from environment variables
    ///
    /// - QUOTE_ID_PREFIX: two ASCII letters (defaults to `UP`)
    /// - STAFF_ACCEPT_REQUIRES_QUOTED: `true`/`false` (defaults to `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = LifecycleConfig::default();

        let quote_id_prefix = env::var("QUOTE_ID_PREFIX").unwrap_or_else(|_| {
            warn!("QUOTE_ID_PREFIX not set, using default: {}", defaults.quote_id_prefix);
            defaults.quote_id_prefix.clone()
        });

        let staff_accept_requires_quoted = match env::var("STAFF_ACCEPT_REQUIRES_QUOTED") {
            Ok(raw) => raw.trim().parse::<bool>().map_err(|_| {
                error!("Invalid STAFF_ACCEPT_REQUIRES_QUOTED value: {}", raw);
                ConfigError::ParseError(format!("STAFF_ACCEPT_REQUIRES_QUOTED: {}", raw))
            })?,
            Err(_) => defaults.staff_accept_requires_quoted,
        };

        let config = LifecycleConfig {
            quote_id_prefix,
            staff_accept_requires_quoted,
        };
        config.validate()?;
        info!(
            prefix = %config.quote_id_prefix,
            staff_accept_requires_quoted = config.staff_accept_requires_quoted,
            "Lifecycle configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quote_id_prefix.len() != 2 || !self.quote_id_prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::ValidationError(
                "QUOTE_ID_PREFIX must be two uppercase ASCII letters".to_string(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            staff_accept_requires_quoted: self.staff_accept_requires_quoted,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            quote_id_prefix: "UP".to_string(),
            staff_accept_requires_quoted: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enforces_quoted_before_staff_accept() {
        let config = LifecycleConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.policy().staff_accept_requires_quoted);
    }

    #[test]
    fn prefix_must_be_two_uppercase_letters() {
        for prefix in ["U", "UPX", "up", "U1"] {
            let config = LifecycleConfig {
                quote_id_prefix: prefix.to_string(),
                ..LifecycleConfig::default()
            };
            assert!(config.validate().is_err(), "{prefix} should be rejected");
        }
    }
}
