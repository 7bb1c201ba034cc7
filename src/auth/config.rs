//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for the auth configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("auth.jwt_secret is required when dev_mode is disabled")]
    MissingJwtSecret,

    #[error("auth.jwt_secret must be at least 32 characters")]
    WeakJwtSecret,
}

fn default_cookie_name() -> String {
    "token".to_string()
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to verify HS256 tokens.
    pub jwt_secret: Option<String>,
    /// Development mode: falls back to a built-in secret when none is
    /// configured and relaxes CORS to localhost origins.
    pub dev_mode: bool,
    /// Cookie the token is read from (a Bearer header also works).
    pub cookie_name: String,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            dev_mode: true,
            cookie_name: default_cookie_name(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Validate the configuration for the selected mode.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match &self.jwt_secret {
            None if !self.dev_mode => Err(ConfigValidationError::MissingJwtSecret),
            Some(secret) if secret.len() < 32 => Err(ConfigValidationError::WeakJwtSecret),
            _ => Ok(()),
        }
    }
}
