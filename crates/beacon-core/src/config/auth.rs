//! Credential signing and lifetime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session authority configuration.
///
/// Access and refresh tokens are signed with distinct secrets so that a
/// refresh token can never be presented where an access token is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret for access tokens.
    #[serde(default = "default_access_secret")]
    pub access_secret: String,
    /// HMAC-SHA256 secret for refresh tokens.
    #[serde(default = "default_refresh_secret")]
    pub refresh_secret: String,
    /// Access credential lifetime in hours.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_hours: u64,
    /// Refresh credential lifetime in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_hours: u64,
    /// Clock skew tolerated when checking the `exp` claim.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: default_access_secret(),
            refresh_secret: default_refresh_secret(),
            access_ttl_hours: default_access_ttl(),
            refresh_ttl_hours: default_refresh_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

impl AuthConfig {
    /// Access credential lifetime.
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_hours * 3600)
    }

    /// Refresh credential lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_hours * 3600)
    }

    /// Validates secrets and lifetimes.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AppError::configuration("auth secrets must not be empty"));
        }
        if self.access_ttl_hours == 0 || self.refresh_ttl_hours == 0 {
            return Err(AppError::configuration(
                "credential lifetimes must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_access_secret() -> String {
    "CHANGE_ME_ACCESS".to_string()
}

fn default_refresh_secret() -> String {
    "CHANGE_ME_REFRESH".to_string()
}

fn default_access_ttl() -> u64 {
    24 * 30
}

fn default_refresh_ttl() -> u64 {
    24 * 60
}

fn default_leeway() -> u64 {
    5
}
