//! JWT signature and expiry verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use beacon_core::config::AuthConfig;
use beacon_core::error::AppError;

use super::claims::{Claims, TokenType};

/// Verifies JWT signatures, expiry, and token type.
///
/// This only proves a token is authentic and unexpired. Whether its
/// credential is still live is decided by the session authority.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC key for access tokens.
    access_key: DecodingKey,
    /// HMAC key for refresh tokens.
    refresh_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            access_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes a token that must be of the `expected` type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let key = match expected {
            TokenType::Access => &self.access_key,
            TokenType::Refresh => &self.refresh_key,
        };

        let token_data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::authentication("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::authentication("Invalid token signature")
                }
                _ => AppError::authentication(format!("Token validation failed: {e}")),
            }
        })?;

        let claims = token_data.claims;
        if claims.token_type != expected {
            return Err(AppError::authentication(format!(
                "Invalid token type: expected {expected} token"
            )));
        }

        Ok(claims)
    }
}
