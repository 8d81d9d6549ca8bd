//! App-token signing and validation
//!
//! Bearer tokens are HS256 JWTs carrying the internal user id and an
//! absolute expiry. The secret and lifetime are process-wide configuration
//! loaded once at startup.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use stride_types::UserId;

use crate::{AuthConfig, AuthError};

/// Payload embedded in an app token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Internal user id (not the federated subject)
    pub user_id: String,
    /// Absolute expiry, unix seconds
    pub exp: i64,
}

impl TokenClaims {
    /// Parse the embedded user id
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        UserId::parse(&self.user_id).map_err(|_| AuthError::TokenInvalid)
    }

    /// Remaining lifetime from now, clamped to non-negative
    pub fn remaining_ttl(&self) -> Duration {
        let remaining = self.exp - Utc::now().timestamp();
        Duration::from_secs(remaining.max(0) as u64)
    }
}

/// Signs and validates app tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl TokenSigner {
    /// Create a signer from process configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl: config.token_ttl,
        }
    }

    /// Sign a token embedding `user_id` with expiry `now + ttl`
    pub fn sign(&self, user_id: UserId) -> Result<String, AuthError> {
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            exp: Utc::now().timestamp() + self.token_ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AuthError::Internal("Failed to sign token".to_string())
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Both checks are enforced: a future-dated payload signed with the
    /// wrong secret fails on the signature, an expired payload fails even
    /// when the signature is good (zero leeway).
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Token decode failed: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthError::TokenInvalid
                }
                _ => AuthError::TokenMalformed,
            }
        })?;

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
