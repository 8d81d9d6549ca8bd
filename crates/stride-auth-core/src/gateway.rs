//! Request-time bearer-auth gateway
//!
//! Validates a presented bearer token against the cache, the signer, and
//! the stored token ownership, producing the authenticated identity every
//! protected endpoint consumes.

use std::sync::Arc;

use async_trait::async_trait;

use stride_cache::{hash_token, CachedAuth, TokenCache};
use stride_db::{TokenRepository, UserRepository};
use stride_types::{AuthIdentity, UserId};

use crate::{AuthError, TokenSigner};

/// Object-safe seam for bearer-token validation, so handlers and tests can
/// substitute implementations.
#[async_trait]
pub trait BearerAuth: Send + Sync {
    /// Validate a bearer token and return the caller's identity
    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AuthError>;
}

/// Cache-fronted bearer-auth gateway.
///
/// Validation order: cache fast-path (positive and negative), then decode,
/// then user lookup, then byte-for-byte comparison against the stored
/// token via digests. A presented token that does not match the stored one
/// has been superseded and is negative-cached so replays fail fast.
pub struct AuthGateway<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    signer: TokenSigner,
    users: Arc<U>,
    tokens: Arc<T>,
    cache: Arc<C>,
}

impl<U, T, C> AuthGateway<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    /// Create a new gateway
    pub fn new(signer: TokenSigner, users: Arc<U>, tokens: Arc<T>, cache: Arc<C>) -> Self {
        Self {
            signer,
            users,
            tokens,
            cache,
        }
    }
}

#[async_trait]
impl<U, T, C> BearerAuth for AuthGateway<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        let digest = hash_token(token);

        if let Some(cached) = self.cache.get_auth(&digest).await {
            if cached.valid {
                tracing::debug!(user_id = %cached.user_id, "Cache hit for auth");
                return Ok(AuthIdentity::new(UserId(cached.user_id)));
            }
            tracing::debug!("Negative cache hit for known-bad token");
            return Err(AuthError::TokenInvalid);
        }

        let claims = self.signer.decode(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id.0)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let stored = self
            .tokens
            .find_by_user_id(user.id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let stored_digest = hash_token(&stored.token);
        if stored_digest != digest {
            tracing::warn!(user_id = %user_id, "Token mismatch, presented token superseded");
            // Remember the rejection under the presented token's own digest,
            // bounded by its own remaining lifetime, so the same stale token
            // does not re-trigger full validation.
            self.cache
                .set_auth(&digest, CachedAuth::invalid(user.id), claims.remaining_ttl())
                .await;
            return Err(AuthError::TokenInvalid);
        }

        let cached = self
            .cache
            .set_auth(
                &stored_digest,
                CachedAuth::valid(user.id),
                claims.remaining_ttl(),
            )
            .await;
        if cached {
            tracing::debug!(user_id = %user_id, "Auth cache set");
        }

        Ok(AuthIdentity::new(user_id))
    }
}

impl<U, T, C> std::fmt::Debug for AuthGateway<U, T, C>
where
    U: UserRepository + ?Sized,
    T: TokenRepository + ?Sized,
    C: TokenCache + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
