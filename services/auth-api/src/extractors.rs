//! Axum extractors for authentication

use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;

use stride_auth_core::AuthError;
use stride_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user extracted from the bearer credential
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = bearer_token(parts)?;
        let identity = app_state.auth.authenticate(&token).await.map_err(|e| {
            tracing::debug!(error = ?e, "Token validation failed");
            e
        })?;

        Ok(Self {
            user_id: identity.user_id,
        })
    }
}

/// Extract the bearer token from the Authorization header
fn bearer_token(parts: &Parts) -> Result<String, AuthError> {
    let header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::TokenMissing)?;

    let value = header.to_str().map_err(|_| AuthError::TokenMissing)?;

    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AuthError::TokenMissing)
}
