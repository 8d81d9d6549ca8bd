//! NHS login handlers (login redirect, callback, logout, disconnect)

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use stride_auth_core::CallbackParams;
use stride_types::{DeleteReason, UserStatus};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /nhs_login/{app_name}/{app_internal_id}
///
/// Redirect the caller into the NHS login authorize flow, carrying the
/// app identity in the state parameter.
pub async fn nhs_login(
    State(state): State<AppState>,
    Path((app_name, app_internal_id)): Path<(String, String)>,
) -> ApiResult<Redirect> {
    let url = state.login.login_url(&app_name, &app_internal_id)?;
    Ok(Redirect::temporary(url.as_str()))
}

/// GET /nhs_login/callback
///
/// Complete the federation handshake and bounce the browser back into the
/// mobile app via deep link (301).
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let params = CallbackParams::from_query(&query);
    let outcome = state.login.process_callback(params).await?;

    Ok((
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, outcome.redirect_url().to_string())],
    )
        .into_response())
}

/// POST /nhs_login/logout
///
/// Revoke the caller's token: cache eviction first, then the status flip
/// and token-row delete, so the revocation is visible to every subsequent
/// request.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let user = state
        .users
        .find_by_id(auth.user_id.0)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    state.cache.invalidate_session(user.id).await;

    state
        .users
        .set_status(user.id, UserStatus::Logout, Utc::now())
        .await?;
    state.tokens.delete_by_user_id(user.id).await?;

    tracing::info!(user_id = %user.id, "User logged out");

    Ok(Json(MessageResponse {
        message: "User logged out successfully".to_string(),
    }))
}

/// POST /nhs_login/disconnect
///
/// Delete the caller's account (token and email preferences cascade) and
/// record the audit reason. The delete and audit insert are one
/// transaction; failure rolls back and surfaces a generic 500.
pub async fn disconnect(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let user = state
        .users
        .find_by_id(auth.user_id.0)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    state.cache.invalidate_session(user.id).await;

    state
        .users
        .delete_with_audit(user.id, DeleteReason::Disconnected)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, "Failed to disconnect user: {e}");
            ApiError::DisconnectFailed
        })?;

    tracing::info!(user_id = %user.id, "User disconnected");

    Ok(Json(MessageResponse {
        message: "User disconnected successfully".to_string(),
    }))
}
