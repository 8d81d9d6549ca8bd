//! Stride Auth API
//!
//! Authentication microservice: NHS login federation endpoints, bearer
//! token validation, logout and disconnect.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route(
            "/nhs_login/{app_name}/{app_internal_id}",
            get(handlers::nhs_login::nhs_login),
        )
        .route("/nhs_login/callback", get(handlers::nhs_login::callback))
        .route("/nhs_login/logout", post(handlers::nhs_login::logout))
        .route(
            "/nhs_login/disconnect",
            post(handlers::nhs_login::disconnect),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
