//! Application state

use std::sync::Arc;

use stride_auth_core::{BearerAuth, LoginFlow};
use stride_cache::TokenCache;
use stride_db::{TokenRepository, UserRepository};

/// Application state shared across handlers.
///
/// Everything is held behind object-safe traits so tests can substitute
/// in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    /// Bearer-token validation gateway
    pub auth: Arc<dyn BearerAuth>,
    /// NHS login flow
    pub login: Arc<dyn LoginFlow>,
    /// User persistence
    pub users: Arc<dyn UserRepository>,
    /// Token ownership persistence
    pub tokens: Arc<dyn TokenRepository>,
    /// Auth cache
    pub cache: Arc<dyn TokenCache>,
}
