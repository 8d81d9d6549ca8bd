//! Authenticated-identity types

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Identity produced by a successful bearer-token validation.
///
/// This is the only thing protected endpoints learn about the caller; the
/// token itself never travels past the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub user_id: UserId,
}

impl AuthIdentity {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}
