//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use stride_types::{DeleteReason, UserStatus};

use crate::error::DbResult;
use crate::models::*;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by internal ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Find a user by the identity provider's subject identifier
    async fn find_by_sub(&self, unique_id: &str) -> DbResult<Option<UserRow>>;

    /// Insert a new user, or overwrite the mutable profile fields of an
    /// existing one, setting status to Login with the current timestamp.
    /// Runs as a single atomic statement.
    async fn upsert(&self, user: UpsertUser) -> DbResult<UserRow>;

    /// Update lifecycle status and its change timestamp
    async fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Delete a user and write the delete-audit record in one transaction.
    /// Dependent rows (token, email preferences) are removed by cascade.
    async fn delete_with_audit(&self, id: Uuid, reason: DeleteReason) -> DbResult<()>;
}

/// Upsert user input — the profile projection built from the identity
/// provider and demographics claims during login-callback processing.
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub unique_id: String,
    pub nhs_number: String,
    pub first_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    pub postcode: String,
    pub identity_level: String,
}

/// User-token repository trait (1:1 token ownership)
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Find the current token for a user
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<UserTokenRow>>;

    /// Replace the user's token (insert on first login), refreshing the
    /// issuance timestamp
    async fn upsert(&self, user_id: Uuid, token: &str) -> DbResult<UserTokenRow>;

    /// Delete the user's token
    async fn delete_by_user_id(&self, user_id: Uuid) -> DbResult<()>;
}
