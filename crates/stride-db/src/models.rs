//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    /// Subject identifier issued by the federated identity provider
    pub unique_id: String,
    pub nhs_number: String,
    pub first_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    pub postcode: String,
    /// Identity-assurance level reported by the provider (e.g. "P9")
    pub identity_level: String,
    pub status: String,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The single active app token owned by a user (1:1 with users)
#[derive(Debug, Clone, FromRow)]
pub struct UserTokenRow {
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Audit record written when a user row is deleted
#[derive(Debug, Clone, FromRow)]
pub struct DeleteAuditRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delete_reason: String,
    pub deleted_at: DateTime<Utc>,
}

// Conversion implementations from row types to stride-types domain types
impl UserRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> stride_types::UserId {
        stride_types::UserId(self.id)
    }
}

impl UserTokenRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> stride_types::UserId {
        stride_types::UserId(self.user_id)
    }
}
