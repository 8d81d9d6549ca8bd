//! Mock repositories for testing
//!
//! In-memory implementations with read counters so tests can assert which
//! paths hit the persistence layer.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use stride_db::{
    DbError, DbResult, TokenRepository, UpsertUser, UserRepository, UserRow, UserTokenRow,
};
use stride_types::{DeleteReason, UserStatus};

/// In-memory user repository for testing
#[derive(Default, Clone)]
pub struct MockUserRepository {
    users: Arc<DashMap<Uuid, UserRow>>,
    by_sub: Arc<DashMap<String, Uuid>>,
    read_count: Arc<AtomicUsize>,
    deleted: Arc<DashMap<Uuid, String>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of find_by_id/find_by_sub calls so far
    pub fn reads(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Insert a test user directly
    pub fn insert_user(&self, user: UserRow) {
        self.by_sub.insert(user.unique_id.clone(), user.id);
        self.users.insert(user.id, user);
    }

    /// Build a user row with placeholder profile fields
    #[allow(dead_code)]
    pub fn create_test_user(unique_id: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            unique_id: unique_id.to_string(),
            nhs_number: "9434765919".to_string(),
            first_name: "Test".to_string(),
            email: Some(format!("test-{}@example.com", Uuid::new_v4())),
            date_of_birth: None,
            gender: "female".to_string(),
            postcode: "LS1 4AP".to_string(),
            identity_level: "P9".to_string(),
            status: UserStatus::Login.as_str().to_string(),
            status_updated_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Audit reasons recorded by delete_with_audit
    #[allow(dead_code)]
    pub fn delete_reason_for(&self, id: Uuid) -> Option<String> {
        self.deleted.get(&id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_sub(&self, unique_id: &str) -> DbResult<Option<UserRow>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .by_sub
            .get(unique_id)
            .and_then(|id| self.users.get(id.value()).map(|r| r.value().clone())))
    }

    async fn upsert(&self, user: UpsertUser) -> DbResult<UserRow> {
        let now = Utc::now();

        if let Some(id) = self.by_sub.get(&user.unique_id).map(|r| *r.value()) {
            let mut existing = self.users.get_mut(&id).expect("indexed user exists");
            existing.nhs_number = user.nhs_number;
            existing.first_name = user.first_name;
            existing.email = user.email;
            existing.date_of_birth = user.date_of_birth;
            existing.gender = user.gender;
            existing.postcode = user.postcode;
            existing.identity_level = user.identity_level;
            existing.status = UserStatus::Login.as_str().to_string();
            existing.status_updated_at = Some(now);
            existing.updated_at = now;
            return Ok(existing.value().clone());
        }

        let row = UserRow {
            id: Uuid::new_v4(),
            unique_id: user.unique_id,
            nhs_number: user.nhs_number,
            first_name: user.first_name,
            email: user.email,
            date_of_birth: user.date_of_birth,
            gender: user.gender,
            postcode: user.postcode,
            identity_level: user.identity_level,
            status: UserStatus::Login.as_str().to_string(),
            status_updated_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.insert_user(row.clone());
        Ok(row)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut user = self.users.get_mut(&id).ok_or(DbError::NotFound)?;
        user.status = status.as_str().to_string();
        user.status_updated_at = Some(at);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_with_audit(&self, id: Uuid, reason: DeleteReason) -> DbResult<()> {
        let (_, user) = self.users.remove(&id).ok_or(DbError::NotFound)?;
        self.by_sub.remove(&user.unique_id);
        self.deleted.insert(id, reason.as_str().to_string());
        Ok(())
    }
}

/// In-memory user-token repository for testing
#[derive(Default, Clone)]
pub struct MockTokenRepository {
    tokens: Arc<DashMap<Uuid, UserTokenRow>>,
    read_count: Arc<AtomicUsize>,
}

impl MockTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of find_by_user_id calls so far
    pub fn reads(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<UserTokenRow>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.tokens.get(&user_id).map(|r| r.value().clone()))
    }

    async fn upsert(&self, user_id: Uuid, token: &str) -> DbResult<UserTokenRow> {
        let row = UserTokenRow {
            user_id,
            token: token.to_string(),
            created_at: Utc::now(),
        };
        self.tokens.insert(user_id, row.clone());
        Ok(row)
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> DbResult<()> {
        self.tokens.remove(&user_id);
        Ok(())
    }
}
