//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stride_types::{DeleteReason, UserStatus};

use crate::error::{DbError, DbResult};
use crate::models::UserRow;
use crate::repo::{UpsertUser, UserRepository};

const USER_COLUMNS: &str = "id, unique_id, nhs_number, first_name, email, date_of_birth, \
     gender, postcode, identity_level, status, status_updated_at, created_at, updated_at";

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_sub(&self, unique_id: &str) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE unique_id = $1"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn upsert(&self, user: UpsertUser) -> DbResult<UserRow> {
        // Single statement so a login callback commits the whole profile or
        // nothing. Conflict target is the provider subject identifier.
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users
                (id, unique_id, nhs_number, first_name, email, date_of_birth,
                 gender, postcode, identity_level, status, status_updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'Login', now())
            ON CONFLICT (unique_id) DO UPDATE SET
                nhs_number = EXCLUDED.nhs_number,
                first_name = EXCLUDED.first_name,
                email = EXCLUDED.email,
                date_of_birth = EXCLUDED.date_of_birth,
                gender = EXCLUDED.gender,
                postcode = EXCLUDED.postcode,
                identity_level = EXCLUDED.identity_level,
                status = 'Login',
                status_updated_at = now(),
                updated_at = now()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.unique_id)
        .bind(&user.nhs_number)
        .bind(&user.first_name)
        .bind(&user.email)
        .bind(user.date_of_birth)
        .bind(&user.gender)
        .bind(&user.postcode)
        .bind(&user.identity_level)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET status = $1, status_updated_at = $2, updated_at = now() \
             WHERE id = $3",
        )
        .bind(status.as_str())
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete_with_audit(&self, id: Uuid, reason: DeleteReason) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::NotFound);
        }

        sqlx::query(
            "INSERT INTO delete_audit (id, user_id, delete_reason, deleted_at) \
             VALUES ($1, $2, $3, now())",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(reason.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
