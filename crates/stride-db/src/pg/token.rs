//! PostgreSQL user-token repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::UserTokenRow;
use crate::repo::TokenRepository;

/// PostgreSQL user-token repository
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    /// Create a new token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn find_by_user_id(&self, user_id: Uuid) -> DbResult<Option<UserTokenRow>> {
        let token = sqlx::query_as::<_, UserTokenRow>(
            "SELECT user_id, token, created_at FROM user_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn upsert(&self, user_id: Uuid, token: &str) -> DbResult<UserTokenRow> {
        // user_id is the primary key: one active token per user, replacing
        // it supersedes whatever was there before.
        let row = sqlx::query_as::<_, UserTokenRow>(
            r#"
            INSERT INTO user_tokens (user_id, token, created_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id) DO UPDATE SET
                token = EXCLUDED.token,
                created_at = now()
            RETURNING user_id, token, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
