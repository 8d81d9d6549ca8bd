//! Redis implementation of the token cache
//!
//! A single multiplexed connection is established at startup and shared by
//! all in-flight requests. Connect and response timeouts are kept short so
//! a degraded Redis cannot stall request latency.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;
use uuid::Uuid;

use crate::{CachedAuth, TokenCache};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed token cache.
///
/// Construction never fails: if the backend is unreachable the cache comes
/// up disabled and every operation degrades to a miss, leaving callers on
/// the database path.
#[derive(Clone)]
pub struct RedisTokenCache {
    conn: Option<ConnectionManager>,
}

impl RedisTokenCache {
    /// Connect to Redis at `url` (e.g. `redis://:password@host:6379/0`).
    pub async fn connect(url: &str) -> Self {
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(Some(CONNECT_TIMEOUT))
            .set_response_timeout(Some(RESPONSE_TIMEOUT));

        let conn = match Client::open(url) {
            Ok(client) => match ConnectionManager::new_with_config(client, config).await {
                Ok(conn) => {
                    tracing::info!("Redis connection established");
                    Some(conn)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis, cache disabled: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Invalid Redis URL, cache disabled: {e}");
                None
            }
        };

        Self { conn }
    }

    /// A permanently-degraded cache with no backend. Every read misses and
    /// every write is a no-op. For deployments and tests without Redis.
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Whether the backend answered a PING
    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }

    /// Delete every key matching `pattern`, returning the number removed
    pub async fn delete_pattern(&self, pattern: &str) -> u64 {
        let Some(mut conn) = self.conn.clone() else {
            return 0;
        };

        let keys: Vec<String> = match conn.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Error listing Redis keys for pattern {pattern}: {e}");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match conn.del::<_, u64>(keys).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Error deleting Redis keys for pattern {pattern}: {e}");
                0
            }
        }
    }

    fn auth_key(digest: &str) -> String {
        format!("auth:{digest}")
    }

    fn token_key(user_id: Uuid, digest: &str) -> String {
        format!("token:{user_id}:{digest}")
    }

    fn user_key(user_id: Uuid) -> String {
        format!("user:{user_id}")
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get_auth(&self, digest: &str) -> Option<CachedAuth> {
        let mut conn = self.conn.clone()?;

        let raw: Option<String> = match conn.get(Self::auth_key(digest)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Error reading auth cache entry: {e}");
                return None;
            }
        };

        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Discarding undecodable auth cache entry: {e}");
                None
            }
        })
    }

    async fn set_auth(&self, digest: &str, entry: CachedAuth, ttl: Duration) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        let ttl_secs = ttl.as_secs();
        if ttl_secs == 0 {
            return false;
        }

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Error encoding auth cache entry: {e}");
                return false;
            }
        };

        // The per-user index entry carries the same TTL as the decision it
        // points at, so invalidate_session can find every live entry for a
        // user without the cache ever holding a raw token.
        let result: Result<(), redis::RedisError> = async {
            conn.set_ex::<_, _, ()>(Self::auth_key(digest), json, ttl_secs)
                .await?;
            conn.set_ex::<_, _, ()>(Self::token_key(entry.user_id, digest), "", ttl_secs)
                .await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Error writing auth cache entry: {e}");
                false
            }
        }
    }

    async fn delete_auth(&self, digest: &str) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        match conn.del::<_, u64>(Self::auth_key(digest)).await {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!("Error deleting auth cache entry: {e}");
                false
            }
        }
    }

    async fn invalidate_session(&self, user_id: Uuid) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        let pattern = format!("token:{user_id}:*");
        let index_keys: Vec<String> = match conn.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Error listing session keys for user {user_id}: {e}");
                return false;
            }
        };

        let mut keys: Vec<String> = index_keys
            .iter()
            .filter_map(|k| k.rsplit(':').next())
            .map(Self::auth_key)
            .collect();
        keys.extend(index_keys);
        keys.push(Self::user_key(user_id));

        match conn.del::<_, u64>(keys).await {
            Ok(cleared) => {
                tracing::info!("Invalidated cached session for user {user_id}: {cleared} keys");
                true
            }
            Err(e) => {
                tracing::warn!("Error invalidating session for user {user_id}: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for RedisTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTokenCache")
            .field("connected", &self.conn.is_some())
            .finish()
    }
}
