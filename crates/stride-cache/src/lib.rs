//! Stride Cache - Redis-backed token/auth cache
//!
//! Stores hashed-token → auth-decision mappings with a TTL so the auth
//! gateway can skip the database on repeat requests. The cache is a
//! performance optimization, never a correctness dependency: every
//! operation degrades to a miss or a no-op when the backend is
//! unreachable, and callers fall back to the source of truth.

pub mod redis_cache;

pub use redis_cache::RedisTokenCache;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

/// Cached outcome of a bearer-token validation.
///
/// `valid = false` entries short-circuit re-validation of tokens already
/// known to be superseded, so a replayed stale token does not trigger a
/// fresh database lookup on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAuth {
    pub user_id: Uuid,
    pub valid: bool,
}

impl CachedAuth {
    pub fn valid(user_id: Uuid) -> Self {
        Self {
            user_id,
            valid: true,
        }
    }

    pub fn invalid(user_id: Uuid) -> Self {
        Self {
            user_id,
            valid: false,
        }
    }
}

/// One-way digest of a token, used as the cache key so the cache store
/// never holds the raw credential.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Token/auth cache operations.
///
/// Implementations are availability-over-consistency by contract: reads
/// return `None` and writes return `false` on backend failure, they never
/// raise. TTLs of zero are treated as "do not cache".
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Look up the auth decision cached under a token digest
    async fn get_auth(&self, digest: &str) -> Option<CachedAuth>;

    /// Cache an auth decision under a token digest, bounded by `ttl`
    async fn set_auth(&self, digest: &str, entry: CachedAuth, ttl: Duration) -> bool;

    /// Drop the auth decision cached under a token digest
    async fn delete_auth(&self, digest: &str) -> bool;

    /// Drop every cached entry belonging to a user (auth decisions, the
    /// per-user token index, the user profile entry). Used on logout and
    /// disconnect so a revoked token cannot keep authenticating from cache.
    async fn invalidate_session(&self, user_id: Uuid) -> bool;
}
