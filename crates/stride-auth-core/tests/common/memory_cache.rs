//! In-memory token cache for testing

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use stride_cache::{CachedAuth, TokenCache};

/// TTL-aware in-memory cache honoring the TokenCache contract
#[derive(Default, Clone)]
pub struct MemoryTokenCache {
    entries: Arc<DashMap<String, (CachedAuth, Instant)>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.value().1 > now).count()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get_auth(&self, digest: &str) -> Option<CachedAuth> {
        let entry = self.entries.get(digest)?;
        let (cached, expires_at) = *entry.value();
        drop(entry);

        if expires_at <= Instant::now() {
            self.entries.remove(digest);
            return None;
        }
        Some(cached)
    }

    async fn set_auth(&self, digest: &str, entry: CachedAuth, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        self.entries
            .insert(digest.to_string(), (entry, Instant::now() + ttl));
        true
    }

    async fn delete_auth(&self, digest: &str) -> bool {
        self.entries.remove(digest).is_some()
    }

    async fn invalidate_session(&self, user_id: Uuid) -> bool {
        self.entries.retain(|_, (entry, _)| entry.user_id != user_id);
        true
    }
}
