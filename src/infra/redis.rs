//! Redis-backed cache store.
//!
//! Holds a [`ConnectionManager`] that reconnects on its own; each operation
//! works on a cheap clone of it. Every Redis failure is reported as
//! [`CacheUnavailable::Transport`] so the search path can fall back.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::cache::{CacheKey, CacheStore, CacheUnavailable};
use crate::infra::error::InfraError;

const SCAN_BATCH: usize = 500;

#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(url)
            .map_err(|err| InfraError::cache(format!("invalid redis url: {err}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|err| InfraError::cache(format!("failed to connect to redis: {err}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheUnavailable> {
        let mut conn = self.conn.clone();
        let payload: Option<Vec<u8>> = conn
            .get(key.as_str())
            .await
            .map_err(|err| CacheUnavailable::transport("get", err))?;
        Ok(payload.map(Bytes::from))
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: Bytes,
        ttl: Duration,
    ) -> Result<(), CacheUnavailable> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key.as_str(), payload.as_ref(), seconds)
            .await
            .map_err(|err| CacheUnavailable::transport("set", err))?;
        Ok(())
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64, CacheUnavailable> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|err| CacheUnavailable::transport("delete_matching", err))?;

            if !keys.is_empty() {
                let deleted: u64 = conn
                    .del(&keys)
                    .await
                    .map_err(|err| CacheUnavailable::transport("delete_matching", err))?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = %pattern, removed, "Redis keys deleted by prefix");
        Ok(removed)
    }
}

/// Escape Redis glob metacharacters so `prefix` matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '^' | '-') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
