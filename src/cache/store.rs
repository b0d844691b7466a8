//! Cache store capability.
//!
//! The cache is reached through [`CacheStore`] so the read path can run against
//! Redis in production and an in-process store in development and tests.
//! Failures are reported as [`CacheUnavailable`], never as hard errors: callers
//! fall back to the source of truth.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::keys::CacheKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheUnavailable {
    #[error("cache operation `{op}` timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },
    #[error("cache transport failed during `{op}`: {message}")]
    Transport { op: &'static str, message: String },
}

impl CacheUnavailable {
    pub fn transport(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            op,
            message: err.to_string(),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            CacheUnavailable::Timeout { op, .. } | CacheUnavailable::Transport { op, .. } => op,
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live payload for `key`, or `None` when absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheUnavailable>;

    /// Stores `payload` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, payload: Bytes, ttl: Duration)
    -> Result<(), CacheUnavailable>;

    /// Deletes every entry whose key starts with `prefix`, returning how many were removed.
    async fn delete_matching(&self, prefix: &str) -> Result<u64, CacheUnavailable>;
}
